use super::*;

fn sample_shape() -> DrawingElement {
    DrawingElement::Shape(ShapeElement {
        id: "s1".into(),
        shape_type: ShapeKind::Polygon,
        start_x: 0.0,
        start_y: 0.0,
        end_x: 10.0,
        end_y: 5.0,
        color: "#123456".into(),
        stroke_width: 2.0,
        fill: false,
        sides: Some(6),
        rotation: None,
    })
}

// --- wire form ---

#[test]
fn shape_serializes_with_type_tag_and_camel_case() {
    let json = serde_json::to_value(sample_shape()).expect("serialize");
    assert_eq!(
        json,
        serde_json::json!({
            "type": "shape",
            "id": "s1",
            "shapeType": "polygon",
            "startX": 0.0,
            "startY": 0.0,
            "endX": 10.0,
            "endY": 5.0,
            "color": "#123456",
            "strokeWidth": 2.0,
            "fill": false,
            "sides": 6
        })
    );
}

#[test]
fn absent_optionals_are_omitted() {
    let json = serde_json::to_value(sample_shape()).expect("serialize");
    assert!(json.get("rotation").is_none());
}

#[test]
fn path_deserializes_from_browser_payload() {
    let raw = r##"{"type":"path","id":"p9","points":[{"x":1,"y":2},{"x":3,"y":4}],"color":"#ff0000","width":3}"##;
    let el: DrawingElement = serde_json::from_str(raw).expect("deserialize");
    let DrawingElement::Path(path) = &el else {
        panic!("expected path, got {}", el.kind());
    };
    assert_eq!(path.points.len(), 2);
    assert_eq!(path.points[1], Point::new(3.0, 4.0));
    assert!(path.widths.is_none());
    assert!(path.opacity.is_none());
}

#[test]
fn text_style_fields_use_lowercase_values() {
    let raw = r##"{"type":"text","id":"t1","x":0,"y":0,"text":"hi","fontSize":16,"color":"#000","fontWeight":"bold","fontStyle":"italic","textAlign":"center"}"##;
    let el: DrawingElement = serde_json::from_str(raw).expect("deserialize");
    let DrawingElement::Text(text) = el else {
        panic!("expected text");
    };
    assert_eq!(text.font_weight, Some(FontWeight::Bold));
    assert_eq!(text.font_style, Some(FontStyle::Italic));
    assert_eq!(text.text_align, Some(TextAlign::Center));
}

#[test]
fn function_plot_round_trips() {
    let plot = DrawingElement::Function(FunctionPlot {
        id: "f1".into(),
        expression: "sin(x)".into(),
        color: "#0000ff".into(),
        stroke_width: 2.0,
        x_range: 10.0,
        y_range: 4.0,
        stroke_dasharray: Some("5 5".into()),
    });
    let json = serde_json::to_string(&plot).expect("serialize");
    assert!(json.contains(r#""xRange":10.0"#));
    assert!(json.contains(r#""strokeDasharray":"5 5""#));
    let back: DrawingElement = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, plot);
}

#[test]
fn unknown_type_is_rejected() {
    let raw = r#"{"type":"sticker","id":"x"}"#;
    assert!(serde_json::from_str::<DrawingElement>(raw).is_err());
}

// --- accessors ---

#[test]
fn id_and_kind() {
    let el = sample_shape();
    assert_eq!(el.id(), "s1");
    assert_eq!(el.kind(), "shape");

    let img = DrawingElement::Image(ImageElement {
        id: "i1".into(),
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
        src: String::new(),
        alt: None,
        rotation: None,
    });
    assert_eq!(img.id(), "i1");
    assert_eq!(img.kind(), "image");
}

#[test]
fn kind_matches_serialized_tag() {
    let el = sample_shape();
    let json = serde_json::to_value(&el).expect("serialize");
    assert_eq!(json["type"], el.kind());
}

// --- ids ---

#[test]
fn new_element_ids_are_unique_uuids() {
    let a = new_element_id();
    let b = new_element_id();
    assert_ne!(a, b);
    assert!(uuid::Uuid::parse_str(&a).is_ok());
}

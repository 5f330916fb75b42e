//! Two sessions on one in-memory hub: the element-update round trip a host
//! sees when a peer edits a shape.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use boardsync::canvas::element::{ShapeElement, ShapeKind};
use boardsync::hub::LocalHub;
use boardsync::stores::RemoteCursor;
use boardsync::{CollabSession, DrawingElement, LocalUser, SessionConfig, UserId};

type Received = Arc<Mutex<Vec<(DrawingElement, UserId, String)>>>;

fn init_tracing() {
    // Several tests share the process; only the first install wins.
    if tracing_subscriber::fmt().with_test_writer().try_init().is_err() {
        tracing::trace!("subscriber already installed");
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

fn e1() -> DrawingElement {
    DrawingElement::Shape(ShapeElement {
        id: "e1".into(),
        shape_type: ShapeKind::Rectangle,
        start_x: 0.0,
        start_y: 0.0,
        end_x: 10.0,
        end_y: 10.0,
        color: "#1e293b".into(),
        stroke_width: 2.0,
        fill: false,
        sides: None,
        rotation: None,
    })
}

fn open(hub: &LocalHub, id: UserId, name: &str) -> CollabSession {
    CollabSession::start(hub, "lesson-42", LocalUser::new(id, name), SessionConfig::default()).expect("start")
}

fn record_updates(session: &CollabSession) -> Received {
    let received: Received = Arc::default();
    let sink = Arc::clone(&received);
    session.on_remote_element_updated(move |element, user_id, username| {
        sink.lock()
            .expect("lock")
            .push((element.clone(), user_id, username.to_owned()));
    });
    received
}

#[tokio::test(start_paused = true)]
async fn peer_receives_element_update_with_sender_identity() {
    init_tracing();
    let hub = LocalHub::new();
    let a = open(&hub, 1, "tutor");
    let b = open(&hub, 2, "student");
    let received = record_updates(&b);
    settle().await;
    assert!(a.is_connected() && b.is_connected());

    assert!(a.broadcast_element_updated(&e1()));
    settle().await;

    let got = received.lock().expect("lock").clone();
    assert_eq!(got, vec![(e1(), 1, "tutor".to_owned())]);
}

#[tokio::test(start_paused = true)]
async fn self_delivery_never_fires_handler() {
    init_tracing();
    // Echoing hub: every broadcast also comes back to its sender.
    let hub = LocalHub::new().with_self_echo();
    let a = open(&hub, 1, "tutor");
    let b_as_a = open(&hub, 1, "tutor");
    let own = record_updates(&a);
    let other_tab = record_updates(&b_as_a);
    settle().await;

    assert!(a.broadcast_element_updated(&e1()));
    settle().await;

    assert!(own.lock().expect("lock").is_empty());
    assert!(other_tab.lock().expect("lock").is_empty());
}

#[tokio::test(start_paused = true)]
async fn leaving_peer_takes_only_their_cursor() {
    init_tracing();
    let hub = LocalHub::new();
    let a = open(&hub, 1, "tutor");
    let b = open(&hub, 2, "student");
    let c = open(&hub, 3, "observer");

    let cursors: Arc<Mutex<Vec<RemoteCursor>>> = Arc::default();
    let sink = Arc::clone(&cursors);
    let _sub = a.subscribe_cursors(move |items| *sink.lock().expect("lock") = items.to_vec());
    settle().await;

    assert!(b.broadcast_cursor_move(1.0, 2.0));
    assert!(c.broadcast_cursor_move(3.0, 4.0));
    settle().await;
    assert_eq!(cursors.lock().expect("lock").len(), 2);

    drop(b);
    settle().await;

    let left: Vec<UserId> = cursors.lock().expect("lock").iter().map(|c| c.user_id).collect();
    assert_eq!(left, vec![3]);
    let mut online: Vec<UserId> = a.online_users().iter().map(|u| u.user_id).collect();
    online.sort_unstable();
    assert_eq!(online, vec![1, 3]);
}

#[tokio::test(start_paused = true)]
async fn late_subscriber_sees_existing_cursors_immediately() {
    init_tracing();
    let hub = LocalHub::new();
    let a = open(&hub, 1, "tutor");
    let b = open(&hub, 2, "student");
    let c = open(&hub, 3, "observer");
    settle().await;
    assert!(b.broadcast_cursor_move(1.0, 1.0));
    assert!(c.broadcast_cursor_move(2.0, 2.0));
    settle().await;

    let calls: Arc<Mutex<Vec<usize>>> = Arc::default();
    let sink = Arc::clone(&calls);
    let _sub = a.subscribe_cursors(move |items| sink.lock().expect("lock").push(items.len()));

    assert_eq!(*calls.lock().expect("lock"), vec![2]);
}

use super::*;
use crate::event::ErrorCode;

const TOPIC: &str = "board:b1";

fn queue() -> (mpsc::Sender<ChannelMessage>, mpsc::Receiver<ChannelMessage>) {
    mpsc::channel(32)
}

fn drain(rx: &mut mpsc::Receiver<ChannelMessage>) -> Vec<ChannelMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

async fn joined(hub: &LocalHub, key: &str) -> (Box<dyn Channel>, mpsc::Receiver<ChannelMessage>) {
    let channel = hub.channel(TOPIC, key);
    let (tx, mut rx) = queue();
    channel.subscribe(tx).await.expect("subscribe");
    assert_eq!(
        rx.try_recv().expect("status"),
        ChannelMessage::Status(ChannelStatus::Subscribed)
    );
    (channel, rx)
}

// --- subscribe ---

#[tokio::test]
async fn subscribe_reports_status_and_registers_member() {
    let hub = LocalHub::new();
    let (channel, _rx) = joined(&hub, "1").await;
    assert_eq!(channel.topic(), TOPIC);
    assert_eq!(hub.member_count(TOPIC).await, 1);
}

#[tokio::test]
async fn second_subscribe_is_rejected() {
    let hub = LocalHub::new();
    let (channel, _rx) = joined(&hub, "1").await;
    let (tx, _rx2) = queue();
    let err = channel.subscribe(tx).await.expect_err("already subscribed");
    assert_eq!(err.error_code(), "E_ALREADY_SUBSCRIBED");
    assert_eq!(hub.member_count(TOPIC).await, 1);
}

#[tokio::test]
async fn subscribe_with_closed_queue_fails() {
    let hub = LocalHub::new();
    let channel = hub.channel(TOPIC, "1");
    let (tx, rx) = queue();
    drop(rx);
    let err = channel.subscribe(tx).await.expect_err("closed queue");
    assert_eq!(err.error_code(), "E_TRANSPORT");
    assert_eq!(hub.member_count(TOPIC).await, 0);
}

#[tokio::test]
async fn unsubscribed_channel_cannot_send_or_track() {
    let hub = LocalHub::new();
    let channel = hub.channel(TOPIC, "1");
    let err = channel.send("cursor-moved", serde_json::json!({})).await.expect_err("not joined");
    assert_eq!(err.error_code(), "E_NOT_SUBSCRIBED");
    let err = channel.track(PresenceRecord::new(1, "a")).await.expect_err("not joined");
    assert_eq!(err.error_code(), "E_NOT_SUBSCRIBED");
}

// --- send ---

#[tokio::test]
async fn send_reaches_other_members_only() {
    let hub = LocalHub::new();
    let (a, mut rx_a) = joined(&hub, "1").await;
    let (_b, mut rx_b) = joined(&hub, "2").await;

    a.send("cursor-moved", serde_json::json!({"x": 1})).await.expect("send");

    assert!(drain(&mut rx_a).is_empty());
    assert_eq!(
        drain(&mut rx_b),
        vec![ChannelMessage::Broadcast { event: "cursor-moved".into(), payload: serde_json::json!({"x": 1}) }]
    );
}

#[tokio::test]
async fn self_echo_hub_delivers_to_sender() {
    let hub = LocalHub::new();
    let echo = hub.with_self_echo();
    let (a, mut rx_a) = joined(&echo, "1").await;

    a.send("element-deleted", serde_json::json!({})).await.expect("send");

    assert_eq!(drain(&mut rx_a).len(), 1);
}

#[tokio::test]
async fn topics_are_isolated() {
    let hub = LocalHub::new();
    let (a, _rx_a) = joined(&hub, "1").await;
    let other = hub.channel("board:b2", "2");
    let (tx, mut rx_other) = queue();
    other.subscribe(tx).await.expect("subscribe");
    drain(&mut rx_other);

    a.send("cursor-moved", serde_json::json!({})).await.expect("send");

    assert!(drain(&mut rx_other).is_empty());
}

#[tokio::test]
async fn full_member_queue_drops_without_error() {
    let hub = LocalHub::new();
    let (a, _rx_a) = joined(&hub, "1").await;
    let slow = hub.channel(TOPIC, "2");
    let (tx, mut rx_slow) = mpsc::channel(1);
    slow.subscribe(tx).await.expect("subscribe");

    // Queue still holds the status message.
    a.send("cursor-moved", serde_json::json!({})).await.expect("send is best-effort");

    assert_eq!(drain(&mut rx_slow), vec![ChannelMessage::Status(ChannelStatus::Subscribed)]);
}

// --- presence ---

#[tokio::test]
async fn track_sends_join_then_full_sync_to_everyone() {
    let hub = LocalHub::new();
    let (a, mut rx_a) = joined(&hub, "1").await;
    let (b, mut rx_b) = joined(&hub, "2").await;
    a.track(PresenceRecord::new(1, "a")).await.expect("track");
    drain(&mut rx_a);
    drain(&mut rx_b);

    let rec_b = PresenceRecord::new(2, "b");
    b.track(rec_b.clone()).await.expect("track");

    let seen = drain(&mut rx_a);
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], ChannelMessage::PresenceJoin(vec![rec_b]));
    let ChannelMessage::PresenceSync(table) = &seen[1] else {
        panic!("expected sync, got {:?}", seen[1]);
    };
    let ids: Vec<_> = table.iter().map(|r| r.user_id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(drain(&mut rx_b).len(), 2);
}

#[tokio::test]
async fn retrack_replaces_record() {
    let hub = LocalHub::new();
    let (a, _rx) = joined(&hub, "1").await;
    a.track(PresenceRecord::new(1, "a")).await.expect("track");
    a.track(PresenceRecord::new(1, "a").with_viewport(1.0, 2.0, 3.0)).await.expect("track");

    let table = hub.presence(TOPIC).await;
    assert_eq!(table.len(), 1);
    assert_eq!(table[0].viewport(), Some((1.0, 2.0, 3.0)));
}

#[tokio::test]
async fn unsubscribe_announces_leave_and_sync() {
    let hub = LocalHub::new();
    let (a, mut rx_a) = joined(&hub, "1").await;
    let (b, mut rx_b) = joined(&hub, "2").await;
    a.track(PresenceRecord::new(1, "a")).await.expect("track");
    b.track(PresenceRecord::new(2, "b")).await.expect("track");
    drain(&mut rx_a);
    drain(&mut rx_b);

    b.unsubscribe().await.expect("unsubscribe");

    let seen = drain(&mut rx_a);
    assert_eq!(seen.len(), 2);
    let ChannelMessage::PresenceLeave { left, current } = &seen[0] else {
        panic!("expected leave, got {:?}", seen[0]);
    };
    assert_eq!(left[0].user_id, 2);
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].user_id, 1);
    assert_eq!(drain(&mut rx_b), vec![ChannelMessage::Status(ChannelStatus::Closed)]);
    assert_eq!(hub.member_count(TOPIC).await, 1);
}

#[tokio::test]
async fn unsubscribe_is_idempotent_and_drops_empty_topic() {
    let hub = LocalHub::new();
    let (a, _rx) = joined(&hub, "1").await;
    a.unsubscribe().await.expect("first");
    a.unsubscribe().await.expect("second");
    assert_eq!(hub.member_count(TOPIC).await, 0);
    assert!(hub.presence(TOPIC).await.is_empty());
}

#[tokio::test]
async fn untracked_member_leaves_silently() {
    let hub = LocalHub::new();
    let (_a, mut rx_a) = joined(&hub, "1").await;
    let (b, _rx_b) = joined(&hub, "2").await;

    b.unsubscribe().await.expect("unsubscribe");

    assert!(drain(&mut rx_a).is_empty());
}

// --- injection ---

#[tokio::test]
async fn inject_status_reaches_every_member() {
    let hub = LocalHub::new();
    let (_a, mut rx_a) = joined(&hub, "1").await;
    let (_b, mut rx_b) = joined(&hub, "2").await;

    hub.inject_status(TOPIC, ChannelStatus::TimedOut).await;

    assert_eq!(drain(&mut rx_a), vec![ChannelMessage::Status(ChannelStatus::TimedOut)]);
    assert_eq!(drain(&mut rx_b), vec![ChannelMessage::Status(ChannelStatus::TimedOut)]);
}

#[tokio::test]
async fn evict_removes_all_records_for_key() {
    let hub = LocalHub::new();
    let (_a, mut rx_a) = joined(&hub, "1").await;
    let (tab1, _rx1) = joined(&hub, "2").await;
    let (tab2, _rx2) = joined(&hub, "2").await;
    tab1.track(PresenceRecord::new(2, "b")).await.expect("track");
    tab2.track(PresenceRecord::new(2, "b")).await.expect("track");
    drain(&mut rx_a);

    assert_eq!(hub.evict(TOPIC, "2").await, 2);

    let seen = drain(&mut rx_a);
    let ChannelMessage::PresenceLeave { left, current } = &seen[0] else {
        panic!("expected leave, got {:?}", seen[0]);
    };
    assert_eq!(left.len(), 2);
    assert!(current.is_empty());
    assert_eq!(hub.member_count(TOPIC).await, 1);
    assert_eq!(hub.evict("board:none", "2").await, 0);
}

use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;
use vidtube_backend::{
    chat::{ChatRelay, RelayError, RoomRegistry, ServerEvent},
    models::user::AuthUser,
    repositories::chat as chat_repo,
    types::VideoId,
};

mod support;

fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn error_code(event: &ServerEvent) -> &str {
    match event {
        ServerEvent::Error { code, .. } => code,
        other => panic!("expected error event, got {:?}", other),
    }
}

struct Fixture {
    pool: vidtube_backend::db::connection::DbPool,
    relay: ChatRelay,
    alice: AuthUser,
    bob: AuthUser,
    video_id: VideoId,
}

async fn fixture() -> Fixture {
    let pool = support::test_pool().await;
    let alice = support::seed_user(&pool, "alice").await;
    let bob = support::seed_user(&pool, "bob").await;
    let video = support::seed_video(&pool, &alice, "intro").await;
    let relay = ChatRelay::new(pool.clone(), Arc::new(RoomRegistry::new()));
    Fixture {
        pool,
        relay,
        alice: AuthUser::from(alice),
        bob: AuthUser::from(bob),
        video_id: video.id,
    }
}

#[tokio::test]
async fn joining_an_empty_room_yields_empty_backlog() {
    let f = fixture().await;
    let (conn, mut rx) = f.relay.connect(&f.alice).await;

    let delivered = f
        .relay
        .join_video_room(conn, &f.video_id.to_string())
        .await
        .expect("join");

    assert_eq!(delivered, 0);
    assert_eq!(drain(&mut rx), vec![ServerEvent::PreviousMessages(vec![])]);
    assert_eq!(f.relay.rooms().room_size(f.video_id).await, 1);
}

#[tokio::test]
async fn late_joiner_receives_backlog_in_send_order() {
    let f = fixture().await;
    let video = f.video_id.to_string();
    let (sender, mut sender_rx) = f.relay.connect(&f.alice).await;
    f.relay.join_video_room(sender, &video).await.unwrap();

    let mut sent = Vec::new();
    for text in ["first", "second", "third"] {
        sent.push(
            f.relay
                .chat_message(sender, &f.alice, &video, None, text)
                .await
                .expect("send"),
        );
    }

    let (late, mut late_rx) = f.relay.connect(&f.bob).await;
    assert_eq!(f.relay.join_video_room(late, &video).await.unwrap(), 3);

    let events = drain(&mut late_rx);
    assert_eq!(events, vec![ServerEvent::PreviousMessages(sent.clone())]);
    let texts: Vec<_> = sent.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, ["first", "second", "third"]);

    // The sender saw its own backlog plus each of its messages live.
    let sender_events = drain(&mut sender_rx);
    assert_eq!(sender_events.len(), 4);
    assert_eq!(sender_events[1], ServerEvent::ChatMessage(sent[0].clone()));
}

#[tokio::test]
async fn message_sent_while_backlog_loads_is_delivered_once_after_backlog() {
    let f = fixture().await;
    let video = f.video_id.to_string();
    let (a, mut a_rx) = f.relay.connect(&f.alice).await;
    f.relay.join_video_room(a, &video).await.unwrap();
    drain(&mut a_rx);

    // Bob's join, split at the point where the backlog query is in flight.
    let (b, mut b_rx) = f.relay.connect(&f.bob).await;
    assert!(f.relay.rooms().begin_join(b, f.video_id).await);
    let raced = f
        .relay
        .chat_message(a, &f.alice, &video, None, "during join")
        .await
        .expect("send");
    let backlog = chat_repo::list_for_video(&f.pool, f.video_id).await.unwrap();
    assert_eq!(backlog, vec![raced.clone()]);
    assert!(b_rx.try_recv().is_err());
    assert!(f.relay.rooms().complete_join(b, f.video_id, backlog).await);

    let later = f
        .relay
        .chat_message(a, &f.alice, &video, None, "after join")
        .await
        .expect("send");

    assert_eq!(
        drain(&mut b_rx),
        vec![
            ServerEvent::PreviousMessages(vec![raced.clone()]),
            ServerEvent::ChatMessage(later.clone()),
        ]
    );
    assert_eq!(
        drain(&mut a_rx),
        vec![ServerEvent::ChatMessage(raced), ServerEvent::ChatMessage(later)]
    );
}

#[tokio::test]
async fn message_is_persisted_then_broadcast_to_room_only() {
    let f = fixture().await;
    let video = f.video_id.to_string();
    let other_video = support::seed_video(&f.pool, &support::seed_user(&f.pool, "carol").await, "other").await;

    let (a, mut a_rx) = f.relay.connect(&f.alice).await;
    let (b, mut b_rx) = f.relay.connect(&f.bob).await;
    let (outsider, mut outsider_rx) = f.relay.connect(&f.bob).await;
    f.relay.join_video_room(a, &video).await.unwrap();
    f.relay.join_video_room(b, &video).await.unwrap();
    f.relay
        .join_video_room(outsider, &other_video.id.to_string())
        .await
        .unwrap();
    drain(&mut a_rx);
    drain(&mut b_rx);
    drain(&mut outsider_rx);

    let message = f
        .relay
        .chat_message(b, &f.bob, &video, Some(&f.bob.id.to_string()), "  hello  ")
        .await
        .expect("send");

    assert_eq!(message.text, "hello");
    assert_eq!(message.user_id, f.bob.id);
    assert_eq!(message.video_id, f.video_id);

    let expected = ServerEvent::ChatMessage(message.clone());
    assert_eq!(drain(&mut a_rx), vec![expected.clone()]);
    assert_eq!(drain(&mut b_rx), vec![expected]);
    assert!(drain(&mut outsider_rx).is_empty());

    let stored = chat_repo::list_for_video(&f.pool, f.video_id).await.unwrap();
    assert_eq!(stored, vec![message]);
}

#[tokio::test]
async fn empty_text_is_rejected_without_persisting_or_broadcasting() {
    let f = fixture().await;
    let video = f.video_id.to_string();
    let (a, mut a_rx) = f.relay.connect(&f.alice).await;
    let (b, mut b_rx) = f.relay.connect(&f.bob).await;
    f.relay.join_video_room(a, &video).await.unwrap();
    f.relay.join_video_room(b, &video).await.unwrap();
    drain(&mut a_rx);
    drain(&mut b_rx);

    let frame = json!({ "event": "chatMessage", "data": { "videoId": video, "text": "   " } });
    f.relay.handle_frame(a, &f.alice, &frame.to_string()).await;

    let events = drain(&mut a_rx);
    assert_eq!(events.len(), 1);
    assert_eq!(error_code(&events[0]), "BAD_REQUEST");
    assert!(drain(&mut b_rx).is_empty());
    assert!(chat_repo::list_for_video(&f.pool, f.video_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn sending_as_someone_else_is_forbidden() {
    let f = fixture().await;
    let video = f.video_id.to_string();
    let (b, mut b_rx) = f.relay.connect(&f.bob).await;
    f.relay.join_video_room(b, &video).await.unwrap();
    drain(&mut b_rx);

    let result = f
        .relay
        .chat_message(b, &f.bob, &video, Some(&f.alice.id.to_string()), "spoofed")
        .await;

    assert!(matches!(result, Err(RelayError::Forbidden(_))));
    assert!(drain(&mut b_rx).is_empty());
    assert!(chat_repo::list_for_video(&f.pool, f.video_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn bad_or_unknown_video_errors_reach_sender_only() {
    let f = fixture().await;
    let (a, mut a_rx) = f.relay.connect(&f.alice).await;
    let (b, mut b_rx) = f.relay.connect(&f.bob).await;
    f.relay
        .join_video_room(b, &f.video_id.to_string())
        .await
        .unwrap();
    drain(&mut b_rx);

    let unknown = json!({ "event": "joinVideoRoom", "data": { "videoId": VideoId::new().to_string() } });
    f.relay.handle_frame(a, &f.alice, &unknown.to_string()).await;
    let malformed = json!({ "event": "joinVideoRoom", "data": { "videoId": "not-an-id" } });
    f.relay.handle_frame(a, &f.alice, &malformed.to_string()).await;
    f.relay.handle_frame(a, &f.alice, "{not json").await;

    let codes: Vec<_> = drain(&mut a_rx).iter().map(|e| error_code(e).to_string()).collect();
    assert_eq!(codes, ["NOT_FOUND", "BAD_REQUEST", "BAD_REQUEST"]);
    assert!(drain(&mut b_rx).is_empty());
    assert_eq!(f.relay.rooms().room_count().await, 1);
}

#[tokio::test]
async fn persistence_failure_aborts_broadcast() {
    let f = fixture().await;
    let video = f.video_id.to_string();
    let (a, mut a_rx) = f.relay.connect(&f.alice).await;
    let (b, mut b_rx) = f.relay.connect(&f.bob).await;
    f.relay.join_video_room(a, &video).await.unwrap();
    f.relay.join_video_room(b, &video).await.unwrap();
    drain(&mut a_rx);
    drain(&mut b_rx);

    sqlx::query("DROP TABLE chat_messages")
        .execute(&f.pool)
        .await
        .unwrap();

    let frame = json!({ "event": "chatMessage", "data": { "videoId": video, "text": "lost" } });
    f.relay.handle_frame(a, &f.alice, &frame.to_string()).await;

    let events = drain(&mut a_rx);
    assert_eq!(
        events,
        vec![ServerEvent::Error {
            code: "INTERNAL_SERVER_ERROR".into(),
            message: "Internal server error".into(),
        }]
    );
    assert!(drain(&mut b_rx).is_empty());
}

#[tokio::test]
async fn disconnect_leaves_every_room() {
    let f = fixture().await;
    let (a, _a_rx) = f.relay.connect(&f.alice).await;
    f.relay
        .join_video_room(a, &f.video_id.to_string())
        .await
        .unwrap();
    assert_eq!(f.relay.rooms().connection_count().await, 1);

    f.relay.disconnect(a).await;

    assert_eq!(f.relay.rooms().room_size(f.video_id).await, 0);
    assert_eq!(f.relay.rooms().room_count().await, 0);
    assert_eq!(f.relay.rooms().connection_count().await, 0);
}

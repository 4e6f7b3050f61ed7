//! Registry and session lifecycle tests: duplicate subscriptions, lazy
//! session creation and teardown, fan-out message-id sharing.

mod common;

use std::sync::Arc;

use bytes::Bytes;
use common::{CompletingHandler, IdleHandler, channel_subscription};
use stompwire::{
    Headers,
    ProtocolError,
    SessionRegistry,
    StompConnection,
};
use tokio::time::{Duration, sleep, timeout};

#[tokio::test]
async fn duplicate_subscription_id_conflicts_until_removed() {
    let registry = SessionRegistry::new(Arc::new(IdleHandler));
    let connection = Arc::new(StompConnection::new());

    let (first, _rx1) = channel_subscription("/queue/a", &connection, "sub-1");
    registry
        .add_subscription(first)
        .expect("first subscription registers");

    let (duplicate, _rx2) = channel_subscription("/queue/a", &connection, "sub-1");
    let err = registry
        .add_subscription(duplicate)
        .expect_err("same (connection, id) pair must conflict");
    assert_eq!(
        err,
        ProtocolError::DuplicateSubscription { id: "sub-1".into() }
    );

    // A different id on the same connection is fine.
    let (sibling, _rx3) = channel_subscription("/queue/a", &connection, "sub-2");
    registry
        .add_subscription(sibling)
        .expect("distinct id registers");

    // After removal the id becomes available again.
    registry.remove_subscription(&connection, "sub-1").await;
    let (again, _rx4) = channel_subscription("/queue/a", &connection, "sub-1");
    registry
        .add_subscription(again)
        .expect("id is reusable after unsubscribe");

    registry.close().await;
}

#[tokio::test]
async fn removing_the_last_subscription_tears_the_session_down() {
    let registry = SessionRegistry::new(Arc::new(IdleHandler));
    let connection = Arc::new(StompConnection::new());

    let (subscription, _rx) = channel_subscription("/queue/a", &connection, "sub-1");
    registry
        .add_subscription(subscription)
        .expect("subscription registers");
    let session = registry.session("/queue/a").expect("session exists");
    assert!(session.is_active());

    registry.remove_subscription(&connection, "sub-1").await;
    assert!(registry.session("/queue/a").is_none());
    assert!(!session.is_active());

    // The torn-down session rejects further traffic.
    let err = session
        .enqueue(common::frame(stompwire::StompCommand::Send, &[], b"late"))
        .await
        .expect_err("closed session must reject enqueue");
    assert_eq!(
        err,
        ProtocolError::SessionClosed {
            destination: "/queue/a".into()
        }
    );
}

#[tokio::test]
async fn removal_broadcasts_across_destinations() {
    let registry = SessionRegistry::new(Arc::new(IdleHandler));
    let connection = Arc::new(StompConnection::new());

    let (on_a, _rx_a) = channel_subscription("/queue/a", &connection, "sub-1");
    let (on_b, _rx_b) = channel_subscription("/queue/b", &connection, "sub-1");
    registry.add_subscription(on_a).expect("first registers");
    registry.add_subscription(on_b).expect("second registers");

    // Subscription ids are scoped per connection, not per destination, so
    // removal sweeps every session.
    registry.remove_subscription(&connection, "sub-1").await;
    assert!(registry.session("/queue/a").is_none());
    assert!(registry.session("/queue/b").is_none());
}

#[tokio::test]
async fn unrelated_subscribers_keep_a_session_alive() {
    let registry = SessionRegistry::new(Arc::new(IdleHandler));
    let alice = Arc::new(StompConnection::new());
    let bob = Arc::new(StompConnection::new());

    let (from_alice, _rx_a) = channel_subscription("/queue/a", &alice, "sub-1");
    let (from_bob, _rx_b) = channel_subscription("/queue/a", &bob, "sub-1");
    registry.add_subscription(from_alice).expect("registers");
    registry.add_subscription(from_bob).expect("registers");

    registry.remove_subscription(&alice, "sub-1").await;
    let session = registry
        .session("/queue/a")
        .expect("bob still holds the session open");
    assert_eq!(session.subscription_count(), 1);

    registry.close().await;
    assert!(registry.session("/queue/a").is_none());
}

#[tokio::test]
async fn fan_out_shares_one_message_id_per_connection() {
    let registry = SessionRegistry::new(Arc::new(IdleHandler));
    let alice = Arc::new(StompConnection::new());
    let bob = Arc::new(StompConnection::new());

    let (s1, mut rx1) = channel_subscription("/topic/news", &alice, "sub-1");
    let (s2, mut rx2) = channel_subscription("/topic/news", &alice, "sub-2");
    let (s3, mut rx3) = channel_subscription("/topic/news", &bob, "sub-1");
    for subscription in [s1, s2, s3] {
        registry
            .add_subscription(subscription)
            .expect("subscription registers");
    }

    let session = registry.session("/topic/news").expect("session exists");
    session
        .send_all(Bytes::from("breaking"), Headers::new())
        .await
        .expect("fan-out succeeds");

    let to_s1 = rx1.recv().await.expect("s1 delivery");
    let to_s2 = rx2.recv().await.expect("s2 delivery");
    let to_s3 = rx3.recv().await.expect("s3 delivery");

    for delivered in [&to_s1, &to_s2, &to_s3] {
        assert_eq!(delivered.payload.as_ref(), b"breaking");
        assert_eq!(delivered.headers.destination(), Some("/topic/news"));
    }
    assert_eq!(to_s1.headers.first("subscription"), Some("sub-1"));
    assert_eq!(to_s2.headers.first("subscription"), Some("sub-2"));

    // Same connection, same id; different connection, its own counter.
    let id1 = to_s1.headers.first("message-id").expect("message id");
    let id2 = to_s2.headers.first("message-id").expect("message id");
    let id3 = to_s3.headers.first("message-id").expect("message id");
    assert_eq!(id1, id2);
    assert_eq!(id1, "message-1");
    assert_eq!(id3, "message-1");
    assert_eq!(alice.next_message_id(), "message-2");
    assert_eq!(bob.next_message_id(), "message-2");

    registry.close().await;
}

#[tokio::test]
async fn handler_completion_detaches_the_session() {
    let registry = SessionRegistry::new(Arc::new(CompletingHandler));
    let connection = Arc::new(StompConnection::new());

    let (subscription, _rx) = channel_subscription("/queue/a", &connection, "sub-1");
    registry
        .add_subscription(subscription)
        .expect("subscription registers");

    timeout(Duration::from_secs(5), async {
        while registry.session("/queue/a").is_some() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("completed handler must detach its session");
}

#[tokio::test]
async fn close_is_terminal_for_every_session() {
    let registry = SessionRegistry::new(Arc::new(IdleHandler));
    let connection = Arc::new(StompConnection::new());

    let (on_a, _rx_a) = channel_subscription("/queue/a", &connection, "sub-1");
    let (on_b, _rx_b) = channel_subscription("/queue/b", &connection, "sub-2");
    registry.add_subscription(on_a).expect("registers");
    registry.add_subscription(on_b).expect("registers");

    let session_a = registry.session("/queue/a").expect("session exists");
    registry.close().await;

    assert!(registry.session("/queue/a").is_none());
    assert!(registry.session("/queue/b").is_none());
    assert!(!session_a.is_active());
}

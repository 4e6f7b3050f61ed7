//! Per-destination publish/subscribe sessions.
//!
//! A [`DestinationSession`] owns the subscriptions for one destination, the
//! inbound queue its handler task consumes, and a cancellation token tied
//! to that task's lifetime. Sessions are shared (`Arc`) between the
//! registry, the handler task and any connection currently touching the
//! destination.
//!
//! Lock discipline: the subscription list sits behind a synchronous mutex
//! held only for mutation and snapshots, never across an `.await`. Fan-out
//! works from a snapshot taken up front.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    command::StompCommand,
    connection::StompConnection,
    error::ProtocolError,
    headers::Headers,
    message::StompMessage,
    subscription::{DeliveryError, Subscription},
};

/// Inbound queue depth. Senders rendezvous with the handler's take, so a
/// slow handler exerts backpressure on SEND dispatch.
const INBOUND_QUEUE_DEPTH: usize = 1;

/// The live state of one destination: subscribers plus the inbound queue
/// consumed by the destination's handler task.
#[derive(Debug)]
pub struct DestinationSession {
    destination: String,
    subscriptions: Mutex<Vec<Arc<Subscription>>>,
    inbound_tx: mpsc::Sender<StompMessage>,
    inbound_rx: AsyncMutex<mpsc::Receiver<StompMessage>>,
    cancel: CancellationToken,
}

impl DestinationSession {
    /// Creates an empty session for `destination`.
    #[must_use]
    pub fn new(destination: impl Into<String>) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);
        Self {
            destination: destination.into(),
            subscriptions: Mutex::new(Vec::new()),
            inbound_tx,
            inbound_rx: AsyncMutex::new(inbound_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Destination this session serves.
    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// True until the session has been closed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Registers a subscription.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::DuplicateSubscription`] when the owning
    /// connection already holds a subscription with the same id here.
    pub fn insert(&self, subscription: Subscription) -> Result<(), ProtocolError> {
        let mut subscriptions = self.subscriptions.lock().expect("subscription lock poisoned");
        if subscriptions.iter().any(|existing| {
            existing.connection().id() == subscription.connection().id()
                && existing.id() == subscription.id()
        }) {
            return Err(ProtocolError::DuplicateSubscription {
                id: subscription.id().to_owned(),
            });
        }
        subscriptions.push(Arc::new(subscription));
        Ok(())
    }

    /// Removes every subscription matching the connection and id pair.
    pub fn remove_matching(&self, connection: &StompConnection, subscription_id: &str) {
        let mut subscriptions = self.subscriptions.lock().expect("subscription lock poisoned");
        subscriptions.retain(|subscription| {
            subscription.connection().as_ref() != connection
                || subscription.id() != subscription_id
        });
    }

    /// Number of registered subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .lock()
            .expect("subscription lock poisoned")
            .len()
    }

    /// Copies out the current subscriptions.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<Subscription>> {
        self.subscriptions
            .lock()
            .expect("subscription lock poisoned")
            .clone()
    }

    /// Queues a message for the session's handler task.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::SessionClosed`] once the session has been
    /// torn down.
    pub async fn enqueue(&self, message: StompMessage) -> Result<(), ProtocolError> {
        let closed = || ProtocolError::SessionClosed {
            destination: self.destination.clone(),
        };
        tokio::select! {
            () = self.cancel.cancelled() => Err(closed()),
            sent = self.inbound_tx.send(message) => sent.map_err(|_| closed()),
        }
    }

    /// Takes the next queued message, or `None` once the session closes.
    ///
    /// Intended for the handler task; concurrent callers queue behind an
    /// async mutex on the receiver.
    pub async fn recv(&self) -> Option<StompMessage> {
        let mut inbound = self.inbound_rx.lock().await;
        tokio::select! {
            () = self.cancel.cancelled() => None,
            message = inbound.recv() => message,
        }
    }

    /// Builds one MESSAGE from `payload` and `headers` and delivers it to
    /// every current subscriber.
    ///
    /// Subscriptions are grouped by connection; each group shares one
    /// message id drawn from its connection's counter. Deliveries run
    /// concurrently and are all awaited before this returns.
    ///
    /// # Errors
    ///
    /// Returns the first [`DeliveryError`] observed, after every delivery
    /// has completed.
    pub async fn send_all(&self, payload: Bytes, headers: Headers) -> Result<(), DeliveryError> {
        let message = StompMessage::new(StompCommand::Message, headers, payload);

        let snapshot = self.snapshot();
        let mut message_ids: Vec<(String, Arc<str>)> = Vec::new();
        let mut tagged = Vec::with_capacity(snapshot.len());
        for subscription in snapshot {
            let connection_id = subscription.connection().id();
            let message_id = match message_ids.iter().find(|(id, _)| id == connection_id) {
                Some((_, message_id)) => Arc::clone(message_id),
                None => {
                    let message_id: Arc<str> =
                        subscription.connection().next_message_id().into();
                    message_ids.push((connection_id.to_owned(), Arc::clone(&message_id)));
                    message_id
                }
            };
            tagged.push((subscription, message_id));
        }

        debug!(
            destination = %self.destination,
            deliveries = tagged.len(),
            "fanning out message"
        );

        let results = futures::future::join_all(
            tagged
                .iter()
                .map(|(subscription, message_id)| {
                    subscription.deliver_tagged(&message, message_id.as_ref())
                }),
        )
        .await;

        results.into_iter().collect()
    }

    /// Tears the session down: cancels the handler task's token and drops
    /// every subscription. Idempotent.
    pub fn close(&self) {
        self.cancel.cancel();
        self.subscriptions
            .lock()
            .expect("subscription lock poisoned")
            .clear();
    }

    /// Token cancelled when the session closes.
    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

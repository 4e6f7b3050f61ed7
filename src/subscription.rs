//! Client subscriptions and message delivery decoration.
//!
//! A [`Subscription`] binds a destination, a connection identity and a
//! client-chosen subscription id to a delivery callback. Deliveries never
//! mutate the message being fanned out: decoration builds a fresh header
//! set with `message-id`, `subscription` and `destination` appended, so
//! one message can be shared safely across concurrent deliveries.

use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use thiserror::Error;

use crate::{
    command::StompCommand,
    connection::StompConnection,
    headers::{self, Headers},
    message::StompMessage,
};

/// Failure to hand a message to a subscription's connection.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The connection's outbound channel has been dropped.
    #[error("subscription delivery channel closed")]
    Closed,
}

/// Boxed async delivery callback invoked once per decorated message.
pub type DeliverFn =
    Box<dyn Fn(StompMessage) -> BoxFuture<'static, Result<(), DeliveryError>> + Send + Sync>;

/// A client's registration of interest in one destination.
///
/// Registration moves the subscription into its destination session, so a
/// subscription can never be bound to two sessions.
pub struct Subscription {
    destination: String,
    connection: Arc<StompConnection>,
    id: String,
    deliver: DeliverFn,
}

impl Subscription {
    /// Creates a subscription delivering through `deliver`.
    #[must_use]
    pub fn new(
        destination: impl Into<String>,
        connection: Arc<StompConnection>,
        id: impl Into<String>,
        deliver: DeliverFn,
    ) -> Self {
        Self {
            destination: destination.into(),
            connection,
            id: id.into(),
            deliver,
        }
    }

    /// Destination this subscription is registered on.
    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Identity of the owning connection.
    #[must_use]
    pub fn connection(&self) -> &Arc<StompConnection> {
        &self.connection
    }

    /// Client-chosen subscription id, unique per connection and session.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Delivers a MESSAGE built from `payload` and `headers` to this
    /// subscription alone, with a message id drawn from the owning
    /// connection's counter.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Closed`] when the connection is gone.
    pub async fn send(&self, payload: Bytes, headers: Headers) -> Result<(), DeliveryError> {
        let message = StompMessage::new(StompCommand::Message, headers, payload);
        let message_id = self.connection.next_message_id();
        self.deliver_tagged(&message, &message_id).await
    }

    /// Decorates `message` with the given message id plus this
    /// subscription's id and destination, then invokes the delivery
    /// callback. The original message is left untouched.
    pub(crate) async fn deliver_tagged(
        &self,
        message: &StompMessage,
        message_id: &str,
    ) -> Result<(), DeliveryError> {
        let mut decorated = message.headers.to_mutable();
        decorated.put(headers::MESSAGE_ID, message_id);
        decorated.put(headers::SUBSCRIPTION, self.id.as_str());
        decorated.put(headers::DESTINATION, self.destination.as_str());

        let decorated = StompMessage::new(
            message.command,
            decorated.freeze(),
            message.payload.clone(),
        );
        (self.deliver)(decorated).await
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("destination", &self.destination)
            .field("connection", &self.connection.id())
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

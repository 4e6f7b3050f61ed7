//! Per-connection identity and message-id allocation.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use rand::{Rng, distr::Alphanumeric};

const CONNECTION_ID_LEN: usize = 16;

/// Identity of one client connection.
///
/// Carries the random session id advertised in CONNECTED replies and the
/// monotonic counter behind `message-id` values. All subscriptions of a
/// connection share one identity (as `Arc<StompConnection>`), so messages
/// fanned out to them draw from the same counter.
///
/// Equality and hashing consider the id only.
#[derive(Debug)]
pub struct StompConnection {
    id: String,
    message_counter: AtomicU64,
}

impl StompConnection {
    /// Creates an identity with a fresh random id and a zeroed counter.
    #[must_use]
    pub fn new() -> Self {
        let id: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(CONNECTION_ID_LEN)
            .map(char::from)
            .collect();
        Self::with_id(id)
    }

    /// Creates an identity with a caller-chosen id, e.g. for tests.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message_counter: AtomicU64::new(0),
        }
    }

    /// Opaque connection id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Allocates the next `message-id` value for this connection.
    ///
    /// Ids are `message-<n>` with `n` starting at 1.
    #[must_use]
    pub fn next_message_id(&self) -> String {
        let n = self.message_counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("message-{n}")
    }
}

impl Default for StompConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for StompConnection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for StompConnection {}

impl std::hash::Hash for StompConnection {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for StompConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

//! Metric helpers for `stompwire`.
//!
//! This module defines metric names and simple helper functions wrapping
//! the [`metrics`](https://docs.rs/metrics) crate. When the `metrics`
//! feature is disabled every helper is a no-op, so call sites need no
//! gating of their own.

/// Name of the gauge tracking active destination sessions.
pub const SESSIONS_ACTIVE: &str = "stompwire_sessions_active";
/// Name of the counter tracking processed frames.
pub const FRAMES_TOTAL: &str = "stompwire_frames_total";
/// Name of the counter tracking error occurrences.
pub const ERRORS_TOTAL: &str = "stompwire_errors_total";

/// Direction of frame processing.
#[derive(Clone, Copy)]
pub enum Direction {
    /// Inbound frames decoded from a client.
    Inbound,
    /// Outbound frames encoded towards a client.
    Outbound,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Increment the active sessions gauge.
#[cfg(feature = "metrics")]
pub fn inc_sessions() {
    metrics::gauge!(SESSIONS_ACTIVE).increment(1.0);
}

/// Decrement the active sessions gauge.
#[cfg(feature = "metrics")]
pub fn dec_sessions() {
    metrics::gauge!(SESSIONS_ACTIVE).decrement(1.0);
}

/// Record a processed frame for the given direction.
#[cfg(feature = "metrics")]
pub fn inc_frames(direction: Direction) {
    metrics::counter!(FRAMES_TOTAL, "direction" => direction.as_str()).increment(1);
}

/// Record an error occurrence under its taxonomy label.
#[cfg(feature = "metrics")]
pub fn inc_errors(kind: &'static str) {
    metrics::counter!(ERRORS_TOTAL, "kind" => kind).increment(1);
}

/// Increment the active sessions gauge.
#[cfg(not(feature = "metrics"))]
pub fn inc_sessions() {}

/// Decrement the active sessions gauge.
#[cfg(not(feature = "metrics"))]
pub fn dec_sessions() {}

/// Record a processed frame for the given direction.
#[cfg(not(feature = "metrics"))]
pub fn inc_frames(direction: Direction) {
    let _ = direction.as_str();
}

/// Record an error occurrence under its taxonomy label.
#[cfg(not(feature = "metrics"))]
pub fn inc_errors(kind: &'static str) {
    let _ = kind;
}

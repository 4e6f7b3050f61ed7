//! The STOMP message moved through every layer.

use bytes::Bytes;

use crate::{command::StompCommand, headers::Headers};

/// A decoded or composed STOMP frame: command, headers and binary payload.
///
/// Equality is structural over headers and payload only; two messages with
/// different commands but identical headers and payload compare equal. This
/// mirrors frame identity on the wire, where the command is routing
/// information rather than content.
#[derive(Clone, Debug)]
pub struct StompMessage {
    /// Frame command.
    pub command: StompCommand,
    /// Frame headers, order preserved.
    pub headers: Headers,
    /// Frame payload; empty for most client commands.
    pub payload: Bytes,
}

impl StompMessage {
    /// Payload carried by synthesised heartbeat messages: a single LF.
    pub const HEARTBEAT_PAYLOAD: &'static [u8] = b"\n";

    /// Creates a message from its parts.
    #[must_use]
    pub fn new(command: StompCommand, headers: Headers, payload: impl Into<Bytes>) -> Self {
        Self {
            command,
            headers,
            payload: payload.into(),
        }
    }

    /// Creates a message with no headers and an empty payload.
    #[must_use]
    pub fn from_command(command: StompCommand) -> Self {
        Self::new(command, Headers::new(), Bytes::new())
    }

    /// Creates the keep-alive message synthesised from bare EOL bytes.
    #[must_use]
    pub fn heartbeat() -> Self {
        Self::new(
            StompCommand::Heartbeat,
            Headers::new(),
            Bytes::from_static(Self::HEARTBEAT_PAYLOAD),
        )
    }

    /// Returns true for keep-alive messages.
    #[must_use]
    pub fn is_heartbeat(&self) -> bool {
        self.command == StompCommand::Heartbeat
    }
}

impl PartialEq for StompMessage {
    fn eq(&self, other: &Self) -> bool {
        self.headers == other.headers && self.payload == other.payload
    }
}

impl Eq for StompMessage {}

//! STOMP command taxonomy.
//!
//! Commands carry a static body-allowed flag: only `SEND`, `MESSAGE` and
//! `ERROR` frames may have a payload. [`StompCommand::Heartbeat`] is a
//! sentinel for the bare end-of-line keep-alives peers exchange; it never
//! appears on the wire as a named frame, so [`StompCommand::from_name`]
//! will not resolve it.

use std::fmt;

/// A STOMP 1.1 command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StompCommand {
    /// Client session initiation (STOMP 1.1 alias of `CONNECT`).
    Stomp,
    /// Client session initiation.
    Connect,
    /// Client session termination.
    Disconnect,
    /// Client registration of interest in a destination.
    Subscribe,
    /// Client removal of a subscription.
    Unsubscribe,
    /// Client message publication to a destination.
    Send,
    /// Client message acknowledgement (unimplemented transaction surface).
    Ack,
    /// Client negative acknowledgement (unimplemented transaction surface).
    Nack,
    /// Transaction begin (unimplemented transaction surface).
    Begin,
    /// Transaction commit (unimplemented transaction surface).
    Commit,
    /// Transaction abort (unimplemented transaction surface).
    Abort,
    /// Server acceptance of a session.
    Connected,
    /// Server acknowledgement of a client request.
    Receipt,
    /// Server delivery of a published message.
    Message,
    /// Server error report.
    Error,
    /// Keep-alive sentinel; synthesised from bare EOL bytes, never parsed
    /// from a command line.
    Heartbeat,
}

impl StompCommand {
    /// Returns true when frames with this command may carry a payload.
    #[must_use]
    pub fn body_allowed(self) -> bool {
        matches!(self, Self::Send | Self::Message | Self::Error)
    }

    /// Wire name of the command.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stomp => "STOMP",
            Self::Connect => "CONNECT",
            Self::Disconnect => "DISCONNECT",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Send => "SEND",
            Self::Ack => "ACK",
            Self::Nack => "NACK",
            Self::Begin => "BEGIN",
            Self::Commit => "COMMIT",
            Self::Abort => "ABORT",
            Self::Connected => "CONNECTED",
            Self::Receipt => "RECEIPT",
            Self::Message => "MESSAGE",
            Self::Error => "ERROR",
            Self::Heartbeat => "HEARTBEAT",
        }
    }

    /// Resolves a command-line token against the known wire names.
    ///
    /// `HEARTBEAT` is deliberately absent: heartbeats have no command line,
    /// so a frame spelling it out is treated as unknown.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "STOMP" => Some(Self::Stomp),
            "CONNECT" => Some(Self::Connect),
            "DISCONNECT" => Some(Self::Disconnect),
            "SUBSCRIBE" => Some(Self::Subscribe),
            "UNSUBSCRIBE" => Some(Self::Unsubscribe),
            "SEND" => Some(Self::Send),
            "ACK" => Some(Self::Ack),
            "NACK" => Some(Self::Nack),
            "BEGIN" => Some(Self::Begin),
            "COMMIT" => Some(Self::Commit),
            "ABORT" => Some(Self::Abort),
            "CONNECTED" => Some(Self::Connected),
            "RECEIPT" => Some(Self::Receipt),
            "MESSAGE" => Some(Self::Message),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for StompCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

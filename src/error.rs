//! Crate-wide error taxonomy.
//!
//! Failures split into two lanes, mirroring their propagation rules:
//!
//! - Wire-level errors ([`DecodeError`], [`BufferError`], [`EncodeError`])
//!   are fatal: the byte stream can no longer be trusted to sit at a frame
//!   boundary, so the owning connection task must terminate.
//! - [`ProtocolError`] is recoverable at the session level: the dispatch
//!   loop converts it into an ERROR frame reply and closes only the
//!   offending connection. The registry and other connections are
//!   unaffected.
//!
//! [`StompError`] is the umbrella over both lanes; [`StompError::is_fatal`]
//! encodes the policy.

use thiserror::Error;

use crate::{
    codec::{BufferError, DecodeError, EncodeError},
    command::StompCommand,
};

/// Violation of STOMP session semantics by an otherwise well-formed frame.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// A frame arrived without a header its command requires.
    #[error("no {header} header provided")]
    MissingHeader {
        /// Name of the missing header.
        header: &'static str,
    },

    /// A connection subscribed twice with the same subscription id on one
    /// destination.
    #[error("already subscribed with ID {id}")]
    DuplicateSubscription {
        /// The client-chosen subscription id.
        id: String,
    },

    /// SEND named a destination with no active session.
    #[error("subscription '{destination}' not found")]
    UnknownDestination {
        /// The destination header value.
        destination: String,
    },

    /// A message was enqueued onto a session already torn down.
    #[error("session for '{destination}' is closed")]
    SessionClosed {
        /// The session's destination.
        destination: String,
    },

    /// The command exists in the taxonomy but carries no implementation.
    #[error("{command} is not implemented")]
    Unimplemented {
        /// The unimplemented command.
        command: StompCommand,
    },

    /// A server-originated command arrived from a client.
    #[error("unexpected command {command} from client")]
    UnexpectedCommand {
        /// The offending command.
        command: StompCommand,
    },
}

/// Umbrella error for every failure the crate surfaces.
#[derive(Debug, Error)]
pub enum StompError {
    /// Malformed inbound frame.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Reassembly buffer limit exceeded.
    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// Failure while writing an outbound frame.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Session-level protocol violation.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl StompError {
    /// Returns true when the error must terminate the owning connection
    /// task rather than be converted into an ERROR frame reply.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Decode(_) | Self::Buffer(_) | Self::Encode(_) => true,
            Self::Protocol(_) => false,
        }
    }

    /// Stable label for logs and metrics.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::Buffer(_) => "buffer",
            Self::Encode(_) => "encode",
            Self::Protocol(_) => "protocol",
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{ProtocolError, StompError};
    use crate::{
        codec::{BufferError, DecodeError},
        command::StompCommand,
    };

    #[rstest]
    #[case(
        ProtocolError::MissingHeader { header: "destination" },
        "no destination header provided"
    )]
    #[case(
        ProtocolError::DuplicateSubscription { id: "sub-0".into() },
        "already subscribed with ID sub-0"
    )]
    #[case(
        ProtocolError::UnknownDestination { destination: "/queue/a".into() },
        "subscription '/queue/a' not found"
    )]
    #[case(
        ProtocolError::Unimplemented { command: StompCommand::Begin },
        "BEGIN is not implemented"
    )]
    #[case(
        ProtocolError::UnexpectedCommand { command: StompCommand::Receipt },
        "unexpected command RECEIPT from client"
    )]
    fn protocol_errors_render_their_diagnostics(
        #[case] err: ProtocolError,
        #[case] rendered: &str,
    ) {
        assert_eq!(err.to_string(), rendered);
    }

    #[test]
    fn wire_errors_are_fatal_and_protocol_errors_are_not() {
        let decode = StompError::from(DecodeError::MissingNullTerminator);
        let buffer = StompError::from(BufferError::Overflow { limit: 1024 });
        let protocol = StompError::from(ProtocolError::MissingHeader { header: "id" });

        assert!(decode.is_fatal());
        assert!(buffer.is_fatal());
        assert!(!protocol.is_fatal());

        assert_eq!(decode.error_type(), "decode");
        assert_eq!(buffer.error_type(), "buffer");
        assert_eq!(protocol.error_type(), "protocol");
    }
}

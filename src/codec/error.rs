//! Error types for the codec layer.
//!
//! Wire-level failures fall into three categories:
//!
//! - [`DecodeError`]: malformed inbound frames (unknown command, illegal
//!   header line, bad escape sequence, missing null terminator, payload on
//!   a body-less command).
//! - [`BufferError`]: the reassembly buffer's size limit was exceeded,
//!   either by a declared `content-length` or by accumulated chunks.
//! - [`EncodeError`]: I/O failure while writing an encoded frame.
//!
//! All of these are fatal to the connection that raised them: the byte
//! stream can no longer be trusted to be at a frame boundary.

use std::io;

use thiserror::Error;

use crate::command::StompCommand;

/// Malformed inbound frame.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Command token did not resolve against the known command names.
    #[error("unknown STOMP command '{command}'")]
    UnknownCommand {
        /// The token read from the command line.
        command: String,
    },

    /// Header line without a colon-separated name while more frame bytes
    /// remain.
    #[error("Illegal header: '{line}'. A header must be of the form <name>:[<value>].")]
    IllegalHeader {
        /// The offending header line.
        line: String,
    },

    /// Backslash escape with no or an unknown code letter.
    #[error("Illegal escape sequence at index {index}: {input}")]
    BadEscape {
        /// Byte index of the backslash in the input.
        index: usize,
        /// The full input being unescaped.
        input: String,
    },

    /// A carriage return not immediately followed by a line feed.
    #[error("'\\r' must be followed by '\\n'")]
    BareCarriageReturn,

    /// `content-length` bytes were read but the next byte was not NUL.
    #[error("Frame must be terminated with a null octet")]
    MissingNullTerminator,

    /// Non-empty payload on a command whose body-allowed flag is false.
    #[error("{command} shouldn't have a payload: length={length}")]
    DisallowedBody {
        /// The offending command.
        command: StompCommand,
        /// Decoded payload length in bytes.
        length: usize,
    },

    /// Transport-level read failure surfaced through the decoder seam.
    #[error("I/O error while decoding: {0}")]
    Io(#[from] io::Error),
}

/// Reassembly buffer size limit exceeded.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    /// A partial frame declared a `content-length` larger than the limit,
    /// so waiting for more bytes can never succeed.
    #[error("STOMP 'content-length' header value {declared} exceeds configured buffer size limit {limit}")]
    ContentLengthExceedsLimit {
        /// Declared content length in bytes.
        declared: usize,
        /// Configured buffer size limit in bytes.
        limit: usize,
    },

    /// Accumulated undecoded bytes exceed the limit.
    #[error("The configured STOMP buffer size limit of {limit} bytes has been exceeded")]
    Overflow {
        /// Configured buffer size limit in bytes.
        limit: usize,
    },
}

/// Failure while serialising or writing an outbound frame.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Transport-level write failure surfaced through the encoder seam.
    #[error("failed to write STOMP frame: {0}")]
    Io(#[from] io::Error),
}

impl From<DecodeError> for io::Error {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

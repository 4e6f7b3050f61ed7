//! STOMP frame encoder.
//!
//! Serialises a [`StompMessage`] to wire bytes: command line, header lines
//! grouped by name, blank separator, payload, null terminator. Heartbeats
//! bypass all of that and emit their raw payload bytes alone. For
//! body-carrying commands any caller-supplied `content-length` is dropped
//! and recomputed from the actual payload length.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::Encoder;

use super::{LF, NULL, error::EncodeError, escape::escape};
use crate::{
    command::StompCommand,
    headers::{CONTENT_LENGTH, Headers},
    message::StompMessage,
};

const COLON: u8 = b':';

/// Stateless STOMP 1.1 frame encoder.
#[derive(Clone, Copy, Debug, Default)]
pub struct StompEncoder;

impl StompEncoder {
    /// Creates an encoder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Serialises `message` into a freshly allocated buffer.
    #[must_use]
    pub fn encode(&self, message: &StompMessage) -> Bytes {
        let mut dst = BytesMut::with_capacity(128 + message.payload.len());
        self.encode_into(message, &mut dst);
        dst.freeze()
    }

    /// Serialises `message` onto the end of `dst`.
    pub fn encode_into(&self, message: &StompMessage, dst: &mut BytesMut) {
        if message.is_heartbeat() {
            dst.extend_from_slice(&message.payload);
            return;
        }

        dst.extend_from_slice(message.command.as_str().as_bytes());
        dst.put_u8(LF);
        write_headers(message.command, &message.headers, message.payload.len(), dst);
        dst.put_u8(LF);
        dst.extend_from_slice(&message.payload);
        dst.put_u8(NULL);
    }
}

impl Encoder<StompMessage> for StompEncoder {
    type Error = EncodeError;

    fn encode(&mut self, item: StompMessage, dst: &mut BytesMut) -> Result<(), EncodeError> {
        self.encode_into(&item, dst);
        Ok(())
    }
}

/// Writes the header block: repeated names grouped at their first
/// occurrence with values in original relative order, `content-length`
/// recomputed for body-carrying commands.
fn write_headers(command: StompCommand, headers: &Headers, payload_len: usize, dst: &mut BytesMut) {
    // CONNECT/CONNECTED frames predate the escape table and travel raw.
    let should_escape = !matches!(command, StompCommand::Connect | StompCommand::Connected);

    let mut seen: Vec<&str> = Vec::new();
    for (name, _) in headers.iter() {
        if seen.contains(&name) {
            continue;
        }
        seen.push(name);
        if command.body_allowed() && name == CONTENT_LENGTH {
            continue;
        }
        for (_, value) in headers.iter().filter(|(entry, _)| *entry == name) {
            write_header_text(name, should_escape, dst);
            dst.put_u8(COLON);
            write_header_text(value, should_escape, dst);
            dst.put_u8(LF);
        }
    }

    if command.body_allowed() {
        dst.extend_from_slice(CONTENT_LENGTH.as_bytes());
        dst.put_u8(COLON);
        dst.extend_from_slice(payload_len.to_string().as_bytes());
        dst.put_u8(LF);
    }
}

fn write_header_text(text: &str, should_escape: bool, dst: &mut BytesMut) {
    if should_escape {
        dst.extend_from_slice(escape(text).as_bytes());
    } else {
        dst.extend_from_slice(text.as_bytes());
    }
}

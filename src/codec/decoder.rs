//! STOMP frame decoder with partial-input semantics.
//!
//! [`StompDecoder::decode_frames`] consumes as many complete frames as the
//! buffer holds and leaves an incomplete trailing frame untouched for the
//! next transport read. Headers already parsed for that trailing frame are
//! stashed on the decoder so the buffering layer can recover the pending
//! `content-length` hint across refills.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;

use super::{CR, LF, NULL, error::DecodeError, escape::unescape};
use crate::{
    command::StompCommand,
    headers::MutableHeaders,
    message::StompMessage,
};

/// Stateful STOMP 1.1 frame decoder.
#[derive(Debug, Default)]
pub struct StompDecoder {
    partial_headers: MutableHeaders,
}

impl StompDecoder {
    /// Creates a decoder with an empty partial-header stash.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes every complete frame at the front of `src`, advancing it
    /// past the consumed bytes.
    ///
    /// An incomplete trailing frame is left in `src` starting at its
    /// command byte (end-of-line bytes already skipped stay consumed), and
    /// its parsed headers replace the partial-header stash.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] for malformed input: a command token that
    /// does not resolve, an illegal header line, a bad escape sequence, a
    /// carriage return followed by anything but a line feed, a missing
    /// null terminator after a `content-length`-delimited payload, or a
    /// payload on a command that does not allow one.
    pub fn decode_frames(&mut self, src: &mut BytesMut) -> Result<Vec<StompMessage>, DecodeError> {
        self.partial_headers.clear();
        let mut messages = Vec::new();
        let mut pos = 0;
        while pos < src.len() {
            match decode_message(src, &mut pos, &mut self.partial_headers)? {
                Some(message) => messages.push(message),
                None => break,
            }
        }
        src.advance(pos);
        Ok(messages)
    }

    /// `content-length` learned from the most recent partial frame, if any.
    #[must_use]
    pub fn pending_content_length(&self) -> Option<usize> {
        self.partial_headers.content_length()
    }
}

impl Decoder for StompDecoder {
    type Item = StompMessage;
    type Error = DecodeError;

    /// Decodes at most one frame per call, for use behind `FramedRead`.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<StompMessage>, DecodeError> {
        self.partial_headers.clear();
        let mut pos = 0;
        if pos >= src.len() {
            return Ok(None);
        }
        let message = decode_message(src, &mut pos, &mut self.partial_headers)?;
        src.advance(pos);
        Ok(message)
    }
}

/// Decodes one frame starting at `pos`, or returns `Ok(None)` with `pos`
/// rewound to the frame's command byte when the frame is incomplete.
fn decode_message(
    buf: &[u8],
    pos: &mut usize,
    partial_headers: &mut MutableHeaders,
) -> Result<Option<StompMessage>, DecodeError> {
    skip_leading_eol(buf, pos)?;
    let mark = *pos;
    if *pos >= buf.len() {
        // Bare EOL bytes with no command are a heartbeat.
        return Ok(Some(StompMessage::heartbeat()));
    }

    let Some(token) = read_command(buf, pos)? else {
        *pos = mark;
        return Ok(None);
    };
    let token = String::from_utf8_lossy(token);
    let command = StompCommand::from_name(&token).ok_or_else(|| DecodeError::UnknownCommand {
        command: token.into_owned(),
    })?;

    let mut headers = MutableHeaders::new();
    read_headers(buf, pos, &mut headers)?;
    let Some(payload) = read_payload(buf, pos, &headers)? else {
        partial_headers.extend_from(&headers);
        *pos = mark;
        return Ok(None);
    };

    if !payload.is_empty() && !command.body_allowed() {
        return Err(DecodeError::DisallowedBody {
            command,
            length: payload.len(),
        });
    }
    Ok(Some(StompMessage::new(command, headers.freeze(), payload)))
}

/// Consumes one end-of-line marker at `pos` if present.
///
/// A carriage return must be followed by a line feed; one followed by any
/// other byte is a framing error. A carriage return at the end of the
/// buffer is not consumed: the line feed may arrive with the next chunk.
fn try_consume_eol(buf: &[u8], pos: &mut usize) -> Result<bool, DecodeError> {
    match buf.get(*pos) {
        Some(&LF) => {
            *pos += 1;
            Ok(true)
        }
        Some(&CR) => match buf.get(*pos + 1) {
            Some(&LF) => {
                *pos += 2;
                Ok(true)
            }
            Some(_) => Err(DecodeError::BareCarriageReturn),
            None => Ok(false),
        },
        _ => Ok(false),
    }
}

fn skip_leading_eol(buf: &[u8], pos: &mut usize) -> Result<(), DecodeError> {
    while try_consume_eol(buf, pos)? {}
    Ok(())
}

/// Reads the command token up to its end-of-line marker, consuming the
/// marker.
///
/// Returns `Ok(None)` when the buffer ends before the marker: the token
/// may be truncated, so it cannot be resolved yet.
fn read_command<'a>(buf: &'a [u8], pos: &mut usize) -> Result<Option<&'a [u8]>, DecodeError> {
    let start = *pos;
    while *pos < buf.len() {
        let line_end = *pos;
        if try_consume_eol(buf, pos)? {
            return Ok(Some(&buf[start..line_end]));
        }
        *pos += 1;
    }
    Ok(None)
}

/// Reads header lines up to the blank separator line.
///
/// A trailing line cut off by the end of the buffer ends the loop without
/// error; the subsequent payload read reports the frame incomplete. A line
/// with no colon while more bytes remain is malformed.
fn read_headers(
    buf: &[u8],
    pos: &mut usize,
    headers: &mut MutableHeaders,
) -> Result<(), DecodeError> {
    loop {
        let start = *pos;
        let mut line_end = start;
        let mut complete = false;
        while *pos < buf.len() {
            line_end = *pos;
            if try_consume_eol(buf, pos)? {
                complete = true;
                break;
            }
            *pos += 1;
        }
        if !complete {
            line_end = buf.len();
        }

        let line = &buf[start..line_end];
        if line.is_empty() || !complete {
            return Ok(());
        }

        let line = String::from_utf8_lossy(line);
        match line.find(':') {
            Some(colon) if colon > 0 => {
                let name = unescape(&line[..colon])?;
                let value = unescape(&line[colon + 1..])?;
                headers.push(name, value);
            }
            _ => {
                // A colon-less line at the very end of the buffer may be a
                // truncated header; anything earlier is malformed.
                if *pos < buf.len() {
                    return Err(DecodeError::IllegalHeader {
                        line: line.into_owned(),
                    });
                }
            }
        }
    }
}

/// Reads the payload, delimited either by `content-length` plus a null
/// octet or by scanning for the null octet.
///
/// Returns `Ok(None)` when the buffer holds too few bytes.
fn read_payload(
    buf: &[u8],
    pos: &mut usize,
    headers: &MutableHeaders,
) -> Result<Option<Bytes>, DecodeError> {
    if let Some(content_length) = headers.content_length() {
        if buf.len() - *pos <= content_length {
            return Ok(None);
        }
        let payload = &buf[*pos..*pos + content_length];
        *pos += content_length;
        let terminator = buf[*pos];
        *pos += 1;
        if terminator != NULL {
            return Err(DecodeError::MissingNullTerminator);
        }
        return Ok(Some(Bytes::copy_from_slice(payload)));
    }

    let Some(offset) = buf[*pos..].iter().position(|&b| b == NULL) else {
        return Ok(None);
    };
    let payload = &buf[*pos..*pos + offset];
    *pos += offset + 1;
    Ok(Some(Bytes::copy_from_slice(payload)))
}

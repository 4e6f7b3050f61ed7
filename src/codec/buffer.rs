//! Chunk reassembly in front of the frame decoder.
//!
//! Transports hand over opaque byte chunks that may split or merge frames
//! arbitrarily. [`BufferingDecoder`] accumulates those chunks, runs the
//! decoder whenever enough data might be available, re-queues any
//! undecoded remainder, and enforces a total size limit so a hostile or
//! broken peer cannot buffer unbounded data.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};

use super::{decoder::StompDecoder, error::BufferError};
use crate::{error::StompError, message::StompMessage};

/// Frame reassembly buffer with a configurable size limit.
#[derive(Debug)]
pub struct BufferingDecoder {
    decoder: StompDecoder,
    buffer_size_limit: usize,
    chunks: VecDeque<Bytes>,
    buffered: usize,
    expected_content_length: Option<usize>,
}

impl BufferingDecoder {
    /// Wraps `decoder` with a reassembly buffer capped at
    /// `buffer_size_limit` bytes.
    #[must_use]
    pub fn new(decoder: StompDecoder, buffer_size_limit: usize) -> Self {
        Self {
            decoder,
            buffer_size_limit,
            chunks: VecDeque::new(),
            buffered: 0,
            expected_content_length: None,
        }
    }

    /// Appends `chunk` and decodes every frame now complete.
    ///
    /// Returns an empty list while a known pending `content-length` still
    /// exceeds the buffered byte count.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError`] when the declared or accumulated size
    /// exceeds the configured limit, or a
    /// [`DecodeError`](super::DecodeError) from the wrapped decoder. Both
    /// are fatal to the connection.
    pub fn decode(&mut self, chunk: Bytes) -> Result<Vec<StompMessage>, StompError> {
        self.buffered += chunk.len();
        self.chunks.push_back(chunk);
        self.check_limits()?;

        if let Some(expected) = self.expected_content_length {
            if self.buffered < expected {
                return Ok(Vec::new());
            }
        }

        let mut buffer = self.assemble_chunks_and_reset();
        let messages = self.decoder.decode_frames(&mut buffer)?;

        if !buffer.is_empty() {
            self.buffered = buffer.len();
            self.chunks.push_back(buffer.freeze());
            self.expected_content_length = self.decoder.pending_content_length();
        }

        Ok(messages)
    }

    /// Total undecoded bytes currently buffered.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffered
    }

    /// `content-length` declared by a buffered partial frame, if known.
    #[must_use]
    pub fn expected_content_length(&self) -> Option<usize> {
        self.expected_content_length
    }

    /// Drains the pending chunks into one contiguous buffer and clears the
    /// pending state. A lone chunk is moved rather than copied when it has
    /// no other references.
    fn assemble_chunks_and_reset(&mut self) -> BytesMut {
        self.expected_content_length = None;
        let total = self.buffered;
        self.buffered = 0;

        if self.chunks.len() == 1 {
            if let Some(only) = self.chunks.pop_front() {
                return match only.try_into_mut() {
                    Ok(unique) => unique,
                    Err(shared) => BytesMut::from(&shared[..]),
                };
            }
        }

        let mut assembled = BytesMut::with_capacity(total);
        for chunk in self.chunks.drain(..) {
            assembled.extend_from_slice(&chunk);
        }
        assembled
    }

    fn check_limits(&self) -> Result<(), BufferError> {
        if let Some(declared) = self.expected_content_length {
            if declared > self.buffer_size_limit {
                return Err(BufferError::ContentLengthExceedsLimit {
                    declared,
                    limit: self.buffer_size_limit,
                });
            }
        }
        if self.buffered > self.buffer_size_limit {
            return Err(BufferError::Overflow {
                limit: self.buffer_size_limit,
            });
        }
        Ok(())
    }
}

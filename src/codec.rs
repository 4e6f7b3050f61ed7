//! STOMP 1.1 frame codec.
//!
//! The codec layer turns raw transport bytes into [`StompMessage`] values
//! and back:
//!
//! - [`StompDecoder`]: parses as many complete frames as a buffer holds,
//!   leaving incomplete trailing frames for the next read. It also plugs
//!   into `tokio_util`'s [`Decoder`] seam for use with `FramedRead`.
//! - [`StompEncoder`]: serialises messages to wire bytes, recomputing
//!   `content-length` for body-carrying commands; usable directly or via
//!   `FramedWrite` through the [`Encoder`] impl.
//! - [`BufferingDecoder`]: reassembles frames split across arbitrary
//!   transport chunks and enforces the configured buffer size limit.
//!
//! # Error Handling
//!
//! Wire-level failures are split into [`DecodeError`] (malformed frames),
//! [`BufferError`] (size limits) and [`EncodeError`] (write failures). All
//! three are fatal to the connection that produced them; see
//! [`StompError`](crate::error::StompError) for the crate-wide taxonomy.
//!
//! [`Decoder`]: tokio_util::codec::Decoder
//! [`Encoder`]: tokio_util::codec::Encoder
//! [`StompMessage`]: crate::message::StompMessage

pub mod buffer;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod escape;

pub use buffer::BufferingDecoder;
pub use decoder::StompDecoder;
pub use encoder::StompEncoder;
pub use error::{BufferError, DecodeError, EncodeError};
pub use escape::{escape, unescape};

pub(crate) const LF: u8 = b'\n';
pub(crate) const CR: u8 = b'\r';
pub(crate) const NULL: u8 = 0;

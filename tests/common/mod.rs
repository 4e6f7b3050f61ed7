//! Shared utilities for integration tests.
//!
//! Provides destination handlers, a channel-backed subscription factory,
//! and a minimal STOMP client speaking over an in-memory duplex stream.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::FutureExt;
use stompwire::{
    DestinationSession,
    Headers,
    SessionHandler,
    StompConnection,
    StompMessage,
    Subscription,
    codec::{BufferingDecoder, StompDecoder, StompEncoder},
    subscription::DeliveryError,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf},
    sync::mpsc,
    time::{Duration, timeout},
};

/// Result alias for fallible test bodies.
pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Routes crate logs to the test harness; safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("stompwire=debug")),
        )
        .try_init();
}

/// Handler that drains the inbound queue and does nothing else. Sessions
/// running it live until cancelled.
pub struct IdleHandler;

#[async_trait]
impl SessionHandler for IdleHandler {
    async fn run(&self, session: Arc<DestinationSession>) {
        while session.recv().await.is_some() {}
    }
}

/// Handler that fans every inbound payload back out to the subscribers.
pub struct EchoHandler;

#[async_trait]
impl SessionHandler for EchoHandler {
    async fn run(&self, session: Arc<DestinationSession>) {
        while let Some(message) = session.recv().await {
            let _ = session.send_all(message.payload, Headers::new()).await;
        }
    }
}

/// Handler that returns as soon as the session starts, exercising the
/// natural-completion teardown path.
pub struct CompletingHandler;

#[async_trait]
impl SessionHandler for CompletingHandler {
    async fn run(&self, _session: Arc<DestinationSession>) {}
}

/// Builds a subscription whose deliveries land on a channel receiver.
pub fn channel_subscription(
    destination: &str,
    connection: &Arc<StompConnection>,
    id: &str,
) -> (Subscription, mpsc::Receiver<StompMessage>) {
    let (tx, rx) = mpsc::channel(16);
    let deliver = Box::new(move |message: StompMessage| {
        let tx = tx.clone();
        async move { tx.send(message).await.map_err(|_| DeliveryError::Closed) }.boxed()
    });
    let subscription = Subscription::new(destination, Arc::clone(connection), id, deliver);
    (subscription, rx)
}

/// Minimal client side of a STOMP conversation over an in-memory duplex
/// stream: raw byte writes in, decoded frames out.
pub struct StompClient {
    reader: ReadHalf<DuplexStream>,
    writer: WriteHalf<DuplexStream>,
    buffering: BufferingDecoder,
    pending: VecDeque<StompMessage>,
}

impl StompClient {
    pub fn new(stream: DuplexStream) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader,
            writer,
            buffering: BufferingDecoder::new(StompDecoder::new(), 64 * 1024),
            pending: VecDeque::new(),
        }
    }

    /// Writes raw bytes to the server.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer
            .write_all(bytes)
            .await
            .expect("client write should succeed");
        self.writer.flush().await.expect("client flush should succeed");
    }

    /// Encodes and writes one frame.
    pub async fn send(&mut self, message: &StompMessage) {
        let encoded = StompEncoder::new().encode(message);
        self.send_raw(&encoded).await;
    }

    /// Reads until the next decoded frame arrives.
    pub async fn next_frame(&mut self) -> StompMessage {
        timeout(Duration::from_secs(5), self.next_frame_inner())
            .await
            .expect("timed out waiting for a server frame")
    }

    async fn next_frame_inner(&mut self) -> StompMessage {
        loop {
            if let Some(message) = self.pending.pop_front() {
                return message;
            }
            let mut chunk = BytesMut::with_capacity(1024);
            let n = self
                .reader
                .read_buf(&mut chunk)
                .await
                .expect("client read should succeed");
            assert!(n > 0, "server closed the stream while a frame was expected");
            let messages = self
                .buffering
                .decode(chunk.freeze())
                .expect("server bytes should decode");
            self.pending.extend(messages);
        }
    }

    /// Asserts the server closes the stream without sending more frames.
    pub async fn expect_close(&mut self) {
        assert!(self.pending.is_empty(), "unread frames left before close");
        let mut chunk = [0_u8; 64];
        let n = timeout(Duration::from_secs(5), self.reader.read(&mut chunk))
            .await
            .expect("timed out waiting for the server to close")
            .expect("client read should succeed");
        assert_eq!(n, 0, "expected EOF, got {n} more bytes");
    }
}

/// Frame construction shorthand.
pub fn frame(
    command: stompwire::StompCommand,
    pairs: &[(&str, &str)],
    payload: &[u8],
) -> StompMessage {
    StompMessage::new(
        command,
        Headers::from_pairs(pairs.iter().copied()),
        Bytes::copy_from_slice(payload),
    )
}

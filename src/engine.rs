//! Per-connection wiring and the protocol dispatch loop.
//!
//! [`StompApp`] drives one connection over any `AsyncRead`/`AsyncWrite`
//! pair. A reader pump feeds transport chunks through the
//! [`BufferingDecoder`] into an inbound channel; a writer pump drains an
//! outbound channel through the [`StompEncoder`]. The two channels are
//! independent, so writing never blocks decoding.
//!
//! [`StompApp::handle_raw`] exposes the channel pair directly;
//! [`StompApp::handle_connection`] layers the STOMP command state machine
//! on top: CONNECT/SUBSCRIBE/UNSUBSCRIBE/SEND/DISCONNECT plus heartbeats,
//! with protocol violations converted into ERROR frame replies.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc,
    task::JoinHandle,
};
use tracing::{debug, error, warn};

use crate::{
    codec::{BufferingDecoder, StompDecoder, StompEncoder},
    command::StompCommand,
    config::StompConfig,
    connection::StompConnection,
    error::{ProtocolError, StompError},
    headers::{self, Headers, MutableHeaders},
    message::StompMessage,
    metrics::{self, Direction},
    registry::SessionRegistry,
    subscription::{DeliveryError, Subscription},
};

/// STOMP version advertised in CONNECTED replies.
const STOMP_VERSION: &str = "1.1";
/// Server banner advertised in CONNECTED replies.
const SERVER_BANNER: &str = concat!("stompwire/", env!("CARGO_PKG_VERSION"));
/// Heartbeat interval pair advertised in CONNECTED replies.
const HEARTBEAT_INTERVAL: &str = "10000,10000";
/// Depth of the inbound and outbound message channels.
const CHANNEL_DEPTH: usize = 16;
/// Bytes requested from the transport per read.
const READ_CHUNK_SIZE: usize = 4096;

/// The decoded-message channel pair for one connection, handed to
/// [`StompApp::handle_raw`] callers.
pub struct RawConnection {
    /// Messages decoded from the transport, in arrival order.
    pub incoming: mpsc::Receiver<StompMessage>,
    /// Messages to encode onto the transport, in submission order.
    pub outgoing: mpsc::Sender<StompMessage>,
}

/// A STOMP server instance: configuration plus the shared session
/// registry. One `StompApp` serves any number of connections.
pub struct StompApp {
    config: StompConfig,
    registry: Arc<SessionRegistry>,
}

impl StompApp {
    /// Creates an app over `registry` with the given configuration.
    #[must_use]
    pub fn new(config: StompConfig, registry: Arc<SessionRegistry>) -> Self {
        Self { config, registry }
    }

    /// The session registry shared by every connection of this app.
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Runs the raw message layer for one connection: pumps frames between
    /// the transport halves and the channel pair handed to `handler`.
    ///
    /// Returns once `handler` completes; the reader pump is aborted and
    /// the writer pump drained first.
    ///
    /// # Errors
    ///
    /// Returns the first fatal wire error raised by either pump: a
    /// [`DecodeError`](crate::codec::DecodeError) or
    /// [`BufferError`](crate::codec::BufferError) from decoding, or an
    /// [`EncodeError`](crate::codec::EncodeError) from writing.
    pub async fn handle_raw<R, W, H, Fut>(
        &self,
        reader: R,
        writer: W,
        handler: H,
    ) -> Result<(), StompError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
        H: FnOnce(RawConnection) -> Fut,
        Fut: Future<Output = ()>,
    {
        let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_DEPTH);
        let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_DEPTH);

        let read_task = tokio::spawn(read_pump(
            reader,
            self.config.buffer_size_limit(),
            inbound_tx,
        ));
        let write_task = tokio::spawn(write_pump(writer, outbound_rx));

        handler(RawConnection {
            incoming: inbound_rx,
            outgoing: outbound_tx,
        })
        .await;

        // The handler dropped its channel ends; stop the reader (it may be
        // parked on a transport read) and let the writer drain.
        read_task.abort();
        let read_result = join_pump(read_task).await;
        let write_result = join_pump(write_task).await;
        read_result.and(write_result)
    }

    /// Runs the full STOMP protocol for one connection until DISCONNECT,
    /// a dispatch error, or transport close.
    ///
    /// Subscriptions registered by the connection are deliberately left in
    /// place on return; removing them is the caller's responsibility via
    /// [`SessionRegistry::remove_subscription`].
    ///
    /// # Errors
    ///
    /// Returns the first fatal wire error, as for
    /// [`StompApp::handle_raw`]. Protocol violations are answered with an
    /// ERROR frame and reported as `Ok(())`.
    pub async fn handle_connection<R, W>(&self, reader: R, writer: W) -> Result<(), StompError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let config = self.config.clone();
        let registry = Arc::clone(&self.registry);
        self.handle_raw(reader, writer, move |raw| {
            dispatch_loop(config, registry, raw)
        })
        .await
    }
}

async fn join_pump(task: JoinHandle<Result<(), StompError>>) -> Result<(), StompError> {
    match task.await {
        Ok(result) => result,
        // Aborted by us, or panicked; either way the pump is gone.
        Err(_) => Ok(()),
    }
}

/// Reads transport chunks, reassembles frames, and forwards decoded
/// messages to the inbound channel.
async fn read_pump<R>(
    mut reader: R,
    buffer_size_limit: usize,
    inbound: mpsc::Sender<StompMessage>,
) -> Result<(), StompError>
where
    R: AsyncRead + Unpin,
{
    let mut buffering = BufferingDecoder::new(StompDecoder::new(), buffer_size_limit);
    let mut chunk = BytesMut::with_capacity(READ_CHUNK_SIZE);
    loop {
        chunk.reserve(READ_CHUNK_SIZE);
        let n = reader
            .read_buf(&mut chunk)
            .await
            .map_err(crate::codec::DecodeError::from)?;
        if n == 0 {
            return Ok(());
        }
        let messages = buffering.decode(chunk.split().freeze()).inspect_err(|err| {
            metrics::inc_errors(err.error_type());
            error!(error = %err, "failed to decode inbound bytes");
        })?;
        for message in messages {
            metrics::inc_frames(Direction::Inbound);
            if inbound.send(message).await.is_err() {
                // Dispatch loop is gone; nothing left to decode for.
                return Ok(());
            }
        }
    }
}

/// Drains the outbound channel onto the transport, one encoded frame per
/// message.
async fn write_pump<W>(
    mut writer: W,
    mut outbound: mpsc::Receiver<StompMessage>,
) -> Result<(), StompError>
where
    W: AsyncWrite + Unpin,
{
    let encoder = StompEncoder::new();
    let mut buf = BytesMut::new();
    while let Some(message) = outbound.recv().await {
        buf.clear();
        encoder.encode_into(&message, &mut buf);
        let write = async {
            writer.write_all(&buf).await?;
            writer.flush().await
        };
        write.await.map_err(|err| {
            metrics::inc_errors("encode");
            StompError::from(crate::codec::EncodeError::from(err))
        })?;
        metrics::inc_frames(Direction::Outbound);
    }
    let _ = writer.shutdown().await;
    Ok(())
}

/// Outcome of dispatching one message.
enum Flow {
    Continue,
    Disconnect,
}

/// The per-connection command state machine.
async fn dispatch_loop(
    config: StompConfig,
    registry: Arc<SessionRegistry>,
    mut raw: RawConnection,
) {
    let connection = Arc::new(StompConnection::new());
    debug!(connection = %connection.id(), "connection dispatch loop started");

    while let Some(message) = raw.incoming.recv().await {
        match dispatch(&connection, &registry, &raw.outgoing, &message).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Disconnect) => break,
            Err(err) => {
                metrics::inc_errors("protocol");
                warn!(
                    connection = %connection.id(),
                    command = %message.command,
                    error = %err,
                    "dispatch error, closing connection"
                );
                let reply = error_frame(&config, &message, &err);
                if raw.outgoing.send(reply).await.is_err() {
                    debug!(connection = %connection.id(), "peer gone before ERROR reply");
                }
                break;
            }
        }
    }

    debug!(connection = %connection.id(), "connection dispatch loop finished");
}

async fn dispatch(
    connection: &Arc<StompConnection>,
    registry: &Arc<SessionRegistry>,
    outgoing: &mpsc::Sender<StompMessage>,
    message: &StompMessage,
) -> Result<Flow, ProtocolError> {
    match message.command {
        StompCommand::Stomp | StompCommand::Connect => {
            let reply = StompMessage::new(
                StompCommand::Connected,
                Headers::from_pairs([
                    ("version", STOMP_VERSION),
                    ("session", connection.id()),
                    ("server", SERVER_BANNER),
                    ("heart-beat", HEARTBEAT_INTERVAL),
                ]),
                Bytes::new(),
            );
            Ok(reply_or_disconnect(outgoing, reply).await)
        }
        StompCommand::Disconnect => {
            let mut reply_headers = MutableHeaders::new();
            if let Some(receipt) = message.headers.receipt() {
                reply_headers.push(headers::RECEIPT_ID, receipt);
            }
            let reply =
                StompMessage::new(StompCommand::Receipt, reply_headers.freeze(), Bytes::new());
            let _ = reply_or_disconnect(outgoing, reply).await;
            Ok(Flow::Disconnect)
        }
        StompCommand::Subscribe => {
            let destination =
                message
                    .headers
                    .destination()
                    .ok_or(ProtocolError::MissingHeader {
                        header: headers::DESTINATION,
                    })?;
            let id = message.headers.id().ok_or(ProtocolError::MissingHeader {
                header: headers::ID,
            })?;

            // The callback holds only a weak sender: subscriptions outlive
            // the connection in the registry, and a strong clone would keep
            // the write pump running after the dispatch loop ends.
            let deliver = {
                let outgoing = outgoing.downgrade();
                Box::new(move |delivery: StompMessage| {
                    let outgoing = outgoing.clone();
                    Box::pin(async move {
                        let Some(outgoing) = outgoing.upgrade() else {
                            return Err(DeliveryError::Closed);
                        };
                        outgoing
                            .send(delivery)
                            .await
                            .map_err(|_| DeliveryError::Closed)
                    }) as futures::future::BoxFuture<'static, Result<(), DeliveryError>>
                })
            };
            registry.add_subscription(Subscription::new(
                destination,
                Arc::clone(connection),
                id,
                deliver,
            ))?;
            Ok(Flow::Continue)
        }
        StompCommand::Unsubscribe => {
            let id = message.headers.id().ok_or(ProtocolError::MissingHeader {
                header: headers::ID,
            })?;
            registry.remove_subscription(connection, id).await;
            Ok(Flow::Continue)
        }
        StompCommand::Send => {
            let destination =
                message
                    .headers
                    .destination()
                    .ok_or(ProtocolError::MissingHeader {
                        header: headers::DESTINATION,
                    })?;
            let session =
                registry
                    .session(destination)
                    .ok_or_else(|| ProtocolError::UnknownDestination {
                        destination: destination.to_owned(),
                    })?;
            session.enqueue(message.clone()).await?;
            Ok(Flow::Continue)
        }
        StompCommand::Ack
        | StompCommand::Nack
        | StompCommand::Begin
        | StompCommand::Commit
        | StompCommand::Abort => Err(ProtocolError::Unimplemented {
            command: message.command,
        }),
        StompCommand::Heartbeat => Ok(reply_or_disconnect(outgoing, StompMessage::heartbeat()).await),
        StompCommand::Connected
        | StompCommand::Receipt
        | StompCommand::Message
        | StompCommand::Error => Err(ProtocolError::UnexpectedCommand {
            command: message.command,
        }),
    }
}

/// Sends a reply, mapping a closed outbound channel to loop termination.
async fn reply_or_disconnect(outgoing: &mpsc::Sender<StompMessage>, reply: StompMessage) -> Flow {
    if outgoing.send(reply).await.is_err() {
        Flow::Disconnect
    } else {
        Flow::Continue
    }
}

/// Builds the ERROR frame answering `err`, echoing the triggering frame's
/// `receipt` header as `receipt-id`.
fn error_frame(config: &StompConfig, trigger: &StompMessage, err: &ProtocolError) -> StompMessage {
    let short = err.to_string();
    let mut reply_headers = MutableHeaders::new();
    if let Some(receipt) = trigger.headers.receipt() {
        reply_headers.push(headers::RECEIPT_ID, receipt);
    }
    reply_headers.push(headers::MESSAGE, short.as_str());

    let body = if config.verbose_errors() {
        format!("{err:?}")
    } else {
        short
    };
    StompMessage::new(
        StompCommand::Error,
        reply_headers.freeze(),
        Bytes::from(body),
    )
}

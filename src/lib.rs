//! STOMP 1.1 messaging core.
//!
//! `stompwire` implements the STOMP text-messaging protocol over any
//! ordered byte transport: a byte-exact frame codec with partial-input
//! semantics, a chunk-reassembly buffer with a size limit, and a
//! per-destination publish/subscribe layer with concurrent fan-out.
//!
//! The transport itself (sockets, WebSockets, TLS) stays out of scope; a
//! [`StompApp`] consumes `AsyncRead`/`AsyncWrite` halves and drives the
//! protocol for one connection, while a shared [`SessionRegistry`] routes
//! SEND frames to the handler task of each active destination and fans
//! MESSAGE frames out to its subscribers.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use stompwire::{
//!     DestinationSession, SessionHandler, SessionRegistry, StompApp, StompConfig,
//! };
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl SessionHandler for Echo {
//!     async fn run(&self, session: Arc<DestinationSession>) {
//!         while let Some(message) = session.recv().await {
//!             let _ = session.send_all(message.payload, message.headers).await;
//!         }
//!     }
//! }
//!
//! # async fn serve(reader: tokio::io::DuplexStream, writer: tokio::io::DuplexStream) {
//! let registry = SessionRegistry::new(Arc::new(Echo));
//! let app = StompApp::new(StompConfig::new(), registry);
//! let _ = app.handle_connection(reader, writer).await;
//! # }
//! ```

pub mod codec;
pub mod command;
pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod headers;
pub mod message;
pub mod metrics;
pub mod registry;
pub mod session;
pub mod subscription;

pub use codec::{BufferingDecoder, StompDecoder, StompEncoder};
pub use command::StompCommand;
pub use config::StompConfig;
pub use connection::StompConnection;
pub use engine::{RawConnection, StompApp};
pub use error::{ProtocolError, StompError};
pub use headers::{Headers, MutableHeaders};
pub use message::StompMessage;
pub use registry::{SessionHandler, SessionRegistry};
pub use session::DestinationSession;
pub use subscription::{DeliveryError, Subscription};

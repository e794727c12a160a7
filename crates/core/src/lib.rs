//! MediaROM core - remote object model for media servers
//!
//! This crate implements the transport-agnostic core of a remote object
//! model: a client creates, mutates, invokes methods on, and receives events
//! from objects that live inside a separate media-processing server process.
//!
//! # Architecture
//!
//! - [`protocol`] defines the wire messages and the JSON codec.
//! - [`transport`] defines the pluggable delivery trait and the in-process
//!   Local transport used for deterministic tests; the networked transport
//!   lives in its own crate and implements the same trait.
//! - [`server`] holds the dispatcher, the object registry, the event broker,
//!   and the built-in element classes.
//! - [`client`] holds proxies, construction builders, and the event
//!   subscription manager.
//! - [`model`] declares each class's fixed capability set.
//!
//! The media-processing behavior itself is out of scope: server-side objects
//! are opaque capability sets addressed by operation name, and the bundled
//! element classes are deterministic stand-ins.
//!
//! # Example
//!
//! ```ignore
//! use mediarom_core::client::RomClient;
//! use mediarom_core::server::RomServer;
//! use mediarom_core::transport::LocalTransport;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> mediarom_core::Result<()> {
//!     let server = RomServer::with_default_classes();
//!     let client = RomClient::new(Arc::new(LocalTransport::connect(server)));
//!
//!     let pipeline = client.create_pipeline().build().await?;
//!     let player = pipeline.create_player().uri("file:///in.webm").build().await?;
//!     let http = pipeline.create_http_endpoint().build().await?;
//!     player.connect(http.as_object()).await?;
//!     player.play().await?;
//!     pipeline.release().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod model;
pub mod protocol;
pub mod server;
pub mod transport;

mod error;
pub use error::{Error, Result};

/// Initialize tracing for binaries and examples.
///
/// Reads the filter from `RUST_LOG`, defaulting to `info`. Safe to call more
/// than once; later calls fail quietly.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| Error::Config(e.to_string()))?;

    tracing::info!("mediarom core initialized");
    Ok(())
}

//! Framed-JSON TCP transport for MediaROM
//!
//! The networked counterpart of the core's Local transport. Messages travel
//! as length-prefixed JSON frames over one persistent duplex connection.
//!
//! # Usage
//!
//! ## Client
//!
//! ```ignore
//! use mediarom_core::client::RomClient;
//! use mediarom_tcp::TcpRomTransport;
//! use std::sync::Arc;
//!
//! let transport = TcpRomTransport::connect("127.0.0.1:9966").await?;
//! let client = RomClient::new(Arc::new(transport));
//! let pipeline = client.create_pipeline().build().await?;
//! ```
//!
//! ## Server
//!
//! ```ignore
//! use mediarom_core::server::RomServer;
//! use mediarom_tcp::RomTcpServer;
//!
//! let server = RomServer::with_default_classes();
//! let tcp = RomTcpServer::bind("127.0.0.1:9966", server).await?;
//! tcp.serve().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod framing;
pub mod server;

pub use client::{TcpConfig, TcpRomTransport};
pub use server::RomTcpServer;

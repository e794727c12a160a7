//! TCP client transport
//!
//! Maintains one persistent duplex connection. Outbound requests are written
//! under a write lock so concurrent callers never interleave frames; each
//! caller then waits on a single-assignment slot keyed by its correlation
//! id. One dedicated reader task decodes inbound traffic and demultiplexes:
//! responses complete their pending slot, notifications go to the client's
//! sink. A response whose correlation id has no pending slot (it timed out)
//! is discarded with a log line and no side effects.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use mediarom_core::protocol::{codec, Request, Response, RomMessage};
use mediarom_core::transport::{NotificationSink, RomTransport, TransportKind};
use mediarom_core::{Error, Result};

use crate::framing;

/// Tunables of a TCP transport
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Bound on the wait for each response
    pub request_timeout: Duration,
    /// Cap on a single frame's payload
    pub max_frame: usize,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            max_frame: framing::DEFAULT_MAX_FRAME,
        }
    }
}

struct Shared {
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    pending: DashMap<u64, oneshot::Sender<Response>>,
    sink: Mutex<Option<NotificationSink>>,
    connected: AtomicBool,
    config: TcpConfig,
}

/// Networked [`RomTransport`] over one TCP connection
pub struct TcpRomTransport {
    shared: Arc<Shared>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl TcpRomTransport {
    /// Connect with default configuration.
    pub async fn connect(addr: &str) -> Result<Self> {
        Self::connect_with(addr, TcpConfig::default()).await
    }

    /// Connect with explicit configuration.
    pub async fn connect_with(addr: &str, config: TcpConfig) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| Error::Transport(format!("failed to connect to {}: {}", addr, e)))?;
        stream.set_nodelay(true).ok();
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| addr.to_string());
        tracing::info!(%peer, "connected");

        let (read_half, write_half) = stream.into_split();
        let shared = Arc::new(Shared {
            writer: tokio::sync::Mutex::new(write_half),
            pending: DashMap::new(),
            sink: Mutex::new(None),
            connected: AtomicBool::new(true),
            config,
        });

        let reader = tokio::spawn(read_loop(read_half, shared.clone(), peer));
        Ok(Self {
            shared,
            reader: Mutex::new(Some(reader)),
        })
    }
}

/// Dedicated per-connection reader: decodes and demultiplexes inbound
/// frames until the connection dies, then fails every pending call.
async fn read_loop(mut read_half: OwnedReadHalf, shared: Arc<Shared>, peer: String) {
    loop {
        match framing::read_frame(&mut read_half, shared.config.max_frame).await {
            Ok(Some(frame)) => match codec::decode(&frame) {
                Ok(RomMessage::Response(response)) => {
                    match shared.pending.remove(&response.id) {
                        Some((_, slot)) => {
                            // receiver may have given up in the meantime
                            let _ = slot.send(response);
                        }
                        None => tracing::debug!(%peer, id = response.id,
                            "discarding response with no pending request"),
                    }
                }
                Ok(RomMessage::Notification(notification)) => {
                    let sink = shared.sink.lock().clone();
                    match sink {
                        Some(sink) => {
                            if sink.send(notification).is_err() {
                                tracing::debug!(%peer, "notification sink closed");
                            }
                        }
                        None => tracing::debug!(%peer,
                            "notification before sink registration dropped"),
                    }
                }
                Ok(RomMessage::Request(_)) => {
                    tracing::warn!(%peer, "peer sent a request on a client connection");
                }
                Err(e) => tracing::warn!(%peer, error = %e, "skipping undecodable frame"),
            },
            Ok(None) => {
                tracing::info!(%peer, "server closed the connection");
                break;
            }
            Err(e) => {
                tracing::warn!(%peer, error = %e, "read failed");
                break;
            }
        }
    }

    shared.connected.store(false, Ordering::Release);
    // dropping the slots wakes every pending caller with a transport error
    shared.pending.clear();
}

#[async_trait]
impl RomTransport for TcpRomTransport {
    async fn call(&self, request: Request) -> Result<Response> {
        let shared = &self.shared;
        if !shared.connected.load(Ordering::Acquire) {
            return Err(Error::Transport("connection lost".into()));
        }

        let id = request.id;
        let (slot, wait) = oneshot::channel();
        if shared.pending.insert(id, slot).is_some() {
            return Err(Error::Protocol(format!(
                "correlation id {} reused while in flight",
                id
            )));
        }

        let encoded = match codec::encode(&RomMessage::Request(request)) {
            Ok(bytes) => bytes,
            Err(e) => {
                shared.pending.remove(&id);
                return Err(e);
            }
        };

        {
            let mut writer = shared.writer.lock().await;
            if let Err(e) =
                framing::write_frame(&mut *writer, &encoded, shared.config.max_frame).await
            {
                shared.pending.remove(&id);
                return Err(Error::Transport(format!("write failed: {}", e)));
            }
        }

        match tokio::time::timeout(shared.config.request_timeout, wait).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(Error::Transport(
                "connection lost while awaiting response".into(),
            )),
            Err(_) => {
                // a response arriving from now on finds no pending slot and
                // is discarded by the read loop
                shared.pending.remove(&id);
                Err(Error::Timeout {
                    id,
                    timeout_ms: shared.config.request_timeout.as_millis() as u64,
                })
            }
        }
    }

    fn set_notification_sink(&self, sink: NotificationSink) {
        *self.shared.sink.lock() = Some(sink);
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Tcp
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    async fn close(&self) -> Result<()> {
        self.shared.connected.store(false, Ordering::Release);
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }
        self.shared.pending.clear();
        let mut writer = self.shared.writer.lock().await;
        writer.shutdown().await.ok();
        Ok(())
    }
}

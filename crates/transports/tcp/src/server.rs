//! TCP server
//!
//! Accept loop plus one task pair per connection: the reader dispatches
//! requests strictly in arrival order (per-connection FIFO, the contract
//! callers rely on for sequences like construct-then-connect), and a single
//! writer task multiplexes responses and broker notifications onto the
//! stream. A malformed inbound frame is logged and skipped, never fatal.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};

use mediarom_core::protocol::{codec, RomMessage};
use mediarom_core::server::RomServer;
use mediarom_core::{Error, Result};

use crate::framing;

/// Serves a [`RomServer`] over TCP
pub struct RomTcpServer {
    server: Arc<RomServer>,
    listener: TcpListener,
    shutdown: broadcast::Sender<()>,
    max_frame: usize,
}

impl RomTcpServer {
    /// Bind with the default frame cap.
    pub async fn bind(addr: &str, server: Arc<RomServer>) -> Result<Self> {
        Self::bind_with(addr, server, framing::DEFAULT_MAX_FRAME).await
    }

    /// Bind with an explicit frame cap.
    pub async fn bind_with(addr: &str, server: Arc<RomServer>, max_frame: usize) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Transport(format!("failed to bind {}: {}", addr, e)))?;
        let (shutdown, _) = broadcast::channel(1);
        Ok(Self {
            server,
            listener,
            shutdown,
            max_frame,
        })
    }

    /// Address the server is listening on.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Sender that stops [`RomTcpServer::serve`] when signalled.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown.clone()
    }

    /// Accept connections until shutdown is signalled, then tear down all
    /// server state (releasing every live object).
    pub async fn serve(self) -> Result<()> {
        tracing::info!(addr = %self.listener.local_addr()?, "ROM server listening");
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("shutdown requested");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let server = self.server.clone();
                        let max_frame = self.max_frame;
                        let shutdown = self.shutdown.subscribe();
                        tokio::spawn(async move {
                            if let Err(e) =
                                handle_connection(stream, peer, server, max_frame, shutdown).await
                            {
                                tracing::warn!(%peer, error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => tracing::warn!(error = %e, "accept failed"),
                }
            }
        }

        let released = self.server.shutdown();
        tracing::info!(released, "server shut down");
        Ok(())
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    server: Arc<RomServer>,
    max_frame: usize,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    tracing::info!(%peer, "client connected");
    stream.set_nodelay(true).ok();

    let (conn, mut notifications) = server.connect();
    let (mut read_half, write_half) = stream.into_split();

    // one writer task per connection; responses and notifications share it
    let (out_tx, out_rx) = mpsc::unbounded_channel::<RomMessage>();
    let writer_task = tokio::spawn(write_loop(write_half, out_rx, max_frame, peer));

    let notification_tx = out_tx.clone();
    let notification_task = tokio::spawn(async move {
        while let Some(notification) = notifications.recv().await {
            if notification_tx
                .send(RomMessage::Notification(notification))
                .is_err()
            {
                break;
            }
        }
    });

    let result = loop {
        tokio::select! {
            _ = shutdown.recv() => break Ok(()),
            frame = framing::read_frame(&mut read_half, max_frame) => match frame {
                Ok(Some(frame)) => match codec::decode(&frame) {
                    Ok(RomMessage::Request(request)) => {
                        // dispatch before reading the next frame: requests on
                        // this connection are processed in arrival order
                        let response = server.dispatcher().handle_request(conn, request).await;
                        if out_tx.send(RomMessage::Response(response)).is_err() {
                            break Ok(());
                        }
                    }
                    Ok(_) => tracing::warn!(%peer, "unexpected inbound message kind"),
                    Err(e) => tracing::warn!(%peer, error = %e, "skipping undecodable frame"),
                },
                Ok(None) => {
                    tracing::info!(%peer, "client disconnected");
                    break Ok(());
                }
                Err(e) => break Err(e),
            }
        }
    };

    server.disconnect(conn);
    notification_task.abort();
    drop(out_tx);
    // writer drains queued responses, then its channel closes
    let _ = writer_task.await;
    result
}

async fn write_loop(
    mut write_half: OwnedWriteHalf,
    mut out_rx: mpsc::UnboundedReceiver<RomMessage>,
    max_frame: usize,
    peer: SocketAddr,
) {
    while let Some(message) = out_rx.recv().await {
        let encoded = match codec::encode(&message) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(%peer, error = %e, "encode failed");
                continue;
            }
        };
        if let Err(e) = framing::write_frame(&mut write_half, &encoded, max_frame).await {
            tracing::debug!(%peer, error = %e, "write failed");
            break;
        }
    }
}

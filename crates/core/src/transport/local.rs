//! In-process transport
//!
//! Invokes the dispatcher directly in the caller's execution context, with
//! no real concurrency. Requests and responses are still fed through the
//! codec in both directions so model bugs surface in deterministic tests
//! exactly as they would on a wire.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::protocol::{codec, EventNotification, Request, Response, RomMessage};
use crate::server::{ConnectionId, RomServer};
use crate::transport::{NotificationSink, RomTransport, TransportKind};
use crate::{Error, Result};

/// Transport that dispatches against an in-process [`RomServer`]
pub struct LocalTransport {
    server: Arc<RomServer>,
    conn: ConnectionId,
    notifications: Mutex<Option<mpsc::UnboundedReceiver<EventNotification>>>,
    closed: AtomicBool,
}

impl LocalTransport {
    /// Register a connection on `server` and wrap it as a transport.
    pub fn connect(server: Arc<RomServer>) -> Self {
        let (conn, notifications) = server.connect();
        Self {
            server,
            conn,
            notifications: Mutex::new(Some(notifications)),
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl RomTransport for LocalTransport {
    async fn call(&self, request: Request) -> Result<Response> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Transport("local transport closed".into()));
        }

        // round-trip the request through the codec, as a wire would
        let encoded = codec::encode(&RomMessage::Request(request))?;
        let request = match codec::decode(&encoded)? {
            RomMessage::Request(request) => request,
            _ => return Err(Error::Protocol("request did not round-trip".into())),
        };

        let response = self
            .server
            .dispatcher()
            .handle_request(self.conn, request)
            .await;

        let encoded = codec::encode(&RomMessage::Response(response))?;
        match codec::decode(&encoded)? {
            RomMessage::Response(response) => Ok(response),
            _ => Err(Error::Protocol("response did not round-trip".into())),
        }
    }

    fn set_notification_sink(&self, sink: NotificationSink) {
        let Some(mut notifications) = self.notifications.lock().take() else {
            tracing::warn!("notification sink already registered");
            return;
        };
        tokio::spawn(async move {
            while let Some(notification) = notifications.recv().await {
                if sink.send(notification).is_err() {
                    break;
                }
            }
        });
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Local
    }

    fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.server.disconnect(self.conn);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{CallOutcome, ParamValue, RomCall};

    #[tokio::test]
    async fn ping_round_trips_through_the_codec() {
        let transport = LocalTransport::connect(RomServer::with_default_classes());
        let response = transport.call(Request::new(1, RomCall::Ping)).await.unwrap();
        assert_eq!(response.id, 1);
        assert_eq!(
            response.outcome,
            CallOutcome::Ok(ParamValue::Str("pong".into()))
        );
    }

    #[test]
    fn closed_transport_rejects_calls() {
        tokio_test::block_on(async {
            let transport = LocalTransport::connect(RomServer::with_default_classes());
            transport.close().await.unwrap();
            assert!(!transport.is_connected());
            assert!(matches!(
                transport.call(Request::new(1, RomCall::Ping)).await,
                Err(Error::Transport(_))
            ));
        });
    }
}

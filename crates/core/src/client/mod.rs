//! Client-side components
//!
//! A [`RomClient`] wraps a transport and exposes the remote object model:
//! builders issue create requests, proxies forward operations under their
//! declared capability set, and the embedded subscription manager routes
//! server events to registered listeners.
//!
//! # Architecture
//!
//! ```text
//! Proxy / Builder          RomClient              Transport
//! ┌──────────────┐  call   ┌──────────┐  Request  ┌─────────┐
//! │ typed surface│ ──────> │ correlate│ ────────> │ local / │
//! │              │ <────── │  + pump  │ <──────── │   tcp   │
//! └──────────────┘  value  └──────────┘ Response/ └─────────┘
//!                                       Notification
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::model::RemoteClass;
use crate::protocol::{ParamValue, Request, RomCall};
use crate::transport::{RomTransport, TransportKind};
use crate::{Error, Result};

pub mod builder;
pub mod events;
pub mod proxy;
pub mod typed;

pub use builder::ObjectBuilder;
pub use events::{EventListener, Subscription};
pub use proxy::ObjectProxy;
pub use typed::{Proxy, TypedBuilder};

use events::EventSubscriptionManager;

struct ClientInner {
    transport: Arc<dyn RomTransport>,
    correlation: AtomicU64,
    events: EventSubscriptionManager,
}

/// Handle to one ROM connection; cheap to clone
pub struct RomClient {
    inner: Arc<ClientInner>,
}

impl Clone for RomClient {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl RomClient {
    /// Wrap a transport and start the notification pump.
    ///
    /// The pump drains the transport's notification sink on a dedicated task
    /// and hands each event to the subscription manager, decoupling listener
    /// execution from the transport's read path.
    pub fn new(transport: Arc<dyn RomTransport>) -> Self {
        let inner = Arc::new(ClientInner {
            transport,
            correlation: AtomicU64::new(1),
            events: EventSubscriptionManager::new(),
        });

        let (sink, mut notifications) = mpsc::unbounded_channel();
        inner.transport.set_notification_sink(sink);

        let weak = Arc::downgrade(&inner);
        tokio::spawn(async move {
            while let Some(notification) = notifications.recv().await {
                let Some(inner) = weak.upgrade() else { break };
                inner.events.dispatch(&notification).await;
            }
        });

        Self { inner }
    }

    /// Issue one call and unwrap its response value.
    pub(crate) async fn call(&self, call: RomCall) -> Result<ParamValue> {
        let id = self.inner.correlation.fetch_add(1, Ordering::Relaxed);
        let response = self.inner.transport.call(Request::new(id, call)).await?;
        if response.id != id {
            return Err(Error::Protocol(format!(
                "correlation mismatch: sent {}, received {}",
                id, response.id
            )));
        }
        response.outcome.into_result().map_err(Error::from)
    }

    /// Connectivity check against the server.
    pub async fn ping(&self) -> Result<()> {
        self.call(RomCall::Ping).await.map(|_| ())
    }

    /// Start building an object of an arbitrary class.
    ///
    /// For built-in classes prefer the typed [`RomClient::create`] surface,
    /// which checks capabilities client-side.
    pub fn build(&self, class: &str) -> ObjectBuilder {
        ObjectBuilder::new(self.clone(), class)
    }

    /// Start building an object of a statically declared class.
    pub fn create<C: RemoteClass>(&self) -> TypedBuilder<C> {
        TypedBuilder::new(self.clone())
    }

    /// Register a listener for `event` on the object behind `proxy`.
    pub async fn subscribe(
        &self,
        proxy: &ObjectProxy,
        event: &str,
        listener: EventListener,
    ) -> Result<Subscription> {
        if proxy.is_released() {
            return Err(Error::StaleHandle(proxy.handle().clone()));
        }
        if let Some(descriptor) = proxy.descriptor() {
            if !descriptor.has_event(event) {
                return Err(Error::InvalidParam(format!(
                    "class {} has no event '{}'",
                    proxy.class(),
                    event
                )));
            }
        }
        self.inner
            .events
            .subscribe(self, proxy.handle(), event, listener)
            .await
    }

    /// Remove a previously registered listener.
    pub async fn unsubscribe(&self, subscription: Subscription) -> Result<()> {
        self.inner.events.unsubscribe(self, subscription).await
    }

    /// Whether the underlying transport is still usable.
    pub fn is_connected(&self) -> bool {
        self.inner.transport.is_connected()
    }

    /// Flavor of the underlying transport.
    pub fn transport_kind(&self) -> TransportKind {
        self.inner.transport.kind()
    }

    /// Close the underlying transport.
    pub async fn close(&self) -> Result<()> {
        self.inner.transport.close().await
    }
}

impl std::fmt::Debug for RomClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RomClient")
            .field("transport", &self.inner.transport.kind())
            .field("connected", &self.is_connected())
            .finish()
    }
}

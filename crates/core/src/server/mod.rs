//! Server-side components
//!
//! A [`RomServer`] bundles the object registry, the class registry, the
//! event broker, and the request dispatcher behind one facade. Transports
//! register connections with it, feed requests to its dispatcher, and drain
//! the notification stream it hands back. The whole structure has an
//! explicit lifecycle: built at startup, drained by [`RomServer::shutdown`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::protocol::EventNotification;

pub mod broker;
pub mod classes;
pub mod dispatcher;
pub mod elements;
pub mod object;
pub mod registry;

pub use broker::{ConnectionId, EventBroker};
pub use classes::{ClassRegistry, ConstructedObject, MediaObjectFactory};
pub use dispatcher::RomDispatcher;
pub use elements::default_class_registry;
pub use object::{MediaObject, ObjectContext};
pub use registry::ObjectRegistry;

/// One ROM server instance: registry, classes, broker, dispatcher
pub struct RomServer {
    registry: Arc<ObjectRegistry>,
    broker: Arc<EventBroker>,
    dispatcher: RomDispatcher,
    next_conn: AtomicU64,
}

impl RomServer {
    /// Build a server over the given class registry.
    pub fn new(classes: ClassRegistry) -> Arc<Self> {
        let registry = Arc::new(ObjectRegistry::new());
        let broker = Arc::new(EventBroker::new());
        let dispatcher = RomDispatcher::new(
            registry.clone(),
            Arc::new(classes),
            broker.clone(),
        );
        Arc::new(Self {
            registry,
            broker,
            dispatcher,
            next_conn: AtomicU64::new(1),
        })
    }

    /// Build a server with the built-in element classes registered.
    pub fn with_default_classes() -> Arc<Self> {
        Self::new(default_class_registry())
    }

    /// The request dispatcher transports feed requests into.
    pub fn dispatcher(&self) -> &RomDispatcher {
        &self.dispatcher
    }

    /// The registry holding live objects.
    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// Register a new client connection.
    ///
    /// Returns its id plus the stream of notifications destined for it.
    pub fn connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<EventNotification>) {
        let conn = ConnectionId(self.next_conn.fetch_add(1, Ordering::Relaxed));
        let notifications = self.broker.register_connection(conn);
        tracing::debug!(%conn, "connection registered");
        (conn, notifications)
    }

    /// Drop a connection and its subscriptions.
    ///
    /// Objects the connection created stay alive until released or until
    /// server shutdown.
    pub fn disconnect(&self, conn: ConnectionId) {
        self.broker.drop_connection(conn);
        tracing::debug!(%conn, "connection dropped");
    }

    /// Release every live object and purge their subscriptions.
    ///
    /// Returns the number of objects released.
    pub fn shutdown(&self) -> usize {
        let released = self.registry.release_all();
        for conn in self.broker_connections() {
            self.broker.drop_connection(conn);
        }
        tracing::info!(released, "server state torn down");
        released
    }

    fn broker_connections(&self) -> Vec<ConnectionId> {
        self.broker.connection_ids()
    }
}

//! Event broker
//!
//! Server-side subscription table. Connections register a notification
//! sender; objects emit events through their dispatch context; the broker
//! fans each event out to every connection holding a matching
//! (handle, event) subscription. Emission is a channel send and never blocks
//! request dispatch.

use dashmap::DashMap;
use std::fmt;
use tokio::sync::mpsc;

use crate::protocol::{EventNotification, ObjectHandle};
use crate::{Error, Result};

/// Identifier of one client connection on a server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub(crate) u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

type SubKey = (ObjectHandle, String);

struct SubEntry {
    id: String,
    conn: ConnectionId,
}

/// Subscription table plus per-connection notification senders
pub struct EventBroker {
    connections: DashMap<ConnectionId, mpsc::UnboundedSender<EventNotification>>,
    subscriptions: DashMap<SubKey, Vec<SubEntry>>,
    by_id: DashMap<String, SubKey>,
}

impl EventBroker {
    /// Create an empty broker.
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            subscriptions: DashMap::new(),
            by_id: DashMap::new(),
        }
    }

    /// Register a connection and hand back its notification stream.
    pub fn register_connection(
        &self,
        conn: ConnectionId,
    ) -> mpsc::UnboundedReceiver<EventNotification> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.insert(conn, tx);
        rx
    }

    /// Drop a connection and every subscription it held.
    pub fn drop_connection(&self, conn: ConnectionId) {
        self.connections.remove(&conn);
        self.subscriptions.retain(|_, entries| {
            entries.retain(|entry| {
                if entry.conn == conn {
                    self.by_id.remove(&entry.id);
                    false
                } else {
                    true
                }
            });
            !entries.is_empty()
        });
    }

    /// Record interest of `conn` in (handle, event) and return the
    /// subscription id used to remove it later.
    pub fn subscribe(&self, conn: ConnectionId, handle: &ObjectHandle, event: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let key = (handle.clone(), event.to_string());
        self.subscriptions
            .entry(key.clone())
            .or_default()
            .push(SubEntry {
                id: id.clone(),
                conn,
            });
        self.by_id.insert(id.clone(), key);
        tracing::debug!(%conn, %handle, event, subscription = %id, "subscribed");
        id
    }

    /// Remove a subscription by id.
    pub fn unsubscribe(&self, id: &str) -> Result<()> {
        let (_, key) = self
            .by_id
            .remove(id)
            .ok_or_else(|| Error::InvalidParam(format!("unknown subscription '{}'", id)))?;
        if let Some(mut entries) = self.subscriptions.get_mut(&key) {
            entries.retain(|entry| entry.id != id);
        }
        self.subscriptions.remove_if(&key, |_, entries| entries.is_empty());
        Ok(())
    }

    /// Remove every subscription on a handle. Called on release.
    pub fn drop_handle(&self, handle: &ObjectHandle) {
        self.subscriptions.retain(|key, entries| {
            if &key.0 == handle {
                for entry in entries {
                    self.by_id.remove(&entry.id);
                }
                false
            } else {
                true
            }
        });
    }

    /// Fan a notification out to every matching subscription.
    pub fn emit(&self, notification: EventNotification) {
        let key = (notification.target.clone(), notification.event.clone());
        let Some(entries) = self.subscriptions.get(&key) else {
            tracing::trace!(target = %notification.target, event = %notification.event,
                "event with no subscribers dropped");
            return;
        };
        for entry in entries.iter() {
            if let Some(sender) = self.connections.get(&entry.conn) {
                if sender.send(notification.clone()).is_err() {
                    tracing::debug!(conn = %entry.conn, "notification channel closed");
                }
            }
        }
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.by_id.len()
    }

    /// Ids of every registered connection.
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections.iter().map(|e| *e.key()).collect()
    }
}

impl Default for EventBroker {
    fn default() -> Self {
        Self::new()
    }
}

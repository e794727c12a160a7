//! Client-side event subscriptions
//!
//! Tracks which listeners are registered per (handle, event type) and fans
//! inbound notifications out to them in registration order. All listeners on
//! one (handle, event) pair share a single wire subscription: the first
//! registration subscribes on the server, the last removal tears the wire
//! subscription down.
//!
//! Listener invocation happens on the client's notification pump task, never
//! on a transport read path, so a slow listener delays later listeners on
//! the same notification but can never stall response matching.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::client::RomClient;
use crate::protocol::{EventNotification, ObjectHandle, ParamValue, RomCall};
use crate::{Error, Result};

/// Callback invoked for each matching notification
pub type EventListener = Arc<dyn Fn(&EventNotification) + Send + Sync>;

/// Registration record returned by subscribe, used to unsubscribe
#[derive(Debug, Clone)]
pub struct Subscription {
    pub(crate) handle: ObjectHandle,
    pub(crate) event: String,
    pub(crate) local_id: u64,
}

impl Subscription {
    /// Handle of the observed object.
    pub fn handle(&self) -> &ObjectHandle {
        &self.handle
    }

    /// Event type this subscription listens for.
    pub fn event(&self) -> &str {
        &self.event
    }
}

type BindingKey = (ObjectHandle, String);

struct EventBinding {
    wire_subscription: String,
    listeners: Vec<(u64, EventListener)>,
}

/// Listener table plus wire-subscription bookkeeping
pub(crate) struct EventSubscriptionManager {
    bindings: Mutex<HashMap<BindingKey, EventBinding>>,
    next_local: AtomicU64,
}

impl EventSubscriptionManager {
    pub(crate) fn new() -> Self {
        Self {
            bindings: Mutex::new(HashMap::new()),
            next_local: AtomicU64::new(1),
        }
    }

    /// Register a listener, subscribing on the wire if this is the first
    /// listener for (handle, event).
    pub(crate) async fn subscribe(
        &self,
        client: &RomClient,
        handle: &ObjectHandle,
        event: &str,
        listener: EventListener,
    ) -> Result<Subscription> {
        let key: BindingKey = (handle.clone(), event.to_string());
        let local_id = self.next_local.fetch_add(1, Ordering::Relaxed);

        let mut bindings = self.bindings.lock().await;
        if let Some(binding) = bindings.get_mut(&key) {
            binding.listeners.push((local_id, listener));
        } else {
            let value = client
                .call(RomCall::Subscribe {
                    target: handle.clone(),
                    event: event.to_string(),
                })
                .await?;
            let wire_subscription = match value {
                ParamValue::Str(id) => id,
                other => {
                    return Err(Error::Protocol(format!(
                        "subscribe returned {} instead of a subscription id",
                        other.kind()
                    )))
                }
            };
            bindings.insert(
                key.clone(),
                EventBinding {
                    wire_subscription,
                    listeners: vec![(local_id, listener)],
                },
            );
        }

        Ok(Subscription {
            handle: key.0,
            event: key.1,
            local_id,
        })
    }

    /// Remove a listener, tearing down the wire subscription when it was the
    /// last one for its (handle, event). Unknown subscriptions are a no-op.
    pub(crate) async fn unsubscribe(
        &self,
        client: &RomClient,
        subscription: Subscription,
    ) -> Result<()> {
        let key: BindingKey = (subscription.handle.clone(), subscription.event.clone());

        let wire_subscription = {
            let mut bindings = self.bindings.lock().await;
            let Some(binding) = bindings.get_mut(&key) else {
                return Ok(());
            };
            binding
                .listeners
                .retain(|(id, _)| *id != subscription.local_id);
            if !binding.listeners.is_empty() {
                return Ok(());
            }
            let wire_subscription = binding.wire_subscription.clone();
            bindings.remove(&key);
            wire_subscription
        };

        match client
            .call(RomCall::Unsubscribe {
                target: subscription.handle,
                subscription: wire_subscription,
            })
            .await
        {
            Ok(_) => Ok(()),
            // the object may already be released; local removal is what counts
            Err(Error::InvalidParam(_)) | Err(Error::InvalidHandle(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Invoke every listener registered for the notification, in
    /// registration order, exactly once each.
    pub(crate) async fn dispatch(&self, notification: &EventNotification) {
        let key: BindingKey = (notification.target.clone(), notification.event.clone());
        let listeners: Vec<EventListener> = {
            let bindings = self.bindings.lock().await;
            match bindings.get(&key) {
                Some(binding) => binding.listeners.iter().map(|(_, l)| l.clone()).collect(),
                None => Vec::new(),
            }
        };
        if listeners.is_empty() {
            tracing::trace!(target = %notification.target, event = %notification.event,
                "notification with no listeners dropped");
            return;
        }
        for listener in listeners {
            listener(notification);
        }
    }
}

//! Server-side object trait
//!
//! The dispatcher treats every registry-held instance as an opaque capability
//! set behind [`MediaObject`]: operations arrive by name with named
//! parameters, and whatever the object reports back crosses the transport as
//! a typed response. The ROM core never interprets media semantics.

use async_trait::async_trait;

use crate::protocol::{EventNotification, ObjectHandle, ParamMap, ParamValue};
use crate::server::broker::EventBroker;
use crate::server::registry::ObjectRegistry;
use crate::Result;

/// Per-invocation context handed to an object by the dispatcher
pub struct ObjectContext<'a> {
    /// Handle of the object being invoked
    pub handle: &'a ObjectHandle,
    /// Registry for resolving handle-typed parameters
    pub registry: &'a ObjectRegistry,
    /// Broker for emitting events toward subscribed clients
    pub broker: &'a EventBroker,
}

impl ObjectContext<'_> {
    /// Emit an event on behalf of the invoked object.
    ///
    /// Delivery is fire-and-forget: the event reaches whichever connections
    /// currently hold a subscription for (handle, event) and never blocks the
    /// invocation.
    pub fn emit(&self, event: &str, payload: ParamValue) {
        self.broker.emit(EventNotification {
            target: self.handle.clone(),
            event: event.to_string(),
            payload,
        });
    }
}

/// A live server-side object addressable through the ROM
#[async_trait]
pub trait MediaObject: Send + Sync {
    /// Declared class of this instance.
    fn class(&self) -> &str;

    /// Execute a named operation.
    ///
    /// Unknown operation names fail with
    /// [`Error::UnsupportedOperation`](crate::Error::UnsupportedOperation);
    /// any other failure is reported through the returned `Result` and
    /// converted to a typed error response at the dispatcher boundary.
    async fn invoke(
        &self,
        ctx: ObjectContext<'_>,
        operation: &str,
        params: &ParamMap,
    ) -> Result<ParamValue>;

    /// Hook invoked when the object's handle is retired.
    fn on_release(&self) {}
}

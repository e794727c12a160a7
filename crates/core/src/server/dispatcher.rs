//! Request dispatcher
//!
//! Resolves each incoming request to an operation on a registry-held
//! instance and converts every failure into a typed error response. Raw
//! faults never cross the transport boundary.
//!
//! Ordering: the dispatcher itself imposes none. Transports that process one
//! connection's requests sequentially (as both bundled transports do) give
//! that connection per-handle FIFO semantics; ordering across connections is
//! unspecified.

use std::sync::Arc;

use crate::model;
use crate::protocol::{ParamValue, Request, Response, RomCall};
use crate::server::broker::{ConnectionId, EventBroker};
use crate::server::classes::ClassRegistry;
use crate::server::object::ObjectContext;
use crate::server::registry::ObjectRegistry;
use crate::{Error, Result};

/// Server-side request state machine
pub struct RomDispatcher {
    registry: Arc<ObjectRegistry>,
    classes: Arc<ClassRegistry>,
    broker: Arc<EventBroker>,
}

impl RomDispatcher {
    /// Assemble a dispatcher over shared server state.
    pub fn new(
        registry: Arc<ObjectRegistry>,
        classes: Arc<ClassRegistry>,
        broker: Arc<EventBroker>,
    ) -> Self {
        Self {
            registry,
            classes,
            broker,
        }
    }

    /// The registry this dispatcher resolves handles against.
    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// The broker events are routed through.
    pub fn broker(&self) -> &EventBroker {
        &self.broker
    }

    /// Handle one request and produce its response.
    ///
    /// Never fails outward: every error is caught here and shipped back as a
    /// typed error response under the request's correlation id.
    pub async fn handle_request(&self, conn: ConnectionId, request: Request) -> Response {
        let id = request.id;
        match self.dispatch(conn, request.call).await {
            Ok(value) => Response::ok(id, value),
            Err(err) => {
                tracing::debug!(%conn, id, error = %err, "request failed");
                Response::error(id, err.to_remote())
            }
        }
    }

    async fn dispatch(&self, conn: ConnectionId, call: RomCall) -> Result<ParamValue> {
        match call {
            RomCall::Create { class, params } => {
                let constructed = self.classes.create(&class, &params)?;
                let handle =
                    self.registry
                        .insert(&class, constructed.object, constructed.parent)?;
                tracing::info!(%conn, %handle, class, "object created");
                Ok(ParamValue::Ref(handle))
            }
            RomCall::Invoke {
                target,
                operation,
                params,
            } => {
                let object = self
                    .registry
                    .lookup(&target)
                    .ok_or_else(|| Error::InvalidHandle(target.to_string()))?;
                let ctx = ObjectContext {
                    handle: &target,
                    registry: &self.registry,
                    broker: &self.broker,
                };
                object.invoke(ctx, &operation, &params).await
            }
            RomCall::Release { target } => {
                let released = self.registry.release(&target)?;
                for handle in &released {
                    self.broker.drop_handle(handle);
                }
                tracing::info!(%conn, %target, count = released.len(), "released");
                Ok(ParamValue::Null)
            }
            RomCall::Subscribe { target, event } => {
                let object = self
                    .registry
                    .lookup(&target)
                    .ok_or_else(|| Error::InvalidHandle(target.to_string()))?;
                // built-in classes declare their events; dynamically
                // registered classes are unconstrained here
                if let Some(descriptor) = model::descriptor(object.class()) {
                    if !descriptor.has_event(&event) {
                        return Err(Error::InvalidParam(format!(
                            "class {} has no event '{}'",
                            object.class(),
                            event
                        )));
                    }
                }
                let subscription = self.broker.subscribe(conn, &target, &event);
                Ok(ParamValue::Str(subscription))
            }
            RomCall::Unsubscribe { subscription, .. } => {
                self.broker.unsubscribe(&subscription)?;
                Ok(ParamValue::Null)
            }
            RomCall::Ping => Ok(ParamValue::Str("pong".into())),
        }
    }
}

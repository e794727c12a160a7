//! Client-side object proxies
//!
//! An [`ObjectProxy`] is the client's stand-in for one server-resident
//! object: a handle plus the declared capability set of its class. Every
//! operation is checked against that set before it touches the transport,
//! and a proxy whose handle was released fails all further operations with
//! `StaleHandle` instead of silently succeeding.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::client::{EventListener, RomClient, Subscription};
use crate::model::{self, ClassDescriptor};
use crate::protocol::{ObjectHandle, ParamMap, ParamValue, RomCall};
use crate::{Error, Result};

/// Proxy for a remote object, bound to its handle and capability set
pub struct ObjectProxy {
    pub(crate) client: RomClient,
    handle: ObjectHandle,
    class: String,
    descriptor: Option<&'static ClassDescriptor>,
    released: Arc<AtomicBool>,
}

impl Clone for ObjectProxy {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            handle: self.handle.clone(),
            class: self.class.clone(),
            descriptor: self.descriptor,
            released: self.released.clone(),
        }
    }
}

impl ObjectProxy {
    pub(crate) fn new(client: RomClient, class: &str, handle: ObjectHandle) -> Self {
        Self {
            client,
            handle,
            class: class.to_string(),
            descriptor: model::descriptor(class),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle of the remote object this proxy addresses.
    pub fn handle(&self) -> &ObjectHandle {
        &self.handle
    }

    /// Declared class of the remote object.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Capability set, when the class is a built-in.
    pub fn descriptor(&self) -> Option<&'static ClassDescriptor> {
        self.descriptor
    }

    /// Whether this proxy (or a clone of it) released the handle.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_released() {
            Err(Error::StaleHandle(self.handle.clone()))
        } else {
            Ok(())
        }
    }

    /// Forward an operation to the remote object and wait for its result.
    pub async fn invoke(&self, operation: &str, params: ParamMap) -> Result<ParamValue> {
        self.ensure_live()?;
        if let Some(descriptor) = self.descriptor {
            if !descriptor.has_operation(operation) {
                return Err(Error::UnsupportedOperation(format!(
                    "'{}' on class {}",
                    operation, self.class
                )));
            }
        }
        self.client
            .call(RomCall::Invoke {
                target: self.handle.clone(),
                operation: operation.to_string(),
                params,
            })
            .await
    }

    /// Register a listener for an event declared by this proxy's class.
    pub async fn subscribe(&self, event: &str, listener: EventListener) -> Result<Subscription> {
        self.client.subscribe(self, event, listener).await
    }

    /// Retire the remote object.
    ///
    /// Idempotent: releasing an already-released proxy is a no-op, and a
    /// concurrent release through another proxy of the same handle is
    /// absorbed. All other operations on a released proxy fail with
    /// `StaleHandle`.
    pub async fn release(&self) -> Result<()> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        match self
            .client
            .call(RomCall::Release {
                target: self.handle.clone(),
            })
            .await
        {
            Ok(_) => Ok(()),
            Err(Error::InvalidHandle(_)) => Ok(()),
            Err(err) => {
                // the release did not reach the server; keep the proxy usable
                self.released.store(false, Ordering::Release);
                Err(err)
            }
        }
    }
}

impl fmt::Debug for ObjectProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectProxy")
            .field("class", &self.class)
            .field("handle", &self.handle)
            .field("released", &self.is_released())
            .finish()
    }
}

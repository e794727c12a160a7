//! Object registry
//!
//! Owns the mapping from handle to live object instance. Handles are issued
//! on construction and retired on release; release cascades to children so a
//! pipeline takes its elements with it. The registry has an explicit
//! lifecycle: created at server start, drained by [`ObjectRegistry::release_all`]
//! at shutdown.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::protocol::ObjectHandle;
use crate::server::object::MediaObject;
use crate::{Error, Result};

struct Entry {
    object: Arc<dyn MediaObject>,
    class: String,
    children: Mutex<Vec<ObjectHandle>>,
}

/// Handle to live instance mapping, shared by dispatcher and objects
pub struct ObjectRegistry {
    objects: DashMap<ObjectHandle, Entry>,
}

impl ObjectRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
        }
    }

    /// Register a freshly constructed object and issue its handle.
    ///
    /// When `parent` is given it must be live; the new object is recorded as
    /// its child and released together with it.
    pub fn insert(
        &self,
        class: &str,
        object: Arc<dyn MediaObject>,
        parent: Option<ObjectHandle>,
    ) -> Result<ObjectHandle> {
        if let Some(parent) = &parent {
            if !self.objects.contains_key(parent) {
                return Err(Error::InvalidHandle(parent.to_string()));
            }
        }

        let handle = ObjectHandle::generate(class);
        self.objects.insert(
            handle.clone(),
            Entry {
                object,
                class: class.to_string(),
                children: Mutex::new(Vec::new()),
            },
        );

        if let Some(parent) = &parent {
            match self.objects.get(parent) {
                Some(entry) => entry.children.lock().push(handle.clone()),
                None => {
                    // parent released between the check and the link; undo
                    self.objects.remove(&handle);
                    return Err(Error::InvalidHandle(parent.to_string()));
                }
            }
        }

        tracing::debug!(%handle, class, "object registered");
        Ok(handle)
    }

    /// Look up a live instance. Returns `None` for unknown or released handles.
    pub fn lookup(&self, handle: &ObjectHandle) -> Option<Arc<dyn MediaObject>> {
        self.objects.get(handle).map(|entry| entry.object.clone())
    }

    /// Whether `handle` currently maps to a live instance.
    pub fn contains(&self, handle: &ObjectHandle) -> bool {
        self.objects.contains_key(handle)
    }

    /// Declared class of a live instance.
    pub fn class_of(&self, handle: &ObjectHandle) -> Option<String> {
        self.objects.get(handle).map(|entry| entry.class.clone())
    }

    /// Retire a handle and, transitively, all its children.
    ///
    /// Returns every handle that was released, the target last. Releasing an
    /// unknown or already-released handle fails with `InvalidHandle`; callers
    /// treat that as the documented no-op error, never a crash.
    pub fn release(&self, handle: &ObjectHandle) -> Result<Vec<ObjectHandle>> {
        if !self.objects.contains_key(handle) {
            return Err(Error::InvalidHandle(handle.to_string()));
        }
        let mut released = Vec::new();
        self.release_recursive(handle, &mut released);
        tracing::debug!(%handle, count = released.len(), "released");
        Ok(released)
    }

    fn release_recursive(&self, handle: &ObjectHandle, released: &mut Vec<ObjectHandle>) {
        if let Some((handle, entry)) = self.objects.remove(handle) {
            let children = entry.children.into_inner();
            for child in &children {
                // children released individually leave stale links; skip them
                self.release_recursive(child, released);
            }
            entry.object.on_release();
            released.push(handle);
        }
    }

    /// Release every live object. Used at server shutdown.
    pub fn release_all(&self) -> usize {
        let handles: Vec<ObjectHandle> = self.objects.iter().map(|e| e.key().clone()).collect();
        let mut released = Vec::new();
        for handle in handles {
            self.release_recursive(&handle, &mut released);
        }
        released.len()
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the registry holds no live objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

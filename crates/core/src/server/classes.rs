//! Class registry and construction factories
//!
//! Mirrors the capability model on the server side: each constructible class
//! registers a [`MediaObjectFactory`], and create requests are resolved
//! through the [`ClassRegistry`]. Parameter extraction helpers live here so
//! factories and objects validate inputs the same way.

use std::collections::HashMap;
use std::sync::Arc;

use crate::protocol::{ObjectHandle, ParamMap, ParamValue};
use crate::server::object::MediaObject;
use crate::{Error, Result};

/// A factory's output: the instance plus its optional parent link
pub struct ConstructedObject {
    /// The newly constructed instance
    pub object: Arc<dyn MediaObject>,
    /// Parent handle extracted from the constructor parameters, if any.
    /// The registry links the new object as a child of this handle.
    pub parent: Option<ObjectHandle>,
}

impl std::fmt::Debug for ConstructedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstructedObject")
            .field("class", &self.object.class())
            .field("parent", &self.parent)
            .finish()
    }
}

/// Constructs instances of one declared class
pub trait MediaObjectFactory: Send + Sync {
    /// Class name this factory constructs.
    fn class(&self) -> &str;

    /// Validate constructor parameters and build an instance.
    fn create(&self, params: &ParamMap) -> Result<ConstructedObject>;
}

/// Registry of constructible classes
pub struct ClassRegistry {
    factories: HashMap<String, Arc<dyn MediaObjectFactory>>,
}

impl ClassRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory under its declared class name.
    pub fn register(&mut self, factory: Arc<dyn MediaObjectFactory>) {
        let class = factory.class().to_string();
        self.factories.insert(class, factory);
    }

    /// Construct an instance of `class` from named parameters.
    pub fn create(&self, class: &str, params: &ParamMap) -> Result<ConstructedObject> {
        let factory = self.factories.get(class).ok_or_else(|| {
            Error::Construction(format!(
                "no factory registered for class '{}'. Available classes: {:?}",
                class,
                self.list_classes()
            ))
        })?;
        factory.create(params)
    }

    /// Whether `class` is constructible on this server.
    pub fn has_class(&self, class: &str) -> bool {
        self.factories.contains_key(class)
    }

    /// All registered class names, sorted.
    pub fn list_classes(&self) -> Vec<String> {
        let mut classes: Vec<String> = self.factories.keys().cloned().collect();
        classes.sort();
        classes
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract a required string parameter.
pub fn require_str(params: &ParamMap, name: &str) -> Result<String> {
    match params.get(name) {
        Some(ParamValue::Str(s)) => Ok(s.clone()),
        Some(other) => Err(Error::InvalidParam(format!(
            "'{}' must be a string, got {}",
            name,
            other.kind()
        ))),
        None => Err(Error::InvalidParam(format!("'{}' is required", name))),
    }
}

/// Extract an optional string parameter.
pub fn optional_str(params: &ParamMap, name: &str) -> Result<Option<String>> {
    match params.get(name) {
        Some(ParamValue::Str(s)) => Ok(Some(s.clone())),
        Some(ParamValue::Null) | None => Ok(None),
        Some(other) => Err(Error::InvalidParam(format!(
            "'{}' must be a string, got {}",
            name,
            other.kind()
        ))),
    }
}

/// Extract a required object-reference parameter.
pub fn require_ref(params: &ParamMap, name: &str) -> Result<ObjectHandle> {
    match params.get(name) {
        Some(ParamValue::Ref(handle)) => Ok(handle.clone()),
        Some(other) => Err(Error::InvalidParam(format!(
            "'{}' must be an object reference, got {}",
            name,
            other.kind()
        ))),
        None => Err(Error::InvalidParam(format!("'{}' is required", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_class_is_a_construction_error() {
        let registry = ClassRegistry::new();
        let err = registry.create("Ghost", &ParamMap::new()).unwrap_err();
        match err {
            Error::Construction(message) => assert!(message.contains("Ghost")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn param_helpers_validate_shape() {
        let mut params = ParamMap::new();
        params.insert("uri".into(), ParamValue::Str("file:///x".into()));
        params.insert("count".into(), ParamValue::Int(3));

        assert_eq!(require_str(&params, "uri").unwrap(), "file:///x");
        assert!(matches!(
            require_str(&params, "count"),
            Err(Error::InvalidParam(_))
        ));
        assert!(matches!(
            require_str(&params, "missing"),
            Err(Error::InvalidParam(_))
        ));
        assert_eq!(optional_str(&params, "missing").unwrap(), None);
        assert!(matches!(
            require_ref(&params, "uri"),
            Err(Error::InvalidParam(_))
        ));
    }
}

//! Construction builders
//!
//! A builder accumulates named constructor parameters and issues exactly one
//! create request. `build` consumes the builder, so a finished construction
//! can never be reused or mutated afterwards.

use crate::client::{ObjectProxy, RomClient};
use crate::model;
use crate::protocol::{ParamMap, ParamValue, RomCall};
use crate::{Error, Result};

/// Accumulator for one create request
pub struct ObjectBuilder {
    client: RomClient,
    class: String,
    params: ParamMap,
}

impl ObjectBuilder {
    pub(crate) fn new(client: RomClient, class: &str) -> Self {
        Self {
            client,
            class: class.to_string(),
            params: ParamMap::new(),
        }
    }

    /// Add a constructor parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Class this builder constructs.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Issue the create request and bind a proxy to the returned handle.
    ///
    /// Required constructor parameters of built-in classes are checked
    /// before anything touches the transport; the server revalidates either
    /// way.
    pub async fn build(self) -> Result<ObjectProxy> {
        let Self {
            client,
            class,
            params,
        } = self;
        if let Some(descriptor) = model::descriptor(&class) {
            for declared in descriptor.constructor_params {
                if declared.required && !params.contains_key(declared.name) {
                    return Err(Error::InvalidParam(format!(
                        "'{}' is required to construct {}",
                        declared.name, class
                    )));
                }
            }
        }
        let value = client
            .call(RomCall::Create {
                class: class.clone(),
                params,
            })
            .await?;
        match value {
            ParamValue::Ref(handle) => Ok(ObjectProxy::new(client, &class, handle)),
            other => Err(Error::Protocol(format!(
                "create returned {} instead of an object reference",
                other.kind()
            ))),
        }
    }
}

impl From<&ObjectProxy> for ParamValue {
    fn from(proxy: &ObjectProxy) -> Self {
        ParamValue::Ref(proxy.handle().clone())
    }
}

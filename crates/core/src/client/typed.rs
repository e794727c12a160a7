//! Typed proxy surface
//!
//! [`Proxy<C>`] brands an [`ObjectProxy`] with a [`RemoteClass`] marker so
//! each built-in class exposes one method per legal operation. The markers
//! carry no runtime state; everything still flows through the untyped proxy
//! underneath, which a `Deref` impl keeps reachable.

use std::marker::PhantomData;
use std::ops::Deref;

use crate::client::{EventListener, ObjectBuilder, ObjectProxy, RomClient, Subscription};
use crate::model::{
    events, ops, params, HttpEndpoint, MediaPipeline, PlayerEndpoint, RecorderEndpoint,
    RemoteClass,
};
use crate::protocol::{ParamMap, ParamValue};
use crate::{Error, Result};

/// Proxy branded with its remote class
pub struct Proxy<C: RemoteClass> {
    inner: ObjectProxy,
    _class: PhantomData<C>,
}

impl<C: RemoteClass> Clone for Proxy<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _class: PhantomData,
        }
    }
}

impl<C: RemoteClass> std::fmt::Debug for Proxy<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.inner, f)
    }
}

impl<C: RemoteClass> Deref for Proxy<C> {
    type Target = ObjectProxy;

    fn deref(&self) -> &ObjectProxy {
        &self.inner
    }
}

impl<C: RemoteClass> Proxy<C> {
    pub(crate) fn wrap(inner: ObjectProxy) -> Self {
        Self {
            inner,
            _class: PhantomData,
        }
    }

    /// The untyped proxy underneath.
    pub fn as_object(&self) -> &ObjectProxy {
        &self.inner
    }
}

/// Builder branded with the class it constructs
pub struct TypedBuilder<C: RemoteClass> {
    inner: ObjectBuilder,
    _class: PhantomData<C>,
}

impl<C: RemoteClass> TypedBuilder<C> {
    pub(crate) fn new(client: RomClient) -> Self {
        Self {
            inner: ObjectBuilder::new(client, C::NAME),
            _class: PhantomData,
        }
    }

    /// Add an arbitrary constructor parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.inner = self.inner.with_param(name, value);
        self
    }

    /// Issue the create request and bind a typed proxy to the result.
    pub async fn build(self) -> Result<Proxy<C>> {
        Ok(Proxy::wrap(self.inner.build().await?))
    }
}

impl TypedBuilder<MediaPipeline> {
    /// Set the pipeline's display name.
    pub fn name(self, name: &str) -> Self {
        self.with_param(params::NAME, name)
    }
}

impl TypedBuilder<PlayerEndpoint> {
    /// Set the source URI to play from.
    pub fn uri(self, uri: &str) -> Self {
        self.with_param(params::URI, uri)
    }
}

impl TypedBuilder<RecorderEndpoint> {
    /// Set the target URI to record into.
    pub fn uri(self, uri: &str) -> Self {
        self.with_param(params::URI, uri)
    }
}

impl RomClient {
    /// Start building a media pipeline.
    pub fn create_pipeline(&self) -> TypedBuilder<MediaPipeline> {
        self.create::<MediaPipeline>()
    }
}

impl Proxy<MediaPipeline> {
    /// Start building a player inside this pipeline.
    pub fn create_player(&self) -> TypedBuilder<PlayerEndpoint> {
        self.inner
            .client
            .create::<PlayerEndpoint>()
            .with_param(params::PIPELINE, self.as_object())
    }

    /// Start building an HTTP endpoint inside this pipeline.
    pub fn create_http_endpoint(&self) -> TypedBuilder<HttpEndpoint> {
        self.inner
            .client
            .create::<HttpEndpoint>()
            .with_param(params::PIPELINE, self.as_object())
    }

    /// Start building a recorder inside this pipeline.
    pub fn create_recorder(&self) -> TypedBuilder<RecorderEndpoint> {
        self.inner
            .client
            .create::<RecorderEndpoint>()
            .with_param(params::PIPELINE, self.as_object())
    }

    /// Read back the pipeline's configured name.
    pub async fn get_name(&self) -> Result<Option<String>> {
        match self.invoke(ops::GET_NAME, ParamMap::new()).await? {
            ParamValue::Str(name) => Ok(Some(name)),
            ParamValue::Null => Ok(None),
            other => Err(Error::Protocol(format!(
                "get_name returned {}",
                other.kind()
            ))),
        }
    }
}

impl Proxy<PlayerEndpoint> {
    /// Connect this player's output to a sink element.
    pub async fn connect(&self, sink: &ObjectProxy) -> Result<()> {
        let mut call_params = ParamMap::new();
        call_params.insert(params::SINK.to_string(), ParamValue::from(sink));
        self.invoke(ops::CONNECT, call_params).await.map(|_| ())
    }

    /// Start playback.
    pub async fn play(&self) -> Result<()> {
        self.invoke(ops::PLAY, ParamMap::new()).await.map(|_| ())
    }

    /// Pause playback.
    pub async fn pause(&self) -> Result<()> {
        self.invoke(ops::PAUSE, ParamMap::new()).await.map(|_| ())
    }

    /// Stop playback.
    pub async fn stop(&self) -> Result<()> {
        self.invoke(ops::STOP, ParamMap::new()).await.map(|_| ())
    }

    /// Read back the source URI.
    pub async fn get_uri(&self) -> Result<String> {
        match self.invoke(ops::GET_URI, ParamMap::new()).await? {
            ParamValue::Str(uri) => Ok(uri),
            other => Err(Error::Protocol(format!("get_uri returned {}", other.kind()))),
        }
    }

    /// Listen for the end of this player's stream.
    pub async fn on_end_of_stream(&self, listener: EventListener) -> Result<Subscription> {
        self.subscribe(events::END_OF_STREAM, listener).await
    }
}

impl Proxy<HttpEndpoint> {
    /// URL the endpoint serves its media on.
    pub async fn get_url(&self) -> Result<String> {
        match self.invoke(ops::GET_URL, ParamMap::new()).await? {
            ParamValue::Str(url) => Ok(url),
            other => Err(Error::Protocol(format!("get_url returned {}", other.kind()))),
        }
    }
}

impl Proxy<RecorderEndpoint> {
    /// Start recording.
    pub async fn record(&self) -> Result<()> {
        self.invoke(ops::RECORD, ParamMap::new()).await.map(|_| ())
    }

    /// Stop recording.
    pub async fn stop(&self) -> Result<()> {
        self.invoke(ops::STOP, ParamMap::new()).await.map(|_| ())
    }

    /// Read back the target URI.
    pub async fn get_uri(&self) -> Result<String> {
        match self.invoke(ops::GET_URI, ParamMap::new()).await? {
            ParamValue::Str(uri) => Ok(uri),
            other => Err(Error::Protocol(format!("get_uri returned {}", other.kind()))),
        }
    }
}

//! Built-in element classes
//!
//! Deterministic stand-ins for the media server's objects. They keep just
//! enough state to exercise the ROM contract (topology links, playback
//! state, event emission); real media behavior belongs to the external media
//! server and is out of scope. The bundled player simulates an instantaneous
//! source: a `play` call traverses the whole stream within the call and
//! emits `EndOfStream` before returning.

use parking_lot::Mutex;
use std::sync::Arc;

use async_trait::async_trait;

use crate::model::{events, ops, params};
use crate::protocol::{ObjectHandle, ParamMap, ParamValue};
use crate::server::classes::{
    optional_str, require_ref, require_str, ClassRegistry, ConstructedObject, MediaObjectFactory,
};
use crate::server::object::{MediaObject, ObjectContext};
use crate::{Error, Result};

fn unsupported(class: &str, operation: &str) -> Error {
    Error::UnsupportedOperation(format!("'{}' on class {}", operation, class))
}

/// Resolve the `sink` parameter of a connect call against the registry.
///
/// A released or unknown sink fails the whole call; no half-connected state
/// is ever recorded.
fn resolve_sink(ctx: &ObjectContext<'_>, call_params: &ParamMap) -> Result<ObjectHandle> {
    let sink = require_ref(call_params, params::SINK)?;
    if !ctx.registry.contains(&sink) {
        return Err(Error::InvalidHandle(sink.to_string()));
    }
    Ok(sink)
}

// ---------------------------------------------------------------------------
// MediaPipeline
// ---------------------------------------------------------------------------

struct MediaPipelineObject {
    name: Option<String>,
}

#[async_trait]
impl MediaObject for MediaPipelineObject {
    fn class(&self) -> &str {
        "MediaPipeline"
    }

    async fn invoke(
        &self,
        _ctx: ObjectContext<'_>,
        operation: &str,
        _params: &ParamMap,
    ) -> Result<ParamValue> {
        match operation {
            ops::GET_NAME => Ok(self
                .name
                .clone()
                .map(ParamValue::Str)
                .unwrap_or(ParamValue::Null)),
            other => Err(unsupported(self.class(), other)),
        }
    }
}

struct MediaPipelineFactory;

impl MediaObjectFactory for MediaPipelineFactory {
    fn class(&self) -> &str {
        "MediaPipeline"
    }

    fn create(&self, params: &ParamMap) -> Result<ConstructedObject> {
        let name = optional_str(params, params::NAME)?;
        Ok(ConstructedObject {
            object: Arc::new(MediaPipelineObject { name }),
            parent: None,
        })
    }
}

// ---------------------------------------------------------------------------
// PlayerEndpoint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayerState {
    Stopped,
    Playing,
    Paused,
}

struct PlayerEndpointObject {
    uri: String,
    state: Mutex<PlayerState>,
    sinks: Mutex<Vec<ObjectHandle>>,
}

#[async_trait]
impl MediaObject for PlayerEndpointObject {
    fn class(&self) -> &str {
        "PlayerEndpoint"
    }

    async fn invoke(
        &self,
        ctx: ObjectContext<'_>,
        operation: &str,
        call_params: &ParamMap,
    ) -> Result<ParamValue> {
        match operation {
            ops::CONNECT => {
                let sink = resolve_sink(&ctx, call_params)?;
                self.sinks.lock().push(sink);
                Ok(ParamValue::Null)
            }
            ops::PLAY => {
                *self.state.lock() = PlayerState::Playing;
                tracing::debug!(handle = %ctx.handle, uri = %self.uri, "playing");
                // instantaneous source: the stream ends within the call
                ctx.emit(events::END_OF_STREAM, ParamValue::Str(self.uri.clone()));
                *self.state.lock() = PlayerState::Stopped;
                Ok(ParamValue::Null)
            }
            ops::PAUSE => {
                *self.state.lock() = PlayerState::Paused;
                Ok(ParamValue::Null)
            }
            ops::STOP => {
                *self.state.lock() = PlayerState::Stopped;
                Ok(ParamValue::Null)
            }
            ops::GET_URI => Ok(ParamValue::Str(self.uri.clone())),
            other => Err(unsupported(self.class(), other)),
        }
    }
}

struct PlayerEndpointFactory;

impl MediaObjectFactory for PlayerEndpointFactory {
    fn class(&self) -> &str {
        "PlayerEndpoint"
    }

    fn create(&self, params: &ParamMap) -> Result<ConstructedObject> {
        let pipeline = require_ref(params, params::PIPELINE)?;
        let uri = require_str(params, params::URI)?;
        Ok(ConstructedObject {
            object: Arc::new(PlayerEndpointObject {
                uri,
                state: Mutex::new(PlayerState::Stopped),
                sinks: Mutex::new(Vec::new()),
            }),
            parent: Some(pipeline),
        })
    }
}

// ---------------------------------------------------------------------------
// HttpEndpoint
// ---------------------------------------------------------------------------

struct HttpEndpointObject;

#[async_trait]
impl MediaObject for HttpEndpointObject {
    fn class(&self) -> &str {
        "HttpEndpoint"
    }

    async fn invoke(
        &self,
        ctx: ObjectContext<'_>,
        operation: &str,
        _params: &ParamMap,
    ) -> Result<ParamValue> {
        match operation {
            // the real media server allocates this; the stand-in derives a
            // stable URL from the handle
            ops::GET_URL => Ok(ParamValue::Str(format!("http://localhost/media/{}", ctx.handle))),
            other => Err(unsupported(self.class(), other)),
        }
    }
}

struct HttpEndpointFactory;

impl MediaObjectFactory for HttpEndpointFactory {
    fn class(&self) -> &str {
        "HttpEndpoint"
    }

    fn create(&self, params: &ParamMap) -> Result<ConstructedObject> {
        let pipeline = require_ref(params, params::PIPELINE)?;
        Ok(ConstructedObject {
            object: Arc::new(HttpEndpointObject),
            parent: Some(pipeline),
        })
    }
}

// ---------------------------------------------------------------------------
// RecorderEndpoint
// ---------------------------------------------------------------------------

struct RecorderEndpointObject {
    uri: String,
    recording: Mutex<bool>,
}

#[async_trait]
impl MediaObject for RecorderEndpointObject {
    fn class(&self) -> &str {
        "RecorderEndpoint"
    }

    async fn invoke(
        &self,
        _ctx: ObjectContext<'_>,
        operation: &str,
        _params: &ParamMap,
    ) -> Result<ParamValue> {
        match operation {
            ops::RECORD => {
                *self.recording.lock() = true;
                Ok(ParamValue::Null)
            }
            ops::STOP => {
                *self.recording.lock() = false;
                Ok(ParamValue::Null)
            }
            ops::GET_URI => Ok(ParamValue::Str(self.uri.clone())),
            other => Err(unsupported(self.class(), other)),
        }
    }
}

struct RecorderEndpointFactory;

impl MediaObjectFactory for RecorderEndpointFactory {
    fn class(&self) -> &str {
        "RecorderEndpoint"
    }

    fn create(&self, params: &ParamMap) -> Result<ConstructedObject> {
        let pipeline = require_ref(params, params::PIPELINE)?;
        let uri = require_str(params, params::URI)?;
        Ok(ConstructedObject {
            object: Arc::new(RecorderEndpointObject {
                uri,
                recording: Mutex::new(false),
            }),
            parent: Some(pipeline),
        })
    }
}

/// Class registry with all built-in element classes registered.
pub fn default_class_registry() -> ClassRegistry {
    let mut registry = ClassRegistry::new();
    registry.register(Arc::new(MediaPipelineFactory));
    registry.register(Arc::new(PlayerEndpointFactory));
    registry.register(Arc::new(HttpEndpointFactory));
    registry.register(Arc::new(RecorderEndpointFactory));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::broker::{ConnectionId, EventBroker};
    use crate::server::registry::ObjectRegistry;

    struct Fixture {
        registry: Arc<ObjectRegistry>,
        broker: Arc<EventBroker>,
        classes: ClassRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: Arc::new(ObjectRegistry::new()),
                broker: Arc::new(EventBroker::new()),
                classes: default_class_registry(),
            }
        }

        fn construct(&self, class: &str, params: ParamMap) -> ObjectHandle {
            let constructed = self.classes.create(class, &params).unwrap();
            self.registry
                .insert(class, constructed.object, constructed.parent)
                .unwrap()
        }

        fn pipeline(&self) -> ObjectHandle {
            self.construct("MediaPipeline", ParamMap::new())
        }

        fn player(&self, pipeline: &ObjectHandle, uri: &str) -> ObjectHandle {
            let mut p = ParamMap::new();
            p.insert(params::PIPELINE.into(), ParamValue::Ref(pipeline.clone()));
            p.insert(params::URI.into(), ParamValue::Str(uri.into()));
            self.construct("PlayerEndpoint", p)
        }

        async fn invoke(
            &self,
            handle: &ObjectHandle,
            operation: &str,
            call_params: ParamMap,
        ) -> Result<ParamValue> {
            let object = self.registry.lookup(handle).unwrap();
            let ctx = ObjectContext {
                handle,
                registry: &self.registry,
                broker: &self.broker,
            };
            object.invoke(ctx, operation, &call_params).await
        }
    }

    #[tokio::test]
    async fn player_requires_uri_and_pipeline() {
        let fixture = Fixture::new();
        let err = fixture.classes.create("PlayerEndpoint", &ParamMap::new());
        assert!(matches!(err, Err(Error::InvalidParam(_))));

        let pipeline = fixture.pipeline();
        let mut p = ParamMap::new();
        p.insert(params::PIPELINE.into(), ParamValue::Ref(pipeline));
        assert!(matches!(
            fixture.classes.create("PlayerEndpoint", &p),
            Err(Error::InvalidParam(_))
        ));
    }

    #[tokio::test]
    async fn play_emits_end_of_stream_to_subscribers() {
        let fixture = Fixture::new();
        let conn = ConnectionId(1);
        let mut rx = fixture.broker.register_connection(conn);

        let pipeline = fixture.pipeline();
        let player = fixture.player(&pipeline, "file:///in.webm");
        fixture.broker.subscribe(conn, &player, events::END_OF_STREAM);

        fixture
            .invoke(&player, ops::PLAY, ParamMap::new())
            .await
            .unwrap();

        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.target, player);
        assert_eq!(notification.event, events::END_OF_STREAM);
        assert_eq!(
            notification.payload,
            ParamValue::Str("file:///in.webm".into())
        );
    }

    #[tokio::test]
    async fn connect_rejects_released_sink() {
        let fixture = Fixture::new();
        let pipeline = fixture.pipeline();
        let player = fixture.player(&pipeline, "file:///a");

        let mut http_params = ParamMap::new();
        http_params.insert(params::PIPELINE.into(), ParamValue::Ref(pipeline.clone()));
        let http = fixture.construct("HttpEndpoint", http_params);

        let mut connect = ParamMap::new();
        connect.insert(params::SINK.into(), ParamValue::Ref(http.clone()));
        fixture
            .invoke(&player, ops::CONNECT, connect.clone())
            .await
            .unwrap();

        fixture.registry.release(&http).unwrap();
        assert!(matches!(
            fixture.invoke(&player, ops::CONNECT, connect).await,
            Err(Error::InvalidHandle(_))
        ));
    }

    #[tokio::test]
    async fn unknown_operation_is_unsupported() {
        let fixture = Fixture::new();
        let pipeline = fixture.pipeline();
        assert!(matches!(
            fixture.invoke(&pipeline, "transmogrify", ParamMap::new()).await,
            Err(Error::UnsupportedOperation(_))
        ));
    }

    #[tokio::test]
    async fn http_endpoint_url_derives_from_handle() {
        let fixture = Fixture::new();
        let pipeline = fixture.pipeline();
        let mut p = ParamMap::new();
        p.insert(params::PIPELINE.into(), ParamValue::Ref(pipeline));
        let http = fixture.construct("HttpEndpoint", p);

        let url = fixture
            .invoke(&http, ops::GET_URL, ParamMap::new())
            .await
            .unwrap();
        assert_eq!(
            url,
            ParamValue::Str(format!("http://localhost/media/{}", http))
        );
    }
}

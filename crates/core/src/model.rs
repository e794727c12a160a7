//! Class and capability model
//!
//! Every remote object class declares a fixed, enumerable capability set: the
//! operations a proxy may forward and the event types that may be observed on
//! it. The declarations live in static [`ClassDescriptor`] tables so illegal
//! calls are rejected before they reach a transport, and marker types
//! implementing [`RemoteClass`] brand typed proxies at compile time without
//! carrying any runtime state.

/// Well-known operation names shared by client and server
pub mod ops {
    /// Connect a source element to a sink element
    pub const CONNECT: &str = "connect";
    /// Start playback on a player
    pub const PLAY: &str = "play";
    /// Pause playback
    pub const PAUSE: &str = "pause";
    /// Stop playback or recording
    pub const STOP: &str = "stop";
    /// Read back the configured source/target URI
    pub const GET_URI: &str = "get_uri";
    /// Read the URL an HTTP endpoint is reachable at
    pub const GET_URL: &str = "get_url";
    /// Read a pipeline's configured name
    pub const GET_NAME: &str = "get_name";
    /// Start recording
    pub const RECORD: &str = "record";
}

/// Well-known event type names
pub mod events {
    /// Emitted when a source element reaches the end of its stream
    pub const END_OF_STREAM: &str = "EndOfStream";
}

/// Well-known constructor and operation parameter names
pub mod params {
    /// Optional display name of a pipeline
    pub const NAME: &str = "name";
    /// Source or target URI of an endpoint
    pub const URI: &str = "uri";
    /// Parent pipeline reference of an element
    pub const PIPELINE: &str = "pipeline";
    /// Sink element reference of a connect call
    pub const SINK: &str = "sink";
}

/// Declared constructor parameter of a class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    /// Parameter name
    pub name: &'static str,
    /// Whether construction fails when the parameter is absent
    pub required: bool,
}

/// Static capability declaration of a remote object class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassDescriptor {
    /// Class name as it appears in create requests
    pub class: &'static str,
    /// Operations a proxy may forward to instances of this class
    pub operations: &'static [&'static str],
    /// Event types observable on instances of this class
    pub events: &'static [&'static str],
    /// Declared constructor parameters
    pub constructor_params: &'static [ParamSpec],
}

impl ClassDescriptor {
    /// Whether `operation` is part of this class's capability set.
    pub fn has_operation(&self, operation: &str) -> bool {
        self.operations.contains(&operation)
    }

    /// Whether `event` may be observed on this class.
    pub fn has_event(&self, event: &str) -> bool {
        self.events.contains(&event)
    }
}

/// Capability set of the pipeline container class
pub const MEDIA_PIPELINE: ClassDescriptor = ClassDescriptor {
    class: "MediaPipeline",
    operations: &[ops::GET_NAME],
    events: &[],
    constructor_params: &[ParamSpec {
        name: params::NAME,
        required: false,
    }],
};

/// Capability set of the playback source element
pub const PLAYER_ENDPOINT: ClassDescriptor = ClassDescriptor {
    class: "PlayerEndpoint",
    operations: &[
        ops::CONNECT,
        ops::PLAY,
        ops::PAUSE,
        ops::STOP,
        ops::GET_URI,
    ],
    events: &[events::END_OF_STREAM],
    constructor_params: &[
        ParamSpec {
            name: params::PIPELINE,
            required: true,
        },
        ParamSpec {
            name: params::URI,
            required: true,
        },
    ],
};

/// Capability set of the HTTP sink element
pub const HTTP_ENDPOINT: ClassDescriptor = ClassDescriptor {
    class: "HttpEndpoint",
    operations: &[ops::GET_URL],
    events: &[],
    constructor_params: &[ParamSpec {
        name: params::PIPELINE,
        required: true,
    }],
};

/// Capability set of the recording sink element
pub const RECORDER_ENDPOINT: ClassDescriptor = ClassDescriptor {
    class: "RecorderEndpoint",
    operations: &[ops::RECORD, ops::STOP, ops::GET_URI],
    events: &[],
    constructor_params: &[
        ParamSpec {
            name: params::PIPELINE,
            required: true,
        },
        ParamSpec {
            name: params::URI,
            required: true,
        },
    ],
};

const DESCRIPTORS: &[&ClassDescriptor] = &[
    &MEDIA_PIPELINE,
    &PLAYER_ENDPOINT,
    &HTTP_ENDPOINT,
    &RECORDER_ENDPOINT,
];

/// Look up the descriptor of a built-in class.
///
/// Returns `None` for classes registered dynamically on a server; callers
/// treat those as unconstrained and defer capability checks to the server.
pub fn descriptor(class: &str) -> Option<&'static ClassDescriptor> {
    DESCRIPTORS.iter().copied().find(|d| d.class == class)
}

/// All built-in class descriptors.
pub fn descriptors() -> &'static [&'static ClassDescriptor] {
    DESCRIPTORS
}

/// Marker trait branding a typed proxy with its remote class.
///
/// Implementors are zero-sized tags used purely for static typing of the
/// capability set; no runtime state is attached.
pub trait RemoteClass: Send + Sync + 'static {
    /// Class name as it appears in create requests
    const NAME: &'static str;

    /// The class's static capability declaration.
    fn descriptor() -> &'static ClassDescriptor;
}

/// Marker type for the pipeline container class
#[derive(Debug, Clone, Copy)]
pub struct MediaPipeline;

impl RemoteClass for MediaPipeline {
    const NAME: &'static str = "MediaPipeline";

    fn descriptor() -> &'static ClassDescriptor {
        &MEDIA_PIPELINE
    }
}

/// Marker type for the playback source element
#[derive(Debug, Clone, Copy)]
pub struct PlayerEndpoint;

impl RemoteClass for PlayerEndpoint {
    const NAME: &'static str = "PlayerEndpoint";

    fn descriptor() -> &'static ClassDescriptor {
        &PLAYER_ENDPOINT
    }
}

/// Marker type for the HTTP sink element
#[derive(Debug, Clone, Copy)]
pub struct HttpEndpoint;

impl RemoteClass for HttpEndpoint {
    const NAME: &'static str = "HttpEndpoint";

    fn descriptor() -> &'static ClassDescriptor {
        &HTTP_ENDPOINT
    }
}

/// Marker type for the recording sink element
#[derive(Debug, Clone, Copy)]
pub struct RecorderEndpoint;

impl RemoteClass for RecorderEndpoint {
    const NAME: &'static str = "RecorderEndpoint";

    fn descriptor() -> &'static ClassDescriptor {
        &RECORDER_ENDPOINT
    }
}

//! Wire protocol types for the remote object model
//!
//! Every message that crosses a transport is a [`RomMessage`]: a request
//! carrying a correlation id and one [`RomCall`], a response matched back to
//! its request by that id, or an uncorrelated server-to-client
//! [`EventNotification`]. All parameter and result values travel as
//! [`ParamValue`], a self-describing union that round-trips primitives,
//! strings, lists, and object references through the codec.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub mod codec;

/// Named parameters of a create or invoke call
pub type ParamMap = HashMap<String, ParamValue>;

/// Correlation id matching a response to its request.
///
/// Unique per in-flight request on a connection; never reused while the
/// response is outstanding.
pub type CorrelationId = u64;

/// Opaque, server-issued identifier for a remote object instance.
///
/// Handles are unique for the lifetime of the registry and are never reused
/// after release. The embedded class suffix is a debugging aid only; no
/// component derives behavior from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectHandle(String);

impl ObjectHandle {
    /// Allocate a fresh handle for an instance of `class`.
    pub fn generate(class: &str) -> Self {
        Self(format!("{}_{}", uuid::Uuid::new_v4(), class))
    }

    /// Wrap a raw handle string received over the wire.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw handle string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Self-describing parameter/result value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// Absent value
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// UTF-8 string
    Str(String),
    /// Ordered list of values
    List(Vec<ParamValue>),
    /// Reference to a server-resident object
    Ref(ObjectHandle),
}

impl ParamValue {
    /// Short name of the value's variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ParamValue::Null => "null",
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::Str(_) => "str",
            ParamValue::List(_) => "list",
            ParamValue::Ref(_) => "ref",
        }
    }

    /// Borrow the string payload, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the referenced handle, if this is a `Ref`.
    pub fn as_handle(&self) -> Option<&ObjectHandle> {
        match self {
            ParamValue::Ref(h) => Some(h),
            _ => None,
        }
    }

    /// Integer payload, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Boolean payload, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl Default for ParamValue {
    fn default() -> Self {
        ParamValue::Null
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl From<Vec<ParamValue>> for ParamValue {
    fn from(v: Vec<ParamValue>) -> Self {
        ParamValue::List(v)
    }
}

impl From<ObjectHandle> for ParamValue {
    fn from(v: ObjectHandle) -> Self {
        ParamValue::Ref(v)
    }
}

/// The operation union carried by a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RomCall {
    /// Construct a new object of `class` from named parameters
    Create {
        /// Declared class of the object to construct
        class: String,
        /// Constructor parameters
        #[serde(default)]
        params: ParamMap,
    },
    /// Invoke a named operation on an existing object
    Invoke {
        /// Handle of the target object
        target: ObjectHandle,
        /// Operation name from the target's capability set
        operation: String,
        /// Operation parameters
        #[serde(default)]
        params: ParamMap,
    },
    /// Retire a handle; subsequent operations on it fail with InvalidHandle
    Release {
        /// Handle to retire
        target: ObjectHandle,
    },
    /// Register interest in a named event type on an object
    Subscribe {
        /// Handle of the observed object
        target: ObjectHandle,
        /// Event type name
        event: String,
    },
    /// Remove a previously registered subscription
    Unsubscribe {
        /// Handle of the observed object
        target: ObjectHandle,
        /// Subscription id returned by the subscribe call
        subscription: String,
    },
    /// Connectivity check answered by every server
    Ping,
}

/// A client-to-server request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Correlation id, echoed by the matching response
    pub id: CorrelationId,
    /// The requested operation
    #[serde(flatten)]
    pub call: RomCall,
}

impl Request {
    /// Build a request around a call.
    pub fn new(id: CorrelationId, call: RomCall) -> Self {
        Self { id, call }
    }
}

/// Result-or-error payload of a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CallOutcome {
    /// The operation succeeded with this value
    #[serde(rename = "result")]
    Ok(ParamValue),
    /// The operation failed with this descriptor
    #[serde(rename = "error")]
    Err(RemoteError),
}

impl CallOutcome {
    /// Convert into a standard `Result`.
    pub fn into_result(self) -> std::result::Result<ParamValue, RemoteError> {
        match self {
            CallOutcome::Ok(value) => Ok(value),
            CallOutcome::Err(err) => Err(err),
        }
    }
}

/// A server-to-client response; exactly one per request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Correlation id of the request being answered
    pub id: CorrelationId,
    /// Result value or error descriptor
    #[serde(flatten)]
    pub outcome: CallOutcome,
}

impl Response {
    /// Successful response carrying `value`.
    pub fn ok(id: CorrelationId, value: ParamValue) -> Self {
        Self {
            id,
            outcome: CallOutcome::Ok(value),
        }
    }

    /// Failed response carrying `error`.
    pub fn error(id: CorrelationId, error: RemoteError) -> Self {
        Self {
            id,
            outcome: CallOutcome::Err(error),
        }
    }
}

/// Asynchronous server-to-client event message, not correlated to a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventNotification {
    /// Handle of the object that produced the event
    pub target: ObjectHandle,
    /// Event type name
    pub event: String,
    /// Event payload
    #[serde(default)]
    pub payload: ParamValue,
}

/// Wire-level error descriptor carried by failed responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteError {
    /// Machine-readable error class
    pub code: ErrorCode,
    /// Human-readable description
    pub message: String,
}

impl RemoteError {
    /// Build a descriptor from a code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

/// Error classes a server may report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Operation on an unknown or released handle
    InvalidHandle,
    /// Object construction failed
    ConstructionFailed,
    /// Operation name not in the target's capability set
    MethodNotFound,
    /// Missing or malformed parameter
    InvalidParam,
    /// The object reported an operation failure
    OperationFailed,
    /// Unclassified server-side failure
    Internal,
}

/// Tagged union of everything that crosses a transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RomMessage {
    /// Client-to-server request
    Request(Request),
    /// Server-to-client response
    Response(Response),
    /// Server-to-client event notification
    Notification(EventNotification),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_embeds_class_suffix() {
        let handle = ObjectHandle::generate("MediaPipeline");
        assert!(handle.as_str().ends_with("_MediaPipeline"));
    }

    #[test]
    fn generated_handles_are_unique() {
        let a = ObjectHandle::generate("X");
        let b = ObjectHandle::generate("X");
        assert_ne!(a, b);
    }

    #[test]
    fn request_wire_shape_is_tagged() {
        let request = Request::new(
            3,
            RomCall::Invoke {
                target: ObjectHandle::from_raw("h1"),
                operation: "play".into(),
                params: ParamMap::new(),
            },
        );
        let json = serde_json::to_value(RomMessage::Request(request)).unwrap();
        assert_eq!(json["kind"], "request");
        assert_eq!(json["op"], "invoke");
        assert_eq!(json["id"], 3);
        assert_eq!(json["target"], "h1");
    }

    #[test]
    fn outcome_into_result() {
        let ok = CallOutcome::Ok(ParamValue::Int(1));
        assert_eq!(ok.into_result().unwrap(), ParamValue::Int(1));

        let err = CallOutcome::Err(RemoteError::new(ErrorCode::InvalidHandle, "gone"));
        assert_eq!(
            err.into_result().unwrap_err().code,
            ErrorCode::InvalidHandle
        );
    }

    #[test]
    fn create_params_default_to_empty() {
        let json = r#"{"kind":"request","id":1,"op":"create","class":"MediaPipeline"}"#;
        let message: RomMessage = serde_json::from_str(json).unwrap();
        match message {
            RomMessage::Request(Request {
                call: RomCall::Create { class, params },
                ..
            }) => {
                assert_eq!(class, "MediaPipeline");
                assert!(params.is_empty());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }
}

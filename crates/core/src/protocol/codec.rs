//! Message codec
//!
//! Serializes protocol messages to JSON bytes and back. The format is
//! symmetric: whatever `encode` produces, `decode` accepts, on both sides of
//! any transport. Malformed input is reported to the caller as
//! [`Error::Protocol`](crate::Error::Protocol) and never panics.

use crate::protocol::RomMessage;
use crate::{Error, Result};

/// Serialize a message to its wire representation.
pub fn encode(message: &RomMessage) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(message)?)
}

/// Deserialize a wire payload into a message.
///
/// Fails with `Error::Protocol` on malformed input; the error stays local to
/// the receiving side and is never forwarded across the transport.
pub fn decode(bytes: &[u8]) -> Result<RomMessage> {
    serde_json::from_slice(bytes).map_err(|e| Error::Protocol(format!("undecodable message: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{
        CallOutcome, ErrorCode, EventNotification, ObjectHandle, ParamMap, ParamValue,
        RemoteError, Request, Response, RomCall,
    };

    fn round_trip(message: RomMessage) -> RomMessage {
        decode(&encode(&message).unwrap()).unwrap()
    }

    #[test]
    fn request_round_trips_all_param_kinds() {
        let mut params = ParamMap::new();
        params.insert("null".into(), ParamValue::Null);
        params.insert("flag".into(), ParamValue::Bool(true));
        params.insert("count".into(), ParamValue::Int(-7));
        params.insert("rate".into(), ParamValue::Float(0.5));
        params.insert("uri".into(), ParamValue::Str("file:///in.webm".into()));
        params.insert(
            "tags".into(),
            ParamValue::List(vec![ParamValue::Int(1), ParamValue::Str("a".into())]),
        );
        params.insert(
            "sink".into(),
            ParamValue::Ref(ObjectHandle::from_raw("h2_HttpEndpoint")),
        );

        let message = RomMessage::Request(Request::new(
            42,
            RomCall::Create {
                class: "PlayerEndpoint".into(),
                params,
            },
        ));
        assert_eq!(round_trip(message.clone()), message);
    }

    #[test]
    fn invoke_and_release_round_trip() {
        let target = ObjectHandle::generate("PlayerEndpoint");
        let invoke = RomMessage::Request(Request::new(
            1,
            RomCall::Invoke {
                target: target.clone(),
                operation: "connect".into(),
                params: ParamMap::new(),
            },
        ));
        assert_eq!(round_trip(invoke.clone()), invoke);

        let release = RomMessage::Request(Request::new(2, RomCall::Release { target }));
        assert_eq!(round_trip(release.clone()), release);
    }

    #[test]
    fn subscribe_ping_round_trip() {
        let target = ObjectHandle::generate("PlayerEndpoint");
        let subscribe = RomMessage::Request(Request::new(
            5,
            RomCall::Subscribe {
                target: target.clone(),
                event: "EndOfStream".into(),
            },
        ));
        assert_eq!(round_trip(subscribe.clone()), subscribe);

        let unsubscribe = RomMessage::Request(Request::new(
            6,
            RomCall::Unsubscribe {
                target,
                subscription: "sub-1".into(),
            },
        ));
        assert_eq!(round_trip(unsubscribe.clone()), unsubscribe);

        let ping = RomMessage::Request(Request::new(7, RomCall::Ping));
        assert_eq!(round_trip(ping.clone()), ping);
    }

    #[test]
    fn response_round_trips_both_outcomes() {
        let ok = RomMessage::Response(Response::ok(
            9,
            ParamValue::Ref(ObjectHandle::from_raw("h9_MediaPipeline")),
        ));
        assert_eq!(round_trip(ok.clone()), ok);

        let err = RomMessage::Response(Response::error(
            10,
            RemoteError::new(ErrorCode::InvalidHandle, "unknown handle"),
        ));
        match round_trip(err) {
            RomMessage::Response(Response {
                id: 10,
                outcome: CallOutcome::Err(remote),
            }) => assert_eq!(remote.code, ErrorCode::InvalidHandle),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn notification_round_trips() {
        let message = RomMessage::Notification(EventNotification {
            target: ObjectHandle::generate("PlayerEndpoint"),
            event: "EndOfStream".into(),
            payload: ParamValue::Str("file:///in.webm".into()),
        });
        assert_eq!(round_trip(message.clone()), message);
    }

    #[test]
    fn malformed_input_is_a_protocol_error() {
        let err = decode(b"{not json").unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));

        let err = decode(b"").unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));

        // well-formed JSON that is not a protocol message
        let err = decode(br#"{"kind":"dance"}"#).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn truncated_input_is_a_protocol_error() {
        let message = RomMessage::Request(Request::new(1, RomCall::Ping));
        let bytes = encode(&message).unwrap();
        let err = decode(&bytes[..bytes.len() - 2]).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}

//! Message kinds and the typed message enum.
//!
//! The `type` field discriminates the kind, but two kinds are overloaded by
//! direction: `property_update` is an outbound single-property write when it
//! carries `object`/`property`, and an inbound per-object batch when it
//! carries `data`; `init` is the outbound request when bare and the inbound
//! object-map response when it carries `data`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::descriptor::ObjectDescriptor;
use crate::error::{Result, WireError};

/// Host-emitted signal notification.
pub const SIGNAL: u8 = 1;
/// Property write (client → host) or update batch (host → client).
pub const PROPERTY_UPDATE: u8 = 2;
/// Initialization request (client → host) or response (host → client).
pub const INIT: u8 = 3;
/// Method invocation response carrying the return value.
pub const RESPONSE: u8 = 4;
/// Method invocation request.
pub const INVOKE_METHOD: u8 = 5;

/// Returns a human-readable name for a message kind.
pub fn kind_name(kind: u8) -> &'static str {
    match kind {
        SIGNAL => "signal",
        PROPERTY_UPDATE => "property_update",
        INIT => "init",
        RESPONSE => "response",
        INVOKE_METHOD => "invoke_method",
        _ => "unknown",
    }
}

/// One protocol message, as seen by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// `{type: 3}`: ask the host for its object map.
    InitRequest,
    /// `{type: 3, data: {name: descriptor}}`: the host's object map.
    InitResponse {
        objects: HashMap<String, ObjectDescriptor>,
    },
    /// `{type: 5, id, object, method, args}`: invoke a host method.
    InvokeMethod {
        id: u64,
        object: String,
        method: i32,
        args: Vec<Value>,
    },
    /// `{type: 4, id, data}`: return value for a correlated invocation.
    Response {
        id: u64,
        data: Value,
    },
    /// `{type: 2, object, property, value}`: request a host-side write.
    PropertyWrite {
        object: String,
        property: String,
        value: Value,
    },
    /// `{type: 2, data: {name: {property: value}}}`: confirmed host state.
    PropertyUpdateBatch {
        updates: HashMap<String, HashMap<String, Value>>,
    },
    /// `{type: 1, object, signal, args}`: a host signal fired.
    SignalEmission {
        object: String,
        signal: i32,
        args: Vec<Value>,
    },
}

/// On-the-wire shape: one flat object with optional fields per kind.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    object: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    signal: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    property: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl Message {
    /// The wire discriminant for this message.
    pub fn kind(&self) -> u8 {
        match self {
            Message::SignalEmission { .. } => SIGNAL,
            Message::PropertyWrite { .. } | Message::PropertyUpdateBatch { .. } => PROPERTY_UPDATE,
            Message::InitRequest | Message::InitResponse { .. } => INIT,
            Message::Response { .. } => RESPONSE,
            Message::InvokeMethod { .. } => INVOKE_METHOD,
        }
    }

    /// Encode into the JSON text sent over the transport.
    pub fn encode(&self) -> Result<String> {
        let raw = match self {
            Message::InitRequest => RawMessage {
                kind: INIT,
                ..RawMessage::default()
            },
            Message::InitResponse { objects } => RawMessage {
                kind: INIT,
                data: Some(serde_json::to_value(objects)?),
                ..RawMessage::default()
            },
            Message::InvokeMethod {
                id,
                object,
                method,
                args,
            } => RawMessage {
                kind: INVOKE_METHOD,
                id: Some(*id),
                object: Some(object.clone()),
                method: Some(*method),
                args: Some(args.clone()),
                ..RawMessage::default()
            },
            Message::Response { id, data } => RawMessage {
                kind: RESPONSE,
                id: Some(*id),
                data: Some(data.clone()),
                ..RawMessage::default()
            },
            Message::PropertyWrite {
                object,
                property,
                value,
            } => RawMessage {
                kind: PROPERTY_UPDATE,
                object: Some(object.clone()),
                property: Some(property.clone()),
                value: Some(value.clone()),
                ..RawMessage::default()
            },
            Message::PropertyUpdateBatch { updates } => RawMessage {
                kind: PROPERTY_UPDATE,
                data: Some(serde_json::to_value(updates)?),
                ..RawMessage::default()
            },
            Message::SignalEmission {
                object,
                signal,
                args,
            } => RawMessage {
                kind: SIGNAL,
                object: Some(object.clone()),
                signal: Some(*signal),
                args: Some(args.clone()),
                ..RawMessage::default()
            },
        };
        Ok(serde_json::to_string(&raw)?)
    }

    /// Decode one JSON text payload into a typed message.
    pub fn decode(text: &str) -> Result<Message> {
        let raw: RawMessage = serde_json::from_str(text)?;
        match raw.kind {
            SIGNAL => Ok(Message::SignalEmission {
                object: require(raw.object, SIGNAL, "object")?,
                signal: require(raw.signal, SIGNAL, "signal")?,
                args: raw.args.unwrap_or_default(),
            }),
            PROPERTY_UPDATE => match raw.data {
                Some(data) => Ok(Message::PropertyUpdateBatch {
                    updates: serde_json::from_value(data)?,
                }),
                None => Ok(Message::PropertyWrite {
                    object: require(raw.object, PROPERTY_UPDATE, "object")?,
                    property: require(raw.property, PROPERTY_UPDATE, "property")?,
                    value: raw.value.unwrap_or(Value::Null),
                }),
            },
            INIT => match raw.data {
                Some(data) => Ok(Message::InitResponse {
                    objects: serde_json::from_value(data)?,
                }),
                None => Ok(Message::InitRequest),
            },
            RESPONSE => Ok(Message::Response {
                id: require(raw.id, RESPONSE, "id")?,
                data: raw.data.unwrap_or(Value::Null),
            }),
            INVOKE_METHOD => Ok(Message::InvokeMethod {
                id: require(raw.id, INVOKE_METHOD, "id")?,
                object: require(raw.object, INVOKE_METHOD, "object")?,
                method: require(raw.method, INVOKE_METHOD, "method")?,
                args: raw.args.unwrap_or_default(),
            }),
            other => Err(WireError::UnknownKind(other)),
        }
    }
}

fn require<T>(field: Option<T>, kind: u8, name: &'static str) -> Result<T> {
    field.ok_or(WireError::MissingField { kind, field: name })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn init_request_is_bare() {
        let text = Message::InitRequest.encode().unwrap();
        assert_eq!(text, r#"{"type":3}"#);
        assert_eq!(Message::decode(&text).unwrap(), Message::InitRequest);
    }

    #[test]
    fn init_with_data_is_a_response() {
        let text = r#"{"type":3,"data":{"calc":{"methods":[["add",0]],"properties":[["total",0]],"signals":[["totalChanged",1]]}}}"#;
        let message = Message::decode(text).unwrap();
        let Message::InitResponse { objects } = message else {
            panic!("expected init response");
        };
        let calc = &objects["calc"];
        assert_eq!(calc.method_index("add"), Some(0));
        assert_eq!(calc.signal_index("totalChanged"), Some(1));
        assert_eq!(calc.initial_property("total"), Some(&json!(0)));
    }

    #[test]
    fn invoke_method_round_trip() {
        let message = Message::InvokeMethod {
            id: 1,
            object: "calc".to_string(),
            method: 0,
            args: vec![json!(2), json!(3)],
        };
        let text = message.encode().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({"type": 5, "id": 1, "object": "calc", "method": 0, "args": [2, 3]})
        );
        assert_eq!(Message::decode(&text).unwrap(), message);
    }

    #[test]
    fn property_update_discriminated_by_direction() {
        let write = Message::decode(
            r#"{"type":2,"object":"calc","property":"total","value":5}"#,
        )
        .unwrap();
        assert!(matches!(write, Message::PropertyWrite { .. }));

        let batch = Message::decode(r#"{"type":2,"data":{"calc":{"total":5}}}"#).unwrap();
        let Message::PropertyUpdateBatch { updates } = batch else {
            panic!("expected update batch");
        };
        assert_eq!(updates["calc"]["total"], json!(5));
    }

    #[test]
    fn signal_args_default_to_empty() {
        let message = Message::decode(r#"{"type":1,"object":"calc","signal":1}"#).unwrap();
        assert_eq!(
            message,
            Message::SignalEmission {
                object: "calc".to_string(),
                signal: 1,
                args: vec![],
            }
        );
    }

    #[test]
    fn unknown_kind_is_typed() {
        let err = Message::decode(r#"{"type":42}"#).unwrap_err();
        assert!(matches!(err, WireError::UnknownKind(42)));
    }

    #[test]
    fn missing_field_is_typed() {
        let err = Message::decode(r#"{"type":4,"data":7}"#).unwrap_err();
        assert!(matches!(
            err,
            WireError::MissingField { kind: RESPONSE, field: "id" }
        ));
        assert_eq!(err.to_string(), "message kind 4 missing required field 'id'");
    }

    #[test]
    fn response_data_defaults_to_null() {
        let message = Message::decode(r#"{"type":4,"id":9}"#).unwrap();
        assert_eq!(
            message,
            Message::Response {
                id: 9,
                data: Value::Null,
            }
        );
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        assert!(matches!(
            Message::decode("{not-json").unwrap_err(),
            WireError::Json(_)
        ));
    }
}

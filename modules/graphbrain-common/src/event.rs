//! Queued business events as they arrive from the ingest queue.
//!
//! The payload is opaque nested JSON; only the envelope fields are typed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventValidationError {
    #[error("event must be a JSON object")]
    NotAnObject,

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
}

/// A business event pulled off the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedEvent {
    pub event_id: String,
    pub event_type: String,
    pub user_id: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub payload: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl QueuedEvent {
    /// Validate presence and type of every envelope field on a loosely typed value.
    pub fn from_value(value: &Value) -> Result<Self, EventValidationError> {
        let obj = value.as_object().ok_or(EventValidationError::NotAnObject)?;

        let event = Self {
            event_id: required_string(obj, "eventId")?,
            event_type: required_string(obj, "eventType")?,
            user_id: required_string(obj, "userId")?,
            timestamp: match obj.get("timestamp") {
                None | Some(Value::Null) => return Err(EventValidationError::MissingField("timestamp")),
                Some(v) => v
                    .as_i64()
                    .or_else(|| v.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
                    .ok_or(EventValidationError::InvalidField {
                        field: "timestamp",
                        expected: "a number",
                    })?,
            },
            payload: match obj.get("payload") {
                None | Some(Value::Null) => return Err(EventValidationError::MissingField("payload")),
                Some(Value::Object(map)) => map.clone(),
                Some(_) => {
                    return Err(EventValidationError::InvalidField {
                        field: "payload",
                        expected: "an object",
                    })
                }
            },
            retry_count: match obj.get("retryCount") {
                None | Some(Value::Null) => None,
                Some(v) => Some(
                    v.as_u64()
                        .and_then(|n| u32::try_from(n).ok())
                        .ok_or(EventValidationError::InvalidField {
                            field: "retryCount",
                            expected: "a non-negative integer",
                        })?,
                ),
            },
            message_id: match obj.get("messageId") {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(_) => {
                    return Err(EventValidationError::InvalidField {
                        field: "messageId",
                        expected: "a string",
                    })
                }
            },
        };

        event.validate()?;
        Ok(event)
    }

    /// Envelope identifiers must be non-empty.
    pub fn validate(&self) -> Result<(), EventValidationError> {
        if self.event_id.is_empty() {
            return Err(EventValidationError::MissingField("eventId"));
        }
        if self.event_type.is_empty() {
            return Err(EventValidationError::MissingField("eventType"));
        }
        if self.user_id.is_empty() {
            return Err(EventValidationError::MissingField("userId"));
        }
        Ok(())
    }

    /// The value mapping specs are evaluated against.
    ///
    /// The payload is reachable both nested (`payload.title`) and spread at the
    /// top level (`title`). Envelope fields win over colliding payload keys.
    pub fn mappable_view(&self) -> Value {
        let mut view = self.payload.clone();
        view.insert("eventId".into(), Value::String(self.event_id.clone()));
        view.insert("eventType".into(), Value::String(self.event_type.clone()));
        view.insert("userId".into(), Value::String(self.user_id.clone()));
        view.insert("timestamp".into(), Value::from(self.timestamp));
        view.insert("payload".into(), Value::Object(self.payload.clone()));
        if let Some(retry_count) = self.retry_count {
            view.insert("retryCount".into(), Value::from(retry_count));
        }
        if let Some(message_id) = &self.message_id {
            view.insert("messageId".into(), Value::String(message_id.clone()));
        }
        Value::Object(view)
    }
}

fn required_string(obj: &Map<String, Value>, field: &'static str) -> Result<String, EventValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(EventValidationError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(EventValidationError::InvalidField {
            field,
            expected: "a string",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw() -> Value {
        json!({
            "eventId": "e1",
            "eventType": "calendar.event_created",
            "userId": "u1",
            "timestamp": 1700000000000i64,
            "payload": { "eventId": "cal1", "title": "Sync" }
        })
    }

    #[test]
    fn valid_event_parses() {
        let event = QueuedEvent::from_value(&raw()).unwrap();
        assert_eq!(event.event_id, "e1");
        assert_eq!(event.timestamp, 1_700_000_000_000);
        assert_eq!(event.retry_count, None);
    }

    #[test]
    fn missing_user_id_is_rejected() {
        let mut value = raw();
        value.as_object_mut().unwrap().remove("userId");
        assert_eq!(
            QueuedEvent::from_value(&value),
            Err(EventValidationError::MissingField("userId"))
        );
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let mut value = raw();
        value["payload"] = json!([1, 2, 3]);
        assert!(matches!(
            QueuedEvent::from_value(&value),
            Err(EventValidationError::InvalidField { field: "payload", .. })
        ));
    }

    #[test]
    fn string_timestamp_is_rejected() {
        let mut value = raw();
        value["timestamp"] = json!("yesterday");
        assert!(QueuedEvent::from_value(&value).is_err());
    }

    #[test]
    fn empty_event_type_is_rejected() {
        let mut value = raw();
        value["eventType"] = json!("");
        assert_eq!(
            QueuedEvent::from_value(&value),
            Err(EventValidationError::MissingField("eventType"))
        );
    }

    #[test]
    fn envelope_fields_win_over_payload_keys() {
        let event = QueuedEvent::from_value(&raw()).unwrap();
        let view = event.mappable_view();
        assert_eq!(view["eventId"], json!("e1"));
        assert_eq!(view["payload"]["eventId"], json!("cal1"));
        assert_eq!(view["title"], json!("Sync"));
    }

    #[test]
    fn validation_error_converts_into_brain_error() {
        let err: crate::BrainError = EventValidationError::MissingField("payload").into();
        assert!(matches!(err, crate::BrainError::Validation(_)));
        assert_eq!(err.to_string(), "Invalid event: missing required field 'payload'");
    }
}

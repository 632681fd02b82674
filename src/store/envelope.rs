use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DomainError, Result};

const HTTP_CONFLICT: u16 = 409;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Success,
    Error,
}

/// Envelope wrapping every server reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub status: ReplyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Reply {
    pub fn success(data: Value) -> Self {
        Self {
            status: ReplyStatus::Success,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Error,
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Turn a raw reply body into the `data` payload or a classified error.
///
/// `http_status` is the transport status code when there is one; 409 marks a version
/// conflict even when the message does not say so.
pub fn unwrap_reply(http_status: Option<u16>, body: Value) -> Result<Value> {
    let reply: Reply = serde_json::from_value(body)
        .map_err(|e| DomainError::Transport(format!("malformed reply from server: {}", e)))?;

    match reply.status {
        ReplyStatus::Success => Ok(reply.data.unwrap_or(Value::Null)),
        ReplyStatus::Error => {
            let message = reply.message.unwrap_or_else(|| "unknown server error".to_string());
            warn!("server rejected request: {}", message);
            if http_status == Some(HTTP_CONFLICT) {
                Err(DomainError::ConcurrencyConflict(message))
            } else {
                Err(DomainError::from_server_message(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_yields_data() {
        let data = unwrap_reply(Some(200), json!({"status": "success", "data": {"id": "a"}})).unwrap();
        assert_eq!(data, json!({"id": "a"}));
    }

    #[test]
    fn test_success_without_data_is_null() {
        assert_eq!(unwrap_reply(None, json!({"status": "success"})).unwrap(), Value::Null);
    }

    #[test]
    fn test_error_message_is_surfaced_raw() {
        let err = unwrap_reply(Some(400), json!({"status": "error", "message": "invalid page requested"})).unwrap_err();
        assert_eq!(err, DomainError::Transport("invalid page requested".to_string()));
    }

    #[test]
    fn test_version_mismatch_is_a_conflict() {
        let body = Reply::error("expected version doesn't match current version").to_value();
        assert!(unwrap_reply(Some(400), body).unwrap_err().is_conflict());
    }

    #[test]
    fn test_http_409_is_a_conflict() {
        let body = Reply::error("stale").to_value();
        assert_eq!(
            unwrap_reply(Some(409), body).unwrap_err(),
            DomainError::ConcurrencyConflict("stale".to_string())
        );
    }

    #[test]
    fn test_malformed_reply() {
        let err = unwrap_reply(Some(200), json!({"ok": true})).unwrap_err();
        assert!(err.message().starts_with("malformed reply from server"));
    }
}

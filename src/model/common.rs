use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{DomainError, Result};

pub type Id = String;

pub fn generate_id() -> Id {
    Uuid::new_v4().simple().to_string()
}

/// Characters escaped inside a single path segment, `/` included.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Join a route and its segments into an absolute REST path.
///
/// The first part is a literal route and may contain slashes (`"studies/cetypes"`).
/// Every later part is one percent-encoded segment, so ids cannot add segments,
/// a query or a fragment. Empty parts are skipped.
pub fn uri(parts: &[&str]) -> String {
    let mut result = String::new();
    for (index, part) in parts.iter().enumerate() {
        let part = if index == 0 { part.trim_matches('/') } else { part };
        if part.is_empty() {
            continue;
        }
        result.push('/');
        if index == 0 {
            result.push_str(part);
        } else {
            result.extend(utf8_percent_encode(part, PATH_SEGMENT));
        }
    }
    if result.is_empty() {
        result.push('/');
    }
    result
}

/// Serialize a nested record into the JSON shape used in a command body.
pub fn to_command<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| DomainError::InvalidArgument(format!("cannot build command: {}", e)))
}

/// Merge the keys of `extra` into `cmd`. Both must be JSON objects.
pub fn merge_fields(mut cmd: Value, extra: Value) -> Value {
    if let (Some(target), Value::Object(source)) = (cmd.as_object_mut(), extra) {
        for (key, value) in source {
            target.insert(key, value);
        }
    }
    cmd
}

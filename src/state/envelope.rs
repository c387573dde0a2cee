// src/state/envelope.rs
// Versioned wrapper for persisted values, with migration from the legacy
// unversioned format

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current on-disk format version
pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub version: u32,
    pub data: T,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported state version {0}")]
    UnsupportedVersion(u64),
}

/// Wrap a value in the current envelope and serialize it
pub fn encode<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Envelope {
        version: STATE_VERSION,
        data: value,
    })
}

/// Parse a stored payload, upgrading older formats first
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, DecodeError> {
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        // The legacy theme key held a bare word (dark/light), not JSON
        Err(_) if is_bare_word(raw) => Value::String(raw.trim().to_string()),
        Err(e) => return Err(e.into()),
    };

    let data = migrate(value)?;
    Ok(serde_json::from_value(data)?)
}

/// Bring a parsed payload up to the current version and return its data
pub fn migrate(value: Value) -> Result<Value, DecodeError> {
    match envelope_version(&value) {
        // Version 0: the raw payload itself, as written before envelopes existed
        None => Ok(value),
        Some(v) if v == u64::from(STATE_VERSION) => match value {
            Value::Object(mut map) => Ok(map.remove("data").unwrap_or(Value::Null)),
            _ => Ok(Value::Null),
        },
        Some(v) => Err(DecodeError::UnsupportedVersion(v)),
    }
}

fn envelope_version(value: &Value) -> Option<u64> {
    let map = value.as_object()?;
    if map.len() != 2 || !map.contains_key("data") {
        return None;
    }
    map.get("version")?.as_u64()
}

fn is_bare_word(raw: &str) -> bool {
    let trimmed = raw.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_alphabetic())
}

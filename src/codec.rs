//! Storage representation and change fingerprints
//!
//! Records are stored as a JSON object holding `id` and `createdAt` next to the
//! payload keys. Fingerprints hash a canonical rendering of that object where every
//! map is key-sorted, so two logically equal sessions always hash the same.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::SessionError;
use crate::session::SessionData;

/// Serialize a session for the store
pub fn encode(session: &SessionData) -> Result<Vec<u8>, SessionError> {
    Ok(serde_json::to_vec(session)?)
}

/// Deserialize a stored record.
///
/// Fails with [`SessionError::Malformed`] when the bytes are not a JSON object
/// carrying a non-empty `id` and a `createdAt` timestamp.
pub fn decode(bytes: &[u8]) -> Result<SessionData, SessionError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| SessionError::Malformed(e.to_string()))?;

    let obj = value
        .as_object()
        .ok_or_else(|| SessionError::Malformed("record is not an object".to_string()))?;

    match obj.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => {}
        _ => return Err(SessionError::Malformed("missing id".to_string())),
    }
    if !obj.contains_key("createdAt") {
        return Err(SessionError::Malformed("missing createdAt".to_string()));
    }

    serde_json::from_value(value).map_err(|e| SessionError::Malformed(e.to_string()))
}

/// Digest of the full session, including `id` and `createdAt`
pub fn fingerprint(session: &SessionData) -> Result<String, SessionError> {
    let value = canonicalize(serde_json::to_value(session)?);
    let bytes = serde_json::to_vec(&value)?;
    Ok(STANDARD_NO_PAD.encode(Sha256::digest(&bytes)))
}

// serde_json keeps insertion order when `preserve_order` is enabled anywhere in
// the dependency graph, so sort explicitly.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k, canonicalize(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

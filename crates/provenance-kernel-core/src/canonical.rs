//! Canonical JSON encoding for deterministic hashing.
//!
//! Every digest in the kernel (credential signing digest, manifest master
//! hash) is computed over this encoding:
//! - Object keys sorted by byte comparison of their UTF-8 form
//! - No insignificant whitespace
//! - Strings escaped exactly as `serde_json` escapes them
//! - Integers only; floats are rejected
//!
//! The encoder walks a `serde_json::Value` itself instead of trusting the
//! map ordering of `serde_json`, which changes when the `preserve_order`
//! feature is enabled anywhere in the dependency graph.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::crypto::Sha256Hash;
use crate::error::CoreError;

/// Encode a JSON value to canonical bytes.
pub fn canonical_json(value: &Value) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value)?;
    Ok(buf)
}

/// Serialize any value and encode it canonically.
pub fn canonical_json_of<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CoreError> {
    let value = serde_json::to_value(value)?;
    canonical_json(&value)
}

/// SHA-256 over the canonical encoding of a value.
pub fn canonical_digest(value: &Value) -> Result<Sha256Hash, CoreError> {
    Ok(Sha256Hash::hash(&canonical_json(value)?))
}

fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<(), CoreError> {
    match value {
        Value::Null => buf.extend_from_slice(b"null"),
        Value::Bool(true) => buf.extend_from_slice(b"true"),
        Value::Bool(false) => buf.extend_from_slice(b"false"),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                buf.extend_from_slice(i.to_string().as_bytes());
            } else if let Some(u) = n.as_u64() {
                buf.extend_from_slice(u.to_string().as_bytes());
            } else {
                return Err(CoreError::EncodingError(format!(
                    "floats not supported in canonical encoding: {n}"
                )));
            }
        }
        Value::String(s) => encode_string(buf, s)?,
        Value::Array(items) => {
            buf.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                encode_value_to(buf, item)?;
            }
            buf.push(b']');
        }
        Value::Object(map) => encode_object(buf, map)?,
    }
    Ok(())
}

fn encode_string(buf: &mut Vec<u8>, s: &str) -> Result<(), CoreError> {
    serde_json::to_writer(&mut *buf, s)?;
    Ok(())
}

/// Keys are sorted by their raw byte comparison.
fn encode_object(buf: &mut Vec<u8>, map: &Map<String, Value>) -> Result<(), CoreError> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    buf.push(b'{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        encode_string(buf, key)?;
        buf.push(b':');
        encode_value_to(buf, value)?;
    }
    buf.push(b'}');
    Ok(())
}

// Node ID codec (SPEC_FULL.md §3.1/GLOSSARY "Node ID"): an opaque,
// base64url-encoded token carrying the GraphQL type name plus the row's
// primary-key tuple. Clients must treat it as opaque; we still give it a
// stable internal shape so it round-trips through `Node.id` resolution.

use crate::error::{CoreError, Result};
use crate::model::ColumnKind;
use crate::value::Value;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct NodeIdPayload {
    #[serde(rename = "t")]
    type_name: String,
    #[serde(rename = "k")]
    key: Vec<serde_json::Value>,
}

pub fn encode(type_name: &str, key: &[Value]) -> String {
    let payload = NodeIdPayload {
        type_name: type_name.to_string(),
        key: key.iter().map(Value::to_wire_json).collect(),
    };
    let json = serde_json::to_vec(&payload).expect("NodeIdPayload is always serializable");
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode the opaque ID's type name and raw JSON key components, without
/// interpreting them against any particular table yet — the caller looks up
/// the table's primary-key column kinds first and then calls
/// [`decode_typed`].
pub fn decode_untyped(id: &str) -> Result<(String, Vec<serde_json::Value>)> {
    let bytes = URL_SAFE_NO_PAD
        .decode(id)
        .map_err(|e| CoreError::BadInput(format!("malformed node id: {e}")))?;
    let payload: NodeIdPayload =
        serde_json::from_slice(&bytes).map_err(|e| CoreError::BadInput(format!("malformed node id: {e}")))?;
    Ok((payload.type_name, payload.key))
}

/// Decode and coerce the key components against the primary key's column
/// kinds, matching spec.md's "ID fails to decode" → BadInput edge case.
pub fn decode_typed(id: &str, expected_type_name: &str, pk_kinds: &[ColumnKind]) -> Result<Vec<Value>> {
    let (type_name, raw_key) = decode_untyped(id)?;
    if type_name != expected_type_name {
        return Err(CoreError::BadInput(format!(
            "node id type mismatch: expected {expected_type_name}, got {type_name}"
        )));
    }
    if raw_key.len() != pk_kinds.len() {
        return Err(CoreError::BadInput(format!(
            "node id key arity mismatch: expected {}, got {}",
            pk_kinds.len(),
            raw_key.len()
        )));
    }
    raw_key
        .iter()
        .zip(pk_kinds.iter())
        .map(|(v, kind)| {
            Value::from_wire_json(v, kind).ok_or_else(|| CoreError::BadInput("node id key component has wrong shape for column type".to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_single_int_key() {
        let id = encode("Author", &[Value::Int(42)]);
        let key = decode_typed(&id, "Author", &[ColumnKind::Int]).unwrap();
        assert_eq!(key, vec![Value::Int(42)]);
    }

    #[test]
    fn round_trips_a_composite_key() {
        let id = encode("Enrollment", &[Value::Int(1), Value::Int(2)]);
        let key = decode_typed(&id, "Enrollment", &[ColumnKind::Int, ColumnKind::Int]).unwrap();
        assert_eq!(key, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn rejects_type_name_mismatch() {
        let id = encode("Author", &[Value::Int(42)]);
        assert!(decode_typed(&id, "Book", &[ColumnKind::Int]).is_err());
    }

    #[test]
    fn rejects_malformed_base64() {
        assert!(decode_untyped("not valid base64url!!").is_err());
    }

    #[test]
    fn rejects_key_arity_mismatch() {
        let id = encode("Author", &[Value::Int(42)]);
        assert!(decode_typed(&id, "Author", &[ColumnKind::Int, ColumnKind::Int]).is_err());
    }
}

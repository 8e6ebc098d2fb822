// Cursor Codec (spec.md §4.2, SPEC_FULL.md §3 "Cursor"): opaque token
// binding a connection's pagination position to the exact ordering that
// produced it, so a cursor minted under one `orderBy` can never be replayed
// against another.

use crate::error::{CoreError, Result};
use crate::model::{ColumnKind, Direction, OrderBy};
use crate::value::Value;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct CursorPayload {
    #[serde(rename = "t")]
    type_name: String,
    #[serde(rename = "f")]
    order_by_fingerprint: String,
    #[serde(rename = "d")]
    directions: Vec<bool>, // true = Asc
    #[serde(rename = "v")]
    values: Vec<serde_json::Value>,
}

pub fn encode(type_name: &str, order_by: &OrderBy, values: &[Value]) -> String {
    let payload = CursorPayload {
        type_name: type_name.to_string(),
        order_by_fingerprint: order_by.fingerprint(),
        directions: order_by.directions().iter().map(|d| *d == Direction::Asc).collect(),
        values: values.iter().map(Value::to_wire_json).collect(),
    };
    let json = serde_json::to_vec(&payload).expect("CursorPayload is always serializable");
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode a cursor, validating that it was minted for `type_name` under
/// exactly `order_by` (same columns, same directions) before coercing its
/// value tuple against `kinds`. Any mismatch is a `BadInput` — spec.md §5
/// scenario S3: "cursor minted under a different sort order must be
/// rejected, not silently reinterpreted".
pub fn decode(cursor: &str, type_name: &str, order_by: &OrderBy, kinds: &[ColumnKind]) -> Result<Vec<Value>> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|e| CoreError::BadInput(format!("malformed cursor: {e}")))?;
    let payload: CursorPayload =
        serde_json::from_slice(&bytes).map_err(|e| CoreError::BadInput(format!("malformed cursor: {e}")))?;

    if payload.type_name != type_name {
        return Err(CoreError::BadInput(format!(
            "cursor type mismatch: expected {type_name}, got {}",
            payload.type_name
        )));
    }
    if payload.order_by_fingerprint != order_by.fingerprint() {
        return Err(CoreError::BadInput(
            "cursor was minted under a different ordering".to_string(),
        ));
    }
    let expected_directions: Vec<bool> = order_by.directions().iter().map(|d| *d == Direction::Asc).collect();
    if payload.directions != expected_directions {
        return Err(CoreError::BadInput(
            "cursor direction list does not match the current ordering".to_string(),
        ));
    }
    if payload.values.len() != kinds.len() {
        return Err(CoreError::BadInput("cursor value tuple arity mismatch".to_string()));
    }

    payload
        .values
        .iter()
        .zip(kinds.iter())
        .map(|(v, kind)| {
            Value::from_wire_json(v, kind)
                .ok_or_else(|| CoreError::BadInput("cursor value component has wrong shape for column type".to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OrderByClause;

    fn order_by() -> OrderBy {
        OrderBy::new(vec![OrderByClause {
            column: "id".into(),
            direction: Direction::Asc,
        }])
    }

    #[test]
    fn round_trips_under_the_same_ordering() {
        let ob = order_by();
        let c = encode("Author", &ob, &[Value::Int(7)]);
        let values = decode(&c, "Author", &ob, &[ColumnKind::Int]).unwrap();
        assert_eq!(values, vec![Value::Int(7)]);
    }

    #[test]
    fn rejects_cursor_minted_under_a_different_ordering() {
        let ob = order_by();
        let c = encode("Author", &ob, &[Value::Int(7)]);
        let other = OrderBy::new(vec![OrderByClause {
            column: "id".into(),
            direction: Direction::Desc,
        }]);
        assert!(decode(&c, "Author", &other, &[ColumnKind::Int]).is_err());
    }

    #[test]
    fn rejects_cursor_minted_for_a_different_type() {
        let ob = order_by();
        let c = encode("Author", &ob, &[Value::Int(7)]);
        assert!(decode(&c, "Book", &ob, &[ColumnKind::Int]).is_err());
    }

    #[test]
    fn rejects_garbage_input() {
        let ob = order_by();
        assert!(decode("!!!not-base64!!!", "Author", &ob, &[ColumnKind::Int]).is_err());
    }
}

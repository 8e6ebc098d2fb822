// Canonical, dynamically-typed value carried through the planner, scan
// layer, batch keys, and cursor codec. See SPEC_FULL.md §9 "Dynamic row
// typing": rows are `map<string, Any>` in the source design; here that
// becomes a tagged enum so batch-key extraction, cursor encoding, and
// aggregate decoding stay polymorphic without going through `dyn Any`.

use std::collections::BTreeMap;
use std::fmt::Write as _;

/// A single cell value as it flows out of the scan layer.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    /// Decimal/BigInt wire scalars: carried as strings end-to-end.
    DecimalStr(String),
    Json(String),
    /// SET column: ordered, trimmed, non-empty labels.
    Labels(Vec<String>),
    Vector(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::DecimalStr(s) | Value::Json(s) | Value::Vector(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    /// Widens any numeric variant to `f64` — used to decode aggregate
    /// results (`SUM`/`AVG`/`MIN`/`MAX`), which may come back as an integer
    /// or decimal-string depending on the driver and the column's type.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::UInt(u) => Some(*u as f64),
            Value::Float(f) => Some(*f),
            Value::DecimalStr(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Canonical, deterministic string encoding used for batch fingerprints
    /// and tuple keys. Two values that are "the same" under the numeric-width
    /// equivalence required by SPEC_FULL.md §3 (`int(1) == int64(1)`) produce
    /// an identical canonical string.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        self.write_canonical(&mut out);
        out
    }

    fn write_canonical(&self, out: &mut String) {
        match self {
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Int(i) => {
                let _ = write!(out, "n:{i}");
            }
            Value::UInt(u) => {
                // Numeric width is not part of identity: encode under the
                // same `n:` tag as signed integers whenever it fits.
                if let Ok(i) = i64::try_from(*u) {
                    let _ = write!(out, "n:{i}");
                } else {
                    let _ = write!(out, "n:{u}");
                }
            }
            Value::Float(f) => {
                // `{}` on f64 is Rust's shortest round-trippable form.
                let _ = write!(out, "n:{f}");
            }
            Value::Str(s) => {
                out.push('"');
                escape_into(s, out);
                out.push('"');
            }
            Value::Bytes(b) => {
                out.push_str("b:");
                for byte in b {
                    let _ = write!(out, "{byte:02x}");
                }
            }
            Value::DecimalStr(s) => {
                out.push_str("d:");
                out.push_str(s);
            }
            Value::Json(s) => {
                out.push_str("j:");
                match serde_json::from_str::<serde_json::Value>(s) {
                    Ok(v) => out.push_str(&canonical_json(&v)),
                    Err(_) => escape_into(s, out),
                }
            }
            Value::Labels(labels) => {
                out.push('[');
                for (i, l) in labels.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push('"');
                    escape_into(l, out);
                    out.push('"');
                }
                out.push(']');
            }
            Value::Vector(s) => {
                out.push_str("v:");
                out.push_str(s);
            }
        }
    }
}

fn escape_into(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
}

/// Canonicalize arbitrary JSON with sorted object keys, matching SPEC_FULL.md
/// §9's "lists/maps composed with sorted keys" determinism rule.
fn canonical_json(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => {
            let mut out = String::from("\"");
            escape_into(s, &mut out);
            out.push('"');
            out
        }
        serde_json::Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", parts.join(","))
        }
        serde_json::Value::Object(map) => {
            let sorted: BTreeMap<&String, &serde_json::Value> = map.iter().collect();
            let parts: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| {
                    let mut key = String::from("\"");
                    escape_into(k, &mut key);
                    key.push('"');
                    format!("{key}:{}", canonical_json(v))
                })
                .collect();
            format!("{{{}}}", parts.join(","))
        }
    }
}

/// Bridge to `serde_json::Value` used by the node-ID and cursor codecs,
/// which need a reversible wire format rather than the one-way `canonical`
/// encoding above.
impl Value {
    pub fn to_wire_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::json!(i),
            Value::UInt(u) => serde_json::json!(u),
            Value::Float(f) => serde_json::json!(f),
            Value::Str(s) => serde_json::json!(s),
            Value::DecimalStr(s) => serde_json::json!(s),
            Value::Json(s) => serde_json::json!(s),
            Value::Vector(s) => serde_json::json!(s),
            Value::Bytes(b) => {
                use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
                serde_json::json!(URL_SAFE_NO_PAD.encode(b))
            }
            Value::Labels(labels) => serde_json::json!(labels),
        }
    }

    /// Interpret a wire JSON value back into a `Value`, using `kind` to
    /// disambiguate (JSON alone can't tell a decimal string from a plain
    /// string, or bytes from base64 text).
    pub fn from_wire_json(v: &serde_json::Value, kind: &crate::model::ColumnKind) -> Option<Value> {
        use crate::model::ColumnKind;
        if v.is_null() {
            return Some(Value::Null);
        }
        match kind {
            ColumnKind::Int => v.as_i64().map(Value::Int).or_else(|| v.as_u64().map(Value::UInt)),
            ColumnKind::BigInt | ColumnKind::Decimal => v.as_str().map(|s| Value::DecimalStr(s.to_string())),
            ColumnKind::Boolean => v.as_bool().map(Value::Bool),
            ColumnKind::Float => v.as_f64().map(Value::Float),
            ColumnKind::String | ColumnKind::Uuid | ColumnKind::Date | ColumnKind::DateTime | ColumnKind::Time | ColumnKind::Year => {
                v.as_str().map(|s| Value::Str(s.to_string()))
            }
            ColumnKind::Bytes => {
                use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
                v.as_str().and_then(|s| URL_SAFE_NO_PAD.decode(s).ok()).map(Value::Bytes)
            }
            ColumnKind::Json => v.as_str().map(|s| Value::Json(s.to_string())),
            ColumnKind::Vector { .. } => v.as_str().map(|s| Value::Vector(s.to_string())),
            ColumnKind::Enum { .. } => v.as_str().map(|s| Value::Str(s.to_string())),
            ColumnKind::Set { .. } => v.as_array().map(|arr| {
                Value::Labels(arr.iter().filter_map(|x| x.as_str().map(String::from)).collect())
            }),
        }
    }
}

/// Canonical encoding of an ordered tuple of values, used as the key for
/// `tupleKey` lookups (SPEC_FULL.md §3 "Tuple key"). Returns `None` if any
/// component is null, matching the "skip any tuple with any nil component"
/// rule from spec.md §8 invariant 6.
pub fn canonical_tuple(values: &[Value]) -> Option<String> {
    if values.iter().any(Value::is_null) {
        return None;
    }
    let mut out = String::new();
    out.push('(');
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push('|');
        }
        v.write_canonical(&mut out);
    }
    out.push(')');
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_and_uint_canonicalize_identically() {
        assert_eq!(Value::Int(1).canonical(), Value::UInt(1).canonical());
    }

    #[test]
    fn null_component_drops_tuple() {
        assert_eq!(canonical_tuple(&[Value::Int(1), Value::Null]), None);
    }

    #[test]
    fn tuple_canonical_is_order_sensitive() {
        let a = canonical_tuple(&[Value::Int(1), Value::Int(2)]).unwrap();
        let b = canonical_tuple(&[Value::Int(2), Value::Int(1)]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn json_object_keys_are_sorted() {
        let a = Value::Json(r#"{"b":1,"a":2}"#.to_string());
        let b = Value::Json(r#"{"a":2,"b":1}"#.to_string());
        assert_eq!(a.canonical(), b.canonical());
    }

    proptest::proptest! {
        #[test]
        fn canonical_is_deterministic(x in proptest::prelude::any::<i64>()) {
            let v = Value::Int(x);
            proptest::prop_assert_eq!(v.canonical(), v.canonical());
        }
    }

    #[test]
    fn wire_json_round_trips_bytes() {
        use crate::model::ColumnKind;
        let v = Value::Bytes(vec![0xde, 0xad, 0xbe, 0xef]);
        let wire = v.to_wire_json();
        assert_eq!(Value::from_wire_json(&wire, &ColumnKind::Bytes), Some(v));
    }

    #[test]
    fn wire_json_round_trips_labels() {
        use crate::model::ColumnKind;
        let v = Value::Labels(vec!["a".into(), "b".into()]);
        let wire = v.to_wire_json();
        let kind = ColumnKind::Set { members: vec!["a".into(), "b".into()] };
        assert_eq!(Value::from_wire_json(&wire, &kind), Some(v));
    }

    #[test]
    fn wire_json_null_round_trips_regardless_of_kind() {
        use crate::model::ColumnKind;
        assert_eq!(Value::from_wire_json(&serde_json::Value::Null, &ColumnKind::Int), Some(Value::Null));
    }
}

// Bridge from the core's `Value` to async-graphql's dynamic runtime value.
// Kept separate from `value::Value` itself so that module has no
// async-graphql dependency and stays testable in isolation.

use crate::value::Value;
use async_graphql::Value as GqlValue;
use base64::{engine::general_purpose::STANDARD, Engine as _};

pub fn to_gql_value(v: &Value) -> GqlValue {
    match v {
        Value::Null => GqlValue::Null,
        Value::Bool(b) => GqlValue::Boolean(*b),
        Value::Int(i) => GqlValue::Number((*i).into()),
        Value::UInt(u) => GqlValue::Number((*u).into()),
        Value::Float(f) => async_graphql::Number::from_f64(*f).map(GqlValue::Number).unwrap_or(GqlValue::Null),
        Value::Str(s) | Value::DecimalStr(s) | Value::Vector(s) => GqlValue::String(s.clone()),
        Value::Bytes(b) => GqlValue::String(STANDARD.encode(b)),
        Value::Json(s) => serde_json::from_str::<serde_json::Value>(s)
            .ok()
            .and_then(|j| GqlValue::from_json(j).ok())
            .unwrap_or(GqlValue::Null),
        Value::Labels(labels) => GqlValue::List(labels.iter().map(|l| GqlValue::String(l.clone())).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_maps_to_gql_null() {
        assert!(matches!(to_gql_value(&Value::Null), GqlValue::Null));
    }

    #[test]
    fn labels_map_to_a_gql_list_of_strings() {
        let v = Value::Labels(vec!["a".into(), "b".into()]);
        match to_gql_value(&v) {
            GqlValue::List(items) => assert_eq!(items.len(), 2),
            other => panic!("expected list, got {other:?}"),
        }
    }
}

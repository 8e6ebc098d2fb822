// Column-kind -> GraphQL type mapping (spec.md §3 "Column — Derived:
// effective GraphQL type"). Kinds with no built-in GraphQL scalar get a
// custom, unvalidated passthrough `Scalar` registered once per schema.

use crate::model::ColumnKind;
use async_graphql::dynamic::{Scalar, TypeRef};

/// Names of the custom scalars this crate registers, beyond GraphQL's
/// built-in `Int`/`Float`/`String`/`Boolean`/`ID`.
pub const CUSTOM_SCALARS: &[&str] = &["DateTime", "Date", "Time", "Year", "Decimal", "BigInt", "JSON", "Vector", "UUID"];

pub fn custom_scalar_types() -> Vec<Scalar> {
    CUSTOM_SCALARS.iter().map(|name| Scalar::new(*name)).collect()
}

/// The bare (non-null, non-list) type name for a column's effective
/// GraphQL type.
pub fn scalar_type_name(kind: &ColumnKind) -> String {
    match kind {
        ColumnKind::Int => "Int".to_string(),
        ColumnKind::BigInt => "BigInt".to_string(),
        ColumnKind::Float => "Float".to_string(),
        ColumnKind::Decimal => "Decimal".to_string(),
        ColumnKind::Boolean => "Boolean".to_string(),
        ColumnKind::String => "String".to_string(),
        ColumnKind::Date => "Date".to_string(),
        ColumnKind::DateTime => "DateTime".to_string(),
        ColumnKind::Time => "Time".to_string(),
        ColumnKind::Year => "Year".to_string(),
        ColumnKind::Bytes => "String".to_string(),
        ColumnKind::Uuid => "UUID".to_string(),
        ColumnKind::Json => "JSON".to_string(),
        ColumnKind::Vector { .. } => "Vector".to_string(),
        ColumnKind::Enum { .. } | ColumnKind::Set { .. } => "String".to_string(),
    }
}

pub fn column_type_ref(kind: &ColumnKind, nullable: bool) -> TypeRef {
    let name = scalar_type_name(kind);
    let is_list = matches!(kind, ColumnKind::Set { .. });
    match (is_list, nullable) {
        (false, true) => TypeRef::named(name),
        (false, false) => TypeRef::named_nn(name),
        (true, true) => TypeRef::named_list(name),
        (true, false) => TypeRef::named_nn_list_nn(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_columns_map_to_a_list_type() {
        let kind = ColumnKind::Set { members: vec!["a".into()] };
        assert_eq!(scalar_type_name(&kind), "String");
    }

    #[test]
    fn enum_columns_map_to_plain_string() {
        let kind = ColumnKind::Enum { members: vec!["a".into()] };
        assert_eq!(scalar_type_name(&kind), "String");
    }
}

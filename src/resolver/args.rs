// Argument translation (SPEC_FULL.md §4.6: "translating an incoming
// argument's `ConstValue` into a `planner::WhereInput`/`OrderBy` is the
// resolver layer's job, since it needs the Schema Model in scope to resolve
// relationship fields"). Operates on `async_graphql::Value` rather than the
// dynamic `ValueAccessor` wrapper so it stays unit-testable without a live
// `ResolverContext`.

use crate::error::{CoreError, Result};
use crate::model::{Column, ColumnKind, Direction, OrderBy, OrderByClause, Schema, Table};
use crate::planner::connection::ConnectionArgs;
use crate::planner::where_clause::{FilterOp, RelQuantifier, WhereInput};
use crate::value::Value;
use async_graphql::{Name, Value as GqlValue};
use indexmap::IndexMap;

fn obj(v: &GqlValue) -> Result<&IndexMap<Name, GqlValue>> {
    match v {
        GqlValue::Object(m) => Ok(m),
        other => Err(CoreError::BadInput(format!("expected an input object, got {other:?}"))),
    }
}

fn field<'a>(m: &'a IndexMap<Name, GqlValue>, name: &str) -> Option<&'a GqlValue> {
    m.get(name)
}

/// Coerce a GraphQL scalar literal into the core's `Value`, using `kind` to
/// pick the right variant the way `Value::from_wire_json` does for cursors.
pub fn gql_scalar_to_value(v: &GqlValue, kind: &ColumnKind) -> Result<Value> {
    if matches!(v, GqlValue::Null) {
        return Ok(Value::Null);
    }
    match kind {
        ColumnKind::Int => match v {
            GqlValue::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .ok_or_else(|| CoreError::BadInput("integer argument exceeds 64-bit range".to_string())),
            other => Err(CoreError::BadInput(format!("expected an integer, got {other:?}"))),
        },
        ColumnKind::Float => match v {
            GqlValue::Number(n) => n.as_f64().map(Value::Float).ok_or_else(|| CoreError::BadInput("expected a float".to_string())),
            other => Err(CoreError::BadInput(format!("expected a float, got {other:?}"))),
        },
        ColumnKind::Boolean => match v {
            GqlValue::Boolean(b) => Ok(Value::Bool(*b)),
            other => Err(CoreError::BadInput(format!("expected a boolean, got {other:?}"))),
        },
        ColumnKind::BigInt | ColumnKind::Decimal => match v {
            GqlValue::String(s) => Ok(Value::DecimalStr(s.clone())),
            other => Err(CoreError::BadInput(format!("expected a numeric string, got {other:?}"))),
        },
        ColumnKind::Json => match v {
            GqlValue::String(s) => Ok(Value::Json(s.clone())),
            other => Err(CoreError::BadInput(format!("expected a JSON string, got {other:?}"))),
        },
        ColumnKind::Vector { .. } => match v {
            GqlValue::String(s) => Ok(Value::Vector(s.clone())),
            other => Err(CoreError::BadInput(format!("expected a vector literal, got {other:?}"))),
        },
        ColumnKind::Bytes => match v {
            GqlValue::String(s) => {
                use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
                URL_SAFE_NO_PAD
                    .decode(s)
                    .map(Value::Bytes)
                    .map_err(|e| CoreError::BadInput(format!("invalid base64 for bytes argument: {e}")))
            }
            other => Err(CoreError::BadInput(format!("expected a base64 string, got {other:?}"))),
        },
        _ => match v {
            GqlValue::String(s) => Ok(Value::Str(s.clone())),
            GqlValue::Enum(name) => Ok(Value::Str(name.to_string())),
            other => Err(CoreError::BadInput(format!("expected a string, got {other:?}"))),
        },
    }
}

/// Parse one `{Scalar}Filter` input object for `column` into the operators
/// it sets, ANDing them together (a single filter object with several keys
/// set is itself an implicit AND across the keys).
fn parse_column_filter(column: &Column, v: &GqlValue) -> Result<WhereInput> {
    if matches!(column.kind, ColumnKind::Set { .. }) {
        return parse_set_filter(column, v);
    }
    let m = obj(v)?;
    let mut parts = Vec::new();
    macro_rules! scalar_op {
        ($key:literal, $ctor:expr) => {
            if let Some(raw) = field(m, $key) {
                if !matches!(raw, GqlValue::Null) {
                    let val = gql_scalar_to_value(raw, &column.kind)?;
                    parts.push(WhereInput::Column(column.name.clone(), $ctor(val)));
                }
            }
        };
    }
    scalar_op!("eq", FilterOp::Eq);
    scalar_op!("ne", FilterOp::Ne);
    scalar_op!("lt", FilterOp::Lt);
    scalar_op!("lte", FilterOp::Lte);
    scalar_op!("gt", FilterOp::Gt);
    scalar_op!("gte", FilterOp::Gte);
    if let Some(GqlValue::List(items)) = field(m, "in") {
        let values = items.iter().map(|i| gql_scalar_to_value(i, &column.kind)).collect::<Result<Vec<_>>>()?;
        parts.push(WhereInput::Column(column.name.clone(), FilterOp::In(values)));
    }
    if let Some(GqlValue::List(items)) = field(m, "notIn") {
        let values = items.iter().map(|i| gql_scalar_to_value(i, &column.kind)).collect::<Result<Vec<_>>>()?;
        parts.push(WhereInput::Column(column.name.clone(), FilterOp::NotIn(values)));
    }
    if let Some(GqlValue::String(pattern)) = field(m, "like") {
        parts.push(WhereInput::Column(column.name.clone(), FilterOp::Like(pattern.clone())));
    }
    if let Some(GqlValue::String(pattern)) = field(m, "notLike") {
        parts.push(WhereInput::Column(column.name.clone(), FilterOp::NotLike(pattern.clone())));
    }
    if let Some(GqlValue::Boolean(b)) = field(m, "isNull") {
        parts.push(WhereInput::Column(column.name.clone(), FilterOp::IsNull(*b)));
    }
    Ok(WhereInput::And(parts))
}

/// Parse a `SetFilter` input object (spec.md §4.2's SET-column membership
/// operators) rather than `parse_column_filter`'s scalar-comparison keys.
fn parse_set_filter(column: &Column, v: &GqlValue) -> Result<WhereInput> {
    let m = obj(v)?;
    let mut parts = Vec::new();
    if let Some(GqlValue::String(member)) = field(m, "has") {
        parts.push(WhereInput::Column(column.name.clone(), FilterOp::SetHas(member.clone())));
    }
    if let Some(GqlValue::List(items)) = field(m, "hasAnyOf") {
        let members = string_list(items)?;
        parts.push(WhereInput::Column(column.name.clone(), FilterOp::SetHasAnyOf(members)));
    }
    if let Some(GqlValue::List(items)) = field(m, "hasAllOf") {
        let members = string_list(items)?;
        parts.push(WhereInput::Column(column.name.clone(), FilterOp::SetHasAllOf(members)));
    }
    if let Some(GqlValue::List(items)) = field(m, "hasNoneOf") {
        let members = string_list(items)?;
        parts.push(WhereInput::Column(column.name.clone(), FilterOp::SetHasNoneOf(members)));
    }
    if let Some(GqlValue::Boolean(b)) = field(m, "isNull") {
        parts.push(WhereInput::Column(column.name.clone(), FilterOp::IsNull(*b)));
    }
    Ok(WhereInput::And(parts))
}

fn string_list(items: &[GqlValue]) -> Result<Vec<String>> {
    items
        .iter()
        .map(|i| match i {
            GqlValue::String(s) => Ok(s.clone()),
            other => Err(CoreError::BadInput(format!("expected a string, got {other:?}"))),
        })
        .collect()
}

/// Parse a `{Type}Where` input object recursively, resolving nested
/// relationship predicates against `schema` (which owns whatever remote
/// table a relationship field's nested `Where` needs to recurse into).
pub fn parse_where(schema: &Schema, table: &Table, v: &GqlValue) -> Result<WhereInput> {
    let m = obj(v)?;
    let mut parts = Vec::new();

    if let Some(GqlValue::List(items)) = field(m, "and") {
        let inner = items.iter().map(|i| parse_where(schema, table, i)).collect::<Result<Vec<_>>>()?;
        parts.push(WhereInput::And(inner));
    }
    if let Some(GqlValue::List(items)) = field(m, "or") {
        let inner = items.iter().map(|i| parse_where(schema, table, i)).collect::<Result<Vec<_>>>()?;
        parts.push(WhereInput::Or(inner));
    }
    if let Some(inner_v) = field(m, "not") {
        if !matches!(inner_v, GqlValue::Null) {
            parts.push(WhereInput::Not(Box::new(parse_where(schema, table, inner_v)?)));
        }
    }
    for column in &table.columns {
        if let Some(filter_v) = field(m, &field_name(&column.name)) {
            if !matches!(filter_v, GqlValue::Null) {
                parts.push(parse_column_filter(column, filter_v)?);
            }
        }
    }
    for rel in &table.relationships {
        if let Some(rel_v) = field(m, &rel.name) {
            if matches!(rel_v, GqlValue::Null) {
                continue;
            }
            let remote = schema
                .table(&rel.remote_table)
                .ok_or_else(|| CoreError::InvariantViolation(format!("relationship {} points at unknown table", rel.name)))?;
            let inner = Box::new(parse_where(schema, remote, rel_v)?);
            let quantifier = if rel.kind.is_connection() { RelQuantifier::Some(inner) } else { RelQuantifier::Is(inner) };
            parts.push(WhereInput::Relationship(rel.name.clone(), quantifier));
        }
    }
    Ok(WhereInput::And(parts))
}

/// Parse an `orderBy: [{Type}OrderByClause!]` argument, preserving client
/// order (spec.md §4.2: "parsed from an ordered list of single-pair
/// objects (preserves user order)"). Absent or empty defaults the caller
/// substitutes with primary-key ascending.
pub fn parse_order_by(v: &GqlValue) -> Result<OrderBy> {
    let GqlValue::List(items) = v else {
        return Err(CoreError::BadInput("orderBy must be a list".to_string()));
    };
    let mut clauses = Vec::with_capacity(items.len());
    for item in items {
        let m = obj(item)?;
        let field_enum = match field(m, "field") {
            Some(GqlValue::Enum(name)) => name.to_string(),
            Some(GqlValue::String(name)) => name.clone(),
            _ => return Err(CoreError::BadInput("orderBy clause missing field".to_string())),
        };
        let direction = match field(m, "direction") {
            Some(GqlValue::Enum(d)) if d.as_str() == "DESC" => Direction::Desc,
            Some(GqlValue::String(d)) if d == "DESC" => Direction::Desc,
            _ => Direction::Asc,
        };
        clauses.push(OrderByClause { column: field_enum.to_lowercase(), direction });
    }
    Ok(OrderBy::new(clauses))
}

/// Build a `ConnectionArgs` from the four Relay pagination arguments as
/// already extracted from the dynamic `ResolverContext` by the caller.
pub fn parse_connection_args(first: Option<i64>, after: Option<String>, last: Option<i64>, before: Option<String>) -> ConnectionArgs {
    ConnectionArgs { first, after, last, before }
}

/// `created_at` -> `createdAt`, matching `naming::DefaultNamingStrategy`'s
/// column-name convention so `parse_where`'s lookups agree with however
/// `registry::input_types` named the field.
fn field_name(column: &str) -> String {
    crate::naming::DefaultNamingStrategy.field_name(column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, ColumnKind, Table};
    use async_graphql::Value as GqlValue;

    fn authors_schema() -> Schema {
        let authors = Table::new(
            "authors",
            vec![Column::new("id", "int", false, ColumnKind::Int), Column::new("name", "varchar", false, ColumnKind::String)],
        )
        .with_primary_key(vec!["id".into()]);
        Schema::new(vec![authors])
    }

    fn gql_obj(pairs: Vec<(&str, GqlValue)>) -> GqlValue {
        let mut m = IndexMap::new();
        for (k, v) in pairs {
            m.insert(Name::new(k), v);
        }
        GqlValue::Object(m)
    }

    #[test]
    fn parses_a_single_equality_filter() {
        let schema = authors_schema();
        let table = schema.table("authors").unwrap();
        let where_obj = gql_obj(vec![("name", gql_obj(vec![("eq", GqlValue::String("Ada".into()))]))]);
        let parsed = parse_where(&schema, table, &where_obj).unwrap();
        match parsed {
            WhereInput::And(parts) => assert_eq!(parts.len(), 1),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn parses_nested_and_or() {
        let schema = authors_schema();
        let table = schema.table("authors").unwrap();
        let inner = gql_obj(vec![("name", gql_obj(vec![("eq", GqlValue::String("Ada".into()))]))]);
        let where_obj = gql_obj(vec![("and", GqlValue::List(vec![inner.clone(), inner]))]);
        let parsed = parse_where(&schema, table, &where_obj).unwrap();
        assert!(matches!(parsed, WhereInput::And(_)));
    }

    #[test]
    fn order_by_lowercases_the_enum_member_back_to_the_column_name() {
        let clause = gql_obj(vec![("field", GqlValue::Enum(Name::new("CREATED_AT"))), ("direction", GqlValue::Enum(Name::new("DESC")))]);
        let order = parse_order_by(&GqlValue::List(vec![clause])).unwrap();
        assert_eq!(order.0[0].column, "created_at");
        assert_eq!(order.0[0].direction, Direction::Desc);
    }

    #[test]
    fn set_filter_parses_has_any_of_into_a_set_has_any_of_op() {
        let tags = Table::new(
            "posts",
            vec![Column::new(
                "tags",
                "set('a','b','c')",
                false,
                ColumnKind::Set { members: vec!["a".into(), "b".into(), "c".into()] },
            )],
        )
        .with_primary_key(vec![]);
        let schema = Schema::new(vec![tags]);
        let table = schema.table("posts").unwrap();
        let where_obj = gql_obj(vec![(
            "tags",
            gql_obj(vec![("hasAnyOf", GqlValue::List(vec![GqlValue::String("a".into())]))]),
        )]);
        let parsed = parse_where(&schema, table, &where_obj).unwrap();
        match parsed {
            WhereInput::And(parts) => match &parts[0] {
                WhereInput::And(inner) => match &inner[0] {
                    WhereInput::Column(name, FilterOp::SetHasAnyOf(members)) => {
                        assert_eq!(name, "tags");
                        assert_eq!(members, &vec!["a".to_string()]);
                    }
                    other => panic!("expected SetHasAnyOf, got {other:?}"),
                },
                other => panic!("expected nested And, got {other:?}"),
            },
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn null_filter_field_is_ignored_rather_than_erroring() {
        let schema = authors_schema();
        let table = schema.table("authors").unwrap();
        let where_obj = gql_obj(vec![("name", GqlValue::Null)]);
        let parsed = parse_where(&schema, table, &where_obj).unwrap();
        match parsed {
            WhereInput::And(parts) => assert!(parts.is_empty()),
            other => panic!("expected an empty And, got {other:?}"),
        }
    }
}

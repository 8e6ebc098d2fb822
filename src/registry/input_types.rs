// Where/OrderBy input shapes (spec.md §4.2 "Predicate language" /
// "ordered list of single-pair objects"). This module only builds the
// GraphQL type *shapes*; translating an incoming argument's `ConstValue`
// into a `planner::WhereInput`/`OrderBy` is the resolver layer's job, since
// it needs the Schema Model in scope to resolve relationship fields.

use super::scalar::{scalar_type_name, CUSTOM_SCALARS};
use crate::model::Table;
use crate::naming::NamingStrategy;
use async_graphql::dynamic::{Enum, EnumItem, InputObject, InputValue, TypeRef};

const ORDERED_SCALARS: &[&str] = &["Int", "BigInt", "Float", "Decimal", "Date", "DateTime", "Time", "Year"];

/// One `{Scalar}Filter` input per scalar the schema uses, shared across
/// every table's `Where` input rather than generated per-column, plus one
/// shared `SetFilter` for every `SET` column regardless of its member list.
pub fn build_filter_input_types() -> Vec<InputObject> {
    let mut scalars: Vec<&str> = vec!["Int", "Float", "String", "Boolean", "ID"];
    scalars.extend(CUSTOM_SCALARS.iter().copied());
    let mut inputs: Vec<InputObject> = scalars.into_iter().map(build_filter_input).collect();
    inputs.push(build_set_filter_input());
    inputs
}

/// `SetFilter`: membership queries against a `SET` column (spec.md §4.2),
/// lowered by the planner to `FIND_IN_SET` predicates rather than equality,
/// since a SET value is itself a multi-member bag, not a scalar.
fn build_set_filter_input() -> InputObject {
    InputObject::new("SetFilter")
        .field(InputValue::new("has", TypeRef::named(TypeRef::STRING)))
        .field(InputValue::new("hasAnyOf", TypeRef::named_list(TypeRef::STRING)))
        .field(InputValue::new("hasAllOf", TypeRef::named_list(TypeRef::STRING)))
        .field(InputValue::new("hasNoneOf", TypeRef::named_list(TypeRef::STRING)))
        .field(InputValue::new("isNull", TypeRef::named(TypeRef::BOOLEAN)))
}

fn build_filter_input(scalar: &str) -> InputObject {
    let mut input = InputObject::new(format!("{scalar}Filter"))
        .field(InputValue::new("eq", TypeRef::named(scalar)))
        .field(InputValue::new("ne", TypeRef::named(scalar)))
        .field(InputValue::new("in", TypeRef::named_list(scalar)))
        .field(InputValue::new("notIn", TypeRef::named_list(scalar)))
        .field(InputValue::new("isNull", TypeRef::named(TypeRef::BOOLEAN)));
    if ORDERED_SCALARS.contains(&scalar) {
        input = input
            .field(InputValue::new("lt", TypeRef::named(scalar)))
            .field(InputValue::new("lte", TypeRef::named(scalar)))
            .field(InputValue::new("gt", TypeRef::named(scalar)))
            .field(InputValue::new("gte", TypeRef::named(scalar)));
    }
    if scalar == "String" {
        input = input
            .field(InputValue::new("like", TypeRef::named(scalar)))
            .field(InputValue::new("notLike", TypeRef::named(scalar)));
    }
    input
}

/// `{Type}Where`: recursive `and`/`or`/`not`, one optional filter field per
/// column, and one optional nested `Where` per relationship (interpreted by
/// the resolver as `is` for many-to-one, `some` for everything else).
pub fn build_where_input(table: &Table, naming: &dyn NamingStrategy) -> InputObject {
    let name = naming.where_input_name(&table.name);
    let mut input = InputObject::new(&name)
        .field(InputValue::new("and", TypeRef::named_list(name.clone())))
        .field(InputValue::new("or", TypeRef::named_list(name.clone())))
        .field(InputValue::new("not", TypeRef::named(name.clone())));

    for column in &table.columns {
        let filter_name = match &column.kind {
            crate::model::ColumnKind::Set { .. } => "SetFilter".to_string(),
            kind => format!("{}Filter", scalar_type_name(kind)),
        };
        input = input.field(InputValue::new(naming.field_name(&column.name), TypeRef::named(filter_name)));
    }
    for rel in &table.relationships {
        let remote_where = naming.where_input_name(&rel.remote_table);
        input = input.field(InputValue::new(&rel.name, TypeRef::named(remote_where)));
    }
    input
}

pub fn build_sort_direction_enum() -> Enum {
    Enum::new("SortDirection").item(EnumItem::new("ASC")).item(EnumItem::new("DESC"))
}

/// `{Type}OrderableField`: one member per column, named by its uppercased
/// SQL column name (the resolver lowercases it back to look the column up).
pub fn build_orderable_field_enum(table: &Table, naming: &dyn NamingStrategy) -> Enum {
    let name = format!("{}OrderableField", naming.type_name(&table.name));
    let mut e = Enum::new(name);
    for column in &table.columns {
        e = e.item(EnumItem::new(column.name.to_uppercase()));
    }
    e
}

/// `{Type}OrderByClause`: `{ field: {Type}OrderableField!, direction:
/// SortDirection! }`. Clients pass `orderBy: [{Type}OrderByClause!]`,
/// preserving the ordered-list-of-pairs shape from spec.md §4.2.
pub fn build_order_by_clause_input(table: &Table, naming: &dyn NamingStrategy) -> InputObject {
    let name = naming.order_by_input_name(&table.name);
    let field_enum_name = format!("{}OrderableField", naming.type_name(&table.name));
    InputObject::new(name)
        .field(InputValue::new("field", TypeRef::named_nn(field_enum_name)))
        .field(InputValue::new("direction", TypeRef::named_nn("SortDirection")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, ColumnKind};
    use crate::naming::DefaultNamingStrategy;

    #[test]
    fn where_input_has_boolean_combinators_and_one_field_per_column() {
        let table = Table::new(
            "authors",
            vec![Column::new("id", "int", false, ColumnKind::Int), Column::new("name", "varchar", false, ColumnKind::String)],
        )
        .with_primary_key(vec!["id".into()]);
        let _ = build_where_input(&table, &DefaultNamingStrategy);
    }

    #[test]
    fn orderable_field_enum_uppercases_column_names() {
        let table = Table::new("authors", vec![Column::new("created_at", "datetime", false, ColumnKind::DateTime)])
            .with_primary_key(vec!["created_at".into()]);
        let _ = build_orderable_field_enum(&table, &DefaultNamingStrategy);
    }
}

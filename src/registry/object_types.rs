// Object Type construction (spec.md §4.1 "for each non-pure-junction table
// with a primary key, a GraphQL object type"): maps a `Table`'s scalar
// columns onto dynamic `Field`s. Relationship fields are added afterward by
// the resolver layer, which needs the driver/batch-state context this
// module deliberately does not depend on.

use super::scalar::column_type_ref;
use super::value_conv::to_gql_value;
use crate::model::Table;
use crate::naming::NamingStrategy;
use crate::scan::ScannedRow;
use async_graphql::dynamic::{Field, FieldFuture, FieldValue, Object, TypeRef};

/// Build the Object type for `table`, named via `naming`, with one field
/// per column plus `id: ID!` when the table has a primary key (spec.md
/// GLOSSARY "Node ID").
pub fn build_object_type(table: &Table, naming: &dyn NamingStrategy) -> Object {
    let type_name = naming.type_name(&table.name);
    let mut object = Object::new(&type_name);

    if table.has_primary_key() {
        let type_name_for_id = type_name.clone();
        let pk = table.primary_key.clone();
        object = object.field(Field::new("id", TypeRef::named_nn(TypeRef::ID), move |ctx| {
            let type_name = type_name_for_id.clone();
            let pk = pk.clone();
            FieldFuture::new(async move {
                let row = ctx
                    .parent_value
                    .try_downcast_ref::<ScannedRow>()
                    .map_err(|_| async_graphql::Error::new("expected a scanned row"))?;
                let key: Vec<crate::value::Value> = pk.iter().map(|c| row.get(c).cloned().unwrap_or(crate::value::Value::Null)).collect();
                let id = crate::node_id::encode(&type_name, &key);
                Ok(Some(FieldValue::value(async_graphql::Value::String(id))))
            })
        }));
    }

    for column in &table.columns {
        let field_name = naming.field_name(&column.name);
        let column_name = column.name.clone();
        let type_ref = column_type_ref(&column.kind, column.nullable);
        object = object.field(Field::new(field_name, type_ref, move |ctx| {
            let column_name = column_name.clone();
            FieldFuture::new(async move {
                let row = ctx
                    .parent_value
                    .try_downcast_ref::<ScannedRow>()
                    .map_err(|_| async_graphql::Error::new("expected a scanned row"))?;
                let value = row.get(&column_name).cloned().unwrap_or(crate::value::Value::Null);
                if value.is_null() {
                    return Ok(None);
                }
                Ok(Some(FieldValue::value(to_gql_value(&value))))
            })
        }));
    }

    object
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, ColumnKind};
    use crate::naming::DefaultNamingStrategy;

    #[test]
    fn object_type_is_named_after_the_singularized_table() {
        let table = Table::new("authors", vec![Column::new("name", "varchar", false, ColumnKind::String)]).with_primary_key(vec!["name".into()]);
        let object = build_object_type(&table, &DefaultNamingStrategy);
        assert_eq!(object.type_name(), "Author");
    }
}

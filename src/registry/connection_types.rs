// Relay connection plumbing (spec.md §4.1/GLOSSARY "Connection", "Edge",
// "PageInfo"): the three object shapes every to-many relationship and every
// root listing field returns, built once per node type name.

use crate::connection_executor::{PageInfo, ResolvedConnection};
use crate::model::Table;
use crate::naming::NamingStrategy;
use crate::value::Value;
use async_graphql::dynamic::{Field, FieldFuture, FieldValue, Object, TypeRef};
use async_graphql::Value as GqlValue;
use std::collections::HashMap;

/// `PageInfo` is shape-identical for every connection in the schema — built
/// exactly once and shared by name. Its parent value is always a plain
/// `connection_executor::PageInfo`, not a whole connection result, so both
/// `{Type}Connection` and `{Type}VectorConnection` (which carry different
/// result types) can hand it the same resolver.
pub fn build_page_info_type() -> Object {
    Object::new("PageInfo")
        .field(Field::new("hasNextPage", TypeRef::named_nn(TypeRef::BOOLEAN), |ctx| {
            FieldFuture::new(async move {
                let p = downcast(&ctx)?;
                Ok(Some(FieldValue::value(GqlValue::Boolean(p.has_next_page))))
            })
        }))
        .field(Field::new("hasPreviousPage", TypeRef::named_nn(TypeRef::BOOLEAN), |ctx| {
            FieldFuture::new(async move {
                let p = downcast(&ctx)?;
                Ok(Some(FieldValue::value(GqlValue::Boolean(p.has_previous_page))))
            })
        }))
        .field(Field::new("startCursor", TypeRef::named(TypeRef::STRING), |ctx| {
            FieldFuture::new(async move {
                let p = downcast(&ctx)?;
                Ok(p.start_cursor.clone().map(GqlValue::String).map(FieldValue::value))
            })
        }))
        .field(Field::new("endCursor", TypeRef::named(TypeRef::STRING), |ctx| {
            FieldFuture::new(async move {
                let p = downcast(&ctx)?;
                Ok(p.end_cursor.clone().map(GqlValue::String).map(FieldValue::value))
            })
        }))
}

fn downcast<'a>(ctx: &'a async_graphql::dynamic::ResolverContext<'_>) -> async_graphql::Result<&'a PageInfo> {
    ctx.parent_value
        .try_downcast_ref::<PageInfo>()
        .map_err(|_| async_graphql::Error::new("expected page info"))
}

fn downcast_connection<'a>(ctx: &'a async_graphql::dynamic::ResolverContext<'_>) -> async_graphql::Result<&'a ResolvedConnection> {
    ctx.parent_value
        .try_downcast_ref::<ResolvedConnection>()
        .map_err(|_| async_graphql::Error::new("expected a resolved connection"))
}

/// `{Type}Edge`: `{ cursor: String!, node: {Type}! }`.
pub fn build_edge_type(node_type_name: &str) -> Object {
    Object::new(format!("{node_type_name}Edge"))
        .field(Field::new("cursor", TypeRef::named_nn(TypeRef::STRING), |ctx| {
            FieldFuture::new(async move {
                let edge = ctx
                    .parent_value
                    .try_downcast_ref::<crate::connection_executor::Edge>()
                    .map_err(|_| async_graphql::Error::new("expected an edge"))?;
                Ok(Some(FieldValue::value(GqlValue::String(edge.cursor.clone()))))
            })
        }))
        .field(Field::new("node", TypeRef::named_nn(node_type_name), |ctx| {
            FieldFuture::new(async move {
                let edge = ctx
                    .parent_value
                    .try_downcast_ref::<crate::connection_executor::Edge>()
                    .map_err(|_| async_graphql::Error::new("expected an edge"))?;
                Ok(Some(FieldValue::owned_any(edge.node.clone())))
            })
        }))
}

fn downcast_vector<'a>(ctx: &'a async_graphql::dynamic::ResolverContext<'_>) -> async_graphql::Result<&'a crate::connection_executor::ResolvedVectorConnection> {
    ctx.parent_value
        .try_downcast_ref::<crate::connection_executor::ResolvedVectorConnection>()
        .map_err(|_| async_graphql::Error::new("expected a resolved vector connection"))
}

/// `{Type}VectorEdge`: `{ cursor: String!, node: {Type}!, distance: Float!,
/// rank: Int! }` — an ordinary edge plus the two fields spec.md §5 scenario
/// S5 calls for on a vector-search result.
pub fn build_vector_edge_type(node_type_name: &str) -> Object {
    Object::new(format!("{node_type_name}VectorEdge"))
        .field(Field::new("cursor", TypeRef::named_nn(TypeRef::STRING), |ctx| {
            FieldFuture::new(async move {
                let edge = ctx
                    .parent_value
                    .try_downcast_ref::<crate::connection_executor::VectorEdge>()
                    .map_err(|_| async_graphql::Error::new("expected a vector edge"))?;
                Ok(Some(FieldValue::value(GqlValue::String(edge.cursor.clone()))))
            })
        }))
        .field(Field::new("node", TypeRef::named_nn(node_type_name), |ctx| {
            FieldFuture::new(async move {
                let edge = ctx
                    .parent_value
                    .try_downcast_ref::<crate::connection_executor::VectorEdge>()
                    .map_err(|_| async_graphql::Error::new("expected a vector edge"))?;
                Ok(Some(FieldValue::owned_any(edge.node.clone())))
            })
        }))
        .field(Field::new("distance", TypeRef::named_nn(TypeRef::FLOAT), |ctx| {
            FieldFuture::new(async move {
                let edge = ctx
                    .parent_value
                    .try_downcast_ref::<crate::connection_executor::VectorEdge>()
                    .map_err(|_| async_graphql::Error::new("expected a vector edge"))?;
                Ok(Some(FieldValue::value(GqlValue::Number(
                    async_graphql::Number::from_f64(edge.distance).unwrap_or_else(|| async_graphql::Number::from(0)),
                ))))
            })
        }))
        .field(Field::new("rank", TypeRef::named_nn(TypeRef::INT), |ctx| {
            FieldFuture::new(async move {
                let edge = ctx
                    .parent_value
                    .try_downcast_ref::<crate::connection_executor::VectorEdge>()
                    .map_err(|_| async_graphql::Error::new("expected a vector edge"))?;
                Ok(Some(FieldValue::value(GqlValue::Number(edge.rank.into()))))
            })
        }))
}

/// `{Type}VectorConnection`: `{ edges: [{Type}VectorEdge!]!, pageInfo:
/// PageInfo! }`. No `totalCount`/`aggregate` — a vector search is always a
/// fixed top-K slice, not an unbounded listing (spec.md §6 vector search
/// arguments: no aggregate support listed).
pub fn build_vector_connection_type(node_type_name: &str) -> Object {
    let edge_type = format!("{node_type_name}VectorEdge");
    Object::new(format!("{node_type_name}VectorConnection"))
        .field(Field::new("edges", TypeRef::named_nn_list_nn(edge_type), |ctx| {
            FieldFuture::new(async move {
                let c = downcast_vector(&ctx)?;
                let edges: Vec<FieldValue> = c.edges.iter().map(|e| FieldValue::owned_any(e.clone())).collect();
                Ok(Some(FieldValue::list(edges)))
            })
        }))
        .field(Field::new("pageInfo", TypeRef::named_nn("PageInfo"), |ctx| {
            FieldFuture::new(async move {
                let c = downcast_vector(&ctx)?;
                Ok(Some(FieldValue::owned_any(c.page_info.clone())))
            })
        }))
}

/// `{Type}Connection`: `{ edges: [{Type}Edge!]!, pageInfo: PageInfo!,
/// totalCount: Int, aggregate: {Type}AggregateResult }`. `totalCount`/
/// `aggregate` read whatever the resolver already computed — see
/// `ResolvedConnection`.
pub fn build_connection_type(node_type_name: &str, aggregate_result_type_name: &str) -> Object {
    let edge_type = format!("{node_type_name}Edge");
    Object::new(format!("{node_type_name}Connection"))
        .field(Field::new("edges", TypeRef::named_nn_list_nn(edge_type), |ctx| {
            FieldFuture::new(async move {
                let c = downcast_connection(&ctx)?;
                let edges: Vec<FieldValue> = c.edges.iter().map(|e| FieldValue::owned_any(e.clone())).collect();
                Ok(Some(FieldValue::list(edges)))
            })
        }))
        .field(Field::new("pageInfo", TypeRef::named_nn("PageInfo"), |ctx| {
            FieldFuture::new(async move {
                let c = downcast_connection(&ctx)?;
                Ok(Some(FieldValue::owned_any(c.page_info.clone())))
            })
        }))
        .field(Field::new("totalCount", TypeRef::named(TypeRef::INT), |ctx| {
            FieldFuture::new(async move {
                let c = downcast_connection(&ctx)?;
                Ok(c.total_count.map(|n| FieldValue::value(GqlValue::Number(n.into()))))
            })
        }))
        .field(Field::new("aggregate", TypeRef::named(aggregate_result_type_name), |ctx| {
            FieldFuture::new(async move {
                let c = downcast_connection(&ctx)?;
                let Some(agg) = &c.aggregate else { return Ok(None) };
                Ok(Some(FieldValue::owned_any(agg.clone())))
            })
        }))
}

/// Parent value handed to a `{Type}Aggregate` object's fields: the full
/// alias->value map the executor produced, scoped to one op's alias prefix
/// ("sum"/"avg"/"min"/"max") so each numeric-column field only needs its own
/// column name to look itself up.
struct AggregateBucket {
    prefix: &'static str,
    values: HashMap<String, Value>,
}

fn downcast_aggregate<'a>(ctx: &'a async_graphql::dynamic::ResolverContext<'_>) -> async_graphql::Result<&'a HashMap<String, Value>> {
    ctx.parent_value
        .try_downcast_ref::<HashMap<String, Value>>()
        .map_err(|_| async_graphql::Error::new("expected an aggregate result"))
}

fn downcast_bucket<'a>(ctx: &'a async_graphql::dynamic::ResolverContext<'_>) -> async_graphql::Result<&'a AggregateBucket> {
    ctx.parent_value
        .try_downcast_ref::<AggregateBucket>()
        .map_err(|_| async_graphql::Error::new("expected an aggregate bucket"))
}

/// `{Type}Aggregate`: one nullable `Float` field per numeric column, shared
/// by `sum`/`avg`/`min`/`max` (spec.md §4.2) — which op's value a field
/// returns depends on the `AggregateBucket` prefix it was reached through,
/// not the type itself.
pub fn build_aggregate_type(table: &Table, naming: &dyn NamingStrategy) -> Object {
    let mut object = Object::new(naming.aggregate_type_name(&table.name));
    for column in table.columns.iter().filter(|c| c.kind.is_numeric()) {
        let field_name = naming.field_name(&column.name);
        let column_name = column.name.clone();
        object = object.field(Field::new(field_name, TypeRef::named(TypeRef::FLOAT), move |ctx| {
            let column_name = column_name.clone();
            FieldFuture::new(async move {
                let bucket = downcast_bucket(&ctx)?;
                let key = format!("{}_{}", bucket.prefix, column_name);
                Ok(bucket.values.get(&key).and_then(Value::as_f64).map(|f| {
                    FieldValue::value(GqlValue::Number(async_graphql::Number::from_f64(f).unwrap_or_else(|| async_graphql::Number::from(0))))
                }))
            })
        }));
    }
    object
}

/// `{Type}AggregateResult`: `{ count: Int!, sum/avg/min/max: {Type}Aggregate
/// }`. Parent value is the raw alias->value map the executor produced;
/// `sum`/`avg`/`min`/`max` each re-scope it to their own alias prefix via an
/// `AggregateBucket` before handing it to `{Type}Aggregate`'s fields.
pub fn build_aggregate_result_type(table: &Table, naming: &dyn NamingStrategy) -> Object {
    let aggregate_type_name = naming.aggregate_type_name(&table.name);
    let mut object = Object::new(naming.aggregate_result_type_name(&table.name)).field(Field::new(
        "count",
        TypeRef::named_nn(TypeRef::INT),
        |ctx| {
            FieldFuture::new(async move {
                let agg = downcast_aggregate(&ctx)?;
                let count = agg.get("count").and_then(Value::as_i64).unwrap_or(0);
                Ok(Some(FieldValue::value(GqlValue::Number(count.into()))))
            })
        },
    ));
    for prefix in ["sum", "avg", "min", "max"] {
        let aggregate_type_name = aggregate_type_name.clone();
        object = object.field(Field::new(prefix, TypeRef::named(aggregate_type_name), move |ctx| {
            FieldFuture::new(async move {
                let agg = downcast_aggregate(&ctx)?;
                Ok(Some(FieldValue::owned_any(AggregateBucket { prefix, values: agg.clone() })))
            })
        }));
    }
    object
}

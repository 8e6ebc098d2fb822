// Assembles the dynamic GraphQL schema (SPEC_FULL.md §4.6, ADDED): takes
// the registry's per-table types, attaches relationship fields, builds the
// root `Query` object, and registers everything with async-graphql.
//
// The returned `Schema` is process-wide and immutable — safe to share
// across every incoming request. Per-request state (`BatchState`) is NOT
// installed here; the embedding application inserts a fresh
// `crate::batch::new_batching_context()` into each request's
// `Context::data` (e.g. via `Request::data` before `schema.execute(..)`),
// mirroring how `ResolverContext` itself is installed once at schema-build
// time via `.data(ctx)` below.

use super::context::ResolverContext;
use super::{relationship, root};
use crate::error::{CoreError, Result};
use crate::registry;
use async_graphql::dynamic::{Enum, EnumItem, Object, Schema};
use std::sync::Arc;

pub fn build_graphql_schema(ctx: Arc<ResolverContext>) -> Result<Schema> {
    let naming = ctx.naming.clone();
    let types = registry::build_all(&ctx.schema, &*naming);
    let mut objects = types.objects;

    let mut query = Object::new("Query").field(root::build_node_field(ctx.clone()));

    for table in ctx.schema.exposed_tables() {
        let type_name = naming.type_name(&table.name);
        if let Some(object) = objects.remove(&type_name) {
            objects.insert(type_name, relationship::attach_relationship_fields(table, object, ctx.clone()));
        }

        query = query.field(root::build_single_row_field(table, ctx.clone()));
        for index in table.unique_indexes() {
            if index.columns != table.primary_key {
                query = query.field(root::build_unique_index_field(table, &index, ctx.clone()));
            }
        }
        query = query.field(root::build_connection_field(table, ctx.clone()));
        if let Some(field) = root::build_vector_search_field(table, ctx.clone()) {
            query = query.field(field);
        }
    }

    let mut builder = Schema::build("Query", None, None)
        .register(query)
        .register(types.node_interface)
        .register(types.page_info)
        .register(build_vector_metric_enum())
        .register(types.sort_direction);

    for (_, object) in objects {
        builder = builder.register(object);
    }
    for object in types.connections {
        builder = builder.register(object);
    }
    for object in types.edges {
        builder = builder.register(object);
    }
    for object in types.aggregate_types {
        builder = builder.register(object);
    }
    for object in types.aggregate_result_types {
        builder = builder.register(object);
    }
    for object in types.vector_connections {
        builder = builder.register(object);
    }
    for object in types.vector_edges {
        builder = builder.register(object);
    }
    for scalar in types.scalars {
        builder = builder.register(scalar);
    }
    for filter in types.filters {
        builder = builder.register(filter);
    }
    for where_input in types.wheres {
        builder = builder.register(where_input);
    }
    for order_clause in types.order_by_clauses {
        builder = builder.register(order_clause);
    }
    for orderable in types.orderable_fields {
        builder = builder.register(orderable);
    }

    builder.data(ctx).finish().map_err(|e| CoreError::InvariantViolation(e.to_string()))
}

/// `VectorMetric` is global rather than per-table (every vector-search
/// field shares it), so it is built here directly rather than in
/// `registry`, which only ever builds per-table types.
fn build_vector_metric_enum() -> Enum {
    Enum::new("VectorMetric").item(EnumItem::new("COSINE")).item(EnumItem::new("L2")).item(EnumItem::new("INNER_PRODUCT"))
}

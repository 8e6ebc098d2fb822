// Root Query field resolvers (SPEC_FULL.md §4.6 "ADDED"): single-row
// lookups by primary key / unique index, the global `node(id)` field, the
// per-table connection (listing) field, and vector search.

use super::args;
use super::context::ResolverContext;
use crate::batch::BatchState;
use crate::connection_executor::{ConnectionExecutor, Edge, PageInfo, ResolvedConnection};
use crate::cursor;
use crate::error::{CoreError, Result};
use crate::model::{Column, ColumnKind, Direction, Index, OrderBy, OrderByClause, Table};
use crate::naming::NamingStrategy;
use crate::planner::connection::{AggregateField, AggregateFn, ConnectionArgs, ConnectionPlan};
use crate::planner::sql::SqlBuilder;
use crate::planner::vector_search::{VectorMetric, DISTANCE_ALIAS};
use crate::scan::{scan_row, ScanColumn, ScannedRow};
use crate::value::Value;
use async_graphql::dynamic::{Field, FieldFuture, FieldValue, InputValue, ResolverContext as DynCtx, TypeRef};
use async_graphql::{Error as GqlError, Value as GqlValue};
use std::sync::Arc;

pub(super) fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub(super) fn pascal(s: &str) -> String {
    s.split(|c: char| c == '_' || c == '-')
        .filter(|p| !p.is_empty())
        .map(|p| {
            let mut chars = p.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + &chars.as_str().to_ascii_lowercase(),
                None => String::new(),
            }
        })
        .collect()
}

pub(super) fn get_arg(ctx: &DynCtx<'_>, name: &str) -> Option<GqlValue> {
    ctx.args.get(name).map(|v| v.as_value().clone())
}

pub(super) fn arg_i64(ctx: &DynCtx<'_>, name: &str) -> Option<i64> {
    match get_arg(ctx, name) {
        Some(GqlValue::Number(n)) => n.as_i64(),
        _ => None,
    }
}

pub(super) fn arg_string(ctx: &DynCtx<'_>, name: &str) -> Option<String> {
    match get_arg(ctx, name) {
        Some(GqlValue::String(s)) => Some(s),
        _ => None,
    }
}

pub(super) fn core_err(e: CoreError) -> GqlError {
    e.into()
}

/// Primary-key-ascending order, used whenever a connection field's `orderBy`
/// argument is absent (spec.md §4.2: stable default ordering).
pub(super) fn default_order_by(table: &Table) -> OrderBy {
    OrderBy::new(table.primary_key.iter().map(|c| OrderByClause { column: c.clone(), direction: Direction::Asc }).collect())
}

async fn fetch_one_by_key(ctx: &ResolverContext, table: &Table, key_columns: &[String], key_values: &[Value]) -> Result<Option<ScannedRow>> {
    let mut b = SqlBuilder::new();
    b.push_str("SELECT * FROM ").push_ident(&table.name).push_str(" WHERE ");
    for (i, (col, val)) in key_columns.iter().zip(key_values.iter()).enumerate() {
        if i > 0 {
            b.push_str(" AND ");
        }
        b.push_ident(col).push_str(" = ").push_param(val.clone());
    }
    b.push_str(" LIMIT 1");
    let (sql, sql_args) = b.finish();
    let mut rows = ctx.driver.query(&sql, &sql_args).await?;
    let scan_columns: Vec<ScanColumn> = table.columns.iter().map(|c| ScanColumn::from_column(c.name.clone(), c)).collect();
    match rows.next_row()? {
        Some(raw) => Ok(Some(scan_row(&scan_columns, &raw)?)),
        None => Ok(None),
    }
}

/// `node(id: ID!): Node` — decodes the opaque id, dispatches to the table
/// it names, and re-fetches that single row.
pub fn build_node_field(ctx: Arc<ResolverContext>) -> Field {
    Field::new("node", TypeRef::named("Node"), move |field_ctx| {
        let ctx = ctx.clone();
        FieldFuture::new(async move {
            let id = match get_arg(&field_ctx, "id") {
                Some(GqlValue::String(s)) => s,
                _ => return Err(GqlError::new("node requires an id argument")),
            };
            let (type_name, _) = crate::node_id::decode_untyped(&id).map_err(core_err)?;
            let table_name = ctx
                .type_to_table
                .get(&type_name)
                .ok_or_else(|| GqlError::new(format!("unknown node type {type_name}")))?;
            let table = ctx
                .schema
                .table(table_name)
                .ok_or_else(|| GqlError::new(format!("unknown table {table_name}")))?;
            let pk_kinds: Vec<ColumnKind> = table.primary_key.iter().filter_map(|c| table.column(c).map(|col| col.kind.clone())).collect();
            let key = crate::node_id::decode_typed(&id, &type_name, &pk_kinds).map_err(core_err)?;
            let row = fetch_one_by_key(&ctx, table, &table.primary_key, &key).await.map_err(core_err)?;
            Ok(row.map(|r| FieldValue::owned_any(r).with_type(type_name)))
        })
    })
}

fn key_arg_spec(table: &Table, naming: &dyn NamingStrategy, columns: &[String]) -> Vec<(String, ColumnKind)> {
    columns.iter().filter_map(|c| table.column(c).map(|col| (naming.field_name(c), col.kind.clone()))).collect()
}

async fn resolve_by_key(ctx: &Arc<ResolverContext>, field_ctx: &DynCtx<'_>, table_name: &str, key_columns: &[String], arg_spec: &[(String, ColumnKind)]) -> async_graphql::Result<Option<FieldValue<'static>>> {
    let table = ctx.schema.table(table_name).ok_or_else(|| GqlError::new("unknown table"))?;
    let mut key = Vec::with_capacity(arg_spec.len());
    for (arg_name, kind) in arg_spec {
        let raw = get_arg(field_ctx, arg_name).ok_or_else(|| GqlError::new(format!("missing argument {arg_name}")))?;
        key.push(args::gql_scalar_to_value(&raw, kind).map_err(core_err)?);
    }
    let row = fetch_one_by_key(ctx, table, key_columns, &key).await.map_err(core_err)?;
    Ok(row.map(FieldValue::owned_any))
}

/// `<singular>(pk columns...): Type` — direct PK lookup.
pub fn build_single_row_field(table: &Table, ctx: Arc<ResolverContext>) -> Field {
    let type_name = ctx.naming.type_name(&table.name);
    let field_name = lower_first(&type_name);
    let table_name = table.name.clone();
    let key_columns = table.primary_key.clone();
    let arg_spec = key_arg_spec(table, &*ctx.naming, &key_columns);
    let arg_spec_for_field = arg_spec.clone();

    let mut field = Field::new(field_name, TypeRef::named(&type_name), move |field_ctx| {
        let ctx = ctx.clone();
        let table_name = table_name.clone();
        let key_columns = key_columns.clone();
        let arg_spec = arg_spec.clone();
        FieldFuture::new(async move { resolve_by_key(&ctx, &field_ctx, &table_name, &key_columns, &arg_spec).await })
    });
    for (arg_name, kind) in &arg_spec_for_field {
        field = field.argument(InputValue::new(arg_name, crate::registry::scalar::column_type_ref(kind, false)));
    }
    field
}

/// `<singular>By<Cols>(...)`: lookup by a declared non-PK unique index.
pub fn build_unique_index_field(table: &Table, index: &Index, ctx: Arc<ResolverContext>) -> Field {
    let type_name = ctx.naming.type_name(&table.name);
    let suffix: String = index.columns.iter().map(|c| pascal(c)).collect();
    let field_name = format!("{}By{}", lower_first(&type_name), suffix);
    let table_name = table.name.clone();
    let key_columns = index.columns.clone();
    let arg_spec = key_arg_spec(table, &*ctx.naming, &key_columns);
    let arg_spec_for_field = arg_spec.clone();

    let mut field = Field::new(field_name, TypeRef::named(&type_name), move |field_ctx| {
        let ctx = ctx.clone();
        let table_name = table_name.clone();
        let key_columns = key_columns.clone();
        let arg_spec = arg_spec.clone();
        FieldFuture::new(async move { resolve_by_key(&ctx, &field_ctx, &table_name, &key_columns, &arg_spec).await })
    });
    for (arg_name, kind) in &arg_spec_for_field {
        field = field.argument(InputValue::new(arg_name, crate::registry::scalar::column_type_ref(kind, false)));
    }
    field
}

/// Root `<plural>(first, after, last, before, where, orderBy): {Type}Connection!`
/// listing field.
pub fn build_connection_field(table: &Table, ctx: Arc<ResolverContext>) -> Field {
    let type_name = ctx.naming.type_name(&table.name);
    let connection_type_name = ctx.naming.connection_type_name(&table.name);
    let field_name = ctx.naming.field_name(&table.name);
    let table_name = table.name.clone();
    let where_type = ctx.naming.where_input_name(&table.name);
    let order_type = ctx.naming.order_by_input_name(&table.name);

    let mut field = Field::new(field_name, TypeRef::named_nn(&connection_type_name), move |field_ctx| {
        let ctx = ctx.clone();
        let table_name = table_name.clone();
        let type_name = type_name.clone();
        FieldFuture::new(async move {
            let table = ctx.schema.table(&table_name).ok_or_else(|| GqlError::new("unknown table"))?;

            let first = arg_i64(&field_ctx, "first");
            let last = arg_i64(&field_ctx, "last");
            let after = arg_string(&field_ctx, "after");
            let before = arg_string(&field_ctx, "before");
            let conn_args = if first.is_none() && last.is_none() {
                ConnectionArgs { first: Some(ctx.options.default_page_size), after, before, last }
            } else {
                ConnectionArgs { first, last, after, before }
            };
            let direction = conn_args.validate(ctx.options.max_page_size).map_err(core_err)?;

            let where_input = match get_arg(&field_ctx, "where") {
                Some(v) if !matches!(v, GqlValue::Null) => Some(args::parse_where(&ctx.schema, table, &v).map_err(core_err)?),
                _ => None,
            };
            let order_by = match get_arg(&field_ctx, "orderBy") {
                Some(v) if !matches!(v, GqlValue::Null) => args::parse_order_by(&v).map_err(core_err)?,
                _ => default_order_by(table),
            };
            let order_cols = order_by.columns();
            table.validate_order_by_policy(&order_cols, ctx.options.order_by_policy).map_err(|reason| {
                ctx.telemetry.record_order_by_rejected(&table.name, &reason);
                core_err(CoreError::BadInput(reason))
            })?;

            let cursor_kinds: Vec<ColumnKind> = order_by.0.iter().map(|c| table.column(&c.column).map(|col| col.kind.clone()).unwrap_or(ColumnKind::String)).collect();
            let cursor_str = match direction {
                crate::planner::PageDirection::Forward => conn_args.after.as_deref(),
                crate::planner::PageDirection::Backward => conn_args.before.as_deref(),
            };
            let cursor_values = cursor_str.map(|c| cursor::decode(c, &type_name, &order_by, &cursor_kinds)).transpose().map_err(core_err)?;

            let plan = ConnectionPlan { table, order_by: order_by.clone(), where_input: where_input.clone(), direction, page_size: conn_args.limit(), cursor_values };

            // `ConnectionPlan::build_page_sql` emits `SELECT *`, so the scan
            // columns must cover every table column, not just the PK/order-by
            // subset `widen_selection` would otherwise narrow it to.
            let scan_columns: Vec<ScanColumn> = table.columns.iter().map(|c| ScanColumn::from_column(c.name.clone(), c)).collect();

            let executor = ConnectionExecutor::new(&*ctx.driver, &ctx.schema);
            let result = executor.execute(&plan, &scan_columns, &type_name).await.map_err(core_err)?;

            let mut edges = result.edges;
            if let Ok(batch_state) = field_ctx.ctx.data::<Arc<BatchState>>() {
                let mut rows: Vec<ScannedRow> = edges.iter().map(|e| e.node.clone()).collect();
                batch_state.seed_parent_group(&mut rows);
                for (edge, row) in edges.iter_mut().zip(rows.into_iter()) {
                    edge.node = row;
                }
            }

            let wants_total = field_ctx.ctx.look_ahead().field("totalCount").exists();
            let total_count = if wants_total { Some(executor.total_count(&plan).await.map_err(core_err)?) } else { None };
            let aggregate_fields = parse_aggregate_selection(&field_ctx, table, &*ctx.naming);
            let aggregate = if aggregate_fields.is_empty() {
                None
            } else {
                Some(executor.aggregate(&plan, &aggregate_fields).await.map_err(core_err)?)
            };

            let resolved = ResolvedConnection { edges, page_info: result.page_info, total_count, aggregate };
            Ok(Some(FieldValue::owned_any(resolved)))
        })
    });
    field = field
        .argument(InputValue::new("first", TypeRef::named(TypeRef::INT)))
        .argument(InputValue::new("after", TypeRef::named(TypeRef::STRING)))
        .argument(InputValue::new("last", TypeRef::named(TypeRef::INT)))
        .argument(InputValue::new("before", TypeRef::named(TypeRef::STRING)))
        .argument(InputValue::new("where", TypeRef::named(where_type)))
        .argument(InputValue::new("orderBy", TypeRef::named_list(order_type)));
    field
}

/// Walks the connection field's own selection set for an `aggregate { ... }`
/// sub-selection and turns the `count`/`sum`/`avg`/`min`/`max` sub-fields the
/// client actually asked for into `AggregateField`s, keyed by the
/// `"{op}_{column}"` alias convention the registry's `{Type}AggregateResult`
/// type expects back (spec.md §4.2/§4.4: aggregate clauses follow the
/// client's own sub-selection, not a fixed shape).
fn parse_aggregate_selection(field_ctx: &DynCtx<'_>, table: &Table, naming: &dyn NamingStrategy) -> Vec<AggregateField> {
    let mut fields = Vec::new();
    let current = field_ctx.ctx.field();
    let Some(aggregate_field) = current.selection_set().find(|f| f.name() == "aggregate") else {
        return fields;
    };
    for op_field in aggregate_field.selection_set() {
        let op_name = op_field.name();
        if op_name == "count" {
            fields.push(AggregateField { op: AggregateFn::Count, column: "*".to_string(), alias: "count".to_string() });
            continue;
        }
        let op = match op_name {
            "sum" => AggregateFn::Sum,
            "avg" => AggregateFn::Avg,
            "min" => AggregateFn::Min,
            "max" => AggregateFn::Max,
            _ => continue,
        };
        for column_field in op_field.selection_set() {
            let gql_name = column_field.name();
            if let Some(column) = table.columns.iter().find(|c| naming.field_name(&c.name) == gql_name) {
                fields.push(AggregateField { op, column: column.name.clone(), alias: format!("{op_name}_{}", column.name) });
            }
        }
    }
    fields
}

/// `<field>VectorSearch(column, vector, metric, first, after, where):
/// {Type}VectorConnection!` — only built for tables carrying at least one
/// *indexed* vector column (spec.md §4.1). `first` is capped both by the
/// deployment's configured `MaxTopK` (`ResolverOptions::max_top_k`) and the
/// hard ceiling `planner::vector_search::MAX_TOP_K`; overfetch-by-one
/// detects `hasNextPage` the same way an ordinary connection does.
pub fn build_vector_search_field(table: &Table, ctx: Arc<ResolverContext>) -> Option<Field> {
    if table.indexed_vector_columns().is_empty() {
        return None;
    }
    let type_name = ctx.naming.type_name(&table.name);
    let vector_connection_type_name = format!("{type_name}VectorConnection");
    let cursor_type_name = format!("{type_name}Vector");
    let field_name = format!("{}VectorSearch", ctx.naming.field_name(&table.name));
    let table_name = table.name.clone();
    let where_type = ctx.naming.where_input_name(&table.name);

    let mut field = Field::new(field_name, TypeRef::named_nn(&vector_connection_type_name), move |field_ctx| {
        let ctx = ctx.clone();
        let table_name = table_name.clone();
        let cursor_type_name = cursor_type_name.clone();
        FieldFuture::new(async move {
            let table = ctx.schema.table(&table_name).ok_or_else(|| GqlError::new("unknown table"))?;
            let column = arg_string(&field_ctx, "column").ok_or_else(|| GqlError::new("column is required"))?;
            let vector = arg_string(&field_ctx, "vector").ok_or_else(|| GqlError::new("vector is required"))?;
            let metric = match get_arg(&field_ctx, "metric") {
                Some(GqlValue::Enum(m)) if m.as_str() == "L2" => VectorMetric::L2,
                Some(GqlValue::Enum(m)) if m.as_str() == "INNER_PRODUCT" => VectorMetric::InnerProduct,
                _ => VectorMetric::Cosine,
            };
            let page_size = arg_i64(&field_ctx, "first").unwrap_or(ctx.options.max_top_k).min(ctx.options.max_top_k);
            let after = arg_string(&field_ctx, "after");

            let where_input = match get_arg(&field_ctx, "where") {
                Some(v) if !matches!(v, GqlValue::Null) => Some(args::parse_where(&ctx.schema, table, &v).map_err(core_err)?),
                _ => None,
            };

            let pk_kinds: Vec<ColumnKind> = table.primary_key.iter().filter_map(|c| table.column(c).map(|col| col.kind.clone())).collect();
            let mut cursor_kinds = vec![ColumnKind::Float];
            cursor_kinds.extend(pk_kinds);
            let vector_order_by = crate::connection_executor::vector_cursor_order_by(&table.primary_key);
            let after = after
                .map(|c| cursor::decode(&c, &cursor_type_name, &vector_order_by, &cursor_kinds))
                .transpose()
                .map_err(core_err)?
                .map(|mut values| {
                    let distance = values.remove(0);
                    (distance, values)
                });

            let plan = crate::planner::vector_search::VectorSearchPlan {
                table,
                column,
                metric,
                query_vector: vector,
                where_input,
                page_size,
                after,
            };

            let mut scan_columns: Vec<ScanColumn> = table.columns.iter().map(|c| ScanColumn::from_column(c.name.clone(), c)).collect();
            scan_columns.push(ScanColumn::extra(DISTANCE_ALIAS, ColumnKind::Float));

            let resolved = crate::connection_executor::execute_vector_search(&*ctx.driver, &ctx.schema, &plan, &scan_columns, &cursor_type_name)
                .await
                .map_err(core_err)?;
            Ok(Some(FieldValue::owned_any(resolved)))
        })
    });
    field = field
        .argument(InputValue::new("column", TypeRef::named_nn(TypeRef::STRING)))
        .argument(InputValue::new("vector", TypeRef::named_nn(TypeRef::STRING)))
        .argument(InputValue::new("metric", TypeRef::named("VectorMetric")))
        .argument(InputValue::new("first", TypeRef::named(TypeRef::INT)))
        .argument(InputValue::new("after", TypeRef::named(TypeRef::STRING)))
        .argument(InputValue::new("where", TypeRef::named(where_type)));
    Some(field)
}

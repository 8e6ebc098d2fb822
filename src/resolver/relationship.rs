// Relationship field resolvers (SPEC_FULL.md §4.3/§4.6): attaches one field
// per declared `Relationship` onto a table's object type, routed through
// `BatchState` so sibling parents fetched together never issue more than
// one batch query per relationship per request.
//
// Batched and single-parent resolution are the same code path: a row with
// no `__batch_parent_group` stamp is just treated as a sibling group of one
// (`sibling_rows`). There is no separate unbatched fallback.

use super::context::ResolverContext;
use super::root::{arg_i64, arg_string, core_err, default_order_by, get_arg};
use crate::batch::{parent_group_id, BatchState};
use crate::connection_executor::{Edge, PageInfo, ResolvedConnection};
use crate::cursor;
use crate::error::{CoreError, Result};
use crate::model::{ColumnKind, Direction, OrderBy, Relationship, Table};
use crate::planner::connection::ConnectionArgs;
use crate::planner::PageDirection;
use crate::scan::ScannedRow;
use crate::value::Value;
use async_graphql::dynamic::{Field, FieldFuture, FieldValue, InputValue, Object, ResolverContext as DynCtx, TypeRef};
use async_graphql::{Error as GqlError, Value as GqlValue};
use std::sync::Arc;

fn batch_state(field_ctx: &DynCtx<'_>) -> async_graphql::Result<Arc<BatchState>> {
    field_ctx
        .ctx
        .data::<Arc<BatchState>>()
        .cloned()
        .map_err(|_| GqlError::new("relationship resolution requires a per-request batching context"))
}

fn sibling_rows(bs: &BatchState, row: &ScannedRow) -> Vec<ScannedRow> {
    match parent_group_id(row) {
        Some(id) => bs.parent_group(id).map(|arc| (*arc).clone()).unwrap_or_else(|| vec![row.clone()]),
        None => vec![row.clone()],
    }
}

fn parent_key_from_row(rel: &Relationship, row: &ScannedRow) -> Option<Vec<Value>> {
    let mut key = Vec::with_capacity(rel.local_columns.len());
    for col in &rel.local_columns {
        match row.get(col) {
            Some(v) if !v.is_null() => key.push(v.clone()),
            _ => return None,
        }
    }
    Some(key)
}

fn parent_row(field_ctx: &DynCtx<'_>) -> async_graphql::Result<ScannedRow> {
    field_ctx
        .parent_value
        .try_downcast_ref::<ScannedRow>()
        .map(|r| r.clone())
        .map_err(|_| GqlError::new("expected a scanned row as the parent value"))
}

/// Many-to-one: nullable single related object, no arguments.
pub fn build_many_to_one_field(table: &Table, rel: &Relationship, ctx: Arc<ResolverContext>) -> Field {
    let remote_type = ctx.naming.type_name(&rel.remote_table);
    let field_name = ctx.naming.field_name(&rel.name);
    let parent_table_name = table.name.clone();
    let rel = rel.clone();

    Field::new(field_name, TypeRef::named(remote_type), move |field_ctx| {
        let ctx = ctx.clone();
        let rel = rel.clone();
        let parent_table_name = parent_table_name.clone();
        FieldFuture::new(async move {
            let row = parent_row(&field_ctx)?;
            let Some(parent_key) = parent_key_from_row(&rel, &row) else {
                return Ok(None);
            };
            let parent_table = ctx.schema.table(&parent_table_name).ok_or_else(|| GqlError::new("unknown table"))?;
            let bs = batch_state(&field_ctx)?;
            let siblings = sibling_rows(&bs, &row);
            bs.ensure_loaded(&*ctx.driver, &ctx.schema, parent_table, &rel, &siblings, None, None, &*ctx.telemetry)
                .await
                .map_err(core_err)?;
            let related = bs.get(&rel, None, None, &parent_key);
            Ok(related.into_iter().next().map(FieldValue::owned_any))
        })
    })
}

/// One-to-many / many-to-many / edge-list: a `{Remote}Connection!` field
/// with the usual Relay pagination plus `where`/`orderBy`. All matching
/// rows are fetched once per batch (SQL already applies `ORDER BY`), so
/// pagination here is purely an in-memory windowing of that result.
pub fn build_to_many_field(table: &Table, rel: &Relationship, ctx: Arc<ResolverContext>) -> Field {
    let connection_type_name = ctx.naming.connection_type_name(&rel.remote_table);
    let field_name = ctx.naming.field_name(&rel.name);
    let parent_table_name = table.name.clone();
    let where_type = ctx.naming.where_input_name(&rel.remote_table);
    let order_type = ctx.naming.order_by_input_name(&rel.remote_table);
    let rel = rel.clone();

    let mut field = Field::new(field_name, TypeRef::named_nn(&connection_type_name), move |field_ctx| {
        let ctx = ctx.clone();
        let rel = rel.clone();
        let parent_table_name = parent_table_name.clone();
        FieldFuture::new(async move {
            let row = parent_row(&field_ctx)?;
            let parent_table = ctx.schema.table(&parent_table_name).ok_or_else(|| GqlError::new("unknown table"))?;
            let remote = ctx.schema.table(&rel.remote_table).ok_or_else(|| GqlError::new("unknown remote table"))?;

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
                Some(v) if !matches!(v, GqlValue::Null) => Some(super::args::parse_where(&ctx.schema, remote, &v).map_err(core_err)?),
                _ => None,
            };
            let order_by = match get_arg(&field_ctx, "orderBy") {
                Some(v) if !matches!(v, GqlValue::Null) => super::args::parse_order_by(&v).map_err(core_err)?,
                _ => default_order_by(remote),
            };
            let order_cols = order_by.columns();
            remote.validate_order_by_policy(&order_cols, ctx.options.order_by_policy).map_err(|reason| {
                ctx.telemetry.record_order_by_rejected(&remote.name, &reason);
                core_err(CoreError::BadInput(reason))
            })?;

            let bs = batch_state(&field_ctx)?;
            let siblings = sibling_rows(&bs, &row);
            bs.ensure_loaded(&*ctx.driver, &ctx.schema, parent_table, &rel, &siblings, where_input.as_ref(), Some(&order_by), &*ctx.telemetry)
                .await
                .map_err(core_err)?;

            let Some(parent_key) = parent_key_from_row(&rel, &row) else {
                return Ok(Some(FieldValue::owned_any(empty_connection())));
            };
            let related = bs.get(&rel, where_input.as_ref(), Some(&order_by), &parent_key);

            let cursor_kinds: Vec<ColumnKind> = order_by.0.iter().map(|c| remote.column(&c.column).map(|col| col.kind.clone()).unwrap_or(ColumnKind::String)).collect();
            let remote_type_name = ctx.naming.type_name(&rel.remote_table);
            let resolved = windowed_connection(&related, &order_by, &cursor_kinds, &remote_type_name, &conn_args, direction).map_err(core_err)?;
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

fn empty_connection() -> ResolvedConnection {
    ResolvedConnection {
        edges: Vec::new(),
        page_info: PageInfo { has_next_page: false, has_previous_page: false, start_cursor: None, end_cursor: None },
        total_count: Some(0),
        aggregate: None,
    }
}

/// In-memory keyset pagination over an already-fetched, already-ordered
/// row set, mirroring `ConnectionPlan::build_page_sql`'s semantics without
/// a further SQL round trip.
fn windowed_connection(related: &[ScannedRow], order_by: &OrderBy, cursor_kinds: &[ColumnKind], type_name: &str, conn_args: &ConnectionArgs, direction: PageDirection) -> Result<ResolvedConnection> {
    let total = related.len() as i64;
    let limit = conn_args.limit().max(0) as usize;
    match direction {
        PageDirection::Forward => {
            let start = match &conn_args.after {
                Some(c) => keyset_index(related, order_by, &cursor::decode(c, type_name, order_by, cursor_kinds)?),
                None => 0,
            };
            let slice = &related[start.min(related.len())..];
            let has_next = slice.len() > limit;
            let page: Vec<ScannedRow> = slice.iter().take(limit).cloned().collect();
            Ok(build_resolved(page, has_next, start > 0, order_by, type_name, total))
        }
        PageDirection::Backward => {
            let end = match &conn_args.before {
                Some(c) => keyset_index(related, order_by, &cursor::decode(c, type_name, order_by, cursor_kinds)?),
                None => related.len(),
            };
            let slice = &related[..end.min(related.len())];
            let has_prev = slice.len() > limit;
            let skip = slice.len().saturating_sub(limit);
            let page: Vec<ScannedRow> = slice[skip..].to_vec();
            Ok(build_resolved(page, end < related.len(), has_prev, order_by, type_name, total))
        }
    }
}

fn build_resolved(page: Vec<ScannedRow>, has_next: bool, has_prev: bool, order_by: &OrderBy, type_name: &str, total: i64) -> ResolvedConnection {
    let edges: Vec<Edge> = page
        .into_iter()
        .map(|row| {
            let values: Vec<Value> = order_by.columns().iter().map(|c| row.get(*c).cloned().unwrap_or(Value::Null)).collect();
            let cursor = cursor::encode(type_name, order_by, &values);
            Edge { cursor, node: row }
        })
        .collect();
    let start_cursor = edges.first().map(|e| e.cursor.clone());
    let end_cursor = edges.last().map(|e| e.cursor.clone());
    ResolvedConnection { edges, page_info: PageInfo { has_next_page: has_next, has_previous_page: has_prev, start_cursor, end_cursor }, total_count: Some(total), aggregate: None }
}

/// Index of the first row ordered strictly after `values`, the in-memory
/// analogue of the keyset predicate `ConnectionPlan::build_page_sql` pushes
/// into SQL for root connections.
fn keyset_index(rows: &[ScannedRow], order_by: &OrderBy, values: &[Value]) -> usize {
    rows.iter().position(|row| row_after(row, order_by, values)).unwrap_or(rows.len())
}

fn row_after(row: &ScannedRow, order_by: &OrderBy, values: &[Value]) -> bool {
    for (clause, cursor_val) in order_by.0.iter().zip(values.iter()) {
        let row_val = row.get(&clause.column).cloned().unwrap_or(Value::Null);
        match compare_values(&row_val, cursor_val) {
            std::cmp::Ordering::Equal => continue,
            std::cmp::Ordering::Less => return clause.direction == Direction::Desc,
            std::cmp::Ordering::Greater => return clause.direction == Direction::Asc,
        }
    }
    false
}

fn compare_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::UInt(x), Value::UInt(y)) => x.cmp(y),
        (Value::Int(x), Value::UInt(y)) => x.cmp(&(*y as i64)),
        (Value::UInt(x), Value::Int(y)) => (*x as i64).cmp(y),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::Str(x), Value::Str(y)) | (Value::DecimalStr(x), Value::DecimalStr(y)) => x.cmp(y),
        _ => a.canonical().cmp(&b.canonical()),
    }
}

/// Attach one field per declared relationship onto `table`'s already-built
/// object type.
pub fn attach_relationship_fields(table: &Table, mut object: Object, ctx: Arc<ResolverContext>) -> Object {
    for rel in &table.relationships {
        object = if rel.kind.is_connection() {
            object.field(build_to_many_field(table, rel, ctx.clone()))
        } else {
            object.field(build_many_to_one_field(table, rel, ctx.clone()))
        };
    }
    object
}

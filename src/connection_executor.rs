// Connection Executor (spec.md §4.2/§4.4): runs a `ConnectionPlan`,
// overfetching by one row to derive `hasNextPage`/`hasPreviousPage` without a
// second round trip, then lazily memoizes `totalCount` and `aggregate` the
// first time either is actually requested.

use crate::cursor;
use crate::driver::{RawCell, SqlDriver};
use crate::error::{CoreError, Result};
use crate::model::{Direction, OrderBy, OrderByClause, Schema};
use crate::planner::connection::{AggregateField, AggregateFn, PageDirection};
use crate::planner::vector_search::{VectorSearchPlan, DISTANCE_ALIAS};
use crate::planner::{build_aggregate_sql, ConnectionPlan};
use crate::scan::{scan_row, ScanColumn, ScannedRow};
use crate::value::Value;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

#[derive(Debug, Clone)]
pub struct Edge {
    pub cursor: String,
    pub node: ScannedRow,
}

#[derive(Debug, Clone, Default)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionResult {
    pub edges: Vec<Edge>,
    pub page_info: PageInfo,
}

/// A connection's fully-resolved response, assembled eagerly by the
/// resolver layer from `ConnectionResult` plus whichever of `totalCount`
/// and `aggregate` the client's selection set actually asked for (spec.md
/// §4.4: "computed lazily, at most once, only if requested").
#[derive(Debug, Clone, Default)]
pub struct ResolvedConnection {
    pub edges: Vec<Edge>,
    pub page_info: PageInfo,
    pub total_count: Option<i64>,
    pub aggregate: Option<HashMap<String, Value>>,
}

/// One per resolved connection field. Not shared across fields or requests —
/// `totalCount` and `aggregate` are only ever computed for the specific
/// predicate this instance was built against.
pub struct ConnectionExecutor<'a> {
    driver: &'a dyn SqlDriver,
    schema: &'a Schema,
    total_count: OnceCell<i64>,
    /// One memoized slot per distinct aggregate-selection fingerprint, not a
    /// single shared slot: two differently-shaped `aggregate { ... }`
    /// selections against the same connection must not collide.
    aggregate: Mutex<HashMap<String, Arc<OnceCell<HashMap<String, Value>>>>>,
}

impl<'a> ConnectionExecutor<'a> {
    pub fn new(driver: &'a dyn SqlDriver, schema: &'a Schema) -> Self {
        Self {
            driver,
            schema,
            total_count: OnceCell::new(),
            aggregate: Mutex::new(HashMap::new()),
        }
    }

    pub async fn execute(&self, plan: &ConnectionPlan<'_>, scan_columns: &[ScanColumn], type_name: &str) -> Result<ConnectionResult> {
        let (sql, args) = plan.build_page_sql(self.schema)?;
        let mut rows = self.driver.query(&sql, &args).await?;
        let mut scanned = Vec::new();
        while let Some(raw) = rows.next_row()? {
            scanned.push(scan_row(scan_columns, &raw)?);
        }

        let overfetched = scanned.len() as i64 > plan.page_size;
        if overfetched {
            scanned.truncate(plan.page_size as usize);
        }
        if plan.direction == PageDirection::Backward {
            scanned.reverse();
        }

        let (has_next_page, has_previous_page) = match plan.direction {
            PageDirection::Forward => (overfetched, plan.cursor_values.is_some()),
            PageDirection::Backward => (plan.cursor_values.is_some(), overfetched),
        };

        let edges: Vec<Edge> = scanned
            .into_iter()
            .map(|row| {
                let values: Vec<Value> = plan.order_by.columns().iter().map(|c| row.get(*c).cloned().unwrap_or(Value::Null)).collect();
                let cursor = cursor::encode(type_name, &plan.order_by, &values);
                Edge { cursor, node: row }
            })
            .collect();

        let start_cursor = edges.first().map(|e| e.cursor.clone());
        let end_cursor = edges.last().map(|e| e.cursor.clone());

        Ok(ConnectionResult {
            edges,
            page_info: PageInfo { has_next_page, has_previous_page, start_cursor, end_cursor },
        })
    }

    /// Memoized `totalCount`: computed once per executor instance no matter
    /// how many times the field is read during response serialization.
    pub async fn total_count(&self, plan: &ConnectionPlan<'_>) -> Result<i64> {
        let schema = self.schema;
        let driver = self.driver;
        self.total_count
            .get_or_try_init(|| async move {
                let (sql, args) = plan.build_count_sql(schema)?;
                let mut rows = driver.query(&sql, &args).await?;
                let raw = rows
                    .next_row()?
                    .ok_or_else(|| CoreError::ExecutorFailure("count query returned no rows".to_string()))?;
                scalar_to_i64(raw.first().ok_or_else(|| CoreError::ExecutorFailure("count query returned no columns".to_string()))?)
            })
            .await
            .map(|v| *v)
    }

    /// Memoized `aggregate`, keyed by the requested fields' fingerprint so
    /// that at most one query runs per unique aggregate selection (spec.md
    /// §4.4 / invariant 8), not just once per executor instance.
    pub async fn aggregate(&self, plan: &ConnectionPlan<'_>, fields: &[AggregateField]) -> Result<HashMap<String, Value>> {
        let key = aggregate_fingerprint(fields);
        let cell = self.aggregate.lock().entry(key).or_insert_with(|| Arc::new(OnceCell::new())).clone();

        let schema = self.schema;
        let driver = self.driver;
        let table = plan.table;
        let where_input = plan.where_input.as_ref();
        let fields = fields.to_vec();
        cell.get_or_try_init(|| async move {
            let (sql, args) = build_aggregate_sql(schema, table, where_input, &fields)?;
            let mut rows = driver.query(&sql, &args).await?;
            let raw = rows
                .next_row()?
                .ok_or_else(|| CoreError::ExecutorFailure("aggregate query returned no rows".to_string()))?;
            let scan_columns: Vec<ScanColumn> =
                fields.iter().map(|f| ScanColumn::extra(f.alias.clone(), aggregate_kind(table, f))).collect();
            scan_row(&scan_columns, &raw)
        })
        .await
        .map(|v| v.clone())
    }
}

/// Deterministic fingerprint of an aggregate selection: order-independent so
/// equivalent selections gathered in different GraphQL field orders still
/// share one cached computation.
fn aggregate_fingerprint(fields: &[AggregateField]) -> String {
    let mut parts: Vec<String> = fields.iter().map(|f| format!("{:?}:{}:{}", f.op, f.column, f.alias)).collect();
    parts.sort();
    parts.join("|")
}

/// One row of a vector-search page (spec.md §4.2 "vector-distance
/// searches"): like a plain `Edge` but carrying the distance and this
/// page's 1-indexed rank alongside the node.
#[derive(Debug, Clone)]
pub struct VectorEdge {
    pub cursor: String,
    pub node: ScannedRow,
    pub distance: f64,
    pub rank: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedVectorConnection {
    pub edges: Vec<VectorEdge>,
    pub page_info: PageInfo,
}

/// Cursor ordering synthesized for vector search: `(__distance ASC, pk...
/// ASC)`. Not a real table ordering — it exists only so the generic cursor
/// codec can bind each vector-search edge's cursor to this connection's
/// shape and reject cursors minted elsewhere.
pub fn vector_cursor_order_by(pk_columns: &[String]) -> OrderBy {
    let mut clauses = vec![OrderByClause { column: DISTANCE_ALIAS.to_string(), direction: Direction::Asc }];
    clauses.extend(pk_columns.iter().map(|c| OrderByClause { column: c.clone(), direction: Direction::Asc }));
    OrderBy::new(clauses)
}

/// `cursorTypeName` should be distinct from the node's plain connection
/// cursor type name (callers use `"{Type}Vector"`) so a page cursor and a
/// vector-search cursor can never be swapped for one another even though
/// both encode the same node type.
pub async fn execute_vector_search(
    driver: &dyn SqlDriver,
    schema: &Schema,
    plan: &VectorSearchPlan<'_>,
    scan_columns: &[ScanColumn],
    cursor_type_name: &str,
) -> Result<ResolvedVectorConnection> {
    let (sql, args) = plan.build_page_sql(schema)?;
    let mut rows = driver.query(&sql, &args).await?;
    let mut scanned = Vec::new();
    while let Some(raw) = rows.next_row()? {
        scanned.push(scan_row(scan_columns, &raw)?);
    }

    let has_next_page = scanned.len() as i64 > plan.page_size;
    if has_next_page {
        scanned.truncate(plan.page_size as usize);
    }

    let order_by = vector_cursor_order_by(&plan.table.primary_key);
    let mut edges = Vec::with_capacity(scanned.len());
    for (i, row) in scanned.into_iter().enumerate() {
        let distance_value = row.get(DISTANCE_ALIAS).cloned().unwrap_or(Value::Null);
        let distance = match &distance_value {
            Value::Float(f) => *f,
            Value::Int(i) => *i as f64,
            _ => 0.0,
        };
        let mut cursor_values = vec![distance_value];
        cursor_values.extend(plan.table.primary_key.iter().map(|c| row.get(c).cloned().unwrap_or(Value::Null)));
        let cursor = cursor::encode(cursor_type_name, &order_by, &cursor_values);
        edges.push(VectorEdge { cursor, node: row, distance, rank: i as i64 + 1 });
    }

    let start_cursor = edges.first().map(|e| e.cursor.clone());
    let end_cursor = edges.last().map(|e| e.cursor.clone());
    Ok(ResolvedVectorConnection {
        edges,
        page_info: PageInfo { has_next_page, has_previous_page: plan.after.is_some(), start_cursor, end_cursor },
    })
}

fn aggregate_kind(table: &crate::model::Table, field: &AggregateField) -> crate::model::ColumnKind {
    use crate::model::ColumnKind;
    if field.op == AggregateFn::Count {
        return ColumnKind::BigInt;
    }
    table.column(&field.column).map(|c| c.kind.clone()).unwrap_or(ColumnKind::Float)
}

fn scalar_to_i64(cell: &RawCell) -> Result<i64> {
    match cell {
        RawCell::Int(i) => Ok(*i),
        RawCell::UInt(u) => i64::try_from(*u).map_err(|_| CoreError::ExecutorFailure("count overflowed i64".to_string())),
        other => Err(CoreError::InvariantViolation(format!("unexpected count cell {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::StaticDriver;
    use crate::model::{Column, ColumnKind, Direction, OrderBy, Table};

    fn schema_and_table() -> (Schema, Table) {
        let t = Table::new("authors", vec![Column::new("id", "int", false, ColumnKind::Int)]).with_primary_key(vec!["id".into()]);
        (Schema::new(vec![t.clone()]), t)
    }

    fn scan_columns() -> Vec<ScanColumn> {
        vec![ScanColumn { alias: "id".into(), kind: ColumnKind::Int, is_extra: false }]
    }

    #[tokio::test]
    async fn forward_page_detects_has_next_page_from_the_overfetched_row() {
        let (schema, table) = schema_and_table();
        let driver = StaticDriver::new(
            vec!["id".into()],
            (1..=4).map(|i| vec![RawCell::Int(i)]).collect(),
        );
        let plan = ConnectionPlan {
            table: schema.table("authors").unwrap(),
            order_by: OrderBy::single("id", Direction::Asc),
            where_input: None,
            direction: PageDirection::Forward,
            page_size: 3,
            cursor_values: None,
        };
        let executor = ConnectionExecutor::new(&driver, &schema);
        let result = executor.execute(&plan, &scan_columns(), "Author").await.unwrap();
        assert_eq!(result.edges.len(), 3);
        assert!(result.page_info.has_next_page);
        assert!(!result.page_info.has_previous_page);
    }

    #[tokio::test]
    async fn backward_page_reverses_rows_and_flags_has_previous_page() {
        let (schema, table) = schema_and_table();
        let driver = StaticDriver::new(
            vec!["id".into()],
            vec![vec![RawCell::Int(4)], vec![RawCell::Int(3)], vec![RawCell::Int(2)], vec![RawCell::Int(1)]],
        );
        let plan = ConnectionPlan {
            table: schema.table("authors").unwrap(),
            order_by: OrderBy::single("id", Direction::Asc),
            where_input: None,
            direction: PageDirection::Backward,
            page_size: 3,
            cursor_values: None,
        };
        let executor = ConnectionExecutor::new(&driver, &schema);
        let result = executor.execute(&plan, &scan_columns(), "Author").await.unwrap();
        // rows came back DESC-ordered from the (simulated) reversed-order
        // query; the executor reverses them into ascending client order.
        let ids: Vec<i64> = result.edges.iter().map(|e| e.node["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![2, 3, 4]);
        assert!(result.page_info.has_previous_page);
    }

    #[tokio::test]
    async fn vector_search_overfetches_and_assigns_page_local_rank() {
        use crate::model::ColumnKind as CK;
        let table = Table::new(
            "chunks",
            vec![Column::new("id", "int", false, CK::Int), Column::new("embedding", "vector", false, CK::Vector { dims: 3 })],
        )
        .with_primary_key(vec!["id".into()]);
        let schema = Schema::new(vec![table.clone()]);
        let driver = StaticDriver::new(
            vec!["id".into(), "__distance".into()],
            vec![
                vec![RawCell::Int(1), RawCell::Float(0.1)],
                vec![RawCell::Int(2), RawCell::Float(0.2)],
                vec![RawCell::Int(3), RawCell::Float(0.3)],
            ],
        );
        let plan = crate::planner::vector_search::VectorSearchPlan {
            table: schema.table("chunks").unwrap(),
            column: "embedding".into(),
            metric: crate::planner::vector_search::VectorMetric::Cosine,
            query_vector: "[1,0,0]".into(),
            where_input: None,
            page_size: 2,
            after: None,
        };
        let scan_columns = vec![
            ScanColumn { alias: "id".into(), kind: CK::Int, is_extra: false },
            ScanColumn::extra(DISTANCE_ALIAS, CK::Float),
        ];
        let result = execute_vector_search(&driver, &schema, &plan, &scan_columns, "ChunkVector").await.unwrap();
        assert_eq!(result.edges.len(), 2);
        assert!(result.page_info.has_next_page);
        assert_eq!(result.edges[0].rank, 1);
        assert_eq!(result.edges[1].rank, 2);
        assert_eq!(result.edges[0].distance, 0.1);
    }

    #[tokio::test]
    async fn total_count_is_computed_once() {
        let (schema, table) = schema_and_table();
        let driver = StaticDriver::new(vec!["COUNT(*)".into()], vec![vec![RawCell::Int(42)]]);
        let plan = ConnectionPlan {
            table: schema.table("authors").unwrap(),
            order_by: OrderBy::single("id", Direction::Asc),
            where_input: None,
            direction: PageDirection::Forward,
            page_size: 3,
            cursor_values: None,
        };
        let executor = ConnectionExecutor::new(&driver, &schema);
        assert_eq!(executor.total_count(&plan).await.unwrap(), 42);
        assert_eq!(executor.total_count(&plan).await.unwrap(), 42);
        let _ = &table;
    }
}

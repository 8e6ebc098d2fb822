// Relationship Batcher (spec.md §4.3): the N+1-avoidance engine. Given every
// parent row resolving the same relationship field at the same level of a
// query, issue one SQL statement for the lot instead of one per parent.
//
// Usage is two-phase, mirroring the DataLoader pattern: a resolver layer
// collects every parent row needing `rel` via look-ahead, calls
// `ensure_loaded` once, then calls `get` per parent while building the
// response.

use super::fingerprint::rel_key;
use super::state::{BatchState, RelationshipBucket};
use crate::driver::SqlDriver;
use crate::error::{CoreError, Result};
use crate::model::{ColumnKind, OrderBy, Relationship, Schema, Table};
use crate::planner::relationship::{build_batch, ParentKeySource};
use crate::planner::where_clause::WhereInput;
use crate::planner::DEFAULT_BATCH_MAX_IN_CLAUSE;
use crate::scan::{scan_row, ScanColumn, ScannedRow};
use crate::telemetry::TelemetrySink;
use crate::value::{canonical_tuple, Value};

impl BatchState {
    /// Populate the cache for `rel` (parameterized by `where_input` /
    /// `order_by`) so that every row in `parent_rows` has its related rows
    /// available via [`get`](Self::get) afterward. Rows already cached under
    /// this `rel_key` (from an earlier call with an overlapping parent set)
    /// are not re-fetched.
    #[allow(clippy::too_many_arguments)]
    pub async fn ensure_loaded(
        &self,
        driver: &dyn SqlDriver,
        schema: &Schema,
        parent_table: &Table,
        rel: &Relationship,
        parent_rows: &[ScannedRow],
        where_input: Option<&WhereInput>,
        order_by: Option<&OrderBy>,
        telemetry: &dyn TelemetrySink,
    ) -> Result<()> {
        let remote = schema
            .table(&rel.remote_table)
            .ok_or_else(|| CoreError::InvariantViolation(format!("relationship {} points at unknown table", rel.name)))?;

        if rel.kind.is_connection() && !remote.has_primary_key() {
            return Err(CoreError::PlanInfeasible(format!(
                "{} has no primary key; batched connection pagination is infeasible",
                remote.name
            )));
        }

        let key = rel_key(rel, where_input, order_by);
        let wanted = recover_parent_keys(parent_table, rel, parent_rows);

        let missing: Vec<Vec<Value>> = {
            let mut buckets = self.buckets.lock();
            let bucket = buckets.entry(key.clone()).or_default();
            let mut missing = Vec::new();
            for (canon, tuple) in &wanted {
                if bucket.results.contains_key(canon) {
                    self.record_hit();
                } else {
                    self.record_miss();
                    missing.push(tuple.clone());
                }
            }
            missing
        };

        if missing.is_empty() {
            return Ok(());
        }

        let mut fetched: Vec<(String, ScannedRow)> = Vec::new();
        for chunk in missing.chunks(DEFAULT_BATCH_MAX_IN_CLAUSE) {
            let query = build_batch(schema, rel, chunk, where_input, order_by)?;
            let started = std::time::Instant::now();
            let mut rows = driver.query(&query.sql, &query.args).await?;
            let scan_columns = scan_columns_for(remote, parent_table, rel, &query.parent_key_source, rows.columns());
            while let Some(raw) = rows.next_row()? {
                let scanned = scan_row(&scan_columns, &raw)?;
                let group_key = group_key_for(&scanned, &query.parent_key_source, rel);
                if let Some(canon) = group_key.as_ref().and_then(|g| canonical_tuple(g)) {
                    fetched.push((canon, scanned));
                }
            }
            telemetry.record_plan(&remote.name, started.elapsed());
        }

        let mut buckets = self.buckets.lock();
        let bucket = buckets.entry(key).or_insert_with(RelationshipBucket::default);
        // Every key in `missing` must appear in the bucket even with zero
        // rows, so `get` distinguishes "no related rows" from "not loaded".
        for tuple in &missing {
            if let Some(canon) = canonical_tuple(tuple) {
                bucket.results.entry(canon).or_default();
            }
        }
        for (canon, row) in fetched {
            bucket.results.entry(canon).or_default().push(row);
        }
        Ok(())
    }

    /// Fetch the related rows for one parent's key tuple. Must be called
    /// after `ensure_loaded` for the same `(rel, where_input, order_by)`.
    pub fn get(&self, rel: &Relationship, where_input: Option<&WhereInput>, order_by: Option<&OrderBy>, parent_key: &[Value]) -> Vec<ScannedRow> {
        let Some(canon) = canonical_tuple(parent_key) else {
            return Vec::new();
        };
        let key = rel_key(rel, where_input, order_by);
        let buckets = self.buckets.lock();
        buckets.get(&key).and_then(|b| b.results.get(&canon)).cloned().unwrap_or_default()
    }
}

/// Recover each parent row's FK tuple from `rel.local_columns`. Rows with a
/// null or missing component are skipped (partial composite FK) rather than
/// failing the whole batch — the Open Question resolved in SPEC_FULL.md §9.
fn recover_parent_keys(parent_table: &Table, rel: &Relationship, parent_rows: &[ScannedRow]) -> Vec<(String, Vec<Value>)> {
    let mut out = Vec::new();
    for row in parent_rows {
        let mut tuple = Vec::with_capacity(rel.local_columns.len());
        let mut complete = true;
        for col in &rel.local_columns {
            match row.get(col) {
                Some(Value::Null) | None => {
                    complete = false;
                    break;
                }
                Some(v) => tuple.push(v.clone()),
            }
        }
        if !complete {
            tracing::debug!(table = %parent_table.name, relationship = %rel.name, "skipping row with incomplete foreign key");
            continue;
        }
        if let Some(canon) = canonical_tuple(&tuple) {
            out.push((canon, tuple));
        }
    }
    out
}

fn scan_columns_for(remote: &Table, parent_table: &Table, rel: &Relationship, source: &ParentKeySource, raw_columns: &[String]) -> Vec<ScanColumn> {
    raw_columns
        .iter()
        .map(|name| {
            if let ParentKeySource::Extra(aliases) = source {
                if let Some(idx) = aliases.iter().position(|a| a == name) {
                    let local_col = rel.local_columns.get(idx).and_then(|c| parent_table.column(c));
                    let kind = local_col.map(|c| c.kind.clone()).unwrap_or(ColumnKind::String);
                    return ScanColumn::extra(name.clone(), kind);
                }
            }
            match remote.column(name) {
                Some(c) => ScanColumn::from_column(name.clone(), c),
                None => ScanColumn::extra(name.clone(), ColumnKind::String),
            }
        })
        .collect()
}

fn group_key_for(row: &ScannedRow, source: &ParentKeySource, _rel: &Relationship) -> Option<Vec<Value>> {
    let cols: &[String] = match source {
        ParentKeySource::Direct(cols) => cols,
        ParentKeySource::Extra(aliases) => aliases,
    };
    let mut out = Vec::with_capacity(cols.len());
    for c in cols {
        out.push(row.get(c)?.clone());
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{RawCell, StaticDriver};
    use crate::model::{Column, ColumnKind as CK, Table};
    use crate::telemetry::NoopTelemetry;

    fn schema_and_tables() -> (Schema, Table, Relationship) {
        let authors = Table::new("authors", vec![Column::new("id", "int", false, CK::Int)]).with_primary_key(vec!["id".into()]);
        let books = Table::new(
            "books",
            vec![
                Column::new("id", "int", false, CK::Int),
                Column::new("author_id", "int", false, CK::Int),
                Column::new("title", "varchar", false, CK::String),
            ],
        )
        .with_primary_key(vec!["id".into()]);
        let rel = Relationship::one_to_many("books", vec!["id".into()], "books", vec!["author_id".into()]);
        let schema = Schema::new(vec![authors.clone(), books]);
        (schema, authors, rel)
    }

    #[tokio::test]
    async fn ensure_loaded_groups_rows_by_recovered_parent_key() {
        let (schema, authors, rel) = schema_and_tables();
        let driver = StaticDriver::new(
            vec!["id".into(), "author_id".into(), "title".into()],
            vec![
                vec![RawCell::Int(10), RawCell::Int(1), RawCell::Str("A".into())],
                vec![RawCell::Int(11), RawCell::Int(1), RawCell::Str("B".into())],
                vec![RawCell::Int(12), RawCell::Int(2), RawCell::Str("C".into())],
            ],
        );
        let state = BatchState::new();
        let mut parent_rows = Vec::new();
        for id in [1, 2] {
            let mut row = ScannedRow::new();
            row.insert("id".into(), Value::Int(id));
            parent_rows.push(row);
        }
        state
            .ensure_loaded(&driver, &schema, &authors, &rel, &parent_rows, None, None, &NoopTelemetry)
            .await
            .unwrap();

        let books_for_1 = state.get(&rel, None, None, &[Value::Int(1)]);
        assert_eq!(books_for_1.len(), 2);
        let books_for_2 = state.get(&rel, None, None, &[Value::Int(2)]);
        assert_eq!(books_for_2.len(), 1);
    }

    #[tokio::test]
    async fn parent_with_no_related_rows_gets_an_empty_vec_not_a_cache_miss() {
        let (schema, authors, rel) = schema_and_tables();
        let driver = StaticDriver::new(vec!["id".into(), "author_id".into(), "title".into()], vec![]);
        let state = BatchState::new();
        let mut row = ScannedRow::new();
        row.insert("id".into(), Value::Int(99));
        state.ensure_loaded(&driver, &schema, &authors, &rel, &[row], None, None, &NoopTelemetry).await.unwrap();
        assert_eq!(state.get(&rel, None, None, &[Value::Int(99)]), Vec::new());
    }

    #[tokio::test]
    async fn second_call_with_an_already_cached_parent_is_a_pure_hit() {
        let (schema, authors, rel) = schema_and_tables();
        let driver = StaticDriver::new(
            vec!["id".into(), "author_id".into(), "title".into()],
            vec![vec![RawCell::Int(10), RawCell::Int(1), RawCell::Str("A".into())]],
        );
        let state = BatchState::new();
        let mut row = ScannedRow::new();
        row.insert("id".into(), Value::Int(1));
        state.ensure_loaded(&driver, &schema, &authors, &rel, &[row.clone()], None, None, &NoopTelemetry).await.unwrap();
        state.ensure_loaded(&driver, &schema, &authors, &rel, &[row], None, None, &NoopTelemetry).await.unwrap();
        assert_eq!(state.hits(), 1);
        assert_eq!(state.misses(), 1);
    }

    #[tokio::test]
    async fn row_with_null_foreign_key_is_skipped_not_fatal() {
        let (schema, authors, rel) = schema_and_tables();
        let driver = StaticDriver::new(vec!["id".into(), "author_id".into(), "title".into()], vec![]);
        let state = BatchState::new();
        let mut row = ScannedRow::new();
        row.insert("id".into(), Value::Null);
        state.ensure_loaded(&driver, &schema, &authors, &rel, &[row], None, None, &NoopTelemetry).await.unwrap();
    }

    #[tokio::test]
    async fn connection_relationship_on_a_pk_less_remote_table_is_plan_infeasible() {
        let authors = Table::new("authors", vec![Column::new("id", "int", false, CK::Int)]).with_primary_key(vec!["id".into()]);
        let books = Table::new(
            "books",
            vec![Column::new("id", "int", false, CK::Int), Column::new("author_id", "int", false, CK::Int)],
        ); // no primary key
        let schema = Schema::new(vec![authors.clone(), books]);
        let rel = Relationship::one_to_many("books", vec!["id".into()], "books", vec!["author_id".into()]);
        let driver = StaticDriver::new(vec![], vec![]);
        let state = BatchState::new();
        let mut row = ScannedRow::new();
        row.insert("id".into(), Value::Int(1));
        let err = state.ensure_loaded(&driver, &schema, &authors, &rel, &[row], None, None, &NoopTelemetry).await.unwrap_err();
        assert!(err.is_plan_infeasible());
    }
}

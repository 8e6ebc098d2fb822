// SQL Driver boundary (SPEC_FULL.md §1.1 external collaborator): the one
// seam the core treats as "out of scope" and abstracts entirely. Positional
// `?` parameters are the wire convention throughout the planner and batcher.

use crate::error::{CoreError, Result};
use crate::value::Value;
use async_trait::async_trait;

/// A single untyped cell as the driver returns it, before scan-layer
/// normalization maps it onto a column's `ColumnKind`.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bytes(Vec<u8>),
    Str(String),
}

pub type RawRow = Vec<RawCell>;

/// A lazily-advancing result set. Iteration is synchronous and must run to
/// completion (or be dropped) before the next query on the same connection,
/// matching SPEC_FULL.md's concurrency note that scans iterate synchronously
/// over a single driver row iterator.
pub trait RowIterator: Send {
    fn columns(&self) -> &[String];
    fn next_row(&mut self) -> Result<Option<RawRow>>;
}

#[async_trait]
pub trait SqlDriver: Send + Sync {
    /// Execute a parameterized query (`?` placeholders, positional args) and
    /// return a row iterator.
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Box<dyn RowIterator>>;
}

/// In-memory driver used by tests and by the documentation example in
/// SPEC_FULL.md's test-tooling section. Ignores `sql`/`args` entirely and
/// replays whatever rows it was seeded with — the planner and batcher are
/// exercised against fixed fixtures rather than a real SQL engine.
pub struct StaticDriver {
    columns: Vec<String>,
    rows: Vec<RawRow>,
}

impl StaticDriver {
    pub fn new(columns: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self { columns, rows }
    }
}

#[async_trait]
impl SqlDriver for StaticDriver {
    async fn query(&self, _sql: &str, _args: &[Value]) -> Result<Box<dyn RowIterator>> {
        Ok(Box::new(StaticRows {
            columns: self.columns.clone(),
            rows: self.rows.clone(),
            cursor: 0,
        }))
    }
}

struct StaticRows {
    columns: Vec<String>,
    rows: Vec<RawRow>,
    cursor: usize,
}

impl RowIterator for StaticRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<RawRow>> {
        if self.cursor >= self.rows.len() {
            return Ok(None);
        }
        let row = self.rows[self.cursor].clone();
        self.cursor += 1;
        Ok(Some(row))
    }
}

/// Translate a driver-reported MySQL error number into the taxonomy,
/// matching SPEC_FULL.md §6's "driver errors map through
/// `CoreError::from_driver_error_code`" wiring.
pub fn map_driver_error(code: u16, message: impl Into<String>) -> CoreError {
    CoreError::from_driver_error_code(code, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_driver_replays_seeded_rows() {
        let driver = StaticDriver::new(
            vec!["id".into()],
            vec![vec![RawCell::Int(1)], vec![RawCell::Int(2)]],
        );
        let mut rows = driver.query("select 1", &[]).await.unwrap();
        assert_eq!(rows.next_row().unwrap(), Some(vec![RawCell::Int(1)]));
        assert_eq!(rows.next_row().unwrap(), Some(vec![RawCell::Int(2)]));
        assert_eq!(rows.next_row().unwrap(), None);
    }
}

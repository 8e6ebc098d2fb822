// Vector search (spec.md §4.2 "vector-distance columns", §6 "vector search
// arguments"): nearest-neighbor query over a `Vector` column, shaped as a
// connection like any other root listing — overfetch-by-one for
// `hasNextPage`, a keyset `after` cursor over `(distance, pk...)`, and a
// `topK` ceiling so a client can't force an unbounded distance scan.

use super::sql::SqlBuilder;
use super::where_clause::{build_where, WhereInput};
use crate::error::{CoreError, Result};
use crate::model::{Schema, Table};
use crate::value::Value;

/// Distances column on the result set carries this alias; the scan layer
/// treats it as an extra (no enum/set mapping applies).
pub const DISTANCE_ALIAS: &str = "__distance";

/// Upper bound on `topK`, preventing a client from requesting a full-table
/// distance scan disguised as nearest-neighbor search. Distinct from
/// `ResolverOptions::max_top_k`, the deployment-configured ceiling (spec.md
/// §6 `MaxTopK`, default 100) that is always `<=` this absolute cap.
pub const MAX_TOP_K: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorMetric {
    Cosine,
    L2,
    InnerProduct,
}

impl VectorMetric {
    fn sql_fn(&self) -> &'static str {
        match self {
            VectorMetric::Cosine => "VEC_COSINE_DISTANCE",
            VectorMetric::L2 => "VEC_L2_DISTANCE",
            VectorMetric::InnerProduct => "VEC_NEGATIVE_INNER_PRODUCT",
        }
    }
}

/// A resolved vector-search page request: which column/metric/query vector,
/// which predicate, how many rows (already capped), and — if resuming —
/// which `(distance, pk...)` tuple to seek past.
pub struct VectorSearchPlan<'a> {
    pub table: &'a Table,
    pub column: String,
    pub metric: VectorMetric,
    pub query_vector: String,
    pub where_input: Option<WhereInput>,
    /// Already validated against both `MAX_TOP_K` and the deployment's
    /// configured ceiling; this is exactly the number of edges returned.
    pub page_size: i64,
    /// `(distance, pk tuple)` decoded from the client's `after` cursor.
    pub after: Option<(Value, Vec<Value>)>,
}

impl<'a> VectorSearchPlan<'a> {
    /// `SELECT *, metric(col, ?) AS __distance FROM table [WHERE ...] ORDER
    /// BY __distance ASC, pk... ASC LIMIT page_size + 1`. The `+1` overfetch
    /// mirrors `ConnectionPlan::build_page_sql`'s convention so the executor
    /// can detect `hasNextPage` without a second round trip.
    pub fn build_page_sql(&self, schema: &Schema) -> Result<(String, Vec<Value>)> {
        if self.table.column(&self.column).filter(|c| c.kind.is_vector()).is_none() {
            return Err(CoreError::InvariantViolation(format!(
                "{} is not a vector column on {}",
                self.column, self.table.name
            )));
        }
        if self.page_size <= 0 {
            return Err(CoreError::BadInput("first must be positive".to_string()));
        }
        if self.page_size > MAX_TOP_K {
            return Err(CoreError::BadInput(format!("first exceeds the maximum of {MAX_TOP_K}")));
        }

        let mut b = SqlBuilder::new();
        b.push_str("SELECT *, ");
        self.push_distance_expr(&mut b);
        b.push_str(" AS ").push_ident(DISTANCE_ALIAS);
        b.push_str(" FROM ").push_ident(&self.table.name);
        self.push_where(schema, &mut b)?;
        b.push_str(" ORDER BY ").push_ident(DISTANCE_ALIAS).push_str(" ASC");
        for pk in &self.table.primary_key {
            b.push_str(", ").push_ident(pk).push_str(" ASC");
        }
        b.push_str(" LIMIT ").push_param(Value::Int(self.page_size + 1));
        Ok(b.finish())
    }

    fn push_distance_expr(&self, b: &mut SqlBuilder) {
        b.push_str(self.metric.sql_fn()).push_str("(");
        b.push_ident(&self.column).push_str(", ").push_param(Value::Vector(self.query_vector.clone()));
        b.push_str(")");
    }

    fn push_where(&self, schema: &Schema, b: &mut SqlBuilder) -> Result<()> {
        let has_predicate = self.where_input.is_some();
        let has_after = self.after.is_some();
        if !has_predicate && !has_after {
            return Ok(());
        }
        b.push_str(" WHERE ");
        if has_predicate && has_after {
            b.push_str("(");
        }
        if let Some(w) = &self.where_input {
            build_where(schema, self.table, w, b)?;
        }
        if has_predicate && has_after {
            b.push_str(") AND (");
        }
        if let Some((after_distance, after_pk)) = &self.after {
            self.push_keyset_predicate(after_distance, after_pk, b);
        }
        if has_predicate && has_after {
            b.push_str(")");
        }
        Ok(())
    }

    /// `(distance_expr > ?) OR (distance_expr = ? AND <pk tuple lexicographic
    /// ascending past after_pk>)` — the vector-search analogue of
    /// `connection::push_keyset_predicate`, with the leading "column" being
    /// a recomputed distance expression (MySQL can't reference a `SELECT`
    /// alias from `WHERE`) rather than a real column.
    fn push_keyset_predicate(&self, after_distance: &Value, after_pk: &[Value], b: &mut SqlBuilder) {
        b.push_str("((");
        self.push_distance_expr(b);
        b.push_str(" > ").push_param(after_distance.clone()).push_str(")");
        b.push_str(" OR (");
        self.push_distance_expr(b);
        b.push_str(" = ").push_param(after_distance.clone());
        b.push_str(" AND (");
        let n = self.table.primary_key.len();
        for k in 0..n {
            if k > 0 {
                b.push_str(" OR ");
            }
            b.push_str("(");
            for j in 0..k {
                b.push_ident(&self.table.primary_key[j]).push_str(" = ").push_param(after_pk[j].clone());
                b.push_str(" AND ");
            }
            b.push_ident(&self.table.primary_key[k]).push_str(" > ").push_param(after_pk[k].clone());
            b.push_str(")");
        }
        b.push_str(")))");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, ColumnKind};

    fn table_with_vector() -> Table {
        Table::new(
            "chunks",
            vec![
                Column::new("id", "int", false, ColumnKind::Int),
                Column::new("embedding", "vector", false, ColumnKind::Vector { dims: 768 }),
            ],
        )
        .with_primary_key(vec!["id".into()])
    }

    fn plan(table: &Table, page_size: i64, after: Option<(Value, Vec<Value>)>) -> VectorSearchPlan<'_> {
        VectorSearchPlan {
            table,
            column: "embedding".into(),
            metric: VectorMetric::L2,
            query_vector: "[0.1,0.2]".into(),
            where_input: None,
            page_size,
            after,
        }
    }

    #[test]
    fn rejects_page_size_over_the_cap() {
        let table = table_with_vector();
        let schema = Schema::new(vec![table.clone()]);
        assert!(plan(&table, MAX_TOP_K + 1, None).build_page_sql(&schema).is_err());
    }

    #[test]
    fn builds_a_distance_ordered_overfetched_query() {
        let table = table_with_vector();
        let schema = Schema::new(vec![table.clone()]);
        let (sql, params) = plan(&table, 10, None).build_page_sql(&schema).unwrap();
        assert!(sql.contains("VEC_L2_DISTANCE(`embedding`, ?) AS `__distance`"));
        assert!(sql.contains("ORDER BY `__distance` ASC, `id` ASC"));
        assert!(sql.ends_with("LIMIT ?"));
        assert_eq!(params.last(), Some(&Value::Int(11)));
    }

    #[test]
    fn rejects_a_non_vector_column() {
        let t = Table::new("t", vec![Column::new("name", "varchar", false, ColumnKind::String)]).with_primary_key(vec!["name".into()]);
        let schema = Schema::new(vec![t.clone()]);
        let mut p = plan(&t, 5, None);
        p.column = "name".into();
        assert!(p.build_page_sql(&schema).is_err());
    }

    #[test]
    fn after_cursor_adds_a_distance_then_pk_keyset_predicate() {
        let table = table_with_vector();
        let schema = Schema::new(vec![table.clone()]);
        let (sql, _) = plan(&table, 10, Some((Value::Float(0.5), vec![Value::Int(7)]))).build_page_sql(&schema).unwrap();
        assert!(sql.contains("VEC_L2_DISTANCE(`embedding`, ?) > ?"));
        assert!(sql.contains("AND (`id` > ?)"));
    }
}

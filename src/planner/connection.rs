// Connection Executor's query-building half (spec.md §4.2/§4.3): Relay-style
// cursor pagination lowered to keyset predicates plus an n+1 overfetch, so
// the executor can detect `hasNextPage`/`hasPreviousPage` without a second
// round trip.

use super::sql::SqlBuilder;
use super::where_clause::{build_where, WhereInput};
use crate::error::{CoreError, Result};
use crate::model::{Direction, OrderBy, Schema, Table};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDirection {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionArgs {
    pub first: Option<i64>,
    pub after: Option<String>,
    pub last: Option<i64>,
    pub before: Option<String>,
}

impl ConnectionArgs {
    /// Validate the `first`/`after`/`last`/`before` combination against
    /// spec.md §4.2's pagination-argument rules, returning the page's
    /// effective direction.
    pub fn validate(&self, max_page_size: i64) -> Result<PageDirection> {
        match (self.first, self.last) {
            (Some(_), Some(_)) => Err(CoreError::BadInput("first and last are mutually exclusive".to_string())),
            (None, None) => Err(CoreError::BadInput("one of first or last is required".to_string())),
            (Some(first), None) => {
                if first < 0 {
                    return Err(CoreError::BadInput("first must be non-negative".to_string()));
                }
                if first > max_page_size {
                    return Err(CoreError::BadInput(format!("first exceeds the maximum page size of {max_page_size}")));
                }
                if self.before.is_some() {
                    return Err(CoreError::BadInput("before may not be combined with first".to_string()));
                }
                Ok(PageDirection::Forward)
            }
            (None, Some(last)) => {
                if last < 0 {
                    return Err(CoreError::BadInput("last must be non-negative".to_string()));
                }
                if last > max_page_size {
                    return Err(CoreError::BadInput(format!("last exceeds the maximum page size of {max_page_size}")));
                }
                if self.after.is_some() {
                    return Err(CoreError::BadInput("after may not be combined with last".to_string()));
                }
                Ok(PageDirection::Backward)
            }
        }
    }

    pub fn limit(&self) -> i64 {
        self.first.or(self.last).unwrap_or(0)
    }
}

/// A fully-resolved connection query: which table, which predicate, which
/// ordering, which page, and (if resuming) which cursor tuple to seek past.
pub struct ConnectionPlan<'a> {
    pub table: &'a Table,
    pub order_by: OrderBy,
    pub where_input: Option<WhereInput>,
    pub direction: PageDirection,
    pub page_size: i64,
    pub cursor_values: Option<Vec<Value>>,
}

impl<'a> ConnectionPlan<'a> {
    /// The ordering actually sent to SQL: reversed for a backward page, so
    /// `LIMIT` takes the correct end of the result set. The executor
    /// reverses the rows back into forward order after fetching.
    pub fn effective_order(&self) -> OrderBy {
        match self.direction {
            PageDirection::Forward => self.order_by.clone(),
            PageDirection::Backward => self.order_by.reversed(),
        }
    }

    /// `SELECT ... WHERE <predicate> [AND <keyset predicate>] ORDER BY
    /// <effective order> LIMIT page_size + 1`. The `+1` overfetch lets the
    /// executor compute `hasNextPage`/`hasPreviousPage` without a count.
    pub fn build_page_sql(&self, schema: &Schema) -> Result<(String, Vec<Value>)> {
        let effective = self.effective_order();
        let mut b = SqlBuilder::new();
        b.push_str("SELECT * FROM ").push_ident(&self.table.name);
        self.push_where(schema, &effective, &mut b)?;
        b.push_str(" ORDER BY ");
        push_order_by(&effective, &mut b);
        b.push_str(" LIMIT ").push_param(Value::Int(self.page_size + 1));
        Ok(b.finish())
    }

    /// `SELECT COUNT(*) FROM ... WHERE <predicate>` — the predicate only,
    /// no keyset seek or ordering, backing `totalCount`.
    pub fn build_count_sql(&self, schema: &Schema) -> Result<(String, Vec<Value>)> {
        let mut b = SqlBuilder::new();
        b.push_str("SELECT COUNT(*) FROM ").push_ident(&self.table.name);
        if let Some(w) = &self.where_input {
            b.push_str(" WHERE ");
            build_where(schema, self.table, w, &mut b)?;
        }
        Ok(b.finish())
    }

    fn push_where(&self, schema: &Schema, effective: &OrderBy, b: &mut SqlBuilder) -> Result<()> {
        let has_predicate = self.where_input.is_some();
        let has_cursor = self.cursor_values.is_some();
        if !has_predicate && !has_cursor {
            return Ok(());
        }
        b.push_str(" WHERE ");
        if has_predicate && has_cursor {
            b.push_str("(");
        }
        if let Some(w) = &self.where_input {
            build_where(schema, self.table, w, b)?;
        }
        if has_predicate && has_cursor {
            b.push_str(") AND (");
        }
        if let Some(values) = &self.cursor_values {
            push_keyset_predicate(effective, values, b);
        }
        if has_predicate && has_cursor {
            b.push_str(")");
        }
        Ok(())
    }
}

pub(crate) fn push_order_by(order: &OrderBy, b: &mut SqlBuilder) {
    for (i, clause) in order.0.iter().enumerate() {
        if i > 0 {
            b.push_str(", ");
        }
        b.push_ident(&clause.column).push_str(" ").push_str(clause.direction.sql());
    }
}

/// Standard keyset-pagination disjunction: `(c0 > v0) OR (c0 = v0 AND c1 >
/// v1) OR ...`, with the comparison operator flipped per-column to match
/// that column's effective direction.
fn push_keyset_predicate(order: &OrderBy, values: &[Value], b: &mut SqlBuilder) {
    let n = order.0.len();
    b.push_str("(");
    for k in 0..n {
        if k > 0 {
            b.push_str(" OR ");
        }
        b.push_str("(");
        for j in 0..k {
            b.push_ident(&order.0[j].column).push_str(" = ").push_param(values[j].clone());
            b.push_str(" AND ");
        }
        let op = if order.0[k].direction == Direction::Asc { ">" } else { "<" };
        b.push_ident(&order.0[k].column).push_str(" ").push_str(op).push_str(" ").push_param(values[k].clone());
        b.push_str(")");
    }
    b.push_str(")");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFn {
    fn sql(&self) -> &'static str {
        match self {
            AggregateFn::Count => "COUNT",
            AggregateFn::Sum => "SUM",
            AggregateFn::Avg => "AVG",
            AggregateFn::Min => "MIN",
            AggregateFn::Max => "MAX",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AggregateField {
    pub op: AggregateFn,
    pub column: String,
    pub alias: String,
}

/// `SELECT op(col) AS alias, ... FROM table WHERE <predicate>` backing the
/// connection's `aggregate` field (spec.md §4.2). Numeric ops other than
/// `Count` are rejected against non-numeric columns at build time.
pub fn build_aggregate_sql(
    schema: &Schema,
    table: &Table,
    where_input: Option<&WhereInput>,
    fields: &[AggregateField],
) -> Result<(String, Vec<Value>)> {
    if fields.is_empty() {
        return Err(CoreError::BadInput("aggregate requires at least one field".to_string()));
    }
    let mut b = SqlBuilder::new();
    b.push_str("SELECT ");
    for (i, f) in fields.iter().enumerate() {
        if i > 0 {
            b.push_str(", ");
        }
        if f.op != AggregateFn::Count {
            let col = table
                .column(&f.column)
                .ok_or_else(|| CoreError::InvariantViolation(format!("unknown column {} on table {}", f.column, table.name)))?;
            if !col.kind.is_numeric() {
                return Err(CoreError::BadInput(format!("{} is not numeric; cannot apply {:?}", f.column, f.op)));
            }
            b.push_str(f.op.sql()).push_str("(").push_ident(&f.column).push_str(")");
        } else if f.column == "*" {
            b.push_str("COUNT(*)");
        } else {
            b.push_str("COUNT(").push_ident(&f.column).push_str(")");
        }
        b.push_str(" AS ").push_ident(&f.alias);
    }
    b.push_str(" FROM ").push_ident(&table.name);
    if let Some(w) = where_input {
        b.push_str(" WHERE ");
        build_where(schema, table, w, &mut b)?;
    }
    Ok(b.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, ColumnKind, OrderByClause, Table};

    fn authors_table() -> Table {
        Table::new("authors", vec![Column::new("id", "int", false, ColumnKind::Int)]).with_primary_key(vec!["id".into()])
    }

    #[test]
    fn first_and_last_are_mutually_exclusive() {
        let args = ConnectionArgs { first: Some(5), last: Some(5), ..Default::default() };
        assert!(args.validate(100).is_err());
    }

    #[test]
    fn neither_first_nor_last_is_an_error() {
        let args = ConnectionArgs::default();
        assert!(args.validate(100).is_err());
    }

    #[test]
    fn first_over_max_page_size_is_rejected() {
        let args = ConnectionArgs { first: Some(500), ..Default::default() };
        assert!(args.validate(100).is_err());
    }

    #[test]
    fn before_with_first_is_rejected() {
        let args = ConnectionArgs { first: Some(5), before: Some("x".into()), ..Default::default() };
        assert!(args.validate(100).is_err());
    }

    #[test]
    fn forward_page_sql_overfetches_by_one_and_uses_limit() {
        let table = authors_table();
        let schema = Schema::new(vec![table.clone()]);
        let plan = ConnectionPlan {
            table: schema.table("authors").unwrap(),
            order_by: OrderBy::single("id", Direction::Asc),
            where_input: None,
            direction: PageDirection::Forward,
            page_size: 10,
            cursor_values: None,
        };
        let (sql, args) = plan.build_page_sql(&schema).unwrap();
        assert!(sql.contains("ORDER BY `id` ASC"));
        assert!(sql.ends_with("LIMIT ?"));
        assert_eq!(args, vec![Value::Int(11)]);
    }

    #[test]
    fn backward_page_sql_reverses_the_order_by() {
        let table = authors_table();
        let schema = Schema::new(vec![table]);
        let plan = ConnectionPlan {
            table: schema.table("authors").unwrap(),
            order_by: OrderBy::single("id", Direction::Asc),
            where_input: None,
            direction: PageDirection::Backward,
            page_size: 10,
            cursor_values: None,
        };
        let (sql, _) = plan.build_page_sql(&schema).unwrap();
        assert!(sql.contains("ORDER BY `id` DESC"));
    }

    #[test]
    fn cursor_values_add_a_keyset_predicate() {
        let table = authors_table();
        let schema = Schema::new(vec![table]);
        let plan = ConnectionPlan {
            table: schema.table("authors").unwrap(),
            order_by: OrderBy::single("id", Direction::Asc),
            where_input: None,
            direction: PageDirection::Forward,
            page_size: 10,
            cursor_values: Some(vec![Value::Int(5)]),
        };
        let (sql, args) = plan.build_page_sql(&schema).unwrap();
        assert!(sql.contains("(`id` > ?)"));
        assert_eq!(args[0], Value::Int(5));
    }

    #[test]
    fn composite_order_keyset_predicate_is_a_lexicographic_disjunction() {
        let table = authors_table();
        let schema = Schema::new(vec![table]);
        let order = OrderBy::new(vec![
            OrderByClause { column: "a".into(), direction: Direction::Asc },
            OrderByClause { column: "b".into(), direction: Direction::Desc },
        ]);
        let plan = ConnectionPlan {
            table: schema.table("authors").unwrap(),
            order_by: order,
            where_input: None,
            direction: PageDirection::Forward,
            page_size: 10,
            cursor_values: Some(vec![Value::Int(1), Value::Int(2)]),
        };
        let (sql, _) = plan.build_page_sql(&schema).unwrap();
        assert!(sql.contains("(`a` > ?) OR (`a` = ? AND `b` < ?)"));
    }

    #[test]
    fn aggregate_rejects_non_numeric_column_for_sum() {
        let table = Table::new("t", vec![Column::new("name", "varchar", false, ColumnKind::String)]).with_primary_key(vec!["name".into()]);
        let schema = Schema::new(vec![table]);
        let fields = vec![AggregateField { op: AggregateFn::Sum, column: "name".into(), alias: "total".into() }];
        assert!(build_aggregate_sql(&schema, schema.table("t").unwrap(), None, &fields).is_err());
    }

    #[test]
    fn aggregate_count_star_needs_no_column_check() {
        let table = authors_table();
        let schema = Schema::new(vec![table]);
        let fields = vec![AggregateField { op: AggregateFn::Count, column: "*".into(), alias: "count".into() }];
        let (sql, _) = build_aggregate_sql(&schema, schema.table("authors").unwrap(), None, &fields).unwrap();
        assert!(sql.contains("COUNT(*) AS `count`"));
    }
}

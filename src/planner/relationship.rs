// Relationship batch query builder (spec.md §4.3): given a deduplicated set
// of parent key tuples, build the single SQL statement that fetches every
// related row for every parent at once, plus however the batcher should
// regroup the rows back onto their parent.

use super::connection::push_order_by;
use super::sql::SqlBuilder;
use super::where_clause::{build_where, WhereInput};
use crate::error::{CoreError, Result};
use crate::model::{OrderBy, Relationship, RelationshipKind, Schema};
use crate::value::Value;

/// Where the grouping key lives in the fetched rows.
#[derive(Debug, Clone)]
pub enum ParentKeySource {
    /// Direct FK relationships (many-to-one, one-to-many): the grouping key
    /// is one of the remote table's ordinary columns, already present on
    /// every scanned row.
    Direct(Vec<String>),
    /// Junction-backed relationships (many-to-many, edge-list): the
    /// grouping key was echoed through the join under these synthetic
    /// aliases.
    Extra(Vec<String>),
}

pub struct BatchQuery {
    pub sql: String,
    pub args: Vec<Value>,
    pub parent_key_source: ParentKeySource,
}

/// Build the batch SQL for `rel`, given the distinct parent key tuples that
/// need related rows. `parent_keys` must already be deduplicated by the
/// caller (the batcher owns that fingerprinting).
pub fn build_batch(
    schema: &Schema,
    rel: &Relationship,
    parent_keys: &[Vec<Value>],
    where_input: Option<&WhereInput>,
    order_by: Option<&OrderBy>,
) -> Result<BatchQuery> {
    let remote = schema
        .table(&rel.remote_table)
        .ok_or_else(|| CoreError::InvariantViolation(format!("relationship {} points at unknown table {}", rel.name, rel.remote_table)))?;

    match rel.kind {
        RelationshipKind::ManyToOne | RelationshipKind::OneToMany => {
            let mut b = SqlBuilder::new();
            b.push_str("SELECT * FROM ").push_ident(&remote.name).push_str(" WHERE ");
            let cols: Vec<&str> = rel.remote_columns.iter().map(String::as_str).collect();
            b.push_in_clause(&cols, parent_keys);
            if let Some(w) = where_input {
                b.push_str(" AND (");
                build_where(schema, remote, w, &mut b)?;
                b.push_str(")");
            }
            if let Some(ob) = order_by {
                b.push_str(" ORDER BY ");
                push_order_by(ob, &mut b);
            }
            let (sql, args) = b.finish();
            Ok(BatchQuery {
                sql,
                args,
                parent_key_source: ParentKeySource::Direct(rel.remote_columns.clone()),
            })
        }
        RelationshipKind::ManyToMany | RelationshipKind::EdgeList => {
            let junction = rel.junction.as_ref().ok_or_else(|| {
                CoreError::InvariantViolation(format!("relationship {} is junction-backed but has no junction info", rel.name))
            })?;

            let mut b = SqlBuilder::new();
            b.push_str("SELECT ");
            b.push_ident(&remote.name).push_str(".*");
            let mut aliases = Vec::with_capacity(junction.local_fk.len());
            for (i, jcol) in junction.local_fk.iter().enumerate() {
                let alias = format!("__batch_parent_{i}");
                b.push_str(", ");
                b.push_ident(&junction.table).push_str(".").push_ident(jcol);
                b.push_str(" AS ").push_ident(&alias);
                aliases.push(alias);
            }
            b.push_str(" FROM ").push_ident(&junction.table);
            b.push_str(" JOIN ").push_ident(&remote.name).push_str(" ON ");
            for (i, (jcol, rcol)) in junction.remote_fk.iter().zip(rel.remote_columns.iter()).enumerate() {
                if i > 0 {
                    b.push_str(" AND ");
                }
                b.push_ident(&junction.table).push_str(".").push_ident(jcol);
                b.push_str(" = ");
                b.push_ident(&remote.name).push_str(".").push_ident(rcol);
            }
            b.push_str(" WHERE ");
            let jcols: Vec<&str> = junction.local_fk.iter().map(String::as_str).collect();
            b.push_in_clause(&jcols, parent_keys);
            if let Some(w) = where_input {
                b.push_str(" AND (");
                build_where(schema, remote, w, &mut b)?;
                b.push_str(")");
            }
            if let Some(ob) = order_by {
                b.push_str(" ORDER BY ");
                for (i, clause) in ob.0.iter().enumerate() {
                    if i > 0 {
                        b.push_str(", ");
                    }
                    b.push_ident(&remote.name).push_str(".").push_ident(&clause.column);
                    b.push_str(" ").push_str(clause.direction.sql());
                }
            }
            let (sql, args) = b.finish();
            Ok(BatchQuery { sql, args, parent_key_source: ParentKeySource::Extra(aliases) })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, ColumnKind, JunctionInfo, Relationship, Table};

    fn schema() -> Schema {
        let authors = Table::new("authors", vec![Column::new("id", "int", false, ColumnKind::Int)]).with_primary_key(vec!["id".into()]);
        let books = Table::new(
            "books",
            vec![Column::new("id", "int", false, ColumnKind::Int), Column::new("author_id", "int", false, ColumnKind::Int)],
        )
        .with_primary_key(vec!["id".into()]);
        Schema::new(vec![authors, books])
    }

    #[test]
    fn one_to_many_batch_groups_by_a_direct_column() {
        let schema = schema();
        let rel = Relationship::one_to_many("books", vec!["id".into()], "books", vec!["author_id".into()]);
        let q = build_batch(&schema, &rel, &[vec![Value::Int(1)], vec![Value::Int(2)]], None, None).unwrap();
        assert!(q.sql.contains("`author_id` IN (?, ?)"));
        assert!(matches!(q.parent_key_source, ParentKeySource::Direct(cols) if cols == vec!["author_id".to_string()]));
    }

    #[test]
    fn many_to_many_batch_joins_the_junction_and_echoes_the_parent_key() {
        let students = Table::new("students", vec![Column::new("id", "int", false, ColumnKind::Int)]).with_primary_key(vec!["id".into()]);
        let courses = Table::new("courses", vec![Column::new("id", "int", false, ColumnKind::Int)]).with_primary_key(vec!["id".into()]);
        let schema = Schema::new(vec![students, courses]);
        let rel = Relationship::many_to_many(
            "courses",
            vec!["id".into()],
            "courses",
            vec!["id".into()],
            JunctionInfo { table: "enrollment".into(), local_fk: vec!["student_id".into()], remote_fk: vec!["course_id".into()] },
        );
        let q = build_batch(&schema, &rel, &[vec![Value::Int(1)]], None, None).unwrap();
        assert!(q.sql.contains("JOIN `courses`"));
        assert!(q.sql.contains("AS `__batch_parent_0`"));
        assert!(matches!(q.parent_key_source, ParentKeySource::Extra(a) if a == vec!["__batch_parent_0".to_string()]));
    }
}

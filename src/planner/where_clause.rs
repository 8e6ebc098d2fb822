// Where-clause AST and SQL emission (spec.md §4.2 "Predicate language"):
// recursive AND/OR/NOT over per-column operators, plus relationship
// quantifiers (`some`/`none`/`is`) that lower to correlated EXISTS
// subqueries.

use super::sql::SqlBuilder;
use crate::error::{CoreError, Result};
use crate::model::{RelationshipKind, Schema, Table};
use crate::value::Value;

#[derive(Debug, Clone)]
pub enum FilterOp {
    Eq(Value),
    Ne(Value),
    Lt(Value),
    Lte(Value),
    Gt(Value),
    Gte(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    Like(String),
    NotLike(String),
    IsNull(bool),
    /// SET column contains exactly this member.
    SetHas(String),
    /// SET column contains at least one of these members.
    SetHasAnyOf(Vec<String>),
    /// SET column contains every one of these members.
    SetHasAllOf(Vec<String>),
    /// SET column contains none of these members.
    SetHasNoneOf(Vec<String>),
}

#[derive(Debug, Clone)]
pub enum RelQuantifier {
    /// Many-to-one: the related row (which must exist) matches `inner`.
    Is(Box<WhereInput>),
    /// One-to-many / many-to-many / edge-list: at least one related row
    /// matches `inner`.
    Some(Box<WhereInput>),
    /// No related row matches `inner`.
    None(Box<WhereInput>),
}

#[derive(Debug, Clone)]
pub enum WhereInput {
    And(Vec<WhereInput>),
    Or(Vec<WhereInput>),
    Not(Box<WhereInput>),
    Column(String, FilterOp),
    Relationship(String, RelQuantifier),
}

/// Emit `input` as a SQL boolean expression against `table`, correlated on
/// the alias `table.name`. Self-contained: does not assume any particular
/// join has already been made, since every quantifier lowers to its own
/// EXISTS subquery.
pub fn build_where(schema: &Schema, table: &Table, input: &WhereInput, b: &mut SqlBuilder) -> Result<()> {
    match input {
        WhereInput::And(parts) => build_bool_list(schema, table, parts, "AND", b),
        WhereInput::Or(parts) => build_bool_list(schema, table, parts, "OR", b),
        WhereInput::Not(inner) => {
            b.push_str("NOT (");
            build_where(schema, table, inner, b)?;
            b.push_str(")");
            Ok(())
        }
        WhereInput::Column(name, op) => build_column_op(table, name, op, b),
        WhereInput::Relationship(field, quantifier) => build_relationship(schema, table, field, quantifier, b),
    }
}

fn build_bool_list(schema: &Schema, table: &Table, parts: &[WhereInput], joiner: &str, b: &mut SqlBuilder) -> Result<()> {
    if parts.is_empty() {
        // An empty AND is vacuously true; an empty OR is vacuously false.
        b.push_str(if joiner == "AND" { "1=1" } else { "1=0" });
        return Ok(());
    }
    b.push_str("(");
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            b.push_str(" ").push_str(joiner).push_str(" ");
        }
        build_where(schema, table, part, b)?;
    }
    b.push_str(")");
    Ok(())
}

fn build_column_op(table: &Table, name: &str, op: &FilterOp, b: &mut SqlBuilder) -> Result<()> {
    table
        .column(name)
        .ok_or_else(|| CoreError::InvariantViolation(format!("unknown column {name} on table {}", table.name)))?;

    match op {
        FilterOp::Eq(v) => {
            b.push_ident(name).push_str(" = ").push_param(v.clone());
        }
        FilterOp::Ne(v) => {
            b.push_ident(name).push_str(" <> ").push_param(v.clone());
        }
        FilterOp::Lt(v) => {
            b.push_ident(name).push_str(" < ").push_param(v.clone());
        }
        FilterOp::Lte(v) => {
            b.push_ident(name).push_str(" <= ").push_param(v.clone());
        }
        FilterOp::Gt(v) => {
            b.push_ident(name).push_str(" > ").push_param(v.clone());
        }
        FilterOp::Gte(v) => {
            b.push_ident(name).push_str(" >= ").push_param(v.clone());
        }
        FilterOp::In(values) => {
            if values.is_empty() {
                b.push_str("1=0");
            } else {
                b.push_in_clause(&[name], &values.iter().cloned().map(|v| vec![v]).collect::<Vec<_>>());
            }
        }
        FilterOp::NotIn(values) => {
            if values.is_empty() {
                b.push_str("1=1");
            } else {
                b.push_str("NOT ");
                b.push_in_clause(&[name], &values.iter().cloned().map(|v| vec![v]).collect::<Vec<_>>());
            }
        }
        FilterOp::Like(pattern) => {
            b.push_ident(name).push_str(" LIKE ").push_param(Value::Str(pattern.clone()));
        }
        FilterOp::NotLike(pattern) => {
            b.push_ident(name).push_str(" NOT LIKE ").push_param(Value::Str(pattern.clone()));
        }
        FilterOp::IsNull(is_null) => {
            b.push_ident(name).push_str(if *is_null { " IS NULL" } else { " IS NOT NULL" });
        }
        FilterOp::SetHas(member) => push_find_in_set(b, name, member),
        FilterOp::SetHasAnyOf(members) => {
            if members.is_empty() {
                b.push_str("1=0");
            } else {
                b.push_str("(");
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        b.push_str(" OR ");
                    }
                    push_find_in_set(b, name, m);
                }
                b.push_str(")");
            }
        }
        FilterOp::SetHasAllOf(members) => {
            if members.is_empty() {
                b.push_str("1=1");
            } else {
                b.push_str("(");
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        b.push_str(" AND ");
                    }
                    push_find_in_set(b, name, m);
                }
                b.push_str(")");
            }
        }
        FilterOp::SetHasNoneOf(members) => {
            if members.is_empty() {
                b.push_str("1=1");
            } else {
                b.push_str("NOT (");
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        b.push_str(" OR ");
                    }
                    push_find_in_set(b, name, m);
                }
                b.push_str(")");
            }
        }
    }
    Ok(())
}

/// `FIND_IN_SET(?, col) > 0` — the standard MySQL/TiDB idiom for testing
/// membership in a `SET` column's comma-list representation.
fn push_find_in_set(b: &mut SqlBuilder, column: &str, member: &str) {
    b.push_str("FIND_IN_SET(").push_param(Value::Str(member.to_string())).push_str(", ").push_ident(column).push_str(") > 0");
}

fn build_relationship(schema: &Schema, table: &Table, field: &str, quantifier: &RelQuantifier, b: &mut SqlBuilder) -> Result<()> {
    let rel = table
        .relationship(field)
        .ok_or_else(|| CoreError::InvariantViolation(format!("unknown relationship {field} on table {}", table.name)))?;
    let remote = schema
        .table(&rel.remote_table)
        .ok_or_else(|| CoreError::InvariantViolation(format!("relationship {field} points at unknown table {}", rel.remote_table)))?;

    let (negate, inner) = match quantifier {
        RelQuantifier::Is(inner) | RelQuantifier::Some(inner) => (false, inner),
        RelQuantifier::None(inner) => (true, inner),
    };

    if matches!(rel.kind, RelationshipKind::ManyToOne) && matches!(quantifier, RelQuantifier::None(_)) {
        return Err(CoreError::BadInput(format!(
            "relationship {field} is many-to-one and does not support a `none` quantifier"
        )));
    }

    if negate {
        b.push_str("NOT ");
    }
    b.push_str("EXISTS (SELECT 1 FROM ");
    b.push_ident(&remote.name);
    b.push_str(" WHERE ");

    match &rel.junction {
        None => {
            // Direct FK join: remote.remote_columns = table.local_columns.
            for (i, (local, remote_col)) in rel.local_columns.iter().zip(rel.remote_columns.iter()).enumerate() {
                if i > 0 {
                    b.push_str(" AND ");
                }
                b.push_ident(&remote.name).push_str(".").push_ident(remote_col);
                b.push_str(" = ").push_ident(&table.name).push_str(".").push_ident(local);
            }
        }
        Some(junction) => {
            // Correlated through the junction: EXISTS (SELECT 1 FROM
            // junction WHERE junction.remote_fk = remote.pk AND
            // junction.local_fk = table.local_columns).
            b.push_str("EXISTS (SELECT 1 FROM ");
            b.push_ident(&junction.table);
            b.push_str(" WHERE ");
            for (i, (jcol, rcol)) in junction.remote_fk.iter().zip(rel.remote_columns.iter()).enumerate() {
                if i > 0 {
                    b.push_str(" AND ");
                }
                b.push_ident(&junction.table).push_str(".").push_ident(jcol);
                b.push_str(" = ").push_ident(&remote.name).push_str(".").push_ident(rcol);
            }
            b.push_str(" AND ");
            for (i, (jcol, lcol)) in junction.local_fk.iter().zip(rel.local_columns.iter()).enumerate() {
                if i > 0 {
                    b.push_str(" AND ");
                }
                b.push_ident(&junction.table).push_str(".").push_ident(jcol);
                b.push_str(" = ").push_ident(&table.name).push_str(".").push_ident(lcol);
            }
            b.push_str(")");
        }
    }

    b.push_str(" AND ");
    build_where(schema, remote, inner, b)?;
    b.push_str(")");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, ColumnKind, JunctionInfo, Relationship, Table};

    fn schema_with_authors_books() -> Schema {
        let authors = Table::new(
            "authors",
            vec![Column::new("id", "int", false, ColumnKind::Int), Column::new("name", "varchar", false, ColumnKind::String)],
        )
        .with_primary_key(vec!["id".into()])
        .with_relationships(vec![Relationship::one_to_many(
            "books",
            vec!["id".into()],
            "books",
            vec!["author_id".into()],
        )]);
        let books = Table::new(
            "books",
            vec![
                Column::new("id", "int", false, ColumnKind::Int),
                Column::new("author_id", "int", false, ColumnKind::Int),
                Column::new("title", "varchar", false, ColumnKind::String),
            ],
        )
        .with_primary_key(vec!["id".into()])
        .with_relationships(vec![Relationship::many_to_one(
            "author",
            vec!["author_id".into()],
            "authors",
            vec!["id".into()],
        )]);
        Schema::new(vec![authors, books])
    }

    #[test]
    fn simple_eq_emits_placeholder_and_arg() {
        let schema = schema_with_authors_books();
        let table = schema.table("authors").unwrap();
        let input = WhereInput::Column("name".into(), FilterOp::Eq(Value::Str("Ada".into())));
        let mut b = SqlBuilder::new();
        build_where(&schema, table, &input, &mut b).unwrap();
        let (sql, args) = b.finish();
        assert_eq!(sql, "`name` = ?");
        assert_eq!(args, vec![Value::Str("Ada".into())]);
    }

    #[test]
    fn and_with_empty_list_is_vacuously_true() {
        let schema = schema_with_authors_books();
        let table = schema.table("authors").unwrap();
        let mut b = SqlBuilder::new();
        build_where(&schema, table, &WhereInput::And(vec![]), &mut b).unwrap();
        assert_eq!(b.finish().0, "1=1");
    }

    #[test]
    fn relationship_some_lowers_to_exists() {
        let schema = schema_with_authors_books();
        let table = schema.table("authors").unwrap();
        let input = WhereInput::Relationship(
            "books".into(),
            RelQuantifier::Some(Box::new(WhereInput::Column("title".into(), FilterOp::Eq(Value::Str("Foo".into()))))),
        );
        let mut b = SqlBuilder::new();
        build_where(&schema, table, &input, &mut b).unwrap();
        let (sql, _) = b.finish();
        assert!(sql.starts_with("EXISTS (SELECT 1 FROM `books`"));
        assert!(sql.contains("`books`.`author_id` = `authors`.`id`"));
    }

    #[test]
    fn relationship_none_negates_the_exists() {
        let schema = schema_with_authors_books();
        let table = schema.table("authors").unwrap();
        let input = WhereInput::Relationship(
            "books".into(),
            RelQuantifier::None(Box::new(WhereInput::Column("title".into(), FilterOp::Eq(Value::Str("Foo".into()))))),
        );
        let mut b = SqlBuilder::new();
        build_where(&schema, table, &input, &mut b).unwrap();
        assert!(b.finish().0.starts_with("NOT EXISTS"));
    }

    #[test]
    fn many_to_one_rejects_none_quantifier() {
        let schema = schema_with_authors_books();
        let table = schema.table("books").unwrap();
        let input = WhereInput::Relationship(
            "author".into(),
            RelQuantifier::None(Box::new(WhereInput::Column("name".into(), FilterOp::Eq(Value::Str("x".into()))))),
        );
        let mut b = SqlBuilder::new();
        assert!(build_where(&schema, table, &input, &mut b).is_err());
    }

    #[test]
    fn unknown_column_is_an_invariant_violation() {
        let schema = schema_with_authors_books();
        let table = schema.table("authors").unwrap();
        let input = WhereInput::Column("nope".into(), FilterOp::Eq(Value::Int(1)));
        let mut b = SqlBuilder::new();
        assert!(build_where(&schema, table, &input, &mut b).is_err());
    }

    #[test]
    fn not_like_negates_the_pattern_match() {
        let schema = schema_with_authors_books();
        let table = schema.table("authors").unwrap();
        let input = WhereInput::Column("name".into(), FilterOp::NotLike("A%".into()));
        let mut b = SqlBuilder::new();
        build_where(&schema, table, &input, &mut b).unwrap();
        assert_eq!(b.finish().0, "`name` NOT LIKE ?");
    }

    #[test]
    fn set_has_any_of_ors_find_in_set_calls() {
        let schema = schema_with_authors_books();
        let table = schema.table("authors").unwrap();
        let input = WhereInput::Column("name".into(), FilterOp::SetHasAnyOf(vec!["a".into(), "b".into()]));
        let mut b = SqlBuilder::new();
        build_where(&schema, table, &input, &mut b).unwrap();
        let (sql, args) = b.finish();
        assert_eq!(sql, "(FIND_IN_SET(?, `name`) > 0 OR FIND_IN_SET(?, `name`) > 0)");
        assert_eq!(args, vec![Value::Str("a".into()), Value::Str("b".into())]);
    }

    #[test]
    fn set_has_all_of_ands_find_in_set_calls() {
        let schema = schema_with_authors_books();
        let table = schema.table("authors").unwrap();
        let input = WhereInput::Column("name".into(), FilterOp::SetHasAllOf(vec!["a".into(), "b".into()]));
        let mut b = SqlBuilder::new();
        build_where(&schema, table, &input, &mut b).unwrap();
        assert_eq!(b.finish().0, "(FIND_IN_SET(?, `name`) > 0 AND FIND_IN_SET(?, `name`) > 0)");
    }

    #[test]
    fn set_has_none_of_negates_the_any_of_disjunction() {
        let schema = schema_with_authors_books();
        let table = schema.table("authors").unwrap();
        let input = WhereInput::Column("name".into(), FilterOp::SetHasNoneOf(vec!["a".into()]));
        let mut b = SqlBuilder::new();
        build_where(&schema, table, &input, &mut b).unwrap();
        assert_eq!(b.finish().0, "NOT (FIND_IN_SET(?, `name`) > 0)");
    }

    #[test]
    fn many_to_many_predicate_joins_through_the_junction() {
        let students = Table::new("students", vec![Column::new("id", "int", false, ColumnKind::Int)])
            .with_primary_key(vec!["id".into()])
            .with_relationships(vec![Relationship::many_to_many(
                "courses",
                vec!["id".into()],
                "courses",
                vec!["id".into()],
                JunctionInfo {
                    table: "enrollment".into(),
                    local_fk: vec!["student_id".into()],
                    remote_fk: vec!["course_id".into()],
                },
            )]);
        let courses = Table::new(
            "courses",
            vec![Column::new("id", "int", false, ColumnKind::Int), Column::new("name", "varchar", false, ColumnKind::String)],
        )
        .with_primary_key(vec!["id".into()]);
        let schema = Schema::new(vec![students, courses]);
        let table = schema.table("students").unwrap();
        let input = WhereInput::Relationship(
            "courses".into(),
            RelQuantifier::Some(Box::new(WhereInput::Column("name".into(), FilterOp::Eq(Value::Str("Algebra".into()))))),
        );
        let mut b = SqlBuilder::new();
        build_where(&schema, table, &input, &mut b).unwrap();
        let (sql, _) = b.finish();
        assert!(sql.contains("`enrollment`"));
        assert!(sql.contains("`enrollment`.`student_id` = `students`.`id`"));
    }
}

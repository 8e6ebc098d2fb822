// Column selection (spec.md §4.2): the GraphQL selection set names the
// columns a client wants, but the cursor codec and `Node.id` need the
// primary key and ordering columns regardless of whether the client asked
// for them. This module computes that union once, keeping the actual SELECT
// list minimal otherwise.

use crate::model::Table;
use std::collections::BTreeSet;

/// The set of column names that must appear in a row's SELECT list:
/// whatever the client's selection set requested, plus every primary-key
/// column (for `Node.id` / batch parent-key recovery), plus every
/// order-by column (for cursor minting).
pub fn widen_selection(table: &Table, requested: &[String], order_by_columns: &[&str]) -> Vec<String> {
    let mut set: BTreeSet<String> = requested.iter().cloned().collect();
    for pk in &table.primary_key {
        set.insert(pk.clone());
    }
    for col in order_by_columns {
        set.insert((*col).to_string());
    }
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, ColumnKind};

    fn table() -> Table {
        Table::new(
            "authors",
            vec![
                Column::new("id", "int", false, ColumnKind::Int),
                Column::new("name", "varchar", false, ColumnKind::String),
                Column::new("created_at", "datetime", false, ColumnKind::DateTime),
            ],
        )
        .with_primary_key(vec!["id".into()])
    }

    #[test]
    fn always_includes_primary_key_even_if_unrequested() {
        let t = table();
        let cols = widen_selection(&t, &["name".to_string()], &[]);
        assert!(cols.contains(&"id".to_string()));
        assert!(cols.contains(&"name".to_string()));
    }

    #[test]
    fn always_includes_order_by_columns() {
        let t = table();
        let cols = widen_selection(&t, &["name".to_string()], &["created_at"]);
        assert!(cols.contains(&"created_at".to_string()));
    }

    #[test]
    fn does_not_duplicate_already_requested_columns() {
        let t = table();
        let cols = widen_selection(&t, &["id".to_string()], &["id"]);
        assert_eq!(cols.iter().filter(|c| *c == "id").count(), 1);
    }
}

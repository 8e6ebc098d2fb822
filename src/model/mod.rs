// The Schema Model (SPEC_FULL.md §3/§4.1): an immutable description of
// tables, columns, indexes, and relationships, produced once by
// introspection and shared process-wide thereafter.

pub mod column;
pub mod order_by;
pub mod relationship;
pub mod table;

pub use column::{Column, ColumnKind};
pub use order_by::{Direction, OrderBy, OrderByClause, OrderByPolicy};
pub use relationship::{JunctionInfo, Relationship, RelationshipKind};
pub use table::{Index, Table};

use std::collections::HashMap;

/// Immutable, process-wide description of the introspected database.
#[derive(Debug, Clone)]
pub struct Schema {
    tables: HashMap<String, Table>,
}

impl Schema {
    pub fn new(tables: Vec<Table>) -> Self {
        Self {
            tables: tables.into_iter().map(|t| (t.name.clone(), t)).collect(),
        }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Tables that should be exposed to GraphQL directly: everything except
    /// pure junction tables, which only ever appear through many-to-many
    /// relationships (spec.md §4.1 implicitly: "for each non-pure-junction
    /// table with a primary key").
    pub fn exposed_tables(&self) -> impl Iterator<Item = &Table> {
        let junction_names: std::collections::HashSet<&str> = self
            .tables
            .values()
            .flat_map(|t| t.relationships.iter())
            .filter_map(|r| r.junction.as_ref())
            .map(|j| j.table.as_str())
            .collect();
        self.tables
            .values()
            .filter(move |t| t.has_primary_key() && !junction_names.contains(t.name.as_str()))
    }
}

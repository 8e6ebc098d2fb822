use super::column::Column;
use super::order_by::OrderByPolicy;
use super::relationship::Relationship;

#[derive(Debug, Clone)]
pub struct Index {
    pub name: String,
    /// Ordered — prefix matching depends on this order.
    pub columns: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub comment: Option<String>,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
    /// Ordered composite primary key, possibly empty (no PK).
    pub primary_key: Vec<String>,
    pub relationships: Vec<Relationship>,
    pub is_view: bool,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            comment: None,
            columns,
            indexes: Vec::new(),
            primary_key: Vec::new(),
            relationships: Vec::new(),
            is_view: false,
        }
    }

    pub fn with_primary_key(mut self, pk: Vec<String>) -> Self {
        self.primary_key = pk;
        self
    }

    pub fn with_indexes(mut self, indexes: Vec<Index>) -> Self {
        self.indexes = indexes;
        self
    }

    pub fn with_relationships(mut self, relationships: Vec<Relationship>) -> Self {
        self.relationships = relationships;
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }

    pub fn relationship(&self, field_name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name == field_name)
    }

    /// All indexes plus a synthesized unique index over the primary key,
    /// matching spec.md §4.1: "a single-row lookup by each unique index
    /// (including a synthesized one over the PK columns)".
    pub fn unique_indexes(&self) -> Vec<Index> {
        let mut out: Vec<Index> = self.indexes.iter().filter(|i| i.unique).cloned().collect();
        if self.has_primary_key() {
            out.push(Index {
                name: format!("{}_pkey", self.name),
                columns: self.primary_key.clone(),
                unique: true,
            });
        }
        out
    }

    /// True iff `cols` (in order) forms a prefix of some index's column list
    /// — the "index-prefix policy" from spec.md §4.2.
    pub fn covers_index_prefix(&self, cols: &[&str]) -> bool {
        if cols.is_empty() {
            return true;
        }
        let all_indexes = self.unique_indexes().into_iter().chain(self.indexes.iter().cloned());
        for idx in all_indexes {
            if idx.columns.len() >= cols.len()
                && idx.columns.iter().take(cols.len()).map(String::as_str).eq(cols.iter().copied())
            {
                return true;
            }
        }
        false
    }

    /// Validate an ordering's column list against the index-prefix policy.
    /// Resolution of SPEC_FULL.md §9's Open Question: the longest prefix of
    /// `cols` that is itself index-covered is always accepted; anything
    /// beyond that prefix requires `OrderByPolicy::AllowNonPrefix`.
    pub fn validate_order_by_policy(&self, cols: &[&str], policy: OrderByPolicy) -> Result<(), String> {
        if cols.is_empty() {
            return Ok(());
        }
        let mut longest_covered = 0usize;
        for len in 1..=cols.len() {
            if self.covers_index_prefix(&cols[..len]) {
                longest_covered = len;
            }
        }
        if longest_covered == cols.len() {
            return Ok(());
        }
        match policy {
            OrderByPolicy::AllowNonPrefix => Ok(()),
            OrderByPolicy::RequireIndexPrefix => Err(format!(
                "order-by columns {:?} are not covered by an index prefix on table {}",
                &cols[longest_covered..],
                self.name
            )),
        }
    }

    /// Vector columns covered by some index (spec.md §4.1: "for each vector
    /// column with an index, a vector-search connection"). A vector column
    /// with no index is exposed as ordinary data but gets no search field.
    pub fn indexed_vector_columns(&self) -> Vec<&Column> {
        self.columns
            .iter()
            .filter(|c| c.kind.is_vector() && self.indexes.iter().any(|idx| idx.columns.first().map(String::as_str) == Some(c.name.as_str())))
            .collect()
    }

    /// A junction table with no columns beyond the two FK tuples used by its
    /// referencing relationships — surfaced as many-to-many, never as its
    /// own GraphQL type (spec.md glossary: "Junction, pure").
    pub fn is_pure_junction(&self, local_fk: &[String], remote_fk: &[String]) -> bool {
        let fk_cols: std::collections::HashSet<&str> = local_fk
            .iter()
            .chain(remote_fk.iter())
            .map(String::as_str)
            .collect();
        self.columns.iter().all(|c| fk_cols.contains(c.name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::column::ColumnKind;

    fn table_with_index(cols: Vec<&str>, index_cols: Vec<&str>) -> Table {
        let columns = cols
            .into_iter()
            .map(|c| Column::new(c, "int", false, ColumnKind::Int))
            .collect();
        Table::new("t", columns).with_indexes(vec![Index {
            name: "idx".into(),
            columns: index_cols.into_iter().map(String::from).collect(),
            unique: false,
        }])
    }

    #[test]
    fn prefix_covered_by_index_passes_default_policy() {
        let t = table_with_index(vec!["a", "b", "c"], vec!["a", "b"]);
        assert!(t.validate_order_by_policy(&["a", "b"], OrderByPolicy::RequireIndexPrefix).is_ok());
    }

    #[test]
    fn non_prefix_rejected_under_default_policy() {
        let t = table_with_index(vec!["a", "b", "c"], vec!["a"]);
        assert!(t.validate_order_by_policy(&["a", "c"], OrderByPolicy::RequireIndexPrefix).is_err());
    }

    #[test]
    fn non_prefix_allowed_under_allow_non_prefix_policy() {
        let t = table_with_index(vec!["a", "b", "c"], vec!["a"]);
        assert!(t.validate_order_by_policy(&["a", "c"], OrderByPolicy::AllowNonPrefix).is_ok());
    }

    #[test]
    fn indexed_vector_columns_excludes_unindexed_ones() {
        let columns = vec![
            Column::new("id", "int", false, ColumnKind::Int),
            Column::new("embedding", "vector", false, ColumnKind::Vector { dims: 3 }),
            Column::new("aux_embedding", "vector", false, ColumnKind::Vector { dims: 3 }),
        ];
        let t = Table::new("chunks", columns).with_indexes(vec![Index {
            name: "embedding_idx".into(),
            columns: vec!["embedding".into()],
            unique: false,
        }]);
        let names: Vec<&str> = t.indexed_vector_columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["embedding"]);
    }

    #[test]
    fn pure_junction_has_only_fk_columns() {
        let columns = vec![
            Column::new("student_id", "int", false, ColumnKind::Int),
            Column::new("course_id", "int", false, ColumnKind::Int),
        ];
        let t = Table::new("enrollment", columns);
        assert!(t.is_pure_junction(&["student_id".to_string()], &["course_id".to_string()]));
    }
}

/// One of the four relationship shapes named in SPEC_FULL.md §1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipKind {
    ManyToOne,
    OneToMany,
    ManyToMany,
    EdgeList,
}

impl RelationshipKind {
    /// Many-to-one is the only shape that returns a single nullable object;
    /// the other three are connections.
    pub fn is_connection(&self) -> bool {
        !matches!(self, RelationshipKind::ManyToOne)
    }
}

/// Junction metadata for many-to-many (pure junction) and edge-list
/// (attribute junction) relationships.
#[derive(Debug, Clone)]
pub struct JunctionInfo {
    pub table: String,
    /// Junction columns that reference the parent table's key.
    pub local_fk: Vec<String>,
    /// Junction columns that reference the remote table's key.
    pub remote_fk: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Relationship {
    /// Stable GraphQL field name, already derived by the naming module.
    pub name: String,
    pub kind: RelationshipKind,
    pub local_columns: Vec<String>,
    pub remote_table: String,
    pub remote_columns: Vec<String>,
    pub junction: Option<JunctionInfo>,
}

impl Relationship {
    pub fn many_to_one(
        name: impl Into<String>,
        local_columns: Vec<String>,
        remote_table: impl Into<String>,
        remote_columns: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationshipKind::ManyToOne,
            local_columns,
            remote_table: remote_table.into(),
            remote_columns,
            junction: None,
        }
    }

    pub fn one_to_many(
        name: impl Into<String>,
        local_columns: Vec<String>,
        remote_table: impl Into<String>,
        remote_columns: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationshipKind::OneToMany,
            local_columns,
            remote_table: remote_table.into(),
            remote_columns,
            junction: None,
        }
    }

    pub fn many_to_many(
        name: impl Into<String>,
        local_columns: Vec<String>,
        remote_table: impl Into<String>,
        remote_columns: Vec<String>,
        junction: JunctionInfo,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationshipKind::ManyToMany,
            local_columns,
            remote_table: remote_table.into(),
            remote_columns,
            junction: Some(junction),
        }
    }

    pub fn edge_list(
        name: impl Into<String>,
        local_columns: Vec<String>,
        remote_table: impl Into<String>,
        remote_columns: Vec<String>,
        junction: JunctionInfo,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationshipKind::EdgeList,
            local_columns,
            remote_table: remote_table.into(),
            remote_columns,
            junction: Some(junction),
        }
    }
}

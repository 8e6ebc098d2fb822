/// Effective GraphQL type for a column, derived from the introspected SQL
/// type per SPEC_FULL.md §3 "Column — Derived: effective GraphQL type".
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    Int,
    BigInt,
    Float,
    Decimal,
    Boolean,
    String,
    Date,
    DateTime,
    Time,
    Year,
    Bytes,
    Uuid,
    Json,
    Vector { dims: usize },
    /// SQL ordinals are 1-based; `members` preserves declaration order.
    Enum { members: Vec<String> },
    Set { members: Vec<String> },
}

impl ColumnKind {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ColumnKind::Int | ColumnKind::BigInt | ColumnKind::Float | ColumnKind::Decimal
        )
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, ColumnKind::Vector { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub sql_type: String,
    pub nullable: bool,
    pub kind: ColumnKind,
    pub comment: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>, nullable: bool, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            nullable,
            kind,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Map a 1-based SQL ordinal to its enum label, per SPEC_FULL.md §4.5:
    /// "if the driver returned a numeric ordinal, map 1-based to the member
    /// list".
    pub fn enum_label(&self, ordinal: i64) -> Option<&str> {
        match &self.kind {
            ColumnKind::Enum { members } => {
                let idx = usize::try_from(ordinal - 1).ok()?;
                members.get(idx).map(String::as_str)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_ordinal_is_one_based() {
        let col = Column::new(
            "status",
            "enum",
            false,
            ColumnKind::Enum {
                members: vec!["open".into(), "closed".into(), "archived".into()],
            },
        );
        assert_eq!(col.enum_label(2), Some("closed"));
        assert_eq!(col.enum_label(1), Some("open"));
        assert_eq!(col.enum_label(0), None);
    }
}

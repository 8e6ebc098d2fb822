// Positional-parameter SQL builder shared by every planner submodule. The
// wire convention is MySQL/TiDB-style `?` placeholders bound in emission
// order (spec.md §1: "positional-parameter SQL").

use crate::value::Value;

#[derive(Debug, Default)]
pub struct SqlBuilder {
    sql: String,
    args: Vec<Value>,
}

impl SqlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_str(&mut self, s: &str) -> &mut Self {
        self.sql.push_str(s);
        self
    }

    pub fn push_ident(&mut self, ident: &str) -> &mut Self {
        self.sql.push('`');
        self.sql.push_str(&ident.replace('`', "``"));
        self.sql.push('`');
        self
    }

    pub fn push_param(&mut self, v: Value) -> &mut Self {
        self.sql.push('?');
        self.args.push(v);
        self
    }

    /// `col IN (?, ?, ?)` for a single column, or the row-constructor form
    /// `(col_a, col_b) IN ((?, ?), (?, ?))` for composite keys — spec.md
    /// §4.3's tuple-IN requirement for composite-PK batching.
    pub fn push_in_clause(&mut self, columns: &[&str], tuples: &[Vec<Value>]) -> &mut Self {
        if columns.len() == 1 {
            self.push_ident(columns[0]).push_str(" IN (");
        } else {
            self.push_str("(");
            for (i, c) in columns.iter().enumerate() {
                if i > 0 {
                    self.push_str(", ");
                }
                self.push_ident(c);
            }
            self.push_str(") IN (");
        }
        for (i, tuple) in tuples.iter().enumerate() {
            if i > 0 {
                self.push_str(", ");
            }
            if columns.len() == 1 {
                self.push_param(tuple[0].clone());
            } else {
                self.push_str("(");
                for (j, v) in tuple.iter().enumerate() {
                    if j > 0 {
                        self.push_str(", ");
                    }
                    self.push_param(v.clone());
                }
                self.push_str(")");
            }
        }
        self.push_str(")");
        self
    }

    pub fn finish(self) -> (String, Vec<Value>) {
        (self.sql, self.args)
    }

    pub fn len_args(&self) -> usize {
        self.args.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_column_in_clause() {
        let mut b = SqlBuilder::new();
        b.push_in_clause(&["id"], &[vec![Value::Int(1)], vec![Value::Int(2)]]);
        let (sql, args) = b.finish();
        assert_eq!(sql, "`id` IN (?, ?)");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn composite_column_in_clause_uses_row_constructor() {
        let mut b = SqlBuilder::new();
        b.push_in_clause(
            &["student_id", "course_id"],
            &[vec![Value::Int(1), Value::Int(2)]],
        );
        let (sql, args) = b.finish();
        assert_eq!(sql, "(`student_id`, `course_id`) IN ((?, ?))");
        assert_eq!(args.len(), 2);
    }
}

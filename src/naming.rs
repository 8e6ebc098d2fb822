// The naming module is listed in SPEC_FULL.md §1 as an external
// collaborator ("interface only"): database-identifier -> GraphQL-identifier
// rules. We define the trait boundary plus a default implementation so the
// rest of the core is independently testable.

/// Database identifier -> GraphQL identifier rules.
pub trait NamingStrategy: Send + Sync {
    /// `orders` -> `Order`.
    fn type_name(&self, table: &str) -> String;
    /// `created_at` -> `createdAt`.
    fn field_name(&self, column: &str) -> String;

    fn connection_type_name(&self, table: &str) -> String {
        format!("{}Connection", self.type_name(table))
    }
    fn edge_type_name(&self, table: &str) -> String {
        format!("{}Edge", self.type_name(table))
    }
    fn aggregate_type_name(&self, table: &str) -> String {
        format!("{}Aggregate", self.type_name(table))
    }
    fn aggregate_result_type_name(&self, table: &str) -> String {
        format!("{}AggregateResult", self.type_name(table))
    }
    fn where_input_name(&self, table: &str) -> String {
        format!("{}Where", self.type_name(table))
    }
    fn order_by_input_name(&self, table: &str) -> String {
        format!("{}OrderByClause", self.type_name(table))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNamingStrategy;

impl NamingStrategy for DefaultNamingStrategy {
    fn type_name(&self, table: &str) -> String {
        // singularize naively: drop a single trailing "s" unless the table
        // ends in "ss" (address, status) — a heuristic, not a grammar.
        let singular = if table.ends_with('s') && !table.ends_with("ss") && table.len() > 1 {
            &table[..table.len() - 1]
        } else {
            table
        };
        to_pascal_case(singular)
    }

    fn field_name(&self, column: &str) -> String {
        to_camel_case(column)
    }
}

fn to_pascal_case(s: &str) -> String {
    s.split(|c: char| c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .map(capitalize)
        .collect()
}

fn to_camel_case(s: &str) -> String {
    let mut parts = s.split(|c: char| c == '_' || c == '-').filter(|p| !p.is_empty());
    let Some(first) = parts.next() else {
        return String::new();
    };
    let mut out = first.to_ascii_lowercase();
    for part in parts {
        out.push_str(&capitalize(part));
    }
    out
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_ascii_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_name_singularizes_and_pascal_cases() {
        let n = DefaultNamingStrategy;
        assert_eq!(n.type_name("authors"), "Author");
        assert_eq!(n.type_name("line_items"), "LineItem");
        assert_eq!(n.type_name("address"), "Address");
    }

    #[test]
    fn column_name_camel_cases() {
        let n = DefaultNamingStrategy;
        assert_eq!(n.field_name("created_at"), "createdAt");
        assert_eq!(n.field_name("id"), "id");
    }

    #[test]
    fn derived_type_names_compose() {
        let n = DefaultNamingStrategy;
        assert_eq!(n.connection_type_name("authors"), "AuthorConnection");
        assert_eq!(n.where_input_name("authors"), "AuthorWhere");
    }
}

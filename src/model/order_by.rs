#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }

    pub fn reversed(&self) -> Direction {
        match self {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByClause {
    pub column: String,
    pub direction: Direction,
}

/// Controls whether an ordering that is not covered by an index prefix is
/// permitted. See SPEC_FULL.md §9 for the resolved Open Question: the
/// shared prefix is always validated against an index; only the remainder
/// is gated by this policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderByPolicy {
    #[default]
    RequireIndexPrefix,
    AllowNonPrefix,
}

/// An ordered list of (column, direction) pairs. Preserves user order per
/// spec.md §4.2 ("parsed from an ordered list of single-pair objects").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy(pub Vec<OrderByClause>);

impl OrderBy {
    pub fn new(clauses: Vec<OrderByClause>) -> Self {
        Self(clauses)
    }

    pub fn single(column: impl Into<String>, direction: Direction) -> Self {
        Self(vec![OrderByClause {
            column: column.into(),
            direction,
        }])
    }

    pub fn columns(&self) -> Vec<&str> {
        self.0.iter().map(|c| c.column.as_str()).collect()
    }

    pub fn directions(&self) -> Vec<Direction> {
        self.0.iter().map(|c| c.direction).collect()
    }

    /// Deterministic string identifying this ordering's shape, used as the
    /// cursor/ConnectionPlan "order-by fingerprint".
    pub fn fingerprint(&self) -> String {
        self.0
            .iter()
            .map(|c| format!("{}:{}", c.column, if c.direction == Direction::Asc { "A" } else { "D" }))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Flips every direction — used to run the SQL for a backward page
    /// (spec.md §4.2: "requests `last + 1` with the order reversed in SQL,
    /// then reverses client-side").
    pub fn reversed(&self) -> OrderBy {
        OrderBy(
            self.0
                .iter()
                .map(|c| OrderByClause {
                    column: c.column.clone(),
                    direction: c.direction.reversed(),
                })
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_direction_sensitive() {
        let a = OrderBy::single("id", Direction::Asc);
        let b = OrderBy::single("id", Direction::Desc);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn reversed_flips_every_direction() {
        let ob = OrderBy::new(vec![
            OrderByClause { column: "a".into(), direction: Direction::Asc },
            OrderByClause { column: "b".into(), direction: Direction::Desc },
        ]);
        let rev = ob.reversed();
        assert_eq!(rev.directions(), vec![Direction::Desc, Direction::Asc]);
    }
}

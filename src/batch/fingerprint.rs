// Batch key fingerprinting (spec.md §4.3): two distinct relationship
// resolutions within the same request coalesce into the same SQL query iff
// they agree on relationship, where-predicate, and ordering. `rel_key`
// captures that; parent-key fingerprinting reuses `value::canonical_tuple`.

use crate::model::{OrderBy, Relationship};
use crate::planner::where_clause::{FilterOp, RelQuantifier, WhereInput};
use crate::value::Value;

pub fn rel_key(rel: &Relationship, where_input: Option<&WhereInput>, order_by: Option<&OrderBy>) -> String {
    format!(
        "{}::{}::{}",
        rel.name,
        where_input.map(where_fingerprint).unwrap_or_default(),
        order_by.map(OrderBy::fingerprint).unwrap_or_default(),
    )
}

fn where_fingerprint(w: &WhereInput) -> String {
    match w {
        WhereInput::And(parts) => format!("and({})", join_fingerprints(parts)),
        WhereInput::Or(parts) => format!("or({})", join_fingerprints(parts)),
        WhereInput::Not(inner) => format!("not({})", where_fingerprint(inner)),
        WhereInput::Column(name, op) => format!("col({name},{})", filter_op_fingerprint(op)),
        WhereInput::Relationship(field, quant) => format!("rel({field},{})", quantifier_fingerprint(quant)),
    }
}

fn join_fingerprints(parts: &[WhereInput]) -> String {
    parts.iter().map(where_fingerprint).collect::<Vec<_>>().join(",")
}

fn filter_op_fingerprint(op: &FilterOp) -> String {
    match op {
        FilterOp::Eq(v) => format!("eq:{}", v.canonical()),
        FilterOp::Ne(v) => format!("ne:{}", v.canonical()),
        FilterOp::Lt(v) => format!("lt:{}", v.canonical()),
        FilterOp::Lte(v) => format!("lte:{}", v.canonical()),
        FilterOp::Gt(v) => format!("gt:{}", v.canonical()),
        FilterOp::Gte(v) => format!("gte:{}", v.canonical()),
        FilterOp::In(vs) => format!("in:[{}]", vs.iter().map(Value::canonical).collect::<Vec<_>>().join(",")),
        FilterOp::NotIn(vs) => format!("notin:[{}]", vs.iter().map(Value::canonical).collect::<Vec<_>>().join(",")),
        FilterOp::Like(p) => format!("like:{p}"),
        FilterOp::IsNull(b) => format!("isnull:{b}"),
    }
}

fn quantifier_fingerprint(q: &RelQuantifier) -> String {
    match q {
        RelQuantifier::Is(inner) => format!("is({})", where_fingerprint(inner)),
        RelQuantifier::Some(inner) => format!("some({})", where_fingerprint(inner)),
        RelQuantifier::None(inner) => format!("none({})", where_fingerprint(inner)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Direction, OrderByClause};

    fn rel() -> Relationship {
        Relationship::one_to_many("books", vec!["id".into()], "books", vec!["author_id".into()])
    }

    #[test]
    fn identical_inputs_produce_identical_keys() {
        let r = rel();
        let w = WhereInput::Column("title".into(), FilterOp::Eq(Value::Str("Foo".into())));
        let ob = OrderBy::single("id", Direction::Asc);
        assert_eq!(rel_key(&r, Some(&w), Some(&ob)), rel_key(&r, Some(&w), Some(&ob)));
    }

    #[test]
    fn different_where_values_produce_different_keys() {
        let r = rel();
        let a = WhereInput::Column("title".into(), FilterOp::Eq(Value::Str("Foo".into())));
        let b = WhereInput::Column("title".into(), FilterOp::Eq(Value::Str("Bar".into())));
        assert_ne!(rel_key(&r, Some(&a), None), rel_key(&r, Some(&b), None));
    }

    #[test]
    fn no_predicate_and_empty_predicate_are_distinguishable_from_some_predicate() {
        let r = rel();
        let w = WhereInput::Column("title".into(), FilterOp::Eq(Value::Str("Foo".into())));
        assert_ne!(rel_key(&r, None, None), rel_key(&r, Some(&w), None));
    }

    #[test]
    fn ordering_is_part_of_the_fingerprint() {
        let r = rel();
        let asc = OrderBy::single("id", Direction::Asc);
        let desc = OrderBy::single("id", Direction::Desc);
        assert_ne!(rel_key(&r, None, Some(&asc)), rel_key(&r, None, Some(&desc)));
    }

    #[test]
    fn clause_order_inside_and_matters() {
        let r = rel();
        let a = WhereInput::And(vec![
            WhereInput::Column("a".into(), FilterOp::Eq(Value::Int(1))),
            WhereInput::Column("b".into(), FilterOp::Eq(Value::Int(2))),
        ]);
        let b = WhereInput::And(vec![
            WhereInput::Column("b".into(), FilterOp::Eq(Value::Int(2))),
            WhereInput::Column("a".into(), FilterOp::Eq(Value::Int(1))),
        ]);
        assert_ne!(rel_key(&r, Some(&a), None), rel_key(&r, Some(&b), None));
        let _ = OrderByClause { column: "x".into(), direction: Direction::Asc };
    }
}

// Query Planner (spec.md §4.2): turns a resolved GraphQL selection —
// predicate, ordering, pagination args, relationship batch request, or
// vector search — into positional-parameter SQL against the Schema Model.

pub mod connection;
pub mod relationship;
pub mod select;
pub mod sql;
pub mod vector_search;
pub mod where_clause;

pub use connection::{AggregateField, AggregateFn, ConnectionArgs, ConnectionPlan, PageDirection};
pub use relationship::{build_batch, BatchQuery, ParentKeySource};
pub use select::widen_selection;
pub use sql::SqlBuilder;
pub use vector_search::{VectorMetric, VectorSearchPlan, DISTANCE_ALIAS, MAX_TOP_K};
pub use where_clause::{build_where, FilterOp, RelQuantifier, WhereInput};

/// Default cap on `batchMaxInClause` (spec.md §4.3): the relationship
/// batcher chunks its `IN (...)` lists at this size.
pub const DEFAULT_BATCH_MAX_IN_CLAUSE: usize = 1000;

/// Default cap on page size (`first`/`last`) absent any table- or
/// schema-level override.
pub const DEFAULT_MAX_PAGE_SIZE: i64 = 100;

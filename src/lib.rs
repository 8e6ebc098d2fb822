// rgql-core: GraphQL-over-relational-database adapter core.
//
// Given a SQL schema introspected from a TiDB/MySQL-compatible database,
// this crate derives a typed GraphQL schema on demand (`registry`,
// `resolver::schema_builder`) and executes incoming GraphQL queries against
// the database with request-scoped, deduplicating batch planning
// (`planner`, `batch`, `connection_executor`) so relationship fan-out never
// turns into N+1 round trips.
//
// See `SPEC_FULL.md` for the full module-by-module design; `DESIGN.md`
// records which teacher/example files each module is grounded on.

pub mod batch;
pub mod connection_executor;
pub mod cursor;
pub mod driver;
pub mod error;
pub mod introspect;
pub mod model;
pub mod naming;
pub mod node_id;
pub mod planner;
pub mod registry;
pub mod resolver;
pub mod scan;
pub mod telemetry;
pub mod value;

pub use error::{CoreError, Result};
pub use resolver::context::{ResolverContext, ResolverOptions};
pub use resolver::schema_builder::build_graphql_schema;
pub use batch::{new_batching_context, BatchState};

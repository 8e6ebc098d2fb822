// Resolver layer (SPEC_FULL.md §4.6, ADDED): wires `model::Schema` +
// `registry`'s generated types + `planner`/`batch`/`connection_executor`
// into a runnable `async_graphql::dynamic::Schema`.

pub mod args;
pub mod context;
pub mod relationship;
pub mod root;
pub mod schema_builder;

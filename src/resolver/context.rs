// Resolver wiring context (SPEC_FULL.md §4.6, ADDED): bundles everything a
// field resolver needs that isn't already on its parent value — the Schema
// Model, the SQL driver, the naming strategy, and the telemetry sink —
// mirroring how the teacher wires `Arc<GraphQLEngine>` into `Context<'_>`
// via `ctx.data::<Arc<GraphQLEngine>>()`.

use crate::driver::SqlDriver;
use crate::model::{OrderByPolicy, Schema};
use crate::naming::NamingStrategy;
use crate::planner::{DEFAULT_BATCH_MAX_IN_CLAUSE, DEFAULT_MAX_PAGE_SIZE};
use crate::telemetry::TelemetrySink;
use std::collections::HashMap;
use std::sync::Arc;

/// Policy knobs referenced throughout spec.md §4.2/§4.3 by name
/// (`OrderByPolicy`, `batchMaxInClause`, default page size, `MaxTopK`)
/// gathered in one place instead of threaded as loose arguments.
#[derive(Debug, Clone, Copy)]
pub struct ResolverOptions {
    /// `first`/`last` when the client supplies neither (spec.md §6:
    /// "Absence of both pagination tuples implies `first = defaultLimit`
    /// forward").
    pub default_page_size: i64,
    /// Hard ceiling on `first`/`last`, independent of `defaultPageSize`.
    pub max_page_size: i64,
    pub order_by_policy: OrderByPolicy,
    /// spec.md §4.3 `batchMaxInClause`.
    pub batch_max_in_clause: usize,
    /// Configured ceiling on vector search `topK` (spec.md §6 `MaxTopK`,
    /// default 100) — distinct from `planner::vector_search::MAX_TOP_K`,
    /// the absolute hard cap no deployment may raise past.
    pub max_top_k: i64,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            order_by_policy: OrderByPolicy::RequireIndexPrefix,
            batch_max_in_clause: DEFAULT_BATCH_MAX_IN_CLAUSE,
            max_top_k: 100,
        }
    }
}

/// Everything a resolver closure captures besides the per-request
/// `BatchState` (which is installed separately via
/// [`crate::batch::new_batching_context`] since, unlike this context, it
/// must not be shared across requests).
pub struct ResolverContext {
    pub schema: Arc<Schema>,
    pub driver: Arc<dyn SqlDriver>,
    pub naming: Arc<dyn NamingStrategy>,
    pub telemetry: Arc<dyn TelemetrySink>,
    pub options: ResolverOptions,
    /// GraphQL type name -> table name, so the `node(id)` field can reverse
    /// a decoded node id's type name back to the table it reads from.
    pub type_to_table: HashMap<String, String>,
}

impl ResolverContext {
    pub fn new(schema: Arc<Schema>, driver: Arc<dyn SqlDriver>, naming: Arc<dyn NamingStrategy>, telemetry: Arc<dyn TelemetrySink>) -> Self {
        let type_to_table = schema.exposed_tables().map(|t| (naming.type_name(&t.name), t.name.clone())).collect();
        Self { schema, driver, naming, telemetry, options: ResolverOptions::default(), type_to_table }
    }

    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }
}

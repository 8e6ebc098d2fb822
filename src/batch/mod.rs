// Relationship Batcher + request-scoped BatchState (spec.md §4.3): the
// N+1-avoidance layer sitting between the resolver dispatch and the SQL
// driver.

mod batcher;
pub mod fingerprint;
mod state;

pub use state::{parent_group_id, BatchState, PARENT_GROUP_KEY};

use std::sync::Arc;

/// spec.md §6 "Inbound": `NewBatchingContext(parent)` installs a fresh
/// `BatchState` on a request context. The core has no context/Data type of
/// its own (that belongs to whichever GraphQL engine hosts it); callers
/// install the returned `Arc` into that engine's per-request data the way
/// `resolver::schema_builder`'s doc comment describes for async-graphql's
/// `Context::data`.
pub fn new_batching_context() -> Arc<BatchState> {
    Arc::new(BatchState::new())
}

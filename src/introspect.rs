// Schema introspection boundary (SPEC_FULL.md §1.1 external collaborator):
// turning a live database's catalog into the Schema Model. Out of scope to
// implement against a real `information_schema` query here — we define the
// trait and a static implementation for tests and schema-building examples.

use crate::error::Result;
use crate::model::Schema;
use async_trait::async_trait;

#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    async fn introspect(&self) -> Result<Schema>;
}

/// Wraps a pre-built `Schema`, e.g. one assembled by hand in a test or
/// constructed once at startup and then swapped in behind an `ArcSwap`.
pub struct StaticIntrospector {
    schema: Schema,
}

impl StaticIntrospector {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }
}

#[async_trait]
impl SchemaIntrospector for StaticIntrospector {
    async fn introspect(&self) -> Result<Schema> {
        Ok(self.schema.clone())
    }
}

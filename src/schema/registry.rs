//! Schema registry
//!
//! Holds every schema known to the deployment, keyed by URN. Populated once
//! at startup from static configuration and read-only afterwards.

use indexmap::IndexMap;

use super::{Schema, core_group_schema, core_user_schema, enterprise_user_schema};

/// URN-keyed schema lookup table
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: IndexMap<String, Schema>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-loaded with the RFC 7643 core schemas
    pub fn with_core_schemas() -> Self {
        let mut registry = Self::new();
        registry.register(core_user_schema());
        registry.register(core_group_schema());
        registry.register(enterprise_user_schema());
        registry
    }

    /// Register a schema, replacing any previous schema with the same URN
    pub fn register(&mut self, schema: Schema) {
        self.schemas
            .insert(schema.urn().to_ascii_lowercase(), schema);
    }

    /// Case-insensitive lookup by URN
    pub fn get(&self, urn: &str) -> Option<&Schema> {
        self.schemas.get(&urn.to_ascii_lowercase())
    }

    /// Registered schemas in registration order
    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }
}

//! Schema registry: resource type name -> `ResourceSchema`.
//!
//! Built once at startup and read-only afterwards, so it can be shared
//! across concurrent requests without locking.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::RegistryError;
use crate::types::ResourceSchema;

/// On-disk registry layout: `{ "resources": [ ... ] }`.
#[derive(Debug, Deserialize)]
struct RegistryFile {
    resources: Vec<ResourceSchema>,
}

/// Immutable set of registered resource schemas.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, ResourceSchema>,
}

impl SchemaRegistry {
    /// Register a set of schemas, checking that they are consistent.
    ///
    /// # Errors
    ///
    /// Fails on duplicate type names, relationship targets that are not
    /// registered, includable names without a relationship, and names used
    /// both as attribute and relationship.
    pub fn new(schemas: impl IntoIterator<Item = ResourceSchema>) -> Result<Self, RegistryError> {
        let mut map = BTreeMap::new();
        for schema in schemas {
            if map.contains_key(&schema.type_name) {
                return Err(RegistryError::DuplicateType {
                    type_name: schema.type_name,
                });
            }
            map.insert(schema.type_name.clone(), schema);
        }

        for schema in map.values() {
            check_schema(schema, &map)?;
        }

        debug!(types = map.len(), "Schema registry built");
        Ok(Self { schemas: map })
    }

    /// Build from the `{ "resources": [...] }` JSON layout.
    pub fn from_value(value: &Value) -> Result<Self, RegistryError> {
        let file = RegistryFile::deserialize(value)
            .map_err(|source| RegistryError::InvalidRegistry { source })?;
        Self::new(file.resources)
    }

    pub fn get(&self, type_name: &str) -> Option<&ResourceSchema> {
        self.schemas.get(type_name)
    }

    /// Like [`get`](Self::get), but unknown types are an error.
    pub fn schema(&self, type_name: &str) -> Result<&ResourceSchema, RegistryError> {
        self.get(type_name).ok_or_else(|| RegistryError::UnknownType {
            type_name: type_name.to_string(),
        })
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

fn check_schema(
    schema: &ResourceSchema,
    all: &BTreeMap<String, ResourceSchema>,
) -> Result<(), RegistryError> {
    for (name, rel) in &schema.relationships {
        if !all.contains_key(&rel.target) {
            return Err(RegistryError::UnknownTarget {
                type_name: schema.type_name.clone(),
                relationship: name.clone(),
                target: rel.target.clone(),
            });
        }
        if schema.attributes.contains(name) {
            return Err(RegistryError::FieldClash {
                type_name: schema.type_name.clone(),
                name: name.clone(),
            });
        }
    }

    if let Some(includable) = &schema.includable {
        if let Some(name) = includable
            .iter()
            .find(|name| !schema.relationships.contains_key(*name))
        {
            return Err(RegistryError::IncludableNotRelationship {
                type_name: schema.type_name.clone(),
                name: name.clone(),
            });
        }
    }

    Ok(())
}

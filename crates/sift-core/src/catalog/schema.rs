//! Schema bundle - versioned snapshot of the entity model.

use super::EntityDef;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A versioned snapshot of the entity model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaBundle {
    /// Schema version.
    #[serde(default)]
    pub version: u64,
    /// Entity and embeddable definitions keyed by name.
    #[serde(default)]
    pub entities: HashMap<String, EntityDef>,
}

impl SchemaBundle {
    /// Create an empty schema bundle.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            entities: HashMap::new(),
        }
    }

    /// Add an entity to the schema.
    pub fn with_entity(mut self, entity: EntityDef) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    /// Get an entity by name.
    pub fn get_entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    /// Get all entity names, sorted.
    pub fn entity_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entities.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Parse a bundle from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check that every relationship points at a known type and every
    /// identity field exists.
    pub fn validate(&self) -> Result<(), Error> {
        for entity in self.entities.values() {
            for name in &entity.identity_fields {
                if entity.get_field(name).is_none() {
                    return Err(Error::unknown_field(&entity.name, name));
                }
            }
            for field in &entity.fields {
                if let Some(target) = field.field_type.target_entity() {
                    if !self.entities.contains_key(target) {
                        return Err(Error::UnknownEntity(target.to_string()));
                    }
                }
            }
        }
        Ok(())
    }
}

//! Entity definitions.

use super::field::FieldDef;
use super::types::FieldType;
use serde::{Deserialize, Serialize};

/// An entity (or embeddable value type) definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    /// Entity name (unique within schema).
    pub name: String,
    /// Names of the identity fields; empty for embeddable value types.
    #[serde(default)]
    pub identity_fields: Vec<String>,
    /// Field definitions in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

/// How an entity is identified.
#[derive(Debug, Clone, PartialEq)]
pub enum Identity<'a> {
    /// A single scalar attribute.
    Single(&'a FieldDef),
    /// A single attribute holding an embedded identifier object.
    Embedded(&'a FieldDef),
    /// Several attributes together.
    Composite(Vec<&'a FieldDef>),
    /// No identifier (embeddable value types).
    None,
}

impl Identity<'_> {
    /// The single identifier attribute, when there is one.
    pub fn single(&self) -> Option<&FieldDef> {
        match self {
            Identity::Single(field) => Some(field),
            _ => None,
        }
    }
}

impl EntityDef {
    /// Create a new entity definition with a single identity field.
    pub fn new(name: impl Into<String>, identity_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity_fields: vec![identity_field.into()],
            fields: Vec::new(),
        }
    }

    /// Create an entity identified by several fields together.
    pub fn with_composite_identity(
        name: impl Into<String>,
        identity_fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            identity_fields: identity_fields.into_iter().map(Into::into).collect(),
            fields: Vec::new(),
        }
    }

    /// Create an embeddable value type (no identity).
    pub fn embeddable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity_fields: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Add a field to the entity.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add multiple fields to the entity.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Resolve the identity of this entity.
    pub fn identity(&self) -> Identity<'_> {
        let fields: Vec<&FieldDef> = self
            .identity_fields
            .iter()
            .filter_map(|name| self.get_field(name))
            .collect();

        match fields.as_slice() {
            [] => Identity::None,
            [field] => match field.field_type {
                FieldType::Embedded { .. } | FieldType::OptionalEmbedded { .. } => {
                    Identity::Embedded(field)
                }
                _ => Identity::Single(field),
            },
            _ => Identity::Composite(fields),
        }
    }

    /// Fields that take part in templates and storage.
    pub fn persistent_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| !f.transient)
    }
}

//! Entity metadata lookups used by the compiler, the materializer and backends.

use super::{CollectionKind, EntityDef, FieldDef, Identity, SchemaBundle};
use crate::error::Error;
use sift_proto::RelationKind;
use tracing::debug;

/// Read access to the entity model.
///
/// Only [`MetadataProvider::entity`] must be implemented; every other lookup
/// is derived from the entity definitions.
pub trait MetadataProvider {
    /// Get an entity definition by name.
    fn entity(&self, name: &str) -> Result<&EntityDef, Error>;

    /// Get an attribute definition.
    fn field(&self, entity: &str, attribute: &str) -> Result<&FieldDef, Error> {
        self.entity(entity)?
            .get_field(attribute)
            .ok_or_else(|| Error::unknown_field(entity, attribute))
    }

    /// Identifier of an entity.
    fn identifier(&self, entity: &str) -> Result<Identity<'_>, Error> {
        Ok(self.entity(entity)?.identity())
    }

    /// Name of the single identifier attribute, failing for composite,
    /// embedded or missing identifiers.
    fn single_identifier(&self, entity: &str) -> Result<&FieldDef, Error> {
        match self.identifier(entity)? {
            Identity::Single(field) => Ok(field),
            Identity::Embedded(_) => Err(Error::CompositeIdentifier {
                entity: entity.to_string(),
                reason: "identifier is an embedded value".into(),
            }),
            Identity::Composite(_) => Err(Error::CompositeIdentifier {
                entity: entity.to_string(),
                reason: "identifier spans several attributes".into(),
            }),
            Identity::None => Err(Error::CompositeIdentifier {
                entity: entity.to_string(),
                reason: "type declares no identifier".into(),
            }),
        }
    }

    /// Relationship kind of an attribute.
    fn relationship_kind(&self, entity: &str, attribute: &str) -> Result<RelationKind, Error> {
        Ok(self.field(entity, attribute)?.field_type.relation_kind())
    }

    /// Entity on the other side of a relationship attribute.
    fn target_entity(&self, entity: &str, attribute: &str) -> Result<&str, Error> {
        let field = self.field(entity, attribute)?;
        match field.field_type.relation_kind() {
            RelationKind::Scalar => Err(Error::unknown_field(entity, attribute)),
            RelationKind::ToMany => self.collection_element_type(entity, attribute),
            _ => field
                .field_type
                .target_entity()
                .ok_or_else(|| Error::unknown_field(entity, attribute)),
        }
    }

    /// Element type of a to-many attribute.
    fn collection_element_type(&self, entity: &str, attribute: &str) -> Result<&str, Error> {
        let field = self.field(entity, attribute)?;
        if field.field_type.collection_kind().is_none() {
            return Err(Error::unknown_field(entity, attribute));
        }
        field
            .field_type
            .target_entity()
            .ok_or_else(|| Error::MissingElementType {
                entity: entity.to_string(),
                attribute: attribute.to_string(),
            })
    }

    /// List or set semantics of a to-many attribute.
    fn collection_kind(&self, entity: &str, attribute: &str) -> Result<CollectionKind, Error> {
        self.field(entity, attribute)?
            .field_type
            .collection_kind()
            .ok_or_else(|| Error::unknown_field(entity, attribute))
    }
}

/// In-memory entity model.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    schema: SchemaBundle,
}

impl Catalog {
    /// Create a catalog from a schema bundle, checking that it is consistent.
    pub fn new(schema: SchemaBundle) -> Result<Self, Error> {
        schema.validate()?;
        debug!(
            version = schema.version,
            entities = schema.entities.len(),
            "Loaded entity catalog"
        );
        Ok(Self { schema })
    }

    /// Create a catalog from a JSON schema bundle.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Self::new(SchemaBundle::from_json(json)?)
    }

    /// Get the schema bundle.
    pub fn schema(&self) -> &SchemaBundle {
        &self.schema
    }

    /// Get the schema version.
    pub fn version(&self) -> u64 {
        self.schema.version
    }

    /// List all entity names.
    pub fn list_entities(&self) -> Vec<String> {
        self.schema
            .entity_names()
            .into_iter()
            .map(String::from)
            .collect()
    }
}

impl MetadataProvider for Catalog {
    fn entity(&self, name: &str) -> Result<&EntityDef, Error> {
        self.schema
            .get_entity(name)
            .ok_or_else(|| Error::UnknownEntity(name.to_string()))
    }
}

//! Entity model metadata.
//!
//! The catalog describes entities, their attributes, identifiers and
//! relationships. The compiler, the materializer and the in-memory backend
//! read it through the [`MetadataProvider`] trait.

mod catalog;
mod entity;
mod field;
mod schema;
mod types;

pub use catalog::{Catalog, MetadataProvider};
pub use entity::{EntityDef, Identity};
pub use field::FieldDef;
pub use schema::SchemaBundle;
pub use types::{CollectionKind, FieldType, ScalarType};

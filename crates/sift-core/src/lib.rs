//! sift core - filter specifications, query compilation and materialization.
//!
//! A [`FilterSpec`] describes a query over one entity type: a template
//! object, restrictions keyed by dotted attribute path (built directly or
//! classified from text such as `">=2020-01-01"` or `"(A,B)"`), projections,
//! ordering, grouping and joins. The [`QueryCompiler`] turns it into
//! immutable [`sift_proto::QueryPlan`] values against a [`MetadataProvider`],
//! and the [`QueryExecutor`] runs them on a [`QueryBackend`], loading
//! deferred collections and materializing nested result objects.
//!
//! ```ignore
//! use sift_core::{Catalog, CompilerConfig, FilterSpec, MemoryStore, QueryExecutor};
//!
//! let catalog = Catalog::from_json(SCHEMA)?;
//! let store = MemoryStore::new(catalog.clone());
//! let config = CompilerConfig::default();
//! let executor = QueryExecutor::new(&catalog, &store, &config);
//!
//! let mut spec = FilterSpec::new("User");
//! spec.apply_text("created", "2020-01-01 & 2020-12-31")?;
//! spec.select("name").select("roles.name");
//! let users: Vec<UserView> = executor.find(&spec)?;
//! ```

pub mod backend;
pub mod catalog;
pub mod coerce;
pub mod compiler;
pub mod config;
pub mod error;
pub mod executor;
pub mod filter;
pub mod materialize;
pub mod memory;

#[cfg(test)]
mod testing;

pub use backend::{BackendError, QueryBackend};
pub use catalog::{
    Catalog, CollectionKind, EntityDef, FieldDef, FieldType, Identity, MetadataProvider,
    ScalarType, SchemaBundle,
};
pub use compiler::{CompiledQuery, DeferredCollection, QueryCompiler};
pub use config::{CompilerConfig, DateFormats};
pub use error::Error;
pub use executor::{PageRequest, QueryExecutor};
pub use filter::{
    Fallback, FieldOverride, FilterSpec, JoinDirective, Operator, OperatorCategory, Restriction,
    RestrictionValue,
};
pub use materialize::{Materializer, RowObject};
pub use memory::MemoryStore;

/// Re-export plan types.
pub use sift_proto as proto;

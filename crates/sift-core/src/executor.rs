//! Compile-and-execute entry points.
//!
//! The executor compiles a filter specification, runs the page or count plan
//! on a backend, loads deferred collections with follow-up queries and
//! materializes the rows.

use crate::backend::QueryBackend;
use crate::catalog::MetadataProvider;
use crate::compiler::{CompiledQuery, DeferredCollection, QueryCompiler};
use crate::config::CompilerConfig;
use crate::error::Error;
use crate::filter::FilterSpec;
use crate::materialize::{into_typed, merge_collection, Materializer, RowObject};
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use sift_proto::{Page, Pagination, QueryPlan, RowSet, Value};
use tracing::{debug, instrument, warn};

/// A zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Zero-based page number.
    pub page_number: u32,
    /// Requested page size; 0 means the configured default.
    pub page_size: u32,
}

impl PageRequest {
    /// Create a page request.
    pub fn new(page_number: u32, page_size: u32) -> Self {
        Self {
            page_number,
            page_size,
        }
    }

    /// The first page of the given size.
    pub fn first(page_size: u32) -> Self {
        Self::new(0, page_size)
    }

    /// The page after this one.
    pub fn next(&self) -> Self {
        Self::new(self.page_number.saturating_add(1), self.page_size)
    }
}

/// Runs filter specifications against a backend.
pub struct QueryExecutor<'a> {
    metadata: &'a dyn MetadataProvider,
    backend: &'a dyn QueryBackend,
    config: &'a CompilerConfig,
}

impl<'a> QueryExecutor<'a> {
    /// Create a new executor.
    pub fn new(
        metadata: &'a dyn MetadataProvider,
        backend: &'a dyn QueryBackend,
        config: &'a CompilerConfig,
    ) -> Self {
        Self {
            metadata,
            backend,
            config,
        }
    }

    /// Compile a specification without executing it.
    pub fn compile(&self, spec: &FilterSpec) -> Result<CompiledQuery, Error> {
        QueryCompiler::new(self.metadata, self.config).compile(spec)
    }

    /// Find all matching results as untyped JSON objects.
    #[instrument(skip_all, fields(entity = %spec.entity()))]
    pub fn find_objects(&self, spec: &FilterSpec) -> Result<Vec<Json>, Error> {
        let compiled = self.compile(spec)?;
        self.load(&compiled, &compiled.page_plan)
    }

    /// Find all matching results.
    pub fn find<T: DeserializeOwned>(&self, spec: &FilterSpec) -> Result<Vec<T>, Error> {
        into_typed(spec.entity(), self.find_objects(spec)?)
    }

    /// Find the first matching result. More than one match is not an error.
    #[instrument(skip_all, fields(entity = %spec.entity()))]
    pub fn find_one<T: DeserializeOwned>(&self, spec: &FilterSpec) -> Result<Option<T>, Error> {
        let compiled = self.compile(spec)?;
        let offset = spec.range().map(|r| r.offset).unwrap_or(0);
        let plan = compiled.paged(Pagination::new(1, offset));
        let objects = self.load(&compiled, &plan)?;
        Ok(into_typed(spec.entity(), objects)?.into_iter().next())
    }

    /// Count matching results, ignoring ordering and range.
    #[instrument(skip_all, fields(entity = %spec.entity()))]
    pub fn count(&self, spec: &FilterSpec) -> Result<u64, Error> {
        let compiled = self.compile(spec)?;
        self.run_count(&compiled)
    }

    /// Fetch one page of results with the total number of matches.
    #[instrument(skip_all, fields(entity = %spec.entity(), page = request.page_number))]
    pub fn find_page<T: DeserializeOwned>(
        &self,
        spec: &FilterSpec,
        request: PageRequest,
    ) -> Result<Page<T>, Error> {
        let compiled = self.compile(spec)?;
        let page_size = self.config.page_size(request.page_size);
        let total = self.run_count(&compiled)?;

        let offset = u64::from(request.page_number) * u64::from(page_size);
        let elements = if offset >= total {
            Vec::new()
        } else {
            let offset = u32::try_from(offset)
                .map_err(|_| Error::Config(format!("page offset {} is out of range", offset)))?;
            let plan = compiled.paged(Pagination::new(page_size, offset));
            into_typed(spec.entity(), self.load(&compiled, &plan)?)?
        };

        debug!(
            total = total,
            page_size = page_size,
            elements = elements.len(),
            "Loaded page"
        );
        Ok(Page::new(total, page_size, request.page_number, elements))
    }

    fn run_count(&self, compiled: &CompiledQuery) -> Result<u64, Error> {
        match self.execute(&compiled.entity, &compiled.count_plan)? {
            RowSet::Count(total) => Ok(total),
            other => Err(Error::materialize(
                &compiled.entity,
                format!("expected a count, got {} rows", other.len()),
            )),
        }
    }

    fn execute(&self, entity: &str, plan: &QueryPlan) -> Result<RowSet, Error> {
        self.backend
            .execute(plan)
            .map_err(|source| Error::backend(entity, source))
    }

    /// Run a plan of a compiled query and materialize its rows.
    fn load(&self, compiled: &CompiledQuery, plan: &QueryPlan) -> Result<Vec<Json>, Error> {
        let entity = compiled.entity.as_str();
        match self.execute(entity, plan)? {
            RowSet::Entities(documents) => {
                debug!(rows = documents.len(), "Loaded entities");
                Ok(documents)
            }
            RowSet::Tuples(rows) => {
                debug!(rows = rows.len(), "Loaded tuples");
                let mut objects = Materializer::new(self.metadata, entity)?
                    .with_identifier_alias(compiled.identifier_alias.as_deref())
                    .objects(&rows)?;
                for deferred in &compiled.deferred {
                    self.load_deferred(compiled, deferred, &mut objects)?;
                }
                Ok(objects.into_iter().map(RowObject::into_json).collect())
            }
            RowSet::Count(_) => Err(Error::materialize(
                entity,
                "expected rows, got a count",
            )),
        }
    }

    /// Load one deferred collection for the given parents.
    fn load_deferred(
        &self,
        compiled: &CompiledQuery,
        deferred: &DeferredCollection,
        parents: &mut [RowObject],
    ) -> Result<(), Error> {
        let entity = compiled.entity.as_str();
        let alias = compiled
            .identifier_alias
            .as_deref()
            .unwrap_or(self.config.identifier_alias.as_str());

        let mut ids: Vec<Value> = Vec::new();
        for id in parents.iter().filter_map(|p| p.id.as_ref()) {
            if !id.is_null() && !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        if ids.is_empty() {
            merge_collection(parents, &deferred.attribute, deferred.kind, Vec::new());
            return Ok(());
        }

        let identifier = self.metadata.single_identifier(entity)?;
        let spec = deferred.root_spec(entity, &identifier.name, alias, ids)?;
        let follow_up = self.compile(&spec)?;

        let rows = match self.execute(entity, &follow_up.page_plan)? {
            RowSet::Tuples(rows) => rows,
            other => {
                return Err(Error::materialize(
                    entity,
                    format!(
                        "collection '{}' expected tuples, got {} rows of another shape",
                        deferred.attribute,
                        other.len()
                    ),
                ))
            }
        };

        let element = self
            .metadata
            .collection_element_type(entity, &deferred.attribute)?;
        let elements = Materializer::new(self.metadata, element)?
            .with_identifier_alias(Some(alias))
            .objects(&rows)?;
        let loaded = elements.len();

        let orphans = merge_collection(parents, &deferred.attribute, deferred.kind, elements);
        if orphans > 0 {
            warn!(
                attribute = %deferred.attribute,
                orphans = orphans,
                "Deferred rows reference identifiers absent from the primary rows"
            );
        }
        debug!(
            attribute = %deferred.attribute,
            elements = loaded,
            parents = parents.len(),
            "Merged deferred collection"
        );
        Ok(())
    }
}

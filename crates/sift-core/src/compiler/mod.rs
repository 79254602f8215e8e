//! Query compiler: filter specifications to immutable query plans.
//!
//! Compilation runs in passes over one shared join registry:
//!
//! 1. forced joins from the filter's join directives
//! 2. the template pass, walking the template object attribute by attribute
//! 3. the restriction pass, walking complex restrictions by attribute path
//! 4. projection, grouping and ordering
//!
//! The result is a [`CompiledQuery`] carrying both the page plan and a
//! separate count plan, so counting never mutates the page plan.

mod joins;
mod predicate;
mod projection;
mod restrictions;
mod template;

pub use joins::{JoinRegistry, ResolvedPath};
pub use predicate::escape_like;

use crate::catalog::{CollectionKind, Identity, MetadataProvider};
use crate::config::CompilerConfig;
use crate::error::Error;
use crate::filter::{FilterSpec, JoinDirective};
use sift_proto::{
    Condition, FieldRef, Pagination, QueryPlan, RelationKind, Selection, Source, Value,
};
use std::collections::HashSet;
use tracing::{debug, trace};

/// A to-many projection loaded by a second query.
#[derive(Debug, Clone)]
pub struct DeferredCollection {
    /// To-many attribute on the root entity.
    pub attribute: String,
    /// List or set semantics of the attribute.
    pub kind: CollectionKind,
    /// How the attribute is joined in the second query.
    pub join: JoinDirective,
    /// Projections, restrictions and ordering relative to the element type.
    pub filter: FilterSpec,
}

impl DeferredCollection {
    /// Build the second query: the collection's sub-fields and the root
    /// identifier, restricted to the identifiers seen in the first query.
    pub fn root_spec(
        &self,
        root_entity: &str,
        identifier: &str,
        identifier_alias: &str,
        ids: Vec<Value>,
    ) -> Result<FilterSpec, Error> {
        let prefixed = |path: &str| format!("{}.{}", self.attribute, path);

        let mut spec = FilterSpec::new(root_entity)
            .with_date_formats(self.filter.date_formats().clone());
        spec.set_collection_selection(false)
            .add_join(self.attribute.clone(), self.join);

        for projection in self.filter.projections() {
            spec.add_projection(
                prefixed(&projection.source),
                projection.aggregate,
                projection.alias.clone(),
            );
        }
        spec.select_as(identifier, identifier_alias);
        if self
            .filter
            .projections()
            .iter()
            .any(|p| p.aggregate.is_aggregate())
        {
            spec.add_group_by(identifier);
        }

        for (path, restrictions) in self.filter.restrictions() {
            for restriction in restrictions {
                spec.add_restriction(prefixed(path), restriction.clone());
            }
        }
        for key in self.filter.order() {
            spec.add_order(prefixed(&key.path), key.direction);
        }
        spec.add_where_in(identifier, ids)?;

        Ok(spec)
    }
}

/// The compiled form of a filter specification.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    /// Root entity type.
    pub entity: String,
    /// Plan returning the rows.
    pub page_plan: QueryPlan,
    /// Plan returning the number of rows the page plan matches, ignoring
    /// ordering and pagination.
    pub count_plan: QueryPlan,
    /// Collections loaded by follow-up queries.
    pub deferred: Vec<DeferredCollection>,
    /// Alias of the correlation identifier column, when collections are deferred.
    pub identifier_alias: Option<String>,
}

impl CompiledQuery {
    /// The page plan with the given pagination.
    pub fn paged(&self, pagination: Pagination) -> QueryPlan {
        let mut plan = self.page_plan.clone();
        plan.pagination = Some(pagination);
        plan
    }

    /// Check if follow-up queries are needed.
    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }
}

/// Compiles filter specifications against an entity model.
pub struct QueryCompiler<'a> {
    metadata: &'a dyn MetadataProvider,
    config: &'a CompilerConfig,
}

impl<'a> QueryCompiler<'a> {
    /// Create a new compiler.
    pub fn new(metadata: &'a dyn MetadataProvider, config: &'a CompilerConfig) -> Self {
        Self { metadata, config }
    }

    /// Compile a specification into page and count plans.
    pub fn compile(&self, spec: &FilterSpec) -> Result<CompiledQuery, Error> {
        let root = spec.entity();
        self.metadata.entity(root)?;

        let mut builder = PlanBuilder {
            metadata: self.metadata,
            config: self.config,
            spec,
            registry: JoinRegistry::new(self.metadata, spec),
            conditions: Vec::new(),
            consumed: HashSet::new(),
        };

        for (path, directive) in spec.joins() {
            if directive.forced {
                builder.registry.join_path(path)?;
            }
        }

        if let Some(template) = spec.template() {
            let object = template.as_object().ok_or_else(|| {
                Error::Config(format!("template for '{}' must be a JSON object", root))
            })?;
            builder.compile_template(root, Source::Root, "", object)?;
        }

        builder.compile_restrictions(root, Source::Root, "")?;
        builder.check_unresolved()?;

        let projection = builder.compile_projection()?;
        let mut group_by = builder.compile_group_by()?;
        if let Some(id) = projection.forced_group_by {
            if !group_by.contains(&id) {
                group_by.push(id);
            }
        }
        let order_by = builder.compile_order(&projection.deferred)?;

        let PlanBuilder {
            registry,
            conditions,
            ..
        } = builder;
        let joins = registry.into_joins();
        let has_to_many = joins.iter().any(|j| j.relation == RelationKind::ToMany);

        let selection = if projection.columns.is_empty() {
            Selection::Entities {
                distinct: has_to_many,
            }
        } else {
            let aggregated = projection
                .columns
                .iter()
                .any(|c| c.function.is_aggregate());
            Selection::Columns {
                distinct: has_to_many && !aggregated && group_by.is_empty(),
                columns: projection.columns,
            }
        };

        let count_field = match self.metadata.identifier(root)? {
            Identity::Single(field) => Some(FieldRef::root(field.name.clone())),
            _ => None,
        };
        let count_plan = QueryPlan {
            root_entity: root.to_string(),
            joins: joins.clone(),
            conditions: conditions.clone(),
            selection: Selection::Count {
                distinct: count_field.is_some() && has_to_many,
                field: count_field,
            },
            group_by: group_by.clone(),
            order_by: Vec::new(),
            pagination: None,
        };

        let page_plan = QueryPlan {
            root_entity: root.to_string(),
            joins,
            conditions,
            selection,
            group_by,
            order_by,
            pagination: spec.range().cloned(),
        };

        debug!(
            entity = root,
            joins = page_plan.joins.len(),
            conditions = page_plan.conditions.len(),
            deferred = projection.deferred.len(),
            "Compiled filter specification"
        );
        trace!(plan = %page_plan.describe(), "Page plan");

        Ok(CompiledQuery {
            entity: root.to_string(),
            page_plan,
            count_plan,
            deferred: projection.deferred,
            identifier_alias: projection.identifier_alias,
        })
    }
}

/// Mutable state shared by the compiler passes.
pub(crate) struct PlanBuilder<'a> {
    metadata: &'a dyn MetadataProvider,
    config: &'a CompilerConfig,
    spec: &'a FilterSpec,
    registry: JoinRegistry<'a>,
    conditions: Vec<Condition>,
    consumed: HashSet<String>,
}

fn child_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

#[cfg(test)]
mod tests;

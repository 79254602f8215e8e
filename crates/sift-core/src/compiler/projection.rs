//! Projection compiler: columns, deferred to-many collections and ordering.

use super::{DeferredCollection, PlanBuilder};
use crate::error::Error;
use crate::filter::{is_below, FilterSpec};
use sift_proto::{Column, FieldRef, OrderSpec, RelationKind};

/// Result of compiling the projection list.
#[derive(Debug, Default)]
pub(super) struct CompiledProjection {
    /// Columns of the primary query.
    pub columns: Vec<Column>,
    /// Collections loaded by a second query.
    pub deferred: Vec<DeferredCollection>,
    /// Alias of the identifier column added for correlation.
    pub identifier_alias: Option<String>,
    /// Identifier the primary query must be grouped by.
    pub forced_group_by: Option<FieldRef>,
}

impl PlanBuilder<'_> {
    /// Compile projections. With collection selection on, projections that
    /// start with a to-many attribute are set aside for a second query and
    /// the primary query gains the root identifier as a correlation column.
    pub(super) fn compile_projection(&mut self) -> Result<CompiledProjection, Error> {
        let metadata = self.metadata;
        let spec = self.spec;
        let root = spec.entity();
        let collection_selection = spec
            .collection_selection()
            .unwrap_or(self.config.collection_selection);

        let mut out = CompiledProjection::default();
        let mut deferred: Vec<(String, FilterSpec)> = Vec::new();

        for projection in spec.projections() {
            if collection_selection {
                if let Some((head, rest)) = projection.source.split_once('.') {
                    let kind = metadata
                        .relationship_kind(root, head)
                        .map_err(|_| Error::unknown_field(root, &projection.source))?;
                    if kind == RelationKind::ToMany {
                        let element = metadata.collection_element_type(root, head)?;
                        let alias = projection
                            .alias
                            .strip_prefix(head)
                            .and_then(|a| a.strip_prefix('.'))
                            .unwrap_or(&projection.alias);
                        let index = match deferred.iter().position(|(attr, _)| attr == head) {
                            Some(index) => index,
                            None => {
                                let filter = FilterSpec::new(element)
                                    .with_date_formats(spec.date_formats().clone());
                                deferred.push((head.to_string(), filter));
                                deferred.len() - 1
                            }
                        };
                        deferred[index]
                            .1
                            .add_projection(rest, projection.aggregate, alias);
                        continue;
                    }
                }
            }

            let resolved = self.registry.resolve(&projection.source)?;
            if resolved.def.field_type.scalar_type().is_none() {
                return Err(Error::NotProjectable {
                    path: projection.source.clone(),
                    found: resolved.def.field_type.to_string(),
                });
            }
            out.columns.push(Column {
                function: projection.aggregate,
                field: resolved.field,
                alias: projection.alias.clone(),
            });
        }

        if deferred.is_empty() {
            return Ok(out);
        }

        let identifier = metadata.single_identifier(root)?;
        let id_ref = FieldRef::root(identifier.name.clone());
        let alias = self.config.identifier_alias.clone();

        if out.columns.is_empty() {
            out.forced_group_by = Some(id_ref.clone());
        }
        out.columns.push(Column::field(id_ref, alias.clone()));
        out.identifier_alias = Some(alias);

        for (attribute, mut filter) in deferred {
            for (path, restrictions) in spec.restrictions_under(&attribute) {
                for restriction in restrictions {
                    filter.add_restriction(path.clone(), restriction);
                }
            }
            for key in spec.order() {
                if is_below(&key.path, &attribute) {
                    filter.add_order(&key.path[attribute.len() + 1..], key.direction);
                }
            }
            let join = spec.join_directive(&attribute).copied().unwrap_or_default();
            let kind = metadata.collection_kind(root, &attribute)?;
            out.deferred.push(DeferredCollection {
                attribute,
                kind,
                join,
                filter,
            });
        }

        Ok(out)
    }

    /// Compile ordering keys, skipping keys that order a deferred collection.
    pub(super) fn compile_order(
        &mut self,
        deferred: &[DeferredCollection],
    ) -> Result<Vec<OrderSpec>, Error> {
        let spec = self.spec;
        let mut order = Vec::new();
        for key in spec.order() {
            if deferred.iter().any(|d| is_below(&key.path, &d.attribute)) {
                continue;
            }
            let resolved = self.registry.resolve(&key.path)?;
            order.push(OrderSpec {
                field: resolved.field,
                direction: key.direction,
            });
        }
        Ok(order)
    }

    /// Compile grouping paths.
    pub(super) fn compile_group_by(&mut self) -> Result<Vec<FieldRef>, Error> {
        let spec = self.spec;
        let mut group_by = Vec::new();
        for path in spec.group_by() {
            let resolved = self.registry.resolve(path)?;
            if !group_by.contains(&resolved.field) {
                group_by.push(resolved.field);
            }
        }
        Ok(group_by)
    }
}

//! Join registry: one join per distinct attribute path.

use crate::catalog::{FieldDef, MetadataProvider};
use crate::error::Error;
use crate::filter::FilterSpec;
use sift_proto::{FieldRef, JoinSpec, Source};
use std::collections::HashMap;
use tracing::debug;

/// An attribute path resolved against the entity model.
#[derive(Debug, Clone)]
pub struct ResolvedPath<'a> {
    /// Where the attribute is read from.
    pub field: FieldRef,
    /// Attribute definition.
    pub def: &'a FieldDef,
    /// Entity (or embeddable) owning the attribute.
    pub entity: String,
}

/// Creates joins on demand, memoized by full dotted path.
///
/// `roles.name` and `owner.roles.name` join different paths (`roles` and
/// `owner.roles`) and never share a join; asking for `roles` twice returns
/// the same join.
pub struct JoinRegistry<'a> {
    metadata: &'a dyn MetadataProvider,
    spec: &'a FilterSpec,
    root_entity: String,
    joins: Vec<JoinSpec>,
    by_path: HashMap<String, u32>,
}

impl<'a> JoinRegistry<'a> {
    /// Create an empty registry for the filter's root entity.
    pub fn new(metadata: &'a dyn MetadataProvider, spec: &'a FilterSpec) -> Self {
        Self {
            metadata,
            spec,
            root_entity: spec.entity().to_string(),
            joins: Vec::new(),
            by_path: HashMap::new(),
        }
    }

    /// Join every segment of `path`, returning the source of the last one and
    /// the entity it holds.
    pub fn join_path(&mut self, path: &str) -> Result<(Source, String), Error> {
        let mut source = Source::Root;
        let mut entity = self.root_entity.clone();
        let mut end = 0;

        for segment in path.split('.') {
            if segment.is_empty() {
                return Err(Error::unknown_field(&self.root_entity, path));
            }
            end += if end == 0 { segment.len() } else { segment.len() + 1 };
            let prefix = &path[..end];

            if let Some(&index) = self.by_path.get(prefix) {
                source = Source::Join(index);
                entity = self.joins[index as usize].target_entity.clone();
                continue;
            }

            let field = self.lookup(&entity, segment, path)?;
            let relation = field.field_type.relation_kind();
            if !relation.is_relationship() {
                return Err(Error::unknown_field(&self.root_entity, path));
            }
            let target = self.metadata.target_entity(&entity, segment)?.to_string();
            let directive = self.spec.join_directive(prefix).copied().unwrap_or_default();

            let index = self.joins.len() as u32;
            self.joins.push(JoinSpec {
                path: prefix.to_string(),
                parent: source,
                attribute: segment.to_string(),
                target_entity: target.clone(),
                relation,
                kind: directive.kind,
                fetch: directive.fetch,
            });
            self.by_path.insert(prefix.to_string(), index);
            debug!(
                path = prefix,
                target = %target,
                kind = ?directive.kind,
                index,
                "Created join"
            );

            source = Source::Join(index);
            entity = target;
        }

        Ok((source, entity))
    }

    /// Resolve a dotted attribute path, joining every non-terminal segment.
    pub fn resolve(&mut self, path: &str) -> Result<ResolvedPath<'a>, Error> {
        let (source, entity, attribute) = match path.rsplit_once('.') {
            Some((parent, attribute)) => {
                let (source, entity) = self.join_path(parent)?;
                (source, entity, attribute)
            }
            None => (Source::Root, self.root_entity.clone(), path),
        };

        let def = self.lookup(&entity, attribute, path)?;
        Ok(ResolvedPath {
            field: FieldRef {
                source,
                field: attribute.to_string(),
            },
            def,
            entity,
        })
    }

    /// Join index created for a path, if any.
    pub fn get(&self, path: &str) -> Option<u32> {
        self.by_path.get(path).copied()
    }

    /// Number of joins created so far.
    pub fn len(&self) -> usize {
        self.joins.len()
    }

    /// Check if no join was created.
    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// Joins in creation order.
    pub fn into_joins(self) -> Vec<JoinSpec> {
        self.joins
    }

    fn lookup(&self, entity: &str, attribute: &str, path: &str) -> Result<&'a FieldDef, Error> {
        let metadata = self.metadata;
        match metadata.field(entity, attribute) {
            Ok(field) if !field.transient => Ok(field),
            Ok(_) | Err(Error::UnknownField { .. }) => {
                Err(Error::unknown_field(&self.root_entity, path))
            }
            Err(other) => Err(other),
        }
    }
}

//! Restriction pass: complex restrictions keyed by attribute path.

use super::{child_path, PlanBuilder};
use crate::error::Error;
use sift_proto::{FieldRef, Source};

impl PlanBuilder<'_> {
    /// Walk the declared attributes of `entity`, compiling restrictions on
    /// each path and descending into relationships that have restrictions
    /// below them.
    pub(super) fn compile_restrictions(
        &mut self,
        entity: &str,
        source: Source,
        prefix: &str,
    ) -> Result<(), Error> {
        let metadata = self.metadata;
        let spec = self.spec;
        let def = metadata.entity(entity)?;

        for field in def.persistent_fields() {
            let path = child_path(prefix, &field.name);

            let restrictions = spec.restrictions_for(&path);
            if !restrictions.is_empty() {
                self.consumed.insert(path.clone());
                let target = FieldRef {
                    source,
                    field: field.name.clone(),
                };
                for restriction in restrictions {
                    self.compile_restriction(&path, restriction, target.clone(), field)?;
                }
            }

            if field.field_type.relation_kind().is_relationship()
                && spec.has_restrictions_below(&path)
            {
                let (join, joined_entity) = self.registry.join_path(&path)?;
                self.compile_restrictions(&joined_entity, join, &path)?;
            }
        }

        Ok(())
    }

    /// Fail on the first restriction path the walk never reached.
    pub(super) fn check_unresolved(&self) -> Result<(), Error> {
        match self
            .spec
            .restrictions()
            .iter()
            .find(|(path, _)| !self.consumed.contains(path))
        {
            Some((path, _)) => Err(Error::unknown_field(self.spec.entity(), path)),
            None => Ok(()),
        }
    }
}

//! Join expansion over stored documents.
//!
//! Every root document starts one binding. Each join of the plan is then
//! applied in order: the parent slot's attribute is resolved to zero or more
//! target documents and the binding fans out, one copy per target. An inner
//! join drops bindings with no target, a left join keeps them with an empty
//! slot.

use super::MemoryStore;
use crate::backend::BackendError;
use crate::catalog::MetadataProvider;
use serde_json::Value as Json;
use sift_proto::{JoinKind, JoinSpec, QueryPlan, RelationKind, Source};
use tracing::trace;

/// One candidate row: the root document and the document each join bound.
#[derive(Debug, Clone)]
pub(super) struct Binding<'a> {
    /// Position of the root document in its entity's store.
    pub root: usize,
    /// Slot 0 is the root, slot `i + 1` belongs to join `i`.
    pub slots: Vec<Option<&'a Json>>,
}

impl<'a> Binding<'a> {
    fn new(root: usize, document: &'a Json, joins: usize) -> Self {
        let mut slots = Vec::with_capacity(joins + 1);
        slots.push(Some(document));
        Self { root, slots }
    }

    /// Document bound to a source, `None` when a left join found nothing.
    pub fn slot(&self, source: Source) -> Option<&'a Json> {
        let index = match source {
            Source::Root => 0,
            Source::Join(i) => i as usize + 1,
        };
        self.slots.get(index).copied().flatten()
    }
}

/// Build the bindings of a plan: root documents expanded through every join.
pub(super) fn expand<'a>(
    store: &'a MemoryStore,
    plan: &QueryPlan,
) -> Result<Vec<Binding<'a>>, BackendError> {
    let mut bindings: Vec<Binding<'a>> = store
        .documents(&plan.root_entity)
        .iter()
        .enumerate()
        .map(|(i, doc)| Binding::new(i, doc, plan.joins.len()))
        .collect();

    for join in &plan.joins {
        let parent_entity = plan.source_entity(join.parent)?;
        let mut next = Vec::with_capacity(bindings.len());

        for binding in bindings {
            let targets = match binding.slot(join.parent) {
                Some(parent) => resolve(store, parent_entity, join, parent)?,
                None => Vec::new(),
            };

            if targets.is_empty() {
                if join.kind == JoinKind::Left {
                    let mut binding = binding;
                    binding.slots.push(None);
                    next.push(binding);
                }
                continue;
            }

            for target in targets {
                let mut expanded = binding.clone();
                expanded.slots.push(Some(target));
                next.push(expanded);
            }
        }

        trace!(
            path = %join.path,
            kind = ?join.kind,
            rows = next.len(),
            "Expanded join"
        );
        bindings = next;
    }

    Ok(bindings)
}

/// Documents an attribute of `parent` points to.
///
/// Embedded values and to-one references may be stored inline as objects;
/// references and collection elements may also be stored as identifiers of
/// documents of the target entity.
fn resolve<'a>(
    store: &'a MemoryStore,
    parent_entity: &str,
    join: &JoinSpec,
    parent: &'a Json,
) -> Result<Vec<&'a Json>, BackendError> {
    let value = match parent.get(&join.attribute) {
        None | Some(Json::Null) => return Ok(Vec::new()),
        Some(value) => value,
    };

    match join.relation {
        RelationKind::Scalar => Err(BackendError::Unsupported(format!(
            "cannot join scalar attribute '{}' of '{}'",
            join.attribute, parent_entity
        ))),
        RelationKind::Embedded => Ok(value.as_object().map(|_| vec![value]).unwrap_or_default()),
        RelationKind::ToOne => Ok(element(store, &join.target_entity, value)?
            .into_iter()
            .collect()),
        RelationKind::ToMany => {
            let Some(items) = value.as_array() else {
                return Err(BackendError::Constraint(format!(
                    "collection '{}' of '{}' is not an array",
                    join.attribute, parent_entity
                )));
            };
            let mut targets = Vec::with_capacity(items.len());
            for item in items {
                targets.extend(element(store, &join.target_entity, item)?);
            }
            Ok(targets)
        }
    }
}

fn element<'a>(
    store: &'a MemoryStore,
    entity: &str,
    value: &'a Json,
) -> Result<Option<&'a Json>, BackendError> {
    match value {
        Json::Null => Ok(None),
        Json::Object(_) => Ok(Some(value)),
        id => lookup_in(store, entity, id),
    }
}

/// Find a document by its single identifier.
pub(super) fn lookup_in<'a>(
    store: &'a MemoryStore,
    entity: &str,
    id: &Json,
) -> Result<Option<&'a Json>, BackendError> {
    let identifier = store
        .catalog()
        .single_identifier(entity)
        .map_err(|e| BackendError::Unsupported(e.to_string()))?;
    Ok(store
        .documents(entity)
        .iter()
        .find(|doc| doc.get(&identifier.name) == Some(id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use serde_json::json;

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new(testing::catalog());
        store
            .insert_all(
                "Role",
                [
                    json!({"id": 1, "name": "admin", "level": 3}),
                    json!({"id": 2, "name": "dev", "level": 1}),
                ],
            )
            .unwrap();
        store
            .insert_all(
                "User",
                [
                    json!({"id": 1, "name": "Alice", "roles": [1, 2], "address": {"city": "Oslo"}}),
                    json!({"id": 2, "name": "Bob", "roles": []}),
                    json!({"id": 3, "name": "Carol", "roles": [{"id": 9, "name": "ops"}]}),
                ],
            )
            .unwrap();
        store
    }

    fn join(path: &str, target: &str, relation: RelationKind, kind: JoinKind) -> JoinSpec {
        JoinSpec {
            path: path.into(),
            parent: Source::Root,
            attribute: path.into(),
            target_entity: target.into(),
            relation,
            kind,
            fetch: false,
        }
    }

    #[test]
    fn test_inner_join_fans_out() {
        let store = store();
        let mut plan = QueryPlan::new("User");
        plan.joins
            .push(join("roles", "Role", RelationKind::ToMany, JoinKind::Inner));

        let bindings = expand(&store, &plan).unwrap();
        let names: Vec<&str> = bindings
            .iter()
            .filter_map(|b| b.slot(Source::Join(0)))
            .filter_map(|doc| doc["name"].as_str())
            .collect();
        assert_eq!(names, vec!["admin", "dev", "ops"]);
        assert_eq!(bindings[0].root, 0);
        assert_eq!(bindings[2].root, 2);
    }

    #[test]
    fn test_left_join_keeps_unmatched() {
        let store = store();
        let mut plan = QueryPlan::new("User");
        plan.joins
            .push(join("address", "Address", RelationKind::Embedded, JoinKind::Left));

        let bindings = expand(&store, &plan).unwrap();
        assert_eq!(bindings.len(), 3);
        assert!(bindings[0].slot(Source::Join(0)).is_some());
        assert!(bindings[1].slot(Source::Join(0)).is_none());
    }

    #[test]
    fn test_lookup_by_identifier() {
        let store = store();
        let doc = lookup_in(&store, "Role", &json!(2)).unwrap().unwrap();
        assert_eq!(doc["name"], "dev");
        assert!(lookup_in(&store, "Role", &json!(7)).unwrap().is_none());
        assert!(lookup_in(&store, "Membership", &json!(1)).is_err());
    }
}

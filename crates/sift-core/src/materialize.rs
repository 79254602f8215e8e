//! Result materialization: flat tuple rows to nested objects.
//!
//! Column aliases are dotted paths into the result object. Each segment
//! before the last walks into (or creates) a nested object. A segment naming
//! a to-many attribute walks into the collection's open element instead: the
//! first write of a row appends a fresh element and later writes of the same
//! row reuse it, so a backend must deliver one element's columns within one
//! row.
//!
//! Rows of a deferred collection query are merged into their parents by the
//! correlation identifier the primary query carried.

use std::collections::HashSet;

use crate::catalog::{CollectionKind, Identity, MetadataProvider};
use crate::error::Error;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as Json};
use sift_proto::{RelationKind, TupleRow, Value};

/// One materialized row and the identifier it was correlated by.
#[derive(Debug, Clone, PartialEq)]
pub struct RowObject {
    /// Value of the correlation identifier column, if the row carried one.
    pub id: Option<Value>,
    /// The nested result object.
    pub object: Map<String, Json>,
}

impl RowObject {
    /// Take the object as a JSON value.
    pub fn into_json(self) -> Json {
        Json::Object(self.object)
    }
}

/// Builds nested objects for one entity type from tuple rows.
pub struct Materializer<'a> {
    metadata: &'a dyn MetadataProvider,
    entity: &'a str,
    identifier_alias: Option<&'a str>,
    identifier: Option<&'a str>,
}

impl<'a> Materializer<'a> {
    /// Create a materializer for rows rooted at `entity`.
    pub fn new(metadata: &'a dyn MetadataProvider, entity: &'a str) -> Result<Self, Error> {
        let identifier = match metadata.identifier(entity)? {
            Identity::Single(field) => Some(field.name.as_str()),
            _ => None,
        };
        Ok(Self {
            metadata,
            entity,
            identifier_alias: None,
            identifier,
        })
    }

    /// Capture this column as the row's correlation identifier.
    ///
    /// The column is not written into the object unless it also names the
    /// entity's declared identifier.
    pub fn with_identifier_alias(mut self, alias: Option<&'a str>) -> Self {
        self.identifier_alias = alias;
        self
    }

    /// Build one object per row.
    pub fn objects(&self, rows: &[TupleRow]) -> Result<Vec<RowObject>, Error> {
        rows.iter().map(|row| self.object(row)).collect()
    }

    /// Build the object of one row.
    pub fn object(&self, row: &TupleRow) -> Result<RowObject, Error> {
        let mut out = RowObject {
            id: None,
            object: Map::new(),
        };
        let mut opened = HashSet::new();

        for (alias, value) in &row.columns {
            if Some(alias.as_str()) == self.identifier_alias {
                out.id = Some(value.clone());
                if Some(alias.as_str()) != self.identifier {
                    continue;
                }
            }
            self.write(&mut out.object, &mut opened, alias, value.to_json())?;
        }

        Ok(out)
    }

    fn write(
        &self,
        root: &mut Map<String, Json>,
        opened: &mut HashSet<String>,
        alias: &str,
        value: Json,
    ) -> Result<(), Error> {
        let segments: Vec<&str> = alias.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            return Ok(());
        };

        let mut entity = Some(self.entity);
        let mut current = root;
        let mut path = String::new();

        for segment in parents {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(segment);

            // Aliases that do not follow the entity model nest as plain objects.
            let kind = entity.and_then(|e| self.metadata.relationship_kind(e, segment).ok());
            let next = entity.and_then(|e| self.metadata.target_entity(e, segment).ok());

            let slot = current
                .entry(segment.to_string())
                .or_insert_with(|| match kind {
                    Some(RelationKind::ToMany) => Json::Array(Vec::new()),
                    _ => Json::Object(Map::new()),
                });

            current = if kind == Some(RelationKind::ToMany) {
                let Json::Array(items) = slot else {
                    return Err(self.conflict(&path));
                };
                if !opened.contains(&path) {
                    // A null column of an unopened element means no element.
                    if value.is_null() {
                        return Ok(());
                    }
                    opened.insert(path.clone());
                    items.push(Json::Object(Map::new()));
                }
                match items.last_mut() {
                    Some(Json::Object(element)) => element,
                    _ => return Err(self.conflict(&path)),
                }
            } else {
                if slot.is_null() {
                    *slot = Json::Object(Map::new());
                }
                match slot {
                    Json::Object(nested) => nested,
                    _ => return Err(self.conflict(&path)),
                }
            };
            entity = next;
        }

        current.insert(last.to_string(), value);
        Ok(())
    }

    fn conflict(&self, path: &str) -> Error {
        Error::materialize(
            self.entity,
            format!("alias path '{}' collides with a column", path),
        )
    }
}

/// Append deferred collection elements to their parents.
///
/// Every parent gets the attribute, empty when no element belongs to it.
/// Set collections skip elements equal to one already present. Returns the
/// number of elements whose identifier matched no parent.
pub fn merge_collection(
    parents: &mut [RowObject],
    attribute: &str,
    kind: CollectionKind,
    elements: Vec<RowObject>,
) -> usize {
    for parent in parents.iter_mut() {
        parent
            .object
            .entry(attribute.to_string())
            .or_insert_with(|| Json::Array(Vec::new()));
    }

    let mut orphans = 0;
    for element in elements {
        let Some(id) = element.id else {
            orphans += 1;
            continue;
        };
        let mut matched = false;
        let item = Json::Object(element.object);
        for parent in parents.iter_mut().filter(|p| p.id.as_ref() == Some(&id)) {
            matched = true;
            if let Some(Json::Array(items)) = parent.object.get_mut(attribute) {
                if kind == CollectionKind::Set && items.contains(&item) {
                    continue;
                }
                items.push(item.clone());
            }
        }
        if !matched {
            orphans += 1;
        }
    }
    orphans
}

/// Deserialize objects into typed results.
pub fn into_typed<T: DeserializeOwned>(entity: &str, objects: Vec<Json>) -> Result<Vec<T>, Error> {
    objects
        .into_iter()
        .map(|object| {
            serde_json::from_value(object).map_err(|e| Error::materialize(entity, e.to_string()))
        })
        .collect()
}

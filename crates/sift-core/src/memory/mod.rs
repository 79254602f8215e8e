//! In-memory query backend.
//!
//! [`MemoryStore`] keeps JSON documents per entity type and executes query
//! plans against them:
//!
//! 1. every root document starts a binding, joins fan bindings out
//! 2. conditions filter bindings
//! 3. the selection shapes rows: whole entities, tuples (optionally grouped
//!    and aggregated) or a count
//! 4. ordering (nulls first), distinct rows, then offset and limit
//!
//! References and collection elements may be stored inline as objects or as
//! identifiers of documents of the target entity.

mod aggregate;
mod eval;
mod join;

pub use eval::like_match;

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::backend::{BackendError, QueryBackend};
use crate::catalog::{Catalog, MetadataProvider};
use crate::config::DateFormats;
use crate::error::Error;
use aggregate::{column_value, group_by, row_value};
use eval::{same_value, sort_order, RowReader};
use join::Binding;
use serde::Serialize;
use serde_json::Value as Json;
use sift_proto::{Column, OrderSpec, Pagination, QueryPlan, RowSet, Selection, TupleRow, Value};
use tracing::debug;

/// Documents keyed by entity type, queried with compiled plans.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    catalog: Catalog,
    documents: HashMap<String, Vec<Json>>,
    date_formats: DateFormats,
}

impl MemoryStore {
    /// Create an empty store over an entity model.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            documents: HashMap::new(),
            date_formats: DateFormats::default(),
        }
    }

    /// Read stored date and timestamp strings with these formats.
    pub fn with_date_formats(mut self, formats: DateFormats) -> Self {
        self.date_formats = formats;
        self
    }

    /// The entity model.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Date formats used for stored temporal strings.
    pub fn date_formats(&self) -> &DateFormats {
        &self.date_formats
    }

    /// Store one document.
    pub fn insert(&mut self, entity: &str, document: Json) -> Result<(), Error> {
        self.catalog.entity(entity)?;
        if !document.is_object() {
            return Err(Error::backend(
                entity,
                BackendError::Constraint("documents must be JSON objects".into()),
            ));
        }
        self.documents
            .entry(entity.to_string())
            .or_default()
            .push(document);
        Ok(())
    }

    /// Store several documents.
    pub fn insert_all(
        &mut self,
        entity: &str,
        documents: impl IntoIterator<Item = Json>,
    ) -> Result<(), Error> {
        for document in documents {
            self.insert(entity, document)?;
        }
        Ok(())
    }

    /// Store an entity instance through its serde serialization.
    pub fn insert_entity<T: Serialize>(&mut self, entity: &str, value: &T) -> Result<(), Error> {
        self.insert(entity, serde_json::to_value(value)?)
    }

    /// Number of documents stored for an entity type.
    pub fn len(&self, entity: &str) -> usize {
        self.documents(entity).len()
    }

    /// Check if no documents are stored at all.
    pub fn is_empty(&self) -> bool {
        self.documents.values().all(Vec::is_empty)
    }

    fn documents(&self, entity: &str) -> &[Json] {
        self.documents.get(entity).map(Vec::as_slice).unwrap_or_default()
    }

    fn run(&self, plan: &QueryPlan) -> Result<RowSet, BackendError> {
        plan.validate()?;
        let reader = RowReader::new(self, plan);

        let mut bindings = Vec::new();
        for binding in join::expand(self, plan)? {
            if reader.matches(&binding, &plan.conditions)? {
                bindings.push(binding);
            }
        }

        let rows = match &plan.selection {
            Selection::Count { field, distinct } => {
                let total = if plan.group_by.is_empty() {
                    aggregate::count(&reader, &bindings, field.as_ref(), *distinct)?
                } else {
                    group_by(&reader, bindings, &plan.group_by)?.len() as u64
                };
                RowSet::Count(total)
            }

            Selection::Entities { distinct } => {
                let mut bindings = sorted(&reader, bindings, &plan.order_by, |b| Some(b))?;
                if *distinct {
                    let mut seen = HashSet::new();
                    bindings.retain(|b| seen.insert(b.root));
                }
                paginate(&mut bindings, plan.pagination.as_ref());
                let documents = self.documents(&plan.root_entity);
                RowSet::Entities(
                    bindings
                        .iter()
                        .filter_map(|b| documents.get(b.root).cloned())
                        .collect(),
                )
            }

            Selection::Columns { columns, distinct } => {
                let aggregated = columns.iter().any(|c| c.function.is_aggregate());
                let mut rows = if aggregated || !plan.group_by.is_empty() {
                    let groups = if plan.group_by.is_empty() {
                        // Aggregates without grouping fold every row into one.
                        vec![aggregate::Group {
                            key: Vec::new(),
                            members: bindings,
                        }]
                    } else {
                        group_by(&reader, bindings, &plan.group_by)?
                    };
                    let groups = sorted(&reader, groups, &plan.order_by, |g| {
                        g.members.first()
                    })?;
                    groups
                        .iter()
                        .map(|g| tuple(columns, |c| column_value(&reader, &g.members, c)))
                        .collect::<Result<Vec<_>, _>>()?
                } else {
                    let bindings = sorted(&reader, bindings, &plan.order_by, |b| Some(b))?;
                    bindings
                        .iter()
                        .map(|b| tuple(columns, |c| row_value(&reader, b, c)))
                        .collect::<Result<Vec<_>, _>>()?
                };
                if *distinct {
                    dedup_rows(&mut rows);
                }
                paginate(&mut rows, plan.pagination.as_ref());
                RowSet::Tuples(rows)
            }
        };

        Ok(rows)
    }
}

impl QueryBackend for MemoryStore {
    fn execute(&self, plan: &QueryPlan) -> Result<RowSet, BackendError> {
        let rows = self.run(plan)?;
        debug!(
            entity = %plan.root_entity,
            joins = plan.joins.len(),
            rows = rows.len(),
            "Executed plan in memory"
        );
        Ok(rows)
    }
}

fn tuple(
    columns: &[Column],
    mut value: impl FnMut(&Column) -> Result<Value, BackendError>,
) -> Result<TupleRow, BackendError> {
    let mut row = TupleRow::default();
    for column in columns {
        row.push(column.alias.clone(), value(column)?);
    }
    Ok(row)
}

/// Sort items by the order keys read from each item's binding. The sort is
/// stable; items without a binding keep their position relative to each other.
fn sorted<'a, T>(
    reader: &RowReader<'_>,
    items: Vec<T>,
    order_by: &[OrderSpec],
    binding: impl for<'t> Fn(&'t T) -> Option<&'t Binding<'a>>,
) -> Result<Vec<T>, BackendError>
where
    T: 'a,
{
    if order_by.is_empty() {
        return Ok(items);
    }

    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        let keys = match binding(&item) {
            Some(b) => order_by
                .iter()
                .map(|spec| reader.value(b, &spec.field))
                .collect::<Result<Vec<_>, _>>()?,
            None => vec![Value::Null; order_by.len()],
        };
        keyed.push((keys, item));
    }

    keyed.sort_by(|(a, _), (b, _)| {
        for (spec, (a, b)) in order_by.iter().zip(a.iter().zip(b)) {
            let cmp = match spec.direction {
                sift_proto::OrderDirection::Asc => sort_order(a, b),
                sift_proto::OrderDirection::Desc => sort_order(a, b).reverse(),
            };
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
        Ordering::Equal
    });

    Ok(keyed.into_iter().map(|(_, item)| item).collect())
}

fn dedup_rows(rows: &mut Vec<TupleRow>) {
    let mut kept: Vec<TupleRow> = Vec::with_capacity(rows.len());
    for row in rows.drain(..) {
        let duplicate = kept.iter().any(|k| {
            k.columns.len() == row.columns.len()
                && k
                    .columns
                    .iter()
                    .zip(&row.columns)
                    .all(|((_, a), (_, b))| same_value(a, b))
        });
        if !duplicate {
            kept.push(row);
        }
    }
    *rows = kept;
}

/// Apply offset and limit.
fn paginate<T>(rows: &mut Vec<T>, pagination: Option<&Pagination>) {
    let Some(pagination) = pagination else {
        return;
    };
    let offset = pagination.offset as usize;
    let limit = pagination.limit as usize;

    if offset > 0 {
        if offset >= rows.len() {
            rows.clear();
            return;
        }
        rows.drain(0..offset);
    }
    rows.truncate(limit);
}

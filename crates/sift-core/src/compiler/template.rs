//! Template pass: non-null attributes of an example object become restrictions.

use super::{child_path, PlanBuilder};
use crate::catalog::{EntityDef, FieldDef};
use crate::coerce::from_json;
use crate::error::Error;
use crate::filter::{grammar, FieldOverride, Operator, Restriction, RestrictionValue, ValueShape};
use serde_json::{Map, Value as Json};
use sift_proto::{FieldRef, RelationKind, Source, Value};

impl PlanBuilder<'_> {
    /// Walk the declared attributes of `entity` against a template object.
    pub(super) fn compile_template(
        &mut self,
        entity: &str,
        source: Source,
        prefix: &str,
        object: &Map<String, Json>,
    ) -> Result<(), Error> {
        let metadata = self.metadata;
        let def = metadata.entity(entity)?;

        for field in def.persistent_fields() {
            let path = child_path(prefix, &field.name);
            let operator = match self.spec.field_override(&path) {
                Some(FieldOverride::Ignore) => continue,
                Some(FieldOverride::Apply(operator)) => operator,
                None => Operator::Equal,
            };

            let target = FieldRef {
                source,
                field: field.name.clone(),
            };
            if operator.is_null_check() {
                let restriction = Restriction::null_check(operator);
                self.compile_restriction(&path, &restriction, target, field)?;
                continue;
            }

            let value = match object.get(&field.name) {
                None | Some(Json::Null) => continue,
                Some(value) => value,
            };

            match field.field_type.relation_kind() {
                RelationKind::Scalar => {
                    for restriction in self.template_restrictions(&path, operator, value, field)? {
                        self.compile_restriction(&path, &restriction, target.clone(), field)?;
                    }
                }
                RelationKind::Embedded | RelationKind::ToOne => {
                    let Some(nested) = value.as_object() else {
                        return Err(misfit(&path, operator, value));
                    };
                    let target_entity = metadata.target_entity(entity, &field.name)?;
                    if !self.yields_conditions(metadata.entity(target_entity)?, &path, nested) {
                        continue;
                    }
                    let (join, joined_entity) = self.registry.join_path(&path)?;
                    self.compile_template(&joined_entity, join, &path, nested)?;
                }
                RelationKind::ToMany => {
                    let Some(items) = value.as_array() else {
                        return Err(misfit(&path, operator, value));
                    };
                    let element = metadata.collection_element_type(entity, &field.name)?;
                    let element_def = metadata.entity(element)?;
                    let nested: Vec<&Map<String, Json>> = items
                        .iter()
                        .filter_map(Json::as_object)
                        .filter(|item| self.yields_conditions(element_def, &path, item))
                        .collect();
                    if nested.is_empty() {
                        continue;
                    }
                    // Every element restricts the same join.
                    let (join, joined_entity) = self.registry.join_path(&path)?;
                    for item in nested {
                        self.compile_template(&joined_entity, join, &path, item)?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Check if a nested template object produces at least one condition,
    /// so empty value objects do not add joins.
    fn yields_conditions(&self, def: &EntityDef, prefix: &str, object: &Map<String, Json>) -> bool {
        def.persistent_fields().any(|field| {
            let path = child_path(prefix, &field.name);
            match self.spec.field_override(&path) {
                Some(FieldOverride::Ignore) => return false,
                Some(FieldOverride::Apply(op)) if op.is_null_check() => return true,
                _ => {}
            }
            match object.get(&field.name) {
                None | Some(Json::Null) => false,
                Some(Json::Object(nested)) => field
                    .field_type
                    .target_entity()
                    .and_then(|name| self.metadata.entity(name).ok())
                    .is_some_and(|nested_def| self.yields_conditions(nested_def, &path, nested)),
                Some(Json::Array(items)) if field.field_type.collection_kind().is_some() => {
                    let nested_def = field
                        .field_type
                        .target_entity()
                        .and_then(|name| self.metadata.entity(name).ok());
                    nested_def.is_some_and(|nested_def| {
                        items.iter().filter_map(Json::as_object).any(|item| {
                            self.yields_conditions(nested_def, &path, item)
                        })
                    })
                }
                Some(_) => true,
            }
        })
    }

    /// Turn a template value into restrictions for `operator`.
    fn template_restrictions(
        &self,
        path: &str,
        operator: Operator,
        value: &Json,
        field: &FieldDef,
    ) -> Result<Vec<Restriction>, Error> {
        let formats = &self.config.date_formats;
        let read = |json: &Json| -> Result<Value, Error> {
            match field.field_type.scalar_type() {
                Some(scalar) => from_json(json, scalar, formats).map_err(|reason| {
                    Error::InvalidRestriction {
                        path: path.to_string(),
                        operator,
                        reason,
                    }
                }),
                None => Err(Error::UnsupportedType {
                    path: path.to_string(),
                    operator,
                    found: field.field_type.to_string(),
                }),
            }
        };
        let read_all = |items: &[Json]| -> Result<Vec<Value>, Error> {
            items.iter().map(|item| read(item)).collect()
        };

        let restriction_value = match (operator.value_shape(), value) {
            (ValueShape::Text, Json::String(text)) => {
                return grammar::parse_as(path, operator, text, formats)?.ok_or_else(|| {
                    Error::UnclassifiableToken {
                        path: path.to_string(),
                        token: text.clone(),
                    }
                });
            }
            (ValueShape::Path, Json::String(other)) => RestrictionValue::Path(other.clone()),
            (ValueShape::Range, Json::Array(items)) if items.len() == 2 => {
                RestrictionValue::Range(read(&items[0])?, read(&items[1])?)
            }
            (ValueShape::List, Json::Array(items)) | (ValueShape::Scalar, Json::Array(items)) => {
                RestrictionValue::List(read_all(items)?)
            }
            (ValueShape::Scalar, _) | (ValueShape::List, _) => {
                // LIKE literals keep the raw text; other values take the declared type.
                if operator.is_like() {
                    match value {
                        Json::String(s) => RestrictionValue::Scalar(Value::String(s.clone())),
                        other => RestrictionValue::Scalar(Value::String(other.to_string())),
                    }
                } else {
                    RestrictionValue::Scalar(read(value)?)
                }
            }
            _ => return Err(misfit(path, operator, value)),
        };

        Ok(vec![Restriction::new(path, operator, restriction_value)?])
    }
}

/// A template value whose JSON shape the attribute cannot take.
fn misfit(path: &str, operator: Operator, value: &Json) -> Error {
    Error::InvalidRestriction {
        path: path.to_string(),
        operator,
        reason: format!("template value {} does not fit the attribute", value),
    }
}

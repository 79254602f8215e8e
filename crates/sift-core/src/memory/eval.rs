//! Condition evaluation against bindings.
//!
//! Comparisons follow SQL null semantics: a comparison with a null operand
//! is false, whatever the operator. Only `IS NULL` and `IS NOT NULL` look at
//! nulls directly.

use std::cmp::Ordering;

use super::join::Binding;
use super::MemoryStore;
use crate::backend::BackendError;
use crate::catalog::MetadataProvider;
use crate::coerce::from_json;
use serde_json::Value as Json;
use sift_proto::{Comparison, Condition, FieldRef, Operand, QueryPlan, Value};

/// Reads attribute values out of bindings for one plan.
pub(super) struct RowReader<'a> {
    store: &'a MemoryStore,
    plan: &'a QueryPlan,
}

impl<'a> RowReader<'a> {
    pub fn new(store: &'a MemoryStore, plan: &'a QueryPlan) -> Self {
        Self { store, plan }
    }

    /// Raw JSON of an attribute, `None` when absent.
    fn json<'b>(&self, binding: &Binding<'b>, field: &FieldRef) -> Option<&'b Json> {
        binding.slot(field.source)?.get(&field.field)
    }

    /// Scalar value of an attribute, typed by the entity model.
    pub fn value(&self, binding: &Binding<'_>, field: &FieldRef) -> Result<Value, BackendError> {
        let Some(json) = self.json(binding, field) else {
            return Ok(Value::Null);
        };
        let entity = self.plan.source_entity(field.source)?;
        let def = self
            .store
            .catalog()
            .field(entity, &field.field)
            .map_err(|e| BackendError::Execution(e.to_string()))?;
        let Some(scalar) = def.field_type.scalar_type() else {
            return Err(BackendError::Unsupported(format!(
                "attribute '{}' of '{}' is not a scalar",
                field.field, entity
            )));
        };
        from_json(json, scalar, self.store.date_formats()).map_err(|reason| {
            BackendError::Constraint(format!("'{}.{}': {}", entity, field.field, reason))
        })
    }

    /// Check if an attribute is null. Relationship attributes are null when
    /// absent, and collections also when empty.
    fn is_null(&self, binding: &Binding<'_>, field: &FieldRef) -> bool {
        match self.json(binding, field) {
            None | Some(Json::Null) => true,
            Some(Json::Array(items)) => items.is_empty(),
            Some(_) => false,
        }
    }

    fn operand(&self, binding: &Binding<'_>, operand: &Operand) -> Result<Value, BackendError> {
        match operand {
            Operand::Field(field) => self.value(binding, field),
            Operand::Upper(field) => Ok(upper(self.value(binding, field)?)),
            Operand::Literal(value) => Ok(value.clone()),
        }
    }

    /// Check if a binding satisfies every condition.
    pub fn matches(
        &self,
        binding: &Binding<'_>,
        conditions: &[Condition],
    ) -> Result<bool, BackendError> {
        for condition in conditions {
            let passed = match condition {
                Condition::Test(comparison) => self.test(binding, comparison)?,
                Condition::AnyOf(comparisons) => {
                    let mut any = false;
                    for comparison in comparisons {
                        if self.test(binding, comparison)? {
                            any = true;
                            break;
                        }
                    }
                    any
                }
            };
            if !passed {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn test(&self, binding: &Binding<'_>, comparison: &Comparison) -> Result<bool, BackendError> {
        let ordered = |left: &Operand, right: &Operand, accept: fn(Ordering) -> bool| {
            let left = self.operand(binding, left)?;
            let right = self.operand(binding, right)?;
            Ok::<bool, BackendError>(compare_values(&left, &right).is_some_and(accept))
        };

        match comparison {
            Comparison::Eq { left, right } => ordered(left, right, Ordering::is_eq),
            Comparison::Ne { left, right } => ordered(left, right, Ordering::is_ne),
            Comparison::Lt { left, right } => ordered(left, right, Ordering::is_lt),
            Comparison::Le { left, right } => ordered(left, right, Ordering::is_le),
            Comparison::Gt { left, right } => ordered(left, right, Ordering::is_gt),
            Comparison::Ge { left, right } => ordered(left, right, Ordering::is_ge),
            Comparison::In { operand, values } => {
                let value = self.operand(binding, operand)?;
                Ok(values.iter().any(|v| values_equal(&value, v)))
            }
            Comparison::NotIn { operand, values } => {
                let value = self.operand(binding, operand)?;
                Ok(!value.is_null()
                    && values
                        .iter()
                        .all(|v| compare_values(&value, v).is_some_and(Ordering::is_ne)))
            }
            Comparison::IsNull { field } => Ok(self.is_null(binding, field)),
            Comparison::IsNotNull { field } => Ok(!self.is_null(binding, field)),
            Comparison::Between { operand, low, high } => {
                let value = self.operand(binding, operand)?;
                Ok(compare_values(&value, low).is_some_and(Ordering::is_ge)
                    && compare_values(&value, high).is_some_and(Ordering::is_le))
            }
            Comparison::Like { operand, pattern } => {
                let value = self.operand(binding, operand)?;
                Ok(value.as_str().is_some_and(|s| like_match(s, pattern)))
            }
            Comparison::NotLike { operand, pattern } => {
                let value = self.operand(binding, operand)?;
                Ok(value.as_str().is_some_and(|s| !like_match(s, pattern)))
            }
        }
    }
}

fn upper(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.to_uppercase()),
        other => other,
    }
}

/// Check if two non-null values are equal, widening numbers and temporals.
pub(super) fn values_equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b).is_some_and(Ordering::is_eq)
}

/// Check if two values are the same, nulls included. Used for grouping
/// and distinct rows.
pub(super) fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        _ => values_equal(a, b),
    }
}

/// Compare two values, returning their ordering if comparable.
pub(super) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
        (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
        (a, b) if a.is_temporal() && b.is_temporal() => {
            Some(a.as_timestamp()?.cmp(&b.as_timestamp()?))
        }
        (a, b) if a.is_numeric() && b.is_numeric() => match (a.as_i128(), b.as_i128()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        _ => None, // Incompatible types
    }
}

/// Compare two values for sorting. Nulls sort first, incomparable values
/// are considered equal.
pub(super) fn sort_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => compare_values(a, b).unwrap_or(Ordering::Equal),
    }
}

/// Match a string against a SQL LIKE pattern.
///
/// Supports:
/// - `%` matches zero or more characters
/// - `_` matches exactly one character
/// - `\` makes the next pattern character literal
pub fn like_match(value: &str, pattern: &str) -> bool {
    let mut chars = value.chars().peekable();
    let mut pattern_chars = pattern.chars().peekable();

    like_match_recursive(&mut chars, &mut pattern_chars)
}

fn like_match_recursive(
    chars: &mut std::iter::Peekable<std::str::Chars>,
    pattern: &mut std::iter::Peekable<std::str::Chars>,
) -> bool {
    loop {
        match (pattern.peek().copied(), chars.peek().copied()) {
            (None, None) => return true,
            (None, Some(_)) => return false,
            (Some('%'), _) => {
                pattern.next();
                if pattern.peek().is_none() {
                    return true;
                }

                // Let % absorb 0, 1, 2, ... characters.
                loop {
                    let mut pattern_clone = pattern.clone();
                    let mut chars_clone = chars.clone();
                    if like_match_recursive(&mut chars_clone, &mut pattern_clone) {
                        return true;
                    }
                    if chars.next().is_none() {
                        return false;
                    }
                }
            }
            (Some('_'), Some(_)) => {
                pattern.next();
                chars.next();
            }
            (Some('_'), None) => return false,
            (Some('\\'), _) => {
                pattern.next();
                match (pattern.peek().copied(), chars.peek().copied()) {
                    (Some(p), Some(c)) if p == c => {
                        pattern.next();
                        chars.next();
                    }
                    _ => return false,
                }
            }
            (Some(p), Some(c)) => {
                if p != c {
                    return false;
                }
                pattern.next();
                chars.next();
            }
            (Some(_), None) => return false,
        }
    }
}

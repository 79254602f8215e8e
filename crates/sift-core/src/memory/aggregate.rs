//! Grouping, column functions and counts.

use std::cmp::Ordering;

use super::eval::{compare_values, same_value, RowReader};
use super::join::Binding;
use crate::backend::BackendError;
use sift_proto::{Column, ColumnFunction, FieldRef, Value};

/// Bindings sharing the same grouping key.
pub(super) struct Group<'a> {
    pub key: Vec<Value>,
    pub members: Vec<Binding<'a>>,
}

/// Partition bindings by the values of `keys`, keeping first-seen order.
pub(super) fn group_by<'a>(
    reader: &RowReader<'_>,
    bindings: Vec<Binding<'a>>,
    keys: &[FieldRef],
) -> Result<Vec<Group<'a>>, BackendError> {
    let mut groups: Vec<Group<'a>> = Vec::new();
    for binding in bindings {
        let key = keys
            .iter()
            .map(|field| reader.value(&binding, field))
            .collect::<Result<Vec<_>, _>>()?;
        let existing = groups.iter_mut().find(|g| {
            g.key.len() == key.len() && g.key.iter().zip(&key).all(|(a, b)| same_value(a, b))
        });
        match existing {
            Some(group) => group.members.push(binding),
            None => groups.push(Group {
                key,
                members: vec![binding],
            }),
        }
    }
    Ok(groups)
}

/// Value of one column over a group of bindings.
///
/// Non-aggregate columns read the group's first binding.
pub(super) fn column_value(
    reader: &RowReader<'_>,
    members: &[Binding<'_>],
    column: &Column,
) -> Result<Value, BackendError> {
    if !column.function.is_aggregate() {
        return match members.first() {
            Some(binding) => row_value(reader, binding, column),
            None => Ok(Value::Null),
        };
    }

    let mut values = Vec::with_capacity(members.len());
    for binding in members {
        let value = reader.value(binding, &column.field)?;
        if !value.is_null() {
            values.push(value);
        }
    }

    match column.function {
        ColumnFunction::Count => Ok(Value::Int64(values.len() as i64)),
        ColumnFunction::Max => Ok(extreme(values, Ordering::Greater)),
        ColumnFunction::Min => Ok(extreme(values, Ordering::Less)),
        ColumnFunction::Sum => sum(values, &column.field),
        _ => Ok(Value::Null),
    }
}

/// Value of a non-aggregate column on one binding.
pub(super) fn row_value(
    reader: &RowReader<'_>,
    binding: &Binding<'_>,
    column: &Column,
) -> Result<Value, BackendError> {
    let value = reader.value(binding, &column.field)?;
    Ok(match (column.function, value) {
        (ColumnFunction::Upper, Value::String(s)) => Value::String(s.to_uppercase()),
        (ColumnFunction::Lower, Value::String(s)) => Value::String(s.to_lowercase()),
        (_, value) => value,
    })
}

fn extreme(values: Vec<Value>, keep: Ordering) -> Value {
    values
        .into_iter()
        .reduce(|best, v| {
            if compare_values(&v, &best) == Some(keep) {
                v
            } else {
                best
            }
        })
        .unwrap_or(Value::Null)
}

fn sum(values: Vec<Value>, field: &FieldRef) -> Result<Value, BackendError> {
    if values.is_empty() {
        return Ok(Value::Null);
    }
    if values.iter().all(|v| v.as_i128().is_some()) {
        let total = values
            .iter()
            .filter_map(Value::as_i128)
            .try_fold(0i128, i128::checked_add)
            .ok_or_else(|| BackendError::Execution(format!("SUM({}) overflows", field)))?;
        return Ok(match i64::try_from(total) {
            Ok(small) => Value::Int64(small),
            Err(_) => Value::BigInt(total),
        });
    }
    let mut total = 0.0;
    for value in &values {
        total += value.as_f64().ok_or_else(|| {
            BackendError::Unsupported(format!("SUM({}) over {} values", field, value.kind()))
        })?;
    }
    Ok(Value::Float64(total))
}

/// Count rows for a count selection: distinct non-null values of `field`,
/// non-null values of `field`, or every binding.
pub(super) fn count(
    reader: &RowReader<'_>,
    bindings: &[Binding<'_>],
    field: Option<&FieldRef>,
    distinct: bool,
) -> Result<u64, BackendError> {
    let Some(field) = field else {
        return Ok(bindings.len() as u64);
    };

    let mut seen: Vec<Value> = Vec::new();
    let mut total = 0u64;
    for binding in bindings {
        let value = reader.value(binding, field)?;
        if value.is_null() {
            continue;
        }
        if distinct {
            if seen.iter().any(|v| same_value(v, &value)) {
                continue;
            }
            seen.push(value);
        }
        total += 1;
    }
    Ok(total)
}

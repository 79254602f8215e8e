//! Restrictions: an operator with its value.

use super::operator::{Operator, ValueShape};
use crate::error::Error;
use sift_proto::Value;

/// The value half of a restriction.
#[derive(Debug, Clone, PartialEq)]
pub enum RestrictionValue {
    /// No value (null checks).
    None,
    /// A single literal.
    Scalar(Value),
    /// A list of literals.
    List(Vec<Value>),
    /// Inclusive bounds.
    Range(Value, Value),
    /// Path of another attribute.
    Path(String),
}

impl RestrictionValue {
    /// Short name of the value shape, used in error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            RestrictionValue::None => "no value",
            RestrictionValue::Scalar(_) => "a single value",
            RestrictionValue::List(_) => "a list",
            RestrictionValue::Range(_, _) => "a range",
            RestrictionValue::Path(_) => "an attribute path",
        }
    }
}

/// An operator applied to an attribute with its value.
#[derive(Debug, Clone, PartialEq)]
pub struct Restriction {
    /// Operator.
    pub operator: Operator,
    /// Value the operator compares against.
    pub value: RestrictionValue,
    /// The value as written in a text token, every literal a string.
    /// String attributes compare against this instead of the typed value.
    pub text: Option<RestrictionValue>,
}

impl Restriction {
    /// Create a restriction, checking the value has the shape the operator needs.
    ///
    /// A single literal given to a membership operator becomes a one-element list.
    pub fn new(path: &str, operator: Operator, value: RestrictionValue) -> Result<Self, Error> {
        let value = match (operator.value_shape(), value) {
            (ValueShape::None, RestrictionValue::None) => RestrictionValue::None,
            (ValueShape::Scalar, v @ RestrictionValue::Scalar(_)) => v,
            (ValueShape::Scalar, RestrictionValue::List(values))
                if matches!(operator, Operator::Equal | Operator::NotEqual) =>
            {
                if values.is_empty() {
                    return Err(invalid(path, operator, "value list is empty"));
                }
                RestrictionValue::List(values)
            }
            (ValueShape::List, RestrictionValue::Scalar(v)) => RestrictionValue::List(vec![v]),
            (ValueShape::List, RestrictionValue::List(values)) => {
                if values.is_empty() {
                    return Err(invalid(path, operator, "value list is empty"));
                }
                RestrictionValue::List(values)
            }
            (ValueShape::Range, v @ RestrictionValue::Range(_, _)) => v,
            (ValueShape::Path, v @ RestrictionValue::Path(_)) => v,
            (ValueShape::Text, _) => {
                return Err(invalid(
                    path,
                    operator,
                    "multi restrictions are expanded from text rules",
                ))
            }
            (shape, other) => {
                return Err(invalid(
                    path,
                    operator,
                    &format!("expected {:?} value, got {}", shape, other.describe()),
                ))
            }
        };

        if let RestrictionValue::Scalar(Value::Null) = value {
            return Err(invalid(path, operator, "null literal; use a null check"));
        }

        Ok(Self {
            operator,
            value,
            text: None,
        })
    }

    /// A value-less restriction (null checks).
    pub fn null_check(operator: Operator) -> Self {
        Self {
            operator,
            value: RestrictionValue::None,
            text: None,
        }
    }

    /// Keep the text a restriction was read from.
    pub fn with_text(mut self, text: RestrictionValue) -> Self {
        self.text = Some(text);
        self
    }

    /// Value to compare a string attribute against: the token text when
    /// the restriction was read from one, else the typed value.
    pub fn string_value(&self) -> &RestrictionValue {
        self.text.as_ref().unwrap_or(&self.value)
    }
}

fn invalid(path: &str, operator: Operator, reason: &str) -> Error {
    Error::InvalidRestriction {
        path: path.to_string(),
        operator,
        reason: reason.to_string(),
    }
}

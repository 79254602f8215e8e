//! Operator table: one restriction on one attribute to plan conditions.

use super::PlanBuilder;
use crate::catalog::{FieldDef, ScalarType};
use crate::coerce::to_scalar;
use crate::error::Error;
use crate::filter::{Operator, OperatorCategory, Restriction, RestrictionValue};
use sift_proto::{Comparison, Condition, FieldRef, Operand, Value};

/// Escape LIKE metacharacters so a literal matches only itself.
pub fn escape_like(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl PlanBuilder<'_> {
    /// Compile one restriction against the attribute at `target`.
    pub(super) fn compile_restriction(
        &mut self,
        path: &str,
        restriction: &Restriction,
        target: FieldRef,
        field: &FieldDef,
    ) -> Result<(), Error> {
        let operator = restriction.operator;

        match operator {
            Operator::IsNull => {
                self.push(Comparison::IsNull { field: target });
                return Ok(());
            }
            Operator::IsNotNull => {
                self.push(Comparison::IsNotNull { field: target });
                return Ok(());
            }
            _ => {}
        }

        let scalar = field
            .field_type
            .scalar_type()
            .ok_or_else(|| unsupported(path, operator, field))?;
        let given = if scalar.is_string_like() {
            restriction.string_value()
        } else {
            &restriction.value
        };

        match operator.category() {
            OperatorCategory::Equality => match given {
                RestrictionValue::Scalar(value) => {
                    let right = Operand::Literal(self.coerce(path, operator, value, scalar)?);
                    let left = Operand::Field(target);
                    self.push(if operator == Operator::Equal {
                        Comparison::Eq { left, right }
                    } else {
                        Comparison::Ne { left, right }
                    });
                }
                RestrictionValue::List(values) => {
                    let values = self.coerce_all(path, operator, values, scalar)?;
                    if operator == Operator::Equal {
                        let mut any: Vec<Comparison> = values
                            .into_iter()
                            .map(|v| Comparison::eq(target.clone(), v))
                            .collect();
                        if any.len() == 1 {
                            self.push(any.remove(0));
                        } else {
                            self.conditions.push(Condition::AnyOf(any));
                        }
                    } else {
                        for value in values {
                            self.push(Comparison::ne(target.clone(), value));
                        }
                    }
                }
                other => return Err(shape(path, operator, other)),
            },

            OperatorCategory::Comparison => {
                if !scalar.is_ordered() {
                    return Err(unsupported(path, operator, field));
                }
                let RestrictionValue::Scalar(value) = given else {
                    return Err(shape(path, operator, given));
                };
                let left = Operand::Field(target);
                let right = Operand::Literal(self.coerce(path, operator, value, scalar)?);
                self.push(match operator {
                    Operator::LessThan => Comparison::Lt { left, right },
                    Operator::LessThanOrEqualTo => Comparison::Le { left, right },
                    Operator::GreaterThan => Comparison::Gt { left, right },
                    _ => Comparison::Ge { left, right },
                });
            }

            OperatorCategory::Membership => {
                let RestrictionValue::List(values) = given else {
                    return Err(shape(path, operator, given));
                };
                let values = self.coerce_all(path, operator, values, scalar)?;
                let operand = Operand::Field(target);
                self.push(if operator == Operator::In {
                    Comparison::In { operand, values }
                } else {
                    Comparison::NotIn { operand, values }
                });
            }

            OperatorCategory::Range => {
                if !(scalar.is_numeric() || scalar.is_temporal()) {
                    return Err(unsupported(path, operator, field));
                }
                let RestrictionValue::Range(low, high) = given else {
                    return Err(shape(path, operator, given));
                };
                let low = self.coerce(path, operator, low, scalar)?;
                let high = self.coerce(path, operator, high, scalar)?;
                self.push(Comparison::Between {
                    operand: Operand::Field(target),
                    low,
                    high,
                });
            }

            OperatorCategory::Like | OperatorCategory::ILike => {
                if !scalar.is_string_like() {
                    return Err(unsupported(path, operator, field));
                }
                let RestrictionValue::Scalar(value) = given else {
                    return Err(shape(path, operator, given));
                };
                let literal = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let mode = operator.like_mode().unwrap_or(crate::filter::LikeMode::Exact);
                let mut pattern = mode.pattern(&escape_like(&literal));
                let operand = if operator.is_case_insensitive() {
                    pattern = pattern.to_uppercase();
                    Operand::Upper(target)
                } else {
                    Operand::Field(target)
                };
                self.push(if operator.is_negated() {
                    Comparison::NotLike { operand, pattern }
                } else {
                    Comparison::Like { operand, pattern }
                });
            }

            OperatorCategory::FieldComparison => {
                let RestrictionValue::Path(other) = &restriction.value else {
                    return Err(shape(path, operator, &restriction.value));
                };
                let resolved = self.registry.resolve(other)?;
                if resolved.def.field_type.scalar_type().is_none() {
                    return Err(unsupported(other, operator, resolved.def));
                }
                let left = Operand::Field(target);
                let right = Operand::Field(resolved.field);
                self.push(match operator {
                    Operator::EqualField => Comparison::Eq { left, right },
                    Operator::NotEqualField => Comparison::Ne { left, right },
                    Operator::LessThanField => Comparison::Lt { left, right },
                    Operator::LessThanOrEqualToField => Comparison::Le { left, right },
                    Operator::GreaterThanField => Comparison::Gt { left, right },
                    _ => Comparison::Ge { left, right },
                });
            }

            OperatorCategory::Multi | OperatorCategory::Null => {
                return Err(shape(path, operator, &restriction.value));
            }
        }

        Ok(())
    }

    fn push(&mut self, comparison: Comparison) {
        self.conditions.push(Condition::Test(comparison));
    }

    /// Coerce a literal to the attribute's declared type.
    ///
    /// A timestamp compared against a date attribute stays a timestamp so a
    /// normalized end-of-day bound keeps its meaning.
    fn coerce(
        &self,
        path: &str,
        operator: Operator,
        value: &Value,
        scalar: ScalarType,
    ) -> Result<Value, Error> {
        if scalar == ScalarType::Date && matches!(value, Value::Timestamp(_)) {
            return Ok(value.clone());
        }
        to_scalar(value.clone(), scalar, &self.config.date_formats).map_err(|reason| {
            Error::InvalidRestriction {
                path: path.to_string(),
                operator,
                reason,
            }
        })
    }

    fn coerce_all(
        &self,
        path: &str,
        operator: Operator,
        values: &[Value],
        scalar: ScalarType,
    ) -> Result<Vec<Value>, Error> {
        values
            .iter()
            .map(|v| self.coerce(path, operator, v, scalar))
            .collect()
    }
}

fn unsupported(path: &str, operator: Operator, field: &FieldDef) -> Error {
    Error::UnsupportedType {
        path: path.to_string(),
        operator,
        found: field.field_type.to_string(),
    }
}

fn shape(path: &str, operator: Operator, value: &RestrictionValue) -> Error {
    Error::InvalidRestriction {
        path: path.to_string(),
        operator,
        reason: format!("unexpected {}", value.describe()),
    }
}

//! Conversions between text, JSON and typed values.
//!
//! Text tokens are classified without knowing the attribute they target
//! (integer, then float, then date, else string). Once the attribute is
//! known, [`to_scalar`] converts a value to its declared type.

use crate::catalog::ScalarType;
use crate::config::DateFormats;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use sift_proto::value::parse_uuid;
use sift_proto::Value;

/// A literal read from text.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    /// Typed value.
    pub value: Value,
    /// The text named a calendar date without a time of day.
    pub date_only: bool,
}

impl Literal {
    /// Move a date-only literal to the last millisecond of its day.
    pub fn end_of_day(self) -> Value {
        if !self.date_only {
            return self.value;
        }
        match self.value.to_date() {
            Some(date) => Value::from_datetime(end_of_day(date)),
            None => self.value,
        }
    }
}

/// `23:59:59.999` on the given date.
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    let time = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or_default();
    date.and_time(time)
}

/// Classify a text token as integer, float, date or string.
pub fn parse_literal(text: &str, formats: &DateFormats) -> Literal {
    let text = text.trim();

    if let Ok(i) = text.parse::<i64>() {
        return Literal {
            value: Value::Int64(i),
            date_only: false,
        };
    }
    if let Ok(i) = text.parse::<i128>() {
        return Literal {
            value: Value::BigInt(i),
            date_only: false,
        };
    }
    if looks_numeric(text) {
        if let Ok(f) = text.parse::<f64>() {
            return Literal {
                value: Value::Float64(f),
                date_only: false,
            };
        }
    }
    if let Some((dt, date_only)) = parse_temporal(text, formats) {
        return Literal {
            value: Value::from_datetime(dt),
            date_only,
        };
    }

    Literal {
        value: Value::String(text.to_string()),
        date_only: false,
    }
}

fn looks_numeric(text: &str) -> bool {
    let digits = text.trim_start_matches(['-', '+']).trim_start_matches('.');
    digits.starts_with(|c: char| c.is_ascii_digit())
}

/// Parse a date or date-time using the configured formats.
///
/// Returns the moment and whether the text carried only a date.
pub fn parse_temporal(text: &str, formats: &DateFormats) -> Option<(NaiveDateTime, bool)> {
    for fmt in &formats.date_time {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some((dt, false));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some((dt.naive_utc(), false));
    }
    for fmt in &formats.date_only {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return Some((date.and_time(NaiveTime::default()), true));
        }
    }
    None
}

fn integer(value: &Value) -> Option<i128> {
    match value {
        Value::String(s) => s.trim().parse::<i128>().ok(),
        Value::Float32(_) | Value::Float64(_) => {
            let f = value.as_f64()?;
            (f.fract() == 0.0).then_some(f as i128)
        }
        other => other.as_i128(),
    }
}

fn float(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        other => other.as_f64(),
    }
}

/// Convert a value to an attribute's declared scalar type.
///
/// Returns a short reason when the value cannot represent that type.
pub fn to_scalar(value: Value, scalar: ScalarType, formats: &DateFormats) -> Result<Value, String> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let fail = |value: &Value| format!("cannot read {} as {}", value, scalar);

    let converted = match scalar {
        ScalarType::Bool => match &value {
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        },
        ScalarType::Int16 => integer(&value)
            .and_then(|i| i16::try_from(i).ok())
            .map(Value::Int16),
        ScalarType::Int32 => integer(&value)
            .and_then(|i| i32::try_from(i).ok())
            .map(Value::Int32),
        ScalarType::Int64 => integer(&value)
            .and_then(|i| i64::try_from(i).ok())
            .map(Value::Int64),
        ScalarType::BigInt => integer(&value).map(Value::BigInt),
        ScalarType::Float32 => float(&value).map(|f| Value::Float32(f as f32)),
        ScalarType::Float64 | ScalarType::Decimal { .. } => float(&value).map(Value::Float64),
        ScalarType::String => match &value {
            Value::String(s) => Some(Value::String(s.clone())),
            Value::Uuid(bytes) => Some(Value::String(sift_proto::value::format_uuid(bytes))),
            other => Some(Value::String(other.to_string())),
        },
        ScalarType::Bytes => match &value {
            Value::Bytes(b) => Some(Value::Bytes(b.clone())),
            Value::String(s) => Some(Value::Bytes(s.as_bytes().to_vec())),
            _ => None,
        },
        ScalarType::Date => match &value {
            Value::Date(_) => Some(value.clone()),
            Value::Timestamp(_) => value.as_date().map(Value::Date),
            Value::String(s) => {
                parse_temporal(s.trim(), formats).map(|(dt, _)| Value::from_date(dt.date()))
            }
            _ => None,
        },
        ScalarType::Timestamp => match &value {
            Value::Timestamp(_) => Some(value.clone()),
            Value::Date(_) => value.as_timestamp().map(Value::Timestamp),
            Value::String(s) => {
                parse_temporal(s.trim(), formats).map(|(dt, _)| Value::from_datetime(dt))
            }
            _ => None,
        },
        ScalarType::Uuid => match &value {
            Value::Uuid(_) => Some(value.clone()),
            Value::String(s) => parse_uuid(s.trim()).map(Value::Uuid),
            _ => None,
        },
    };

    converted.ok_or_else(|| fail(&value))
}

/// Read a JSON value as an attribute's declared scalar type.
pub fn from_json(
    json: &serde_json::Value,
    scalar: ScalarType,
    formats: &DateFormats,
) -> Result<Value, String> {
    let value = match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int64(i)
            } else if let Some(u) = n.as_u64() {
                Value::BigInt(i128::from(u))
            } else {
                Value::Float64(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            return Err(format!("expected a {} value, got a JSON structure", scalar));
        }
    };
    to_scalar(value, scalar, formats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formats() -> DateFormats {
        DateFormats::default()
    }

    fn ts(text: &str) -> Value {
        Value::from_datetime(NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").unwrap())
    }

    #[test]
    fn test_parse_literal_order() {
        assert_eq!(parse_literal("42", &formats()).value, Value::Int64(42));
        assert_eq!(parse_literal(" -3 ", &formats()).value, Value::Int64(-3));
        assert_eq!(parse_literal("2.5", &formats()).value, Value::Float64(2.5));
        assert_eq!(
            parse_literal("170141183460469231731687303715884105727", &formats()).value,
            Value::BigInt(i128::MAX)
        );
        assert_eq!(parse_literal("pending", &formats()).value, Value::String("pending".into()));
        assert_eq!(parse_literal("nan", &formats()).value, Value::String("nan".into()));
    }

    #[test]
    fn test_parse_literal_dates() {
        let lit = parse_literal("2020-01-01", &formats());
        assert!(lit.date_only);
        assert_eq!(lit.value, ts("2020-01-01T00:00:00"));

        let lit = parse_literal("2020-01-01T10:30:00", &formats());
        assert!(!lit.date_only);
        assert_eq!(lit.value, ts("2020-01-01T10:30:00"));

        let lit = parse_literal("2020-01-01T10:30:00Z", &formats());
        assert_eq!(lit.value, ts("2020-01-01T10:30:00"));

        let lit = parse_literal("31/12/2020", &formats());
        assert!(lit.date_only);
    }

    #[test]
    fn test_end_of_day() {
        let lit = parse_literal("2020-12-31", &formats());
        assert_eq!(lit.end_of_day(), ts("2020-12-31T23:59:59.999"));

        let lit = parse_literal("2020-12-31T08:00:00", &formats());
        assert_eq!(lit.end_of_day(), ts("2020-12-31T08:00:00"));

        let lit = parse_literal("12", &formats());
        assert_eq!(lit.end_of_day(), Value::Int64(12));
    }

    #[test]
    fn test_to_scalar_numbers() {
        let f = formats();
        assert_eq!(to_scalar(Value::Int64(7), ScalarType::Int32, &f), Ok(Value::Int32(7)));
        assert_eq!(to_scalar("7".into(), ScalarType::Int16, &f), Ok(Value::Int16(7)));
        assert_eq!(to_scalar(Value::Float64(3.0), ScalarType::Int64, &f), Ok(Value::Int64(3)));
        assert!(to_scalar(Value::Float64(3.5), ScalarType::Int64, &f).is_err());
        assert!(to_scalar(Value::Int64(70_000), ScalarType::Int16, &f).is_err());
        assert_eq!(to_scalar(Value::Int64(2), ScalarType::Float64, &f), Ok(Value::Float64(2.0)));
        assert!(to_scalar("abc".into(), ScalarType::Int64, &f).is_err());
    }

    #[test]
    fn test_to_scalar_strings_and_temporals() {
        let f = formats();
        assert_eq!(to_scalar(Value::Int64(5), ScalarType::String, &f), Ok("5".into()));
        assert_eq!(
            to_scalar("2020-01-01".into(), ScalarType::Date, &f),
            Ok(Value::Date(18262))
        );
        assert_eq!(
            to_scalar(Value::Date(1), ScalarType::Timestamp, &f),
            Ok(Value::Timestamp(sift_proto::value::MICROS_PER_DAY))
        );
        assert_eq!(to_scalar("TRUE".into(), ScalarType::Bool, &f), Ok(Value::Bool(true)));
        assert!(to_scalar("2020-01-01".into(), ScalarType::Bool, &f).is_err());
        assert_eq!(to_scalar(Value::Null, ScalarType::Uuid, &f), Ok(Value::Null));
    }

    #[test]
    fn test_from_json() {
        let f = formats();
        assert_eq!(
            from_json(&serde_json::json!(30), ScalarType::Int32, &f),
            Ok(Value::Int32(30))
        );
        assert_eq!(
            from_json(&serde_json::json!("2021-06-01"), ScalarType::Date, &f),
            Ok(Value::from_date(NaiveDate::from_ymd_opt(2021, 6, 1).unwrap()))
        );
        assert_eq!(
            from_json(&serde_json::json!(null), ScalarType::String, &f),
            Ok(Value::Null)
        );
        assert!(from_json(&serde_json::json!({"a": 1}), ScalarType::String, &f).is_err());
    }
}

//! Runtime value types carried by restrictions, plans and result rows.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// Number of microseconds in one day.
pub const MICROS_PER_DAY: i64 = 86_400_000_000;

/// A runtime value.
///
/// This enum represents every literal that can appear in a compiled plan and
/// every column value a backend can hand back in a tuple row. It maps to the
/// scalar types declared in the catalog.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 16-bit signed integer.
    Int16(i16),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// Wide integer for arbitrary-precision attributes.
    BigInt(i128),
    /// 32-bit floating point.
    Float32(f32),
    /// 64-bit floating point.
    Float64(f64),
    /// UTF-8 string.
    String(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Calendar date as days since the Unix epoch.
    Date(i32),
    /// Timestamp as microseconds since the Unix epoch (UTC).
    Timestamp(i64),
    /// UUID as 16 bytes.
    Uuid([u8; 16]),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is an integer or floating point number.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Int16(_)
                | Value::Int32(_)
                | Value::Int64(_)
                | Value::BigInt(_)
                | Value::Float32(_)
                | Value::Float64(_)
        )
    }

    /// Check if this value is a date or a timestamp.
    pub fn is_temporal(&self) -> bool {
        matches!(self, Value::Date(_) | Value::Timestamp(_))
    }

    /// Short name of the value kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::BigInt(_) => "bigint",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Timestamp(_) => "timestamp",
            Value::Uuid(_) => "uuid",
        }
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64, widening smaller integers.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int16(i) => Some(i64::from(*i)),
            Value::Int32(i) => Some(i64::from(*i)),
            Value::Int64(i) => Some(*i),
            Value::BigInt(i) => i64::try_from(*i).ok(),
            _ => None,
        }
    }

    /// Try to get as i128, widening every integer kind.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::BigInt(i) => Some(*i),
            other => other.as_i64().map(i128::from),
        }
    }

    /// Try to get as f64, widening integers and f32.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(f) => Some(*f),
            Value::Float32(f) => Some(f64::from(*f)),
            Value::BigInt(i) => Some(*i as f64),
            other => other.as_i64().map(|i| i as f64),
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as bytes reference.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Try to get as timestamp micros. Dates are widened to midnight.
    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            Value::Timestamp(t) => Some(*t),
            Value::Date(d) => Some(i64::from(*d) * MICROS_PER_DAY),
            _ => None,
        }
    }

    /// Try to get as a date. Timestamps are truncated to their day.
    pub fn as_date(&self) -> Option<i32> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Timestamp(t) => i32::try_from(t.div_euclid(MICROS_PER_DAY)).ok(),
            _ => None,
        }
    }

    /// Try to get as UUID.
    pub fn as_uuid(&self) -> Option<&[u8; 16]> {
        match self {
            Value::Uuid(u) => Some(u),
            _ => None,
        }
    }

    /// Build a timestamp value from a naive (UTC) date-time.
    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        Value::Timestamp(dt.and_utc().timestamp_micros())
    }

    /// Build a date value from a naive date.
    pub fn from_date(date: NaiveDate) -> Self {
        let days = date.signed_duration_since(epoch_date()).num_days();
        Value::Date(days as i32)
    }

    /// Interpret this value as a naive date-time, if temporal.
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        let micros = self.as_timestamp()?;
        DateTime::<Utc>::from_timestamp_micros(micros).map(|dt| dt.naive_utc())
    }

    /// Interpret this value as a naive date, if temporal.
    pub fn to_date(&self) -> Option<NaiveDate> {
        let days = self.as_date()?;
        epoch_date().checked_add_signed(chrono::Duration::days(i64::from(days)))
    }

    /// Convert to a JSON value for object materialization.
    ///
    /// Temporal values render as ISO-8601 strings, UUIDs in hyphenated form
    /// and bytes as lowercase hex. Wide integers that fit in 64 bits render as
    /// numbers, otherwise as decimal strings.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int16(i) => Json::from(*i),
            Value::Int32(i) => Json::from(*i),
            Value::Int64(i) => Json::from(*i),
            Value::BigInt(i) => match i64::try_from(*i) {
                Ok(small) => Json::from(small),
                Err(_) => Json::String(i.to_string()),
            },
            Value::Float32(f) => serde_json::Number::from_f64(f64::from(*f))
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Float64(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Bytes(b) => Json::String(hex::encode(b)),
            Value::Date(_) => self
                .to_date()
                .map(|d| Json::String(d.format("%Y-%m-%d").to_string()))
                .unwrap_or(Json::Null),
            Value::Timestamp(_) => self
                .to_datetime()
                .map(|dt| Json::String(dt.and_utc().to_rfc3339()))
                .unwrap_or(Json::Null),
            Value::Uuid(u) => Json::String(format_uuid(u)),
        }
    }
}

/// The Unix epoch as a calendar date.
pub fn epoch_date() -> NaiveDate {
    DateTime::<Utc>::UNIX_EPOCH.date_naive()
}

/// Format 16 UUID bytes in the canonical 8-4-4-4-12 form.
pub fn format_uuid(bytes: &[u8; 16]) -> String {
    let hex = hex::encode(bytes);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

/// Parse a UUID from its hyphenated or plain hex form.
pub fn parse_uuid(text: &str) -> Option<[u8; 16]> {
    let compact: String = text.chars().filter(|c| *c != '-').collect();
    let bytes = hex::decode(compact).ok()?;
    bytes.try_into().ok()
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int16(i) => write!(f, "{}", i),
            Value::Int32(i) => write!(f, "{}", i),
            Value::Int64(i) => write!(f, "{}", i),
            Value::BigInt(i) => write!(f, "{}", i),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "'{}'", s),
            Value::Bytes(b) => write!(f, "x'{}'", hex::encode(b)),
            Value::Date(_) => match self.to_date() {
                Some(d) => write!(f, "{}", d.format("%Y-%m-%d")),
                None => write!(f, "date({})", self.as_date().unwrap_or_default()),
            },
            Value::Timestamp(t) => match self.to_datetime() {
                Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
                None => write!(f, "timestamp({})", t),
            },
            Value::Uuid(u) => write!(f, "{}", format_uuid(u)),
        }
    }
}

// Conversion implementations
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<i128> for Value {
    fn from(v: i128) -> Self {
        Value::BigInt(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<[u8; 16]> for Value {
    fn from(v: [u8; 16]) -> Self {
        Value::Uuid(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::from_date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::from_datetime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

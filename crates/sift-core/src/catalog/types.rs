//! Core type definitions for the catalog.

use serde::{Deserialize, Serialize};
use sift_proto::RelationKind;
use std::fmt;

/// Scalar data types an attribute can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarType {
    /// Boolean value.
    Bool,
    /// 16-bit signed integer.
    Int16,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// Arbitrary-precision integer (held as i128).
    BigInt,
    /// 32-bit floating point.
    Float32,
    /// 64-bit floating point.
    Float64,
    /// Fixed-precision decimal.
    Decimal {
        /// Total number of digits.
        precision: u8,
        /// Number of digits after decimal point.
        scale: u8,
    },
    /// UTF-8 string.
    String,
    /// Binary data.
    Bytes,
    /// Calendar date.
    Date,
    /// Timestamp (microseconds since Unix epoch).
    Timestamp,
    /// UUID (128-bit identifier).
    Uuid,
}

/// Kind of a to-many collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollectionKind {
    /// Ordered, duplicates allowed.
    #[default]
    List,
    /// Unordered, no duplicates.
    Set,
}

/// Field types - flat representation without recursion.
///
/// Relationships name their target entity instead of nesting its definition,
/// so every type stays a plain value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// A scalar value.
    Scalar(ScalarType),
    /// An optional scalar value (nullable).
    OptionalScalar(ScalarType),
    /// An enumeration type, stored as its variant name.
    Enum {
        /// Name of the enum type.
        name: String,
        /// Allowed variant values.
        variants: Vec<String>,
    },
    /// An optional enumeration.
    OptionalEnum {
        /// Name of the enum type.
        name: String,
        /// Allowed variant values.
        variants: Vec<String>,
    },
    /// An embedded value object.
    Embedded {
        /// Name of the embeddable type.
        entity: String,
    },
    /// An optional embedded value object.
    OptionalEmbedded {
        /// Name of the embeddable type.
        entity: String,
    },
    /// A single related entity.
    Reference {
        /// Name of the related entity.
        entity: String,
    },
    /// A collection of related entities or embedded values.
    Collection {
        /// Element type; `None` when the model does not declare it.
        element: Option<String>,
        /// List or set semantics.
        kind: CollectionKind,
    },
}

impl ScalarType {
    /// Check if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ScalarType::Int16
                | ScalarType::Int32
                | ScalarType::Int64
                | ScalarType::BigInt
                | ScalarType::Float32
                | ScalarType::Float64
                | ScalarType::Decimal { .. }
        )
    }

    /// Check if this type is a date or a timestamp.
    pub fn is_temporal(&self) -> bool {
        matches!(self, ScalarType::Date | ScalarType::Timestamp)
    }

    /// Check if this type is a string-like type.
    pub fn is_string_like(&self) -> bool {
        matches!(self, ScalarType::String)
    }

    /// Check if values of this type have a total order usable by comparisons.
    pub fn is_ordered(&self) -> bool {
        self.is_numeric() || self.is_temporal() || self.is_string_like()
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarType::Decimal { precision, scale } => {
                write!(f, "Decimal({}, {})", precision, scale)
            }
            other => write!(f, "{:?}", other),
        }
    }
}

impl FieldType {
    /// Create a scalar field type.
    pub fn scalar(scalar: ScalarType) -> Self {
        FieldType::Scalar(scalar)
    }

    /// Create an optional scalar field type.
    pub fn optional_scalar(scalar: ScalarType) -> Self {
        FieldType::OptionalScalar(scalar)
    }

    /// Create an enum field type.
    pub fn enum_type(name: impl Into<String>, variants: Vec<String>) -> Self {
        FieldType::Enum {
            name: name.into(),
            variants,
        }
    }

    /// Create an embedded value field type.
    pub fn embedded(entity: impl Into<String>) -> Self {
        FieldType::Embedded {
            entity: entity.into(),
        }
    }

    /// Create a to-one reference field type.
    pub fn reference(entity: impl Into<String>) -> Self {
        FieldType::Reference {
            entity: entity.into(),
        }
    }

    /// Create a list collection field type.
    pub fn list(entity: impl Into<String>) -> Self {
        FieldType::Collection {
            element: Some(entity.into()),
            kind: CollectionKind::List,
        }
    }

    /// Create a set collection field type.
    pub fn set(entity: impl Into<String>) -> Self {
        FieldType::Collection {
            element: Some(entity.into()),
            kind: CollectionKind::Set,
        }
    }

    /// Check if this type is nullable.
    pub fn is_nullable(&self) -> bool {
        matches!(
            self,
            FieldType::OptionalScalar(_)
                | FieldType::OptionalEnum { .. }
                | FieldType::OptionalEmbedded { .. }
                | FieldType::Reference { .. }
        )
    }

    /// Relationship kind of an attribute with this type.
    pub fn relation_kind(&self) -> RelationKind {
        match self {
            FieldType::Scalar(_)
            | FieldType::OptionalScalar(_)
            | FieldType::Enum { .. }
            | FieldType::OptionalEnum { .. } => RelationKind::Scalar,
            FieldType::Embedded { .. } | FieldType::OptionalEmbedded { .. } => {
                RelationKind::Embedded
            }
            FieldType::Reference { .. } => RelationKind::ToOne,
            FieldType::Collection { .. } => RelationKind::ToMany,
        }
    }

    /// Get the scalar type values are compared as. Enums compare as strings.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            FieldType::Scalar(s) | FieldType::OptionalScalar(s) => Some(*s),
            FieldType::Enum { .. } | FieldType::OptionalEnum { .. } => Some(ScalarType::String),
            _ => None,
        }
    }

    /// Name of the entity on the other side of a relationship.
    pub fn target_entity(&self) -> Option<&str> {
        match self {
            FieldType::Embedded { entity }
            | FieldType::OptionalEmbedded { entity }
            | FieldType::Reference { entity } => Some(entity),
            FieldType::Collection { element, .. } => element.as_deref(),
            _ => None,
        }
    }

    /// Collection kind, if this is a to-many type.
    pub fn collection_kind(&self) -> Option<CollectionKind> {
        match self {
            FieldType::Collection { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Scalar(s) => write!(f, "{}", s),
            FieldType::OptionalScalar(s) => write!(f, "{}?", s),
            FieldType::Enum { name, .. } => write!(f, "{}", name),
            FieldType::OptionalEnum { name, .. } => write!(f, "{}?", name),
            FieldType::Embedded { entity } => write!(f, "{}", entity),
            FieldType::OptionalEmbedded { entity } => write!(f, "{}?", entity),
            FieldType::Reference { entity } => write!(f, "ref {}", entity),
            FieldType::Collection { element, kind } => {
                let element = element.as_deref().unwrap_or("?");
                match kind {
                    CollectionKind::List => write!(f, "List<{}>", element),
                    CollectionKind::Set => write!(f, "Set<{}>", element),
                }
            }
        }
    }
}

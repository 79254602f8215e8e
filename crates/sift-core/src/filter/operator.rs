//! Restriction operators and their categories.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse operator family, used to whitelist what a text rule may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorCategory {
    /// `IS NULL` / `IS NOT NULL`.
    Null,
    /// `=` / `<>`.
    Equality,
    /// `<`, `<=`, `>`, `>=`.
    Comparison,
    /// `IN` / `NOT IN`.
    Membership,
    /// `BETWEEN`.
    Range,
    /// Case-sensitive `LIKE` family.
    Like,
    /// Case-insensitive `LIKE` family.
    ILike,
    /// Several `;`-separated comparisons at once.
    Multi,
    /// Comparisons between two attributes.
    FieldComparison,
}

impl OperatorCategory {
    /// Every category.
    pub const ALL: [OperatorCategory; 9] = [
        OperatorCategory::Null,
        OperatorCategory::Equality,
        OperatorCategory::Comparison,
        OperatorCategory::Membership,
        OperatorCategory::Range,
        OperatorCategory::Like,
        OperatorCategory::ILike,
        OperatorCategory::Multi,
        OperatorCategory::FieldComparison,
    ];
}

/// What a restriction of a given operator carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    /// Nothing.
    None,
    /// One literal (or, for equality, a list meaning any/none of them).
    Scalar,
    /// A list of literals.
    List,
    /// Lower and upper bound.
    Range,
    /// Another attribute path.
    Path,
    /// Raw text holding several clauses.
    Text,
}

/// Where `%` wildcards go around a LIKE literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeMode {
    /// No wildcard.
    Exact,
    /// `%literal%`.
    Anywhere,
    /// `%literal`.
    End,
    /// `literal%`.
    Start,
}

impl LikeMode {
    /// Wrap an already escaped literal in wildcards.
    pub fn pattern(&self, escaped: &str) -> String {
        match self {
            LikeMode::Exact => escaped.to_string(),
            LikeMode::Anywhere => format!("%{}%", escaped),
            LikeMode::End => format!("%{}", escaped),
            LikeMode::Start => format!("{}%", escaped),
        }
    }
}

macro_rules! operators {
    ($($variant:ident => $label:literal, $category:ident;)*) => {
        /// A restriction operator.
        ///
        /// Declaration order matters: text classification tries operators in
        /// this order and keeps the first match.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Operator {
            $(
                #[doc = $label]
                $variant,
            )*
        }

        impl Operator {
            /// Every operator in declaration order.
            pub const ALL: &'static [Operator] = &[$(Operator::$variant),*];

            /// Display label of the operator.
            pub fn label(&self) -> &'static str {
                match self {
                    $(Operator::$variant => $label,)*
                }
            }

            /// Category the operator belongs to.
            pub fn category(&self) -> OperatorCategory {
                match self {
                    $(Operator::$variant => OperatorCategory::$category,)*
                }
            }
        }
    };
}

operators! {
    IsNull => "IS NULL", Null;
    IsNotNull => "IS NOT NULL", Null;
    Multi => "MULTI", Multi;
    NotEqual => "NOT EQUAL", Equality;
    LessThanOrEqualTo => "LESS THAN OR EQUAL TO", Comparison;
    LessThan => "LESS THAN", Comparison;
    GreaterThanOrEqualTo => "GREATER THAN OR EQUAL TO", Comparison;
    GreaterThan => "GREATER THAN", Comparison;
    NotIn => "NOT IN", Membership;
    In => "IN", Membership;
    Between => "BETWEEN", Range;
    LikeExactMatch => "LIKE EXACT MATCH", Like;
    NotLikeExactMatch => "NOT LIKE EXACT MATCH", Like;
    LikeMatchAnywhere => "LIKE MATCH ANYWHERE", Like;
    LikeMatchEnd => "LIKE MATCH END", Like;
    LikeMatchStart => "LIKE MATCH START", Like;
    NotLikeMatchAnywhere => "NOT LIKE MATCH ANYWHERE", Like;
    NotLikeMatchEnd => "NOT LIKE MATCH END", Like;
    NotLikeMatchStart => "NOT LIKE MATCH START", Like;
    ILikeExactMatch => "ILIKE EXACT MATCH", ILike;
    NotILikeExactMatch => "NOT ILIKE EXACT MATCH", ILike;
    ILikeMatchAnywhere => "ILIKE MATCH ANYWHERE", ILike;
    ILikeMatchEnd => "ILIKE MATCH END", ILike;
    ILikeMatchStart => "ILIKE MATCH START", ILike;
    NotILikeMatchAnywhere => "NOT ILIKE MATCH ANYWHERE", ILike;
    NotILikeMatchEnd => "NOT ILIKE MATCH END", ILike;
    NotILikeMatchStart => "NOT ILIKE MATCH START", ILike;
    Equal => "EQUAL", Equality;
    EqualField => "EQUAL FIELD", FieldComparison;
    NotEqualField => "NOT EQUAL FIELD", FieldComparison;
    LessThanField => "LESS THAN FIELD", FieldComparison;
    LessThanOrEqualToField => "LESS THAN OR EQUAL TO FIELD", FieldComparison;
    GreaterThanField => "GREATER THAN FIELD", FieldComparison;
    GreaterThanOrEqualToField => "GREATER THAN OR EQUAL TO FIELD", FieldComparison;
}

impl Operator {
    /// Shape of the value a restriction with this operator carries.
    pub fn value_shape(&self) -> ValueShape {
        match self.category() {
            OperatorCategory::Null => ValueShape::None,
            OperatorCategory::Membership => ValueShape::List,
            OperatorCategory::Range => ValueShape::Range,
            OperatorCategory::FieldComparison => ValueShape::Path,
            OperatorCategory::Multi => ValueShape::Text,
            OperatorCategory::Equality
            | OperatorCategory::Comparison
            | OperatorCategory::Like
            | OperatorCategory::ILike => ValueShape::Scalar,
        }
    }

    /// Check if restrictions with this operator carry a literal value.
    pub fn requires_value(&self) -> bool {
        !matches!(self.value_shape(), ValueShape::None | ValueShape::Path)
    }

    /// Check if this is a null check.
    pub fn is_null_check(&self) -> bool {
        self.category() == OperatorCategory::Null
    }

    /// Check if this operator belongs to the LIKE or ILIKE families.
    pub fn is_like(&self) -> bool {
        matches!(
            self.category(),
            OperatorCategory::Like | OperatorCategory::ILike
        )
    }

    /// Check if this LIKE operator folds case.
    pub fn is_case_insensitive(&self) -> bool {
        self.category() == OperatorCategory::ILike
    }

    /// Check if this operator negates its test.
    pub fn is_negated(&self) -> bool {
        matches!(
            self,
            Operator::IsNotNull
                | Operator::NotEqual
                | Operator::NotIn
                | Operator::NotLikeExactMatch
                | Operator::NotLikeMatchAnywhere
                | Operator::NotLikeMatchEnd
                | Operator::NotLikeMatchStart
                | Operator::NotILikeExactMatch
                | Operator::NotILikeMatchAnywhere
                | Operator::NotILikeMatchEnd
                | Operator::NotILikeMatchStart
                | Operator::NotEqualField
        )
    }

    /// Wildcard placement for LIKE operators.
    pub fn like_mode(&self) -> Option<LikeMode> {
        match self {
            Operator::LikeExactMatch
            | Operator::NotLikeExactMatch
            | Operator::ILikeExactMatch
            | Operator::NotILikeExactMatch => Some(LikeMode::Exact),
            Operator::LikeMatchAnywhere
            | Operator::NotLikeMatchAnywhere
            | Operator::ILikeMatchAnywhere
            | Operator::NotILikeMatchAnywhere => Some(LikeMode::Anywhere),
            Operator::LikeMatchEnd
            | Operator::NotLikeMatchEnd
            | Operator::ILikeMatchEnd
            | Operator::NotILikeMatchEnd => Some(LikeMode::End),
            Operator::LikeMatchStart
            | Operator::NotLikeMatchStart
            | Operator::ILikeMatchStart
            | Operator::NotILikeMatchStart => Some(LikeMode::Start),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

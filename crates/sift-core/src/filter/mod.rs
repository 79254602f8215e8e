//! Filter specifications.
//!
//! A [`FilterSpec`] describes one query declaratively: a template object,
//! restrictions keyed by dotted attribute path, projections, ordering,
//! grouping and join directives. Restrictions can also be read from a small
//! text language (see [`grammar`]).

pub mod grammar;
mod operator;
mod restriction;
mod spec;

pub use operator::{LikeMode, Operator, OperatorCategory, ValueShape};
pub use restriction::{Restriction, RestrictionValue};
pub use spec::{Fallback, FieldOverride, FilterSpec, JoinDirective, Projection, SortKey};

pub(crate) use spec::is_below;

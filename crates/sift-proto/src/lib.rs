//! sift plan types.
//!
//! This crate defines the values, plan IR and result rows shared between the
//! sift compiler and the backends that execute its plans.
//!
//! # Modules
//!
//! - [`value`] - Runtime value types for restriction literals and result columns
//! - [`query`] - Query plan IR (joins, conditions, selection, ordering, paging)
//! - [`result`] - Row sets returned by backends and result pages
//! - [`error`] - Plan consistency errors
//!
//! # Serialization
//!
//! Plan and value types derive both `rkyv` and `serde` traits, so a plan can be
//! shipped to an out-of-process backend or logged as JSON:
//!
//! ```ignore
//! use sift_proto::QueryPlan;
//!
//! let plan = QueryPlan::new("User");
//! let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&plan).unwrap();
//! let json = serde_json::to_string(&plan).unwrap();
//! ```

pub mod error;
pub mod query;
pub mod result;
pub mod value;

pub use error::Error;

// Re-export commonly used types at crate root
pub use query::{
    Column, ColumnFunction, Comparison, Condition, FieldRef, JoinKind, JoinSpec, Operand,
    OrderDirection, OrderSpec, Pagination, QueryPlan, RelationKind, Selection, Source,
};
pub use result::{Page, RowSet, TupleRow};
pub use value::Value;

//! Plan consistency errors.

use thiserror::Error;

/// Errors raised while reading a plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A plan references a join that does not exist.
    #[error("plan references unknown join j{0}")]
    UnknownJoin(u32),

    /// A plan is structurally inconsistent.
    #[error("invalid plan: {0}")]
    InvalidPlan(String),
}

//! The seam between compiled plans and whatever executes them.

use sift_proto::{QueryPlan, RowSet};
use thiserror::Error;

/// Errors a backend reports while executing a plan.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// A stored value violates the entity model.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// The plan uses a feature the backend does not implement.
    #[error("unsupported plan: {0}")]
    Unsupported(String),

    /// Execution failed.
    #[error("execution error: {0}")]
    Execution(String),

    /// The plan is inconsistent.
    #[error(transparent)]
    Plan(#[from] sift_proto::Error),
}

/// Executes query plans.
///
/// Implementations receive immutable plans and return whole entities as
/// JSON documents, flat tuples keyed by column alias, or a single count,
/// matching the plan's selection.
pub trait QueryBackend {
    /// Execute one plan.
    fn execute(&self, plan: &QueryPlan) -> Result<RowSet, BackendError>;
}

impl<B: QueryBackend + ?Sized> QueryBackend for &B {
    fn execute(&self, plan: &QueryPlan) -> Result<RowSet, BackendError> {
        (**self).execute(plan)
    }
}

impl<B: QueryBackend + ?Sized> QueryBackend for Box<B> {
    fn execute(&self, plan: &QueryPlan) -> Result<RowSet, BackendError> {
        (**self).execute(plan)
    }
}

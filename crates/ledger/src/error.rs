//! The module contains the errors the ledger can return.
//!
//! Every public operation returns either its success payload or exactly one
//! of these variants; nothing else crosses the crate boundary.

use sea_orm::DbErr;
use thiserror::Error;

/// Ledger custom errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Malformed or out-of-range input, rejected before any mutation.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Referenced user/goal/transaction absent or inactive.
    #[error("{0} not found")]
    NotFound(String),
    /// The entity is already in the requested state.
    #[error("nothing to do: {0}")]
    NoOp(String),
    /// The operation would violate a stored invariant.
    #[error("conflict: {0}")]
    Conflict(String),
    /// The operation would push a goal past its overshoot cap.
    #[error("goal overflow: {0}")]
    GoalOverflow(String),
    /// The unit of work did not complete within the caller's deadline.
    /// No partial state persists; the call is safely retryable.
    #[error("unit of work timed out")]
    Timeout,
    #[error(transparent)]
    Storage(#[from] DbErr),
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::NoOp(a), Self::NoOp(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::GoalOverflow(a), Self::GoalOverflow(b)) => a == b,
            (Self::Timeout, Self::Timeout) => true,
            (Self::Storage(a), Self::Storage(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

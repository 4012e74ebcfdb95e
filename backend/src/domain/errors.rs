use shared::{AbsenceStatus, FailureCode, RemoteFailure};
use thiserror::Error;

/// Reasons a store operation can fail.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("absence request {0} is no longer pending")]
    AbsenceNotPending(String),
    #[error("cannot move absence request from {from} to {to}")]
    InvalidStatusTransition { from: AbsenceStatus, to: AbsenceStatus },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn code(&self) -> FailureCode {
        match self {
            DomainError::Validation(_) => FailureCode::ValidationFailed,
            DomainError::NotFound(_) => FailureCode::NotFound,
            DomainError::AbsenceNotPending(_) => FailureCode::AbsenceNotPending,
            DomainError::InvalidStatusTransition { .. } => FailureCode::InvalidStatusTransition,
            DomainError::Unauthorized(_) => FailureCode::Unauthorized,
            DomainError::Internal(_) => FailureCode::Internal,
        }
    }

    pub fn to_failure(&self) -> RemoteFailure {
        RemoteFailure::new(self.code(), self.to_string())
    }
}

impl From<anyhow::Error> for DomainError {
    fn from(err: anyhow::Error) -> Self {
        DomainError::Internal(err.to_string())
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

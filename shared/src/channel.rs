//! The request/response seam between the sync core and whatever carries
//! requests to the store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{MutationName, QueryOperation};

/// Machine-readable reason the store refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCode {
    ValidationFailed,
    AbsenceNotPending,
    InvalidStatusTransition,
    NotFound,
    Unauthorized,
    Internal,
}

impl FailureCode {
    /// The record was in the wrong state for the requested write.
    pub fn is_state_conflict(&self) -> bool {
        matches!(
            self,
            FailureCode::AbsenceNotPending | FailureCode::InvalidStatusTransition
        )
    }
}

/// Error body returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code:?}: {message}")]
pub struct RemoteFailure {
    pub code: FailureCode,
    pub message: String,
}

impl RemoteFailure {
    pub fn new(code: FailureCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChannelError {
    /// The request never got a usable answer (connection, timeout, 5xx).
    #[error("transport failure: {0}")]
    Transport(String),
    /// The store answered and said no.
    #[error("request rejected: {0}")]
    Rejected(RemoteFailure),
    /// The store answered with something we could not read.
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for ChannelError {
    fn from(err: serde_json::Error) -> Self {
        ChannelError::Decode(err.to_string())
    }
}

/// Executes named operations against the remote store.
///
/// Implementations carry their own session; callers only name the operation
/// and hand over its variables.
#[async_trait]
pub trait RemoteChannel: Send + Sync {
    async fn query(&self, operation: QueryOperation, variables: Value) -> Result<Value, ChannelError>;

    async fn mutate(&self, mutation: MutationName, input: Value) -> Result<Value, ChannelError>;
}

use shared::{ChannelError, FailureCode, RemoteFailure};
use thiserror::Error;

/// Why the latest poll of a query failed, held on the query handle next to
/// the last good snapshot. `subscribe` also returns it when no poller can
/// be started.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// The store could not be reached. The next tick retries.
    #[error("store unreachable, showing last known data: {0}")]
    TransientNetwork(String),
    #[error("store refused the query: {0}")]
    Rejected(RemoteFailure),
    #[error("unreadable response: {0}")]
    Decode(String),
    /// The engine was shut down or there is no runtime to poll on.
    #[error("sync engine unavailable: {0}")]
    Stopped(String),
}

impl SyncError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::TransientNetwork(_))
    }
}

impl From<ChannelError> for SyncError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Transport(msg) => SyncError::TransientNetwork(msg),
            ChannelError::Rejected(failure) => SyncError::Rejected(failure),
            ChannelError::Decode(msg) => SyncError::Decode(msg),
        }
    }
}

/// Outcome of a failed write. Snapshots are never touched when one of these
/// is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MutationError {
    #[error("invalid input: {0}")]
    Validation(String),
    /// Another write against the same record has not finished yet.
    #[error("a change to {target} is already in progress")]
    Busy { target: String },
    /// The record is no longer in a state that allows this write.
    #[error("{0}")]
    StateConflict(RemoteFailure),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("not allowed: {0}")]
    Unauthorized(String),
    #[error("store unreachable: {0}")]
    TransientNetwork(String),
    #[error("unreadable response: {0}")]
    Decode(String),
}

impl From<ChannelError> for MutationError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Transport(msg) => MutationError::TransientNetwork(msg),
            ChannelError::Decode(msg) => MutationError::Decode(msg),
            ChannelError::Rejected(failure) => match failure.code {
                FailureCode::ValidationFailed => MutationError::Validation(failure.message),
                FailureCode::AbsenceNotPending | FailureCode::InvalidStatusTransition => {
                    MutationError::StateConflict(failure)
                }
                FailureCode::NotFound => MutationError::NotFound(failure.message),
                FailureCode::Unauthorized => MutationError::Unauthorized(failure.message),
                // The store hit a fault of its own; from here that is no
                // different from not reaching it.
                FailureCode::Internal => MutationError::TransientNetwork(failure.message),
            },
        }
    }
}

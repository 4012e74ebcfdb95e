use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::SyncError;

/// What a query handle currently knows about its query.
///
/// A new snapshot replaces the old one as a whole; readers holding the old
/// `Arc` keep a consistent (if older) copy.
#[derive(Debug)]
pub struct QueryState<T> {
    /// Latest successful result, kept through later failures
    pub snapshot: Option<Arc<T>>,
    /// Error from the most recent attempt, cleared by the next success
    pub error: Option<SyncError>,
    /// A request for this query is outstanding
    pub in_flight: bool,
    /// Number of successful fetches applied so far
    pub version: u64,
    pub consecutive_failures: u32,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            snapshot: None,
            error: None,
            in_flight: false,
            version: 0,
            consecutive_failures: 0,
            fetched_at: None,
        }
    }
}

// Manual impl: cloning shares the snapshot, so `T` need not be `Clone`.
impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            snapshot: self.snapshot.clone(),
            error: self.error.clone(),
            in_flight: self.in_flight,
            version: self.version,
            consecutive_failures: self.consecutive_failures,
            fetched_at: self.fetched_at,
        }
    }
}

impl<T> QueryState<T> {
    pub(crate) fn apply(&mut self, result: Result<T, SyncError>) {
        self.in_flight = false;
        match result {
            Ok(value) => {
                self.snapshot = Some(Arc::new(value));
                self.error = None;
                self.version += 1;
                self.consecutive_failures = 0;
                self.fetched_at = Some(Utc::now());
            }
            Err(err) => {
                self.error = Some(err);
                self.consecutive_failures += 1;
            }
        }
    }

    pub fn page_state(&self) -> PageState {
        match (&self.snapshot, &self.error) {
            (None, None) => PageState::Loading,
            (Some(_), None) => PageState::Ready,
            (Some(_), Some(_)) => PageState::Stale,
            (None, Some(_)) => PageState::Failed,
        }
    }
}

/// Coarse status of a page backed by one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// Nothing fetched yet
    Loading,
    /// Showing a fresh snapshot
    Ready,
    /// Showing the last good snapshot; the latest poll failed
    Stale,
    /// Nothing to show; every attempt so far failed
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_keeps_last_snapshot() {
        let mut state: QueryState<Vec<u32>> = QueryState::default();
        assert_eq!(state.page_state(), PageState::Loading);

        state.apply(Ok(vec![1, 2, 3]));
        assert_eq!(state.page_state(), PageState::Ready);
        assert_eq!(state.version, 1);

        state.apply(Err(SyncError::TransientNetwork("offline".to_string())));
        assert_eq!(state.page_state(), PageState::Stale);
        assert_eq!(state.snapshot.as_deref(), Some(&vec![1, 2, 3]));
        assert_eq!(state.consecutive_failures, 1);
        assert_eq!(state.version, 1);

        state.apply(Ok(vec![4]));
        assert_eq!(state.page_state(), PageState::Ready);
        assert!(state.error.is_none());
        assert_eq!(state.consecutive_failures, 0);
        assert_eq!(state.version, 2);
    }

    #[test]
    fn test_failure_before_first_snapshot() {
        let mut state: QueryState<Vec<u32>> = QueryState::default();
        state.apply(Err(SyncError::TransientNetwork("offline".to_string())));
        assert_eq!(state.page_state(), PageState::Failed);
    }

    #[test]
    fn test_readers_keep_their_copy() {
        let mut state: QueryState<Vec<u32>> = QueryState::default();
        state.apply(Ok(vec![1]));
        let held = state.snapshot.clone().unwrap();

        state.apply(Ok(vec![2]));
        assert_eq!(*held, vec![1]);
        assert_eq!(state.snapshot.as_deref(), Some(&vec![2]));
    }
}

//! Pessimistic writes against the store.
//!
//! Nothing local changes until the store confirms a write. After a
//! confirmed write every live query reading a touched resource is refreshed,
//! and that refresh is what eventually shows the change.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use shared::{Mutation, RemoteChannel};

use super::engine::RemoteSyncEngine;
use crate::error::MutationError;

#[derive(Clone)]
pub struct MutationCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    channel: Arc<dyn RemoteChannel>,
    engine: RemoteSyncEngine,
    busy: Mutex<HashSet<String>>,
}

impl CoordinatorInner {
    fn busy(&self) -> MutexGuard<'_, HashSet<String>> {
        self.busy.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds a target in the busy set until dropped, however the write ends.
struct BusyGuard<'a> {
    inner: &'a CoordinatorInner,
    target: String,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.inner.busy().remove(&self.target);
    }
}

impl MutationCoordinator {
    pub fn new(channel: Arc<dyn RemoteChannel>, engine: RemoteSyncEngine) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                channel,
                engine,
                busy: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Whether a write against `target` is currently outstanding
    pub fn in_flight(&self, target: &str) -> bool {
        self.inner.busy().contains(target)
    }

    /// Submit a write and wait for the store's answer.
    ///
    /// A second write against a target that already has one outstanding is
    /// turned away with [`MutationError::Busy`] without reaching the store.
    pub async fn execute<M: Mutation>(&self, mutation: M) -> Result<M::Output, MutationError> {
        let target = mutation.target();
        let _guard = self.claim(&target)?;

        let input = serde_json::to_value(&mutation).map_err(|e| MutationError::Validation(e.to_string()))?;
        debug!("Submitting {} for {}", M::NAME, target);

        let value = match self.inner.channel.mutate(M::NAME, input).await {
            Ok(value) => value,
            Err(err) => {
                let err = MutationError::from(err);
                warn!("{} for {} failed: {}", M::NAME, target, err);
                return Err(err);
            }
        };

        // The store has changed whether or not the reply decodes.
        let refreshed = self.inner.engine.refresh_affected(M::NAME.touches());
        info!("{} for {} confirmed, refreshing {} live queries", M::NAME, target, refreshed);

        serde_json::from_value(value).map_err(|e| MutationError::Decode(e.to_string()))
    }

    fn claim(&self, target: &str) -> Result<BusyGuard<'_>, MutationError> {
        let mut busy = self.inner.busy();
        if !busy.insert(target.to_string()) {
            debug!("Rejecting write to {}: one is already outstanding", target);
            return Err(MutationError::Busy {
                target: target.to_string(),
            });
        }
        Ok(BusyGuard {
            inner: &self.inner,
            target: target.to_string(),
        })
    }
}

//! Keeps live queries fresh by polling the store.
//!
//! Every distinct (operation, variables) pair gets one poller task. The
//! poller fetches once straight away and then on every interval boundary
//! measured from the moment it started. It never has two requests out at
//! once: a boundary that passes while a request is outstanding is skipped,
//! not queued. Results are published through a `watch` channel, so
//! subscribers see either the previous snapshot or the new one.
//!
//! Failures are recorded on the handle and the last good snapshot is kept;
//! the next boundary simply tries again.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{watch, Notify};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use shared::{Query, QueryOperation, RemoteChannel, Resource};

use super::state::QueryState;
use crate::error::SyncError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Identity of a live query: the operation plus its serialized variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub operation: QueryOperation,
    pub variables: String,
}

type HandleId = u64;

struct LiveQuery {
    subscribers: usize,
    interval: Duration,
    /// `watch::Receiver<QueryState<T>>` for the query's output type
    receiver: Box<dyn Any + Send + Sync>,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
}

#[derive(Default)]
struct Registry {
    next_handle: HandleId,
    queries: HashMap<QueryKey, LiveQuery>,
    handles: HashMap<HandleId, QueryKey>,
}

struct EngineInner {
    channel: Arc<dyn RemoteChannel>,
    default_interval: Duration,
    registry: Mutex<Registry>,
    shutdown: CancellationToken,
}

impl EngineInner {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        // The registry is only touched in short non-panicking sections.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, id: HandleId) {
        let mut registry = self.registry();
        let Some(key) = registry.handles.remove(&id) else {
            return;
        };

        let last = match registry.queries.get_mut(&key) {
            Some(live) => {
                live.subscribers -= 1;
                live.subscribers == 0
            }
            None => false,
        };

        if last {
            if let Some(live) = registry.queries.remove(&key) {
                live.cancel.cancel();
                info!("Stopped polling {} {}", key.operation, key.variables);
            }
        }
    }
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Owner of every live query. Cheap to clone.
#[derive(Clone)]
pub struct RemoteSyncEngine {
    inner: Arc<EngineInner>,
}

impl RemoteSyncEngine {
    pub fn new(channel: Arc<dyn RemoteChannel>) -> Self {
        Self::with_default_interval(channel, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_default_interval(channel: Arc<dyn RemoteChannel>, default_interval: Duration) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                channel,
                default_interval,
                registry: Mutex::new(Registry::default()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Subscribe at the engine's default interval.
    ///
    /// Fails with [`SyncError::Stopped`] outside a tokio runtime or after
    /// [`shutdown`](Self::shutdown).
    pub fn subscribe<Q: Query>(&self, query: Q) -> Result<QueryHandle<Q::Output>, SyncError> {
        self.subscribe_with_interval(query, self.inner.default_interval)
    }

    /// Subscribe to a query, starting a poller for it unless one is already
    /// running for the same operation and variables. A shared poller keeps
    /// the interval it was started with.
    pub fn subscribe_with_interval<Q: Query>(
        &self,
        query: Q,
        interval: Duration,
    ) -> Result<QueryHandle<Q::Output>, SyncError> {
        let interval = interval.max(Duration::from_millis(1));
        let variables = serde_json::to_value(&query).map_err(|e| SyncError::Decode(e.to_string()))?;
        let key = QueryKey {
            operation: Q::OPERATION,
            variables: variables.to_string(),
        };

        if self.inner.shutdown.is_cancelled() {
            return Err(SyncError::Stopped("engine has been shut down".to_string()));
        }

        let mut registry = self.inner.registry();
        let id = registry.next_handle;
        registry.next_handle += 1;

        if let Some(live) = registry.queries.get_mut(&key) {
            let receiver = live
                .receiver
                .downcast_ref::<watch::Receiver<QueryState<Q::Output>>>()
                .ok_or_else(|| {
                    SyncError::Decode(format!(
                        "{} is already live with a different output type",
                        key.operation
                    ))
                })?
                .clone();
            live.subscribers += 1;
            let handle = QueryHandle {
                id,
                key: key.clone(),
                interval: live.interval,
                state: receiver,
                cancel: live.cancel.clone(),
                engine: Arc::downgrade(&self.inner),
            };
            debug!("Joined live query {} ({} subscribers)", key.operation, live.subscribers);
            registry.handles.insert(id, key);
            return Ok(handle);
        }

        let runtime = Handle::try_current().map_err(|e| SyncError::Stopped(e.to_string()))?;
        let (sender, receiver) = watch::channel(QueryState::<Q::Output>::default());
        let refresh = Arc::new(Notify::new());
        let cancel = self.inner.shutdown.child_token();

        runtime.spawn(poll_loop(
            self.inner.channel.clone(),
            Q::OPERATION,
            variables,
            interval,
            sender,
            refresh.clone(),
            cancel.clone(),
        ));
        info!("Started polling {} {} every {:?}", key.operation, key.variables, interval);

        registry.queries.insert(
            key.clone(),
            LiveQuery {
                subscribers: 1,
                interval,
                receiver: Box::new(receiver.clone()),
                refresh,
                cancel: cancel.clone(),
            },
        );
        registry.handles.insert(id, key.clone());

        Ok(QueryHandle {
            id,
            key,
            interval,
            state: receiver,
            cancel,
            engine: Arc::downgrade(&self.inner),
        })
    }

    /// Release a handle. Polling stops once no handle for the query is
    /// left; a request already on the wire is allowed to finish but its
    /// result is thrown away.
    pub fn unsubscribe<T>(&self, handle: QueryHandle<T>) {
        drop(handle);
    }

    /// Fetch a handle's query now, outside the regular cycle. The regular
    /// interval boundaries are unaffected. Returns false if the handle is
    /// no longer live.
    pub fn refresh_now<T>(&self, handle: &QueryHandle<T>) -> bool {
        let registry = self.inner.registry();
        match registry.queries.get(&handle.key) {
            Some(live) if handle.is_live() => {
                live.refresh.notify_one();
                true
            }
            _ => false,
        }
    }

    /// Refresh every live query that reads any of `touched`. Returns how
    /// many were asked to refresh.
    pub fn refresh_affected(&self, touched: &[Resource]) -> usize {
        let registry = self.inner.registry();
        let mut count = 0;
        for (key, live) in registry.queries.iter() {
            if key.operation.reads_any(touched) {
                debug!("Refreshing {} after write to {:?}", key.operation, touched);
                live.refresh.notify_one();
                count += 1;
            }
        }
        count
    }

    /// Keys of every query with at least one subscriber
    pub fn live_queries(&self) -> Vec<QueryKey> {
        self.inner.registry().queries.keys().cloned().collect()
    }

    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        self.inner
            .registry()
            .queries
            .get(key)
            .map(|live| live.subscribers)
            .unwrap_or(0)
    }

    /// Stop every poller. Handles stay readable but will not change again.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }
}

/// A subscription to one live query. Dropping it unsubscribes.
pub struct QueryHandle<T> {
    id: HandleId,
    key: QueryKey,
    interval: Duration,
    state: watch::Receiver<QueryState<T>>,
    cancel: CancellationToken,
    engine: Weak<EngineInner>,
}

impl<T> QueryHandle<T> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn operation(&self) -> QueryOperation {
        self.key.operation
    }

    /// Interval the underlying poller runs at
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_live(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// The state as of now
    pub fn current(&self) -> QueryState<T> {
        self.state.borrow().clone()
    }

    pub fn snapshot(&self) -> Option<Arc<T>> {
        self.state.borrow().snapshot.clone()
    }

    /// Wait for the next published change. Returns false once the poller
    /// has stopped and nothing more will arrive.
    pub async fn changed(&mut self) -> bool {
        self.state.changed().await.is_ok()
    }

    /// Wait until the state satisfies `ready`. Returns `None` if the
    /// poller stops first.
    pub async fn wait_for(&mut self, mut ready: impl FnMut(&QueryState<T>) -> bool) -> Option<QueryState<T>> {
        self.state
            .wait_for(|state| ready(state))
            .await
            .ok()
            .map(|state| state.clone())
    }
}

impl<T> Drop for QueryHandle<T> {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.upgrade() {
            engine.release(self.id);
        }
    }
}

/// Smallest `started + k * interval` strictly after `now`.
pub(crate) fn next_boundary(started: Instant, interval: Duration, now: Instant) -> Instant {
    let elapsed = now.saturating_duration_since(started).as_nanos();
    let period = interval.as_nanos().max(1);
    let periods = elapsed / period + 1;
    let offset = period.saturating_mul(periods);
    started + Duration::from_nanos(u64::try_from(offset).unwrap_or(u64::MAX))
}

async fn poll_loop<T>(
    channel: Arc<dyn RemoteChannel>,
    operation: QueryOperation,
    variables: Value,
    interval: Duration,
    state: watch::Sender<QueryState<T>>,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
) where
    T: DeserializeOwned + Send + Sync + 'static,
{
    let started = Instant::now();
    let mut next_tick = started;

    loop {
        let forced = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = refresh.notified() => true,
            _ = sleep_until(next_tick) => false,
        };
        debug!("Polling {} (forced: {})", operation, forced);

        state.send_if_modified(|s| {
            s.in_flight = true;
            false
        });

        let result = fetch::<T>(channel.as_ref(), operation, variables.clone()).await;

        if cancel.is_cancelled() {
            debug!("Discarding {} result that arrived after unsubscribe", operation);
            break;
        }

        if let Err(err) = &result {
            warn!("Polling {} failed: {}", operation, err);
        }
        state.send_modify(|s| {
            let recovering = s.error.is_some() && result.is_ok();
            s.apply(result);
            if recovering {
                info!("{} recovered after failed polls", operation);
            }
        });

        next_tick = next_boundary(started, interval, Instant::now());
    }

    debug!("Poller for {} stopped", operation);
}

async fn fetch<T: DeserializeOwned>(
    channel: &dyn RemoteChannel,
    operation: QueryOperation,
    variables: Value,
) -> Result<T, SyncError> {
    let value = channel.query(operation, variables).await?;
    serde_json::from_value(value).map_err(|e| SyncError::Decode(e.to_string()))
}

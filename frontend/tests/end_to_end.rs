//! The sync core running against a real in-process store.
//!
//! Time is paused in these tests, so interval arithmetic is exact and a
//! multi-second schedule runs instantly.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

use portal_backend::config::ServerConfig;
use portal_backend::domain::seed::{seed_demo_data, DemoAccounts};
use portal_backend::initialize_backend;
use portal_backend::io::{InProcessChannel, OperationDispatcher};
use portal_frontend::views::{build_absence_table, ViewContext};
use portal_frontend::{MutationCoordinator, MutationError, PageState, RemoteSyncEngine};
use shared::{
    AbsenceStatus, AddStudentInput, ChannelError, Child, DeleteAbsenceRequestInput, FailureCode,
    GetParentsChildren, MutationName, QueryOperation, RemoteChannel, RespondToAbsenceRequestInput,
    SessionContext,
};

/// Wraps the in-process channel to count, time, fail or hold requests.
struct InstrumentedChannel {
    inner: InProcessChannel,
    queries: AtomicUsize,
    query_times: Mutex<Vec<Instant>>,
    offline: AtomicBool,
    mutate_delay: Duration,
    query_delay: Duration,
    query_gate: Option<Arc<Notify>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl InstrumentedChannel {
    fn new(inner: InProcessChannel) -> Self {
        Self {
            inner,
            queries: AtomicUsize::new(0),
            query_times: Mutex::new(Vec::new()),
            offline: AtomicBool::new(false),
            mutate_delay: Duration::ZERO,
            query_delay: Duration::ZERO,
            query_gate: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteChannel for InstrumentedChannel {
    async fn query(&self, operation: QueryOperation, variables: Value) -> Result<Value, ChannelError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.query_times.lock().unwrap().push(Instant::now());
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(gate) = &self.query_gate {
            gate.notified().await;
        }
        if !self.query_delay.is_zero() {
            tokio::time::sleep(self.query_delay).await;
        }
        let result = if self.offline.load(Ordering::SeqCst) {
            Err(ChannelError::Transport("connection refused".to_string()))
        } else {
            self.inner.query(operation, variables).await
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn mutate(&self, mutation: MutationName, input: Value) -> Result<Value, ChannelError> {
        if !self.mutate_delay.is_zero() {
            tokio::time::sleep(self.mutate_delay).await;
        }
        self.inner.mutate(mutation, input).await
    }
}

fn store() -> (OperationDispatcher, DemoAccounts) {
    let state = initialize_backend(&ServerConfig::for_tests()).unwrap();
    let demo = seed_demo_data(&state).unwrap();
    (OperationDispatcher::new(state), demo)
}

fn request_with_status(children: &[Child], status: AbsenceStatus) -> (String, String) {
    children
        .iter()
        .flat_map(|c| c.absence_requests.iter())
        .find(|r| r.status == status)
        .map(|r| (r.child_id.clone(), r.id.clone()))
        .unwrap()
}

fn contains_request(children: &[Child], id: &str) -> bool {
    children
        .iter()
        .any(|c| c.absence_requests.iter().any(|r| r.id == id))
}

#[tokio::test(start_paused = true)]
async fn test_subscription_polls_at_least_twice_in_two_and_a_half_intervals() {
    let (dispatcher, demo) = store();
    let channel = Arc::new(InstrumentedChannel::new(InProcessChannel::new(dispatcher, demo.parent)));
    let engine = RemoteSyncEngine::new(channel.clone());

    let handle = engine
        .subscribe_with_interval(GetParentsChildren {}, Duration::from_millis(1000))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;

    assert!(channel.query_count() >= 2, "only {} polls", channel.query_count());
    assert_eq!(handle.current().page_state(), PageState::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_now_does_not_shift_the_schedule() {
    let (dispatcher, demo) = store();
    let channel = Arc::new(InstrumentedChannel::new(InProcessChannel::new(dispatcher, demo.parent)));
    let engine = RemoteSyncEngine::new(channel.clone());
    let start = Instant::now();

    let handle = engine
        .subscribe_with_interval(GetParentsChildren {}, Duration::from_millis(1000))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(engine.refresh_now(&handle));
    tokio::time::sleep_until(start + Duration::from_millis(2100)).await;

    let offsets: Vec<u128> = channel
        .query_times
        .lock()
        .unwrap()
        .iter()
        .map(|t| t.duration_since(start).as_millis())
        .collect();
    assert_eq!(offsets, vec![0, 300, 1000, 2000]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_requests_never_overlap() {
    let (dispatcher, demo) = store();
    let mut instrumented = InstrumentedChannel::new(InProcessChannel::new(dispatcher, demo.parent));
    instrumented.query_delay = Duration::from_millis(2500);
    let channel = Arc::new(instrumented);
    let engine = RemoteSyncEngine::new(channel.clone());
    let start = Instant::now();

    let handle = engine
        .subscribe_with_interval(GetParentsChildren {}, Duration::from_millis(1000))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(handle.current().in_flight);
    assert!(engine.refresh_now(&handle));
    tokio::time::sleep_until(start + Duration::from_secs(10)).await;

    assert_eq!(channel.max_in_flight.load(Ordering::SeqCst), 1);
    // overrun ticks are skipped, the remembered refresh runs once the first request lands
    let offsets: Vec<u128> = channel
        .query_times
        .lock()
        .unwrap()
        .iter()
        .map(|t| t.duration_since(start).as_millis())
        .collect();
    assert_eq!(offsets, vec![0, 2500, 6000, 9000]);
    assert_eq!(handle.current().page_state(), PageState::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_same_query_shares_one_poller() {
    let (dispatcher, demo) = store();
    let channel = Arc::new(InstrumentedChannel::new(InProcessChannel::new(dispatcher, demo.parent)));
    let engine = RemoteSyncEngine::new(channel.clone());

    let first = engine.subscribe(GetParentsChildren {}).unwrap();
    let second = engine
        .subscribe_with_interval(GetParentsChildren {}, Duration::from_millis(100))
        .unwrap();

    assert_eq!(engine.live_queries().len(), 1);
    assert_eq!(engine.subscriber_count(first.key()), 2);
    // the first subscriber's interval wins
    assert_eq!(second.interval(), Duration::from_millis(1000));

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(channel.query_count(), 3);

    drop(first);
    assert!(second.is_live());
    engine.unsubscribe(second);
    assert!(engine.live_queries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_empty_store_gives_empty_view() {
    let state = initialize_backend(&ServerConfig::for_tests()).unwrap();
    let session = SessionContext::parent("parent-without-children");
    let channel = Arc::new(InProcessChannel::new(OperationDispatcher::new(state), session.clone()));
    let engine = RemoteSyncEngine::new(channel);

    let mut handle = engine.subscribe(GetParentsChildren {}).unwrap();
    let state = handle.wait_for(|s| s.version >= 1).await.unwrap();

    let children = state.snapshot.unwrap();
    assert!(children.is_empty());
    let view = build_absence_table(&children, &ViewContext::new(session), "");
    assert!(view.is_empty);
    assert!(view.rows.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_added_student_appears_once_after_refresh() {
    let (dispatcher, demo) = store();
    let channel = Arc::new(InProcessChannel::new(dispatcher, demo.parent));
    let engine = RemoteSyncEngine::with_default_interval(channel.clone(), Duration::from_secs(60));
    let coordinator = MutationCoordinator::new(channel, engine.clone());

    let mut handle = engine.subscribe(GetParentsChildren {}).unwrap();
    let before = handle.wait_for(|s| s.version >= 1).await.unwrap();
    assert_eq!(before.snapshot.unwrap().len(), 2);

    let added = coordinator
        .execute(AddStudentInput {
            first_name: "Grace".to_string(),
            last_name: "Doe".to_string(),
            dob: "2017-09-01".to_string(),
            year_group: "reception".to_string(),
            profile_image_url: None,
        })
        .await
        .unwrap();

    // far shorter than the interval, so only the mutation refresh can explain it
    let after = tokio::time::timeout(
        Duration::from_secs(1),
        handle.wait_for(|s| s.version >= 2),
    )
    .await
    .unwrap()
    .unwrap();

    let children = after.snapshot.unwrap();
    assert_eq!(children.iter().filter(|c| c.id == added.id).count(), 1);
    assert_eq!(children.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_deleting_pending_request_removes_it() {
    let (dispatcher, demo) = store();
    let channel = Arc::new(InProcessChannel::new(dispatcher, demo.parent));
    let engine = RemoteSyncEngine::with_default_interval(channel.clone(), Duration::from_secs(60));
    let coordinator = MutationCoordinator::new(channel, engine.clone());

    let mut handle = engine.subscribe(GetParentsChildren {}).unwrap();
    let loaded = handle.wait_for(|s| s.version >= 1).await.unwrap();
    let (student_id, absence_request_id) = request_with_status(&loaded.snapshot.unwrap(), AbsenceStatus::Pending);

    let deleted = coordinator
        .execute(DeleteAbsenceRequestInput {
            student_id,
            absence_request_id: absence_request_id.clone(),
        })
        .await;
    assert_eq!(deleted, Ok(true));

    let refreshed = handle.wait_for(|s| s.version >= 2).await.unwrap();
    assert!(!contains_request(&refreshed.snapshot.unwrap(), &absence_request_id));
}

#[tokio::test(start_paused = true)]
async fn test_deleting_decided_request_is_a_state_conflict() {
    let (dispatcher, demo) = store();
    let channel = Arc::new(InProcessChannel::new(dispatcher, demo.parent));
    let engine = RemoteSyncEngine::with_default_interval(channel.clone(), Duration::from_secs(60));
    let coordinator = MutationCoordinator::new(channel, engine.clone());

    let mut handle = engine.subscribe(GetParentsChildren {}).unwrap();
    let loaded = handle.wait_for(|s| s.version >= 1).await.unwrap();
    let children = loaded.snapshot.clone().unwrap();

    for status in [AbsenceStatus::Approved, AbsenceStatus::Rejected] {
        let (student_id, absence_request_id) = request_with_status(&children, status);
        let result = coordinator
            .execute(DeleteAbsenceRequestInput {
                student_id,
                absence_request_id: absence_request_id.clone(),
            })
            .await;

        match result {
            Err(MutationError::StateConflict(failure)) => {
                assert_eq!(failure.code, FailureCode::AbsenceNotPending)
            }
            other => panic!("expected a state conflict, got {other:?}"),
        }

        let current = handle.current();
        assert_eq!(current.version, 1);
        assert_eq!(current.snapshot.as_deref(), Some(&*children));
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_writes_to_one_request() {
    let (dispatcher, demo) = store();
    let mut instrumented = InstrumentedChannel::new(InProcessChannel::new(dispatcher, demo.parent));
    instrumented.mutate_delay = Duration::from_millis(200);
    let channel = Arc::new(instrumented);
    let engine = RemoteSyncEngine::new(channel.clone());
    let coordinator = MutationCoordinator::new(channel, engine.clone());

    let mut handle = engine.subscribe(GetParentsChildren {}).unwrap();
    let loaded = handle.wait_for(|s| s.version >= 1).await.unwrap();
    let (student_id, absence_request_id) = request_with_status(&loaded.snapshot.unwrap(), AbsenceStatus::Pending);
    let input = DeleteAbsenceRequestInput {
        student_id,
        absence_request_id: absence_request_id.clone(),
    };

    let (first, second) = tokio::join!(
        coordinator.execute(input.clone()),
        coordinator.execute(input.clone())
    );

    assert_eq!(first, Ok(true));
    assert_eq!(
        second,
        Err(MutationError::Busy {
            target: absence_request_id
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_teacher_decision_shows_up_for_parent() {
    let (dispatcher, demo) = store();
    let parent_channel = Arc::new(InProcessChannel::new(dispatcher, demo.parent.clone()));
    let teacher_channel = Arc::new(parent_channel.with_session(demo.teacher.clone()));

    let parent_engine = RemoteSyncEngine::new(parent_channel);
    let teacher_engine = RemoteSyncEngine::new(teacher_channel.clone());
    let teacher = MutationCoordinator::new(teacher_channel, teacher_engine);

    let mut handle = parent_engine.subscribe(GetParentsChildren {}).unwrap();
    let loaded = handle.wait_for(|s| s.version >= 1).await.unwrap();
    let (student_id, absence_request_id) = request_with_status(&loaded.snapshot.unwrap(), AbsenceStatus::Pending);

    let decided = teacher
        .execute(RespondToAbsenceRequestInput {
            student_id: student_id.clone(),
            absence_request_id: absence_request_id.clone(),
            status: AbsenceStatus::Approved,
        })
        .await
        .unwrap();
    assert_eq!(decided.status, AbsenceStatus::Approved);

    // a decided request cannot be decided again
    let again = teacher
        .execute(RespondToAbsenceRequestInput {
            student_id,
            absence_request_id: absence_request_id.clone(),
            status: AbsenceStatus::Rejected,
        })
        .await;
    assert!(matches!(again, Err(MutationError::StateConflict(_))));

    // the parent's engine picks the decision up on its own schedule
    let seen = handle
        .wait_for(|s| {
            s.snapshot.as_deref().is_some_and(|children| {
                children
                    .iter()
                    .flat_map(|c| c.absence_requests.iter())
                    .any(|r| r.id == absence_request_id && r.status == AbsenceStatus::Approved)
            })
        })
        .await;
    assert!(seen.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_failed_polls_keep_last_snapshot() {
    let (dispatcher, demo) = store();
    let channel = Arc::new(InstrumentedChannel::new(InProcessChannel::new(dispatcher, demo.parent)));
    let engine = RemoteSyncEngine::new(channel.clone());

    let mut handle = engine.subscribe(GetParentsChildren {}).unwrap();
    let loaded = handle.wait_for(|s| s.version >= 1).await.unwrap();
    let good = loaded.snapshot.unwrap();

    channel.offline.store(true, Ordering::SeqCst);
    let failing = handle.wait_for(|s| s.consecutive_failures >= 2).await.unwrap();
    assert_eq!(failing.page_state(), PageState::Stale);
    assert_eq!(failing.snapshot.as_deref(), Some(&*good));
    assert!(failing.error.as_ref().is_some_and(|e| e.is_transient()));

    channel.offline.store(false, Ordering::SeqCst);
    let recovered = handle.wait_for(|s| s.error.is_none() && s.version >= 2).await.unwrap();
    assert_eq!(recovered.page_state(), PageState::Ready);
    assert_eq!(recovered.consecutive_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribe_stops_polling_and_drops_in_flight_result() {
    let (dispatcher, demo) = store();
    let gate = Arc::new(Notify::new());
    let mut instrumented = InstrumentedChannel::new(InProcessChannel::new(dispatcher, demo.parent));
    instrumented.query_gate = Some(gate.clone());
    let channel = Arc::new(instrumented);
    let engine = RemoteSyncEngine::new(channel.clone());

    let handle = engine.subscribe(GetParentsChildren {}).unwrap();
    while channel.query_count() == 0 {
        tokio::task::yield_now().await;
    }
    assert!(handle.current().in_flight);

    engine.unsubscribe(handle);
    assert!(engine.live_queries().is_empty());

    gate.notify_one();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(channel.query_count(), 1);

    // a fresh subscription starts from nothing rather than the discarded result
    let fresh = engine.subscribe(GetParentsChildren {}).unwrap();
    assert_eq!(fresh.current().version, 0);
    assert!(fresh.snapshot().is_none());
}

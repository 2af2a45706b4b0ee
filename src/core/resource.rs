//! Async resource: binds an async producer to an observable
//! `{data, loading, error}` state.
//!
//! Every invocation is tagged with a sequence number. A result is applied
//! only if no later-started invocation has already landed, so a slow stale
//! response can never overwrite fresher data. After [`AsyncResource::teardown`]
//! the state is frozen: pending results are dropped and polling stops.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::api::error::ApiError;
use crate::api::transport::Envelope;

pub type ProducerFuture<T> = BoxFuture<'static, Result<Envelope<T>, ApiError>>;
type Producer<T, D> = Arc<dyn Fn(D) -> ProducerFuture<T> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<ApiError>,
}

impl<T> ResourceState<T> {
    fn initial() -> Self {
        Self {
            data: None,
            loading: true,
            error: None,
        }
    }
}

struct Inner<T, D> {
    producer: Producer<T, D>,
    dependencies: Mutex<D>,
    state: watch::Sender<ResourceState<T>>,
    started: AtomicU64,
    applied: AtomicU64,
    cancel: CancellationToken,
}

/// Cloning shares the same state; all clones see the same invocations.
pub struct AsyncResource<T, D = ()> {
    inner: Arc<Inner<T, D>>,
}

impl<T, D> Clone for AsyncResource<T, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, D> AsyncResource<T, D>
where
    T: Clone + Send + Sync + 'static,
    D: Clone + PartialEq + Send + 'static,
{
    /// Creates the resource in its initial loading state. Nothing runs until
    /// [`start`](Self::start), [`refetch`](Self::refetch) or a dependency
    /// change.
    pub fn new<F, Fut>(dependencies: D, producer: F) -> Self
    where
        F: Fn(D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Envelope<T>, ApiError>> + Send + 'static,
    {
        let producer: Producer<T, D> = Arc::new(move |deps| producer(deps).boxed());
        let (state, _) = watch::channel(ResourceState::initial());
        Self {
            inner: Arc::new(Inner {
                producer,
                dependencies: Mutex::new(dependencies),
                state,
                started: AtomicU64::new(0),
                applied: AtomicU64::new(0),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn state(&self) -> ResourceState<T> {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResourceState<T>> {
        self.inner.state.subscribe()
    }

    pub fn dependencies(&self) -> D {
        self.lock_dependencies().clone()
    }

    fn lock_dependencies(&self) -> MutexGuard<'_, D> {
        self.inner
            .dependencies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Callers hold the dependencies lock, so sequence order matches the
    /// order in which dependencies were read or replaced.
    fn next_seq(&self) -> u64 {
        self.inner.started.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Number of producer invocations started so far.
    pub fn invocation_count(&self) -> u64 {
        self.inner.started.load(Ordering::SeqCst)
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// First load; the mount-time counterpart of [`refetch`](Self::refetch).
    pub async fn start(&self) -> ResourceState<T> {
        self.refetch().await
    }

    /// Re-invokes the producer with the current dependencies and resolves
    /// once this invocation has settled.
    pub async fn refetch(&self) -> ResourceState<T> {
        if self.is_torn_down() {
            return self.state();
        }
        let (seq, dependencies) = {
            let current = self.lock_dependencies();
            (self.next_seq(), current.clone())
        };
        self.invoke(seq, dependencies).await
    }

    /// Replaces the dependencies and re-invokes when they differ from the
    /// current ones. Returns `None` when nothing changed.
    pub async fn set_dependencies(&self, dependencies: D) -> Option<ResourceState<T>> {
        if self.is_torn_down() {
            return None;
        }
        let seq = {
            let mut current = self.lock_dependencies();
            if *current == dependencies {
                return None;
            }
            *current = dependencies.clone();
            self.next_seq()
        };
        Some(self.invoke(seq, dependencies).await)
    }

    /// Overwrites `data` without touching `loading` or `error`.
    pub fn set_data(&self, data: T) {
        if self.is_torn_down() {
            return;
        }
        self.inner.state.send_modify(|state| state.data = Some(data));
    }

    /// Stops the resource for good: in-flight results are ignored and any
    /// polling task exits.
    pub fn teardown(&self) {
        debug!(
            invocations = self.invocation_count(),
            "Tearing down async resource"
        );
        self.inner.cancel.cancel();
    }

    /// Refetches every `interval` (first fetch immediately) until the handle
    /// is stopped or dropped, or the resource is torn down.
    pub fn poll(&self, interval: Duration) -> PollHandle {
        let stop = self.inner.cancel.child_token();
        let token = stop.clone();
        let resource = self.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        tokio::select! {
                            _ = token.cancelled() => break,
                            _ = resource.refetch() => {}
                        }
                    }
                }
            }
            trace!("Polling stopped");
        });
        PollHandle {
            stop,
            task: Some(task),
        }
    }

    async fn invoke(&self, seq: u64, dependencies: D) -> ResourceState<T> {
        self.inner.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let pending = (self.inner.producer)(dependencies);
        let outcome = tokio::select! {
            biased;
            _ = self.inner.cancel.cancelled() => None,
            result = pending => Some(result),
        };

        match outcome {
            Some(result) => {
                self.apply(seq, result);
            }
            None => trace!(seq, "Invocation abandoned after teardown"),
        }
        self.state()
    }

    fn apply(&self, seq: u64, result: Result<Envelope<T>, ApiError>) -> bool {
        if self.is_torn_down() {
            trace!(seq, "Dropping result after teardown");
            return false;
        }
        let started = &self.inner.started;
        let applied = &self.inner.applied;
        // The watch lock serializes appliers, so the check and the store
        // below cannot interleave with another invocation's.
        self.inner.state.send_if_modified(move |state| {
            let landed = applied.load(Ordering::SeqCst);
            if seq <= landed {
                debug!(seq, landed, "Discarding stale response");
                return false;
            }
            applied.store(seq, Ordering::SeqCst);
            match result {
                Ok(envelope) => {
                    state.data = Some(envelope.data);
                    state.error = None;
                }
                Err(error) => {
                    state.data = None;
                    state.error = Some(error);
                }
            }
            state.loading = started.load(Ordering::SeqCst) > seq;
            true
        })
    }
}

/// Owns a polling task started by [`AsyncResource::poll`]. Dropping the
/// handle stops polling.
pub struct PollHandle {
    stop: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Stops polling and waits for the task to exit.
    pub async fn join(mut self) {
        self.stop.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use tokio::sync::oneshot;

    type Gate = oneshot::Receiver<Result<Envelope<String>, ApiError>>;
    type GateTx = oneshot::Sender<Result<Envelope<String>, ApiError>>;

    /// Producer whose invocations resolve only when the test releases them,
    /// in whatever order the test chooses.
    fn gated() -> (AsyncResource<String>, Arc<Mutex<VecDeque<Gate>>>) {
        let gates: Arc<Mutex<VecDeque<Gate>>> = Arc::new(Mutex::new(VecDeque::new()));
        let producer_gates = Arc::clone(&gates);
        let resource = AsyncResource::new((), move |_| {
            let gate = producer_gates.lock().unwrap().pop_front();
            async move {
                match gate {
                    Some(gate) => gate
                        .await
                        .unwrap_or_else(|_| Err(ApiError::transport("gate dropped"))),
                    None => Err(ApiError::transport("no gate")),
                }
            }
        });
        (resource, gates)
    }

    fn open_gate(gates: &Arc<Mutex<VecDeque<Gate>>>) -> GateTx {
        let (tx, rx) = oneshot::channel();
        gates.lock().unwrap().push_back(rx);
        tx
    }

    fn ok(value: &str) -> Result<Envelope<String>, ApiError> {
        Ok(Envelope::new(value.to_string(), 200))
    }

    async fn wait_for_invocations<D>(resource: &AsyncResource<String, D>, count: u64)
    where
        D: Clone + PartialEq + Send + 'static,
    {
        while resource.invocation_count() < count {
            tokio::task::yield_now().await;
        }
        tokio::task::yield_now().await;
    }

    #[tokio::test]
    async fn initial_state_is_loading() {
        let (resource, _gates) = gated();
        let state = resource.state();
        assert!(state.loading);
        assert_eq!(state.data, None);
        assert_eq!(state.error, None);
        assert_eq!(resource.invocation_count(), 0);
    }

    #[tokio::test]
    async fn success_settles_state() {
        let (resource, gates) = gated();
        let gate = open_gate(&gates);

        let task = tokio::spawn({
            let resource = resource.clone();
            async move { resource.refetch().await }
        });
        wait_for_invocations(&resource, 1).await;
        assert!(resource.state().loading);

        gate.send(ok("payload")).unwrap();
        let settled = task.await.unwrap();
        assert_eq!(settled.data.as_deref(), Some("payload"));
        assert!(!settled.loading);
        assert_eq!(settled.error, None);
        assert_eq!(resource.state(), settled);
    }

    #[tokio::test]
    async fn failure_clears_data_and_records_error() {
        let (resource, gates) = gated();
        open_gate(&gates).send(ok("first")).unwrap();
        resource.start().await;

        open_gate(&gates)
            .send(Err(ApiError::http(503, "unavailable")))
            .unwrap();
        let state = resource.refetch().await;
        assert_eq!(state.data, None);
        assert!(!state.loading);
        assert_eq!(state.error, Some(ApiError::http(503, "unavailable")));
    }

    #[tokio::test]
    async fn stale_response_landing_last_is_discarded() {
        let (resource, gates) = gated();
        let first = open_gate(&gates);
        let second = open_gate(&gates);

        let a = tokio::spawn({
            let resource = resource.clone();
            async move { resource.refetch().await }
        });
        wait_for_invocations(&resource, 1).await;
        let b = tokio::spawn({
            let resource = resource.clone();
            async move { resource.refetch().await }
        });
        wait_for_invocations(&resource, 2).await;

        second.send(ok("fresh")).unwrap();
        b.await.unwrap();
        assert_eq!(resource.state().data.as_deref(), Some("fresh"));
        assert!(!resource.state().loading);

        first.send(ok("stale")).unwrap();
        a.await.unwrap();
        let state = resource.state();
        assert_eq!(state.data.as_deref(), Some("fresh"));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn earlier_response_landing_first_is_superseded() {
        let (resource, gates) = gated();
        let first = open_gate(&gates);
        let second = open_gate(&gates);

        let a = tokio::spawn({
            let resource = resource.clone();
            async move { resource.refetch().await }
        });
        wait_for_invocations(&resource, 1).await;
        let b = tokio::spawn({
            let resource = resource.clone();
            async move { resource.refetch().await }
        });
        wait_for_invocations(&resource, 2).await;

        first.send(ok("older")).unwrap();
        a.await.unwrap();
        let interim = resource.state();
        assert_eq!(interim.data.as_deref(), Some("older"));
        assert!(interim.loading, "a later invocation is still pending");

        second.send(ok("newer")).unwrap();
        b.await.unwrap();
        let state = resource.state();
        assert_eq!(state.data.as_deref(), Some("newer"));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn set_data_leaves_flags_alone() {
        let (resource, gates) = gated();
        open_gate(&gates)
            .send(Err(ApiError::http(500, "boom")))
            .unwrap();
        resource.start().await;

        resource.set_data("optimistic".to_string());
        let state = resource.state();
        assert_eq!(state.data.as_deref(), Some("optimistic"));
        assert!(!state.loading);
        assert_eq!(state.error, Some(ApiError::http(500, "boom")));
    }

    #[tokio::test]
    async fn dependency_change_triggers_refetch() {
        let seen: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let resource = AsyncResource::new(1_u32, move |page: u32| {
            recorder.lock().unwrap().push(page);
            async move { Ok::<_, ApiError>(Envelope::new(format!("page {page}"), 200)) }
        });

        resource.start().await;
        assert!(resource.set_dependencies(1).await.is_none());
        let state = resource.set_dependencies(2).await.expect("should refetch");
        assert_eq!(state.data.as_deref(), Some("page 2"));
        assert_eq!(resource.dependencies(), 2);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_refetch_never_outlives_newer_dependencies() {
        for _ in 0..20 {
            let resource = AsyncResource::new(0_u32, |page: u32| async move {
                tokio::task::yield_now().await;
                Ok::<_, ApiError>(Envelope::new(page.to_string(), 200))
            });

            let tasks: Vec<_> = (1..=64_u32)
                .map(|i| {
                    let resource = resource.clone();
                    tokio::spawn(async move {
                        if i % 2 == 0 {
                            resource.set_dependencies(i).await;
                        } else {
                            resource.refetch().await;
                        }
                    })
                })
                .collect();
            for task in tasks {
                task.await.unwrap();
            }

            let state = resource.state();
            assert!(!state.loading);
            assert_eq!(state.data, Some(resource.dependencies().to_string()));
        }
    }

    #[tokio::test]
    async fn teardown_ignores_in_flight_result() {
        let (resource, gates) = gated();
        let gate = open_gate(&gates);

        let task = tokio::spawn({
            let resource = resource.clone();
            async move { resource.refetch().await }
        });
        wait_for_invocations(&resource, 1).await;
        resource.teardown();
        let _ = gate.send(ok("late"));
        task.await.unwrap();

        let state = resource.state();
        assert_eq!(state.data, None);
        assert!(state.loading);

        resource.set_data("ignored".to_string());
        resource.refetch().await;
        assert_eq!(resource.state().data, None);
        assert_eq!(resource.invocation_count(), 1);
    }

    #[tokio::test]
    async fn subscribers_observe_settled_state() {
        let (resource, gates) = gated();
        let mut rx = resource.subscribe();
        open_gate(&gates).send(ok("seen")).unwrap();
        resource.start().await;

        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update().clone();
        assert_eq!(state.data.as_deref(), Some("seen"));
    }

    #[tokio::test]
    async fn polling_refetches_until_teardown() {
        let resource = AsyncResource::new((), |_| async {
            Ok::<_, ApiError>(Envelope::new("tick".to_string(), 200))
        });
        let handle = resource.poll(Duration::from_millis(5));

        tokio::time::timeout(Duration::from_secs(2), async {
            while resource.invocation_count() < 3 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("polling should refetch repeatedly");

        resource.teardown();
        handle.join().await;
        let after = resource.invocation_count();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(resource.invocation_count(), after);
        assert_eq!(resource.state().data.as_deref(), Some("tick"));
    }

    #[tokio::test]
    async fn dropping_poll_handle_stops_polling() {
        let resource = AsyncResource::new((), |_| async {
            Ok::<_, ApiError>(Envelope::new(0_u8.to_string(), 200))
        });
        let handle = resource.poll(Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_stopped());
        drop(handle);
        tokio::time::sleep(Duration::from_millis(10)).await;
        let after = resource.invocation_count();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(resource.invocation_count(), after);
        assert!(!resource.is_torn_down());
    }
}

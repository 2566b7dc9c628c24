//! QueueEndpoint - the façade clients obtain for a named queue
//!
//! An endpoint owns (or obtains from the [`QueueRegistry`]) its
//! [`BoundedQueue`], tracks the live sets of attached producers and
//! consumers, and owns the [`MulticastDispatcher`] when multiple consumers
//! are allowed. Lifecycle: `Created -> Started -> (Stopping while
//! consumers remain) -> Stopped / ShutDown`, where `ShutDown` is terminal
//! and idempotent.
//!
//! # Thread Safety
//!
//! Endpoints are shared as `Arc<QueueEndpoint>`. Producer and consumer
//! sets use copy-on-read snapshots so iteration never races with a
//! concurrent attach or detach; queue and dispatcher resolution are lazy
//! behind a mutex so exactly one physical instance is created under
//! concurrent first access.

use crate::core::sync::{lock_mutex, read_rwlock, write_rwlock};
use crate::queue::bounded::{BoundedQueue, DefaultQueueFactory, QueueFactory};
use crate::queue::config::EndpointConfig;
use crate::queue::consumer::{Consumer, Processor};
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::multicast::MulticastDispatcher;
use crate::queue::producer::Producer;
use crate::queue::registry::{QueueRegistry, QueueReference};
use crate::queue::task::Task;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// Endpoint lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    Created,
    Started,
    /// A stop or shutdown was requested while consumers were still
    /// attached; the caller retries after detaching them.
    Stopping,
    Stopped,
    /// Terminal. Re-entering shutdown is a no-op.
    ShutDown,
}

impl EndpointState {
    pub fn name(&self) -> &'static str {
        match self {
            EndpointState::Created => "Created",
            EndpointState::Started => "Started",
            EndpointState::Stopping => "Stopping",
            EndpointState::Stopped => "Stopped",
            EndpointState::ShutDown => "ShutDown",
        }
    }
}

/// Observable result of a stop or shutdown request. Deferral is an
/// outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The transition ran (or had already run).
    Completed,
    /// Consumers are still attached; retry after detaching them.
    Deferred,
}

/// One attached consumer as seen by the endpoint: its handle id plus the
/// processing callback the dispatcher fans out to.
#[derive(Clone)]
pub(crate) struct ConsumerEntry {
    pub id: u64,
    pub processor: Arc<dyn Processor>,
}

/// A named, shared, bounded work queue endpoint.
pub struct QueueEndpoint {
    name: String,
    config: RwLock<EndpointConfig>,
    registry: Option<Arc<QueueRegistry>>,
    factory: Arc<dyn QueueFactory>,
    /// Lazily resolved; `None` again after shutdown so a restart
    /// re-resolves it.
    queue: Mutex<Option<Arc<BoundedQueue>>>,
    producers: RwLock<HashSet<u64>>,
    consumers: RwLock<Vec<ConsumerEntry>>,
    dispatcher: Mutex<Option<Arc<MulticastDispatcher>>>,
    /// Set on every consumer attach/detach; the next dispatch rebuilds.
    dispatcher_stale: AtomicBool,
    state: RwLock<EndpointState>,
    next_handle_id: AtomicU64,
}

impl QueueEndpoint {
    /// Endpoint with a private queue built by the default factory.
    pub fn new(name: impl Into<String>, config: EndpointConfig) -> Arc<Self> {
        Self::build(name.into(), config, None, Arc::new(DefaultQueueFactory))
    }

    /// Endpoint whose queue is shared through `registry` under this
    /// endpoint's logical name.
    pub fn with_registry(
        name: impl Into<String>,
        config: EndpointConfig,
        registry: Arc<QueueRegistry>,
    ) -> Arc<Self> {
        Self::build(
            name.into(),
            config,
            Some(registry),
            Arc::new(DefaultQueueFactory),
        )
    }

    /// Endpoint with a custom queue factory, optionally registry-backed.
    pub fn with_factory(
        name: impl Into<String>,
        config: EndpointConfig,
        registry: Option<Arc<QueueRegistry>>,
        factory: Arc<dyn QueueFactory>,
    ) -> Arc<Self> {
        Self::build(name.into(), config, registry, factory)
    }

    fn build(
        name: String,
        config: EndpointConfig,
        registry: Option<Arc<QueueRegistry>>,
        factory: Arc<dyn QueueFactory>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            config: RwLock::new(config),
            registry,
            factory,
            queue: Mutex::new(None),
            producers: RwLock::new(HashSet::new()),
            consumers: RwLock::new(Vec::new()),
            dispatcher: Mutex::new(None),
            dispatcher_stale: AtomicBool::new(false),
            state: RwLock::new(EndpointState::Created),
            next_handle_id: AtomicU64::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Endpoint address under the sedaq scheme.
    pub fn address(&self) -> String {
        format!("sedaq://{}", self.name)
    }

    /// Registry key for this endpoint's shared queue.
    pub fn queue_key(&self) -> String {
        QueueRegistry::queue_key(&self.address())
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> QueueResult<EndpointConfig> {
        Ok(read_rwlock(self.config.read(), |message| {
            QueueError::OperationFailed { message }
        })?
        .clone())
    }

    pub fn state(&self) -> EndpointState {
        self.state
            .read()
            .map(|state| *state)
            .unwrap_or(EndpointState::ShutDown)
    }

    fn set_state(&self, next: EndpointState) -> QueueResult<()> {
        let mut state = write_rwlock(self.state.write(), |message| QueueError::OperationFailed {
            message,
        })?;
        *state = next;
        Ok(())
    }

    /// Resolve the queue, creating or fetching it on first call.
    ///
    /// Registry-backed endpoints prefer the shared queue under their key,
    /// so a re-created endpoint picks up the queue existing producers and
    /// consumers already use; the declared size recorded by the first
    /// registrant overrides this endpoint's own size. Private endpoints
    /// build via the configured factory. Idempotent and race-safe: the
    /// first call wins, later calls return the cached reference.
    pub fn get_queue(&self) -> QueueResult<Arc<BoundedQueue>> {
        let mut cached = lock_mutex(self.queue.lock(), |message| QueueError::OperationFailed {
            message,
        })?;
        if let Some(queue) = cached.as_ref() {
            return Ok(Arc::clone(queue));
        }

        let queue = match self.registry {
            Some(ref registry) => {
                let key = self.queue_key();
                let config = self.config()?;
                let reference = registry.get_or_create(
                    &key,
                    config.size,
                    config.multiple_consumers,
                    self.factory.as_ref(),
                )?;
                log::info!(
                    "Endpoint {} is using shared queue: {} with size: {:?}",
                    self.address(),
                    key,
                    reference.size
                );
                if reference.size.is_some() {
                    // resynchronize our view with the first registrant's
                    let mut config = write_rwlock(self.config.write(), |message| {
                        QueueError::OperationFailed { message }
                    })?;
                    config.size = reference.size;
                }
                reference.queue
            }
            None => {
                let config = self.config()?;
                log::info!(
                    "Endpoint {} is using private queue with size: {:?}",
                    self.address(),
                    config.size
                );
                Arc::new(self.factory.create(config.size))
            }
        };

        *cached = Some(Arc::clone(&queue));
        Ok(queue)
    }

    /// The registry entry backing this endpoint, if one exists.
    pub fn queue_reference(&self) -> Option<QueueReference> {
        self.registry
            .as_ref()
            .and_then(|registry| registry.lookup(&self.queue_key()))
    }

    /// Create and attach a producer handle.
    pub fn create_producer(self: &Arc<Self>) -> QueueResult<Producer> {
        let id = self.next_handle_id.fetch_add(1, Ordering::SeqCst);
        self.attach_producer(id)?;
        Ok(Producer::new(id, Arc::downgrade(self)))
    }

    /// Create a consumer running `processor` for each task.
    ///
    /// All consumers of a shared queue must agree on the
    /// multipleConsumers flag recorded when the shared queue was first
    /// created; a mismatch aborts construction.
    pub fn create_consumer(
        self: &Arc<Self>,
        processor: Arc<dyn Processor>,
    ) -> QueueResult<Consumer> {
        let config = self.config()?;
        if let Some(reference) = self.queue_reference() {
            if reference.multiple_consumers != config.multiple_consumers {
                return Err(QueueError::ConsumerConfigMismatch {
                    key: self.queue_key(),
                    existing: reference.multiple_consumers,
                    requested: config.multiple_consumers,
                });
            }
        }
        let id = self.next_handle_id.fetch_add(1, Ordering::SeqCst);
        Ok(Consumer::new(id, Arc::clone(self), processor))
    }

    pub(crate) fn attach_producer(&self, id: u64) -> QueueResult<()> {
        let mut producers = write_rwlock(self.producers.write(), |message| {
            QueueError::OperationFailed { message }
        })?;
        producers.insert(id);
        Ok(())
    }

    pub(crate) fn detach_producer(&self, id: u64) {
        if let Ok(mut producers) = self.producers.write() {
            producers.remove(&id);
        }
    }

    pub(crate) fn attach_consumer(&self, entry: ConsumerEntry) -> QueueResult<()> {
        {
            let mut consumers = write_rwlock(self.consumers.write(), |message| {
                QueueError::OperationFailed { message }
            })?;
            consumers.push(entry);
        }
        if self.is_multiple_consumers() {
            self.dispatcher_stale.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    pub(crate) fn detach_consumer(&self, id: u64) {
        let now_empty = {
            match self.consumers.write() {
                Ok(mut consumers) => {
                    consumers.retain(|entry| entry.id != id);
                    consumers.is_empty()
                }
                Err(_) => return,
            }
        };
        if self.is_multiple_consumers() {
            self.dispatcher_stale.store(true, Ordering::SeqCst);
            if now_empty {
                // no consumers left, tear the dispatcher down until one
                // reattaches
                if let Ok(mut dispatcher) = self.dispatcher.lock() {
                    if let Some(old) = dispatcher.take() {
                        old.stop();
                    }
                }
            }
        }
        // a pending stop/shutdown can proceed now that the last consumer
        // detached; the caller retries per the deferred-stop contract
    }

    /// Copy-on-read snapshot of attached consumers.
    pub(crate) fn consumers(&self) -> Vec<ConsumerEntry> {
        self.consumers
            .read()
            .map(|consumers| consumers.clone())
            .unwrap_or_default()
    }

    /// Ids of currently attached producers.
    pub fn producer_ids(&self) -> Vec<u64> {
        self.producers
            .read()
            .map(|producers| producers.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn has_consumers(&self) -> bool {
        self.consumer_count() > 0
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers
            .read()
            .map(|consumers| consumers.len())
            .unwrap_or(0)
    }

    pub fn producer_count(&self) -> usize {
        self.producers
            .read()
            .map(|producers| producers.len())
            .unwrap_or(0)
    }

    pub fn is_multiple_consumers(&self) -> bool {
        self.config
            .read()
            .map(|config| config.multiple_consumers)
            .unwrap_or(false)
    }

    /// Current dispatcher for multicast delivery, rebuilt lazily from a
    /// fresh consumer snapshot whenever the attached set changed. Returns
    /// `None` in single-consumer mode or when no consumer is attached.
    pub(crate) fn consumer_dispatcher(&self) -> QueueResult<Option<Arc<MulticastDispatcher>>> {
        if !self.is_multiple_consumers() {
            return Ok(None);
        }
        let mut dispatcher = lock_mutex(self.dispatcher.lock(), |message| {
            QueueError::OperationFailed { message }
        })?;
        let stale = self.dispatcher_stale.swap(false, Ordering::SeqCst);
        if stale || dispatcher.is_none() {
            // stop the stale dispatcher before replacing it
            if let Some(old) = dispatcher.take() {
                old.stop();
            }
            // snapshot after clearing the stale flag: an attach landing
            // now re-marks it and forces another rebuild
            let snapshot = self.consumers();
            if !snapshot.is_empty() {
                log::debug!(
                    "Rebuilding multicast dispatcher for endpoint {} with {} consumers",
                    self.address(),
                    snapshot.len()
                );
                *dispatcher = Some(Arc::new(MulticastDispatcher::new(
                    self.name.clone(),
                    snapshot
                        .into_iter()
                        .map(|entry| entry.processor)
                        .collect(),
                )));
            }
        }
        Ok(dispatcher.clone())
    }

    /// Enqueue a task with the endpoint's configured backpressure policy.
    pub(crate) async fn submit(&self, task: Task) -> QueueResult<()> {
        let config = self.config()?;
        if config.fail_if_no_consumers && !self.has_consumers() {
            return Err(QueueError::NoConsumers {
                name: self.name.clone(),
            });
        }
        let queue = self.get_queue()?;
        queue
            .offer(task, config.block_when_full, config.timeout())
            .await
    }

    /// Start the endpoint, forcing queue resolution.
    pub fn start(&self) -> QueueResult<()> {
        self.get_queue()?;
        self.set_state(EndpointState::Started)?;
        log::debug!("Endpoint {} started", self.address());
        Ok(())
    }

    /// Stop the endpoint.
    ///
    /// While any consumer is attached the stop is deferred: the endpoint
    /// stays up and the caller retries after detaching. Deferral is
    /// observable, not an error.
    pub fn stop(&self) -> QueueResult<StopOutcome> {
        if matches!(
            self.state(),
            EndpointState::Stopped | EndpointState::ShutDown
        ) {
            return Ok(StopOutcome::Completed);
        }
        if self.has_consumers() {
            log::debug!(
                "There are still active consumers on endpoint {}, stop deferred",
                self.address()
            );
            self.set_state(EndpointState::Stopping)?;
            return Ok(StopOutcome::Deferred);
        }
        let config = self.config()?;
        if config.purge_when_stopping {
            let purged = self.purge()?;
            log::debug!(
                "Purged {} tasks from endpoint {} while stopping",
                purged,
                self.address()
            );
        }
        self.set_state(EndpointState::Stopped)?;
        log::info!("Endpoint {} stopped", self.address());
        Ok(StopOutcome::Completed)
    }

    /// Shut the endpoint down.
    ///
    /// Idempotent: a second call on a shut-down endpoint is a no-op and
    /// never re-runs teardown. The owning registry is notified first so
    /// the shared entry is released; actual teardown is deferred while
    /// consumers remain attached, same policy as [`stop`](Self::stop).
    pub fn shutdown(&self) -> QueueResult<StopOutcome> {
        if self.state() == EndpointState::ShutDown {
            log::trace!("Endpoint {} already shut down", self.address());
            return Ok(StopOutcome::Completed);
        }

        // notify the registry we are shutting down this endpoint
        if let Some(ref registry) = self.registry {
            registry.on_shutdown_endpoint(self);
        }

        if self.has_consumers() {
            log::debug!(
                "There are still active consumers on endpoint {}, shutdown deferred",
                self.address()
            );
            self.set_state(EndpointState::Stopping)?;
            return Ok(StopOutcome::Deferred);
        }

        // tear down the multicast worker pool if it was in use
        {
            let mut dispatcher = lock_mutex(self.dispatcher.lock(), |message| {
                QueueError::OperationFailed { message }
            })?;
            if let Some(old) = dispatcher.take() {
                old.stop();
            }
        }

        // drop the queue reference so a restarted endpoint re-resolves it
        {
            let mut cached = lock_mutex(self.queue.lock(), |message| {
                QueueError::OperationFailed { message }
            })?;
            *cached = None;
        }

        self.set_state(EndpointState::ShutDown)?;
        log::info!("Endpoint {} shut down", self.address());
        Ok(StopOutcome::Completed)
    }

    // -- introspection -----------------------------------------------------

    /// Current number of queued tasks; 0 when the queue is unresolved.
    pub fn current_queue_size(&self) -> usize {
        self.resolved_queue().map(|queue| queue.size()).unwrap_or(0)
    }

    /// Purge the queue immediately, returning how many tasks were dropped.
    pub fn purge(&self) -> QueueResult<usize> {
        match self.resolved_queue() {
            Some(queue) => {
                let purged = queue.drain_all()?;
                log::debug!(
                    "Purged {} tasks from endpoint {}",
                    purged,
                    self.address()
                );
                Ok(purged)
            }
            None => Ok(0),
        }
    }

    /// Snapshot of the currently pending tasks, head first.
    pub fn pending_tasks(&self) -> QueueResult<Vec<Task>> {
        match self.resolved_queue() {
            Some(queue) => queue.pending(),
            None => Ok(Vec::new()),
        }
    }

    /// Browse one task by index as a JSON dump, payload included.
    pub fn browse_task(&self, index: usize) -> QueueResult<Option<String>> {
        let queue = match self.resolved_queue() {
            Some(queue) => queue,
            None => return Ok(None),
        };
        let mut snapshots = queue.peek_range(index, index + 1, true)?;
        match snapshots.pop() {
            Some(snapshot) => Ok(Some(serde_json::to_string(&snapshot).map_err(|e| {
                QueueError::OperationFailed {
                    message: format!("failed to render task dump: {e}"),
                }
            })?)),
            None => Ok(None),
        }
    }

    /// Payload of the task at `index`, if any.
    pub fn browse_payload(&self, index: usize) -> QueueResult<Option<String>> {
        let queue = match self.resolved_queue() {
            Some(queue) => queue,
            None => return Ok(None),
        };
        let mut snapshots = queue.peek_range(index, index + 1, true)?;
        Ok(snapshots.pop().and_then(|snapshot| snapshot.payload))
    }

    /// JSON dump of the tasks in `[from, to)`.
    pub fn browse_range_json(
        &self,
        from: usize,
        to: usize,
        include_payload: bool,
    ) -> QueueResult<String> {
        let snapshots = match self.resolved_queue() {
            Some(queue) => queue.peek_range(from, to, include_payload)?,
            None => Vec::new(),
        };
        serde_json::to_string(&snapshots).map_err(|e| QueueError::OperationFailed {
            message: format!("failed to render browse dump: {e}"),
        })
    }

    /// JSON dump of every pending task.
    pub fn browse_all_json(&self, include_payload: bool) -> QueueResult<String> {
        self.browse_range_json(0, usize::MAX, include_payload)
    }

    /// The cached queue, without forcing resolution.
    fn resolved_queue(&self) -> Option<Arc<BoundedQueue>> {
        self.queue.lock().ok().and_then(|cached| cached.clone())
    }
}

//! Consumer: poll loops driving the processing callback
//!
//! A consumer attaches to an endpoint on start and spawns
//! `concurrentConsumers` poll loops. Each loop polls with a bounded
//! timeout so the stop flag is honoured within one poll timeout rather
//! than blocking indefinitely. In multicast mode the polled task is handed
//! to the endpoint's dispatcher; otherwise this consumer's processor runs
//! it directly and resolves the task's reply slot.

use crate::queue::endpoint::{ConsumerEntry, QueueEndpoint};
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::task::Task;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Processing callback invoked once per delivered task.
///
/// The `Ok` value populates the task's reply slot for producers that
/// chose to wait.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, task: Task) -> QueueResult<Option<String>>;
}

/// Consumer handle. Created via [`QueueEndpoint::create_consumer`];
/// inert until [`start`](Consumer::start).
pub struct Consumer {
    id: u64,
    endpoint: Arc<QueueEndpoint>,
    processor: Arc<dyn Processor>,
    running: Arc<AtomicBool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Consumer {
    pub(crate) fn new(
        id: u64,
        endpoint: Arc<QueueEndpoint>,
        processor: Arc<dyn Processor>,
    ) -> Self {
        Self {
            id,
            endpoint,
            processor,
            running: Arc::new(AtomicBool::new(false)),
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Attach to the endpoint and spawn the poll loops. Idempotent.
    pub fn start(&self) -> QueueResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.endpoint.attach_consumer(ConsumerEntry {
            id: self.id,
            processor: Arc::clone(&self.processor),
        })?;
        let queue = self.endpoint.get_queue()?;
        let config = self.endpoint.config()?;
        let loops = config.concurrent_consumers.max(1);

        let mut handles = self.handles.lock().map_err(|_| QueueError::OperationFailed {
            message: "consumer handle list lock poisoned".to_string(),
        })?;
        for _ in 0..loops {
            let endpoint = Arc::clone(&self.endpoint);
            let queue = Arc::clone(&queue);
            let processor = Arc::clone(&self.processor);
            let running = Arc::clone(&self.running);
            let poll_timeout = config.poll_timeout();
            handles.push(tokio::spawn(async move {
                log::trace!("Poll loop started for endpoint {}", endpoint.address());
                while running.load(Ordering::SeqCst) {
                    match queue.poll(Some(poll_timeout)).await {
                        Ok(Some(task)) => deliver(&endpoint, &processor, task).await,
                        Ok(None) => continue, // timeout, re-check stop flag
                        Err(e) => {
                            log::error!(
                                "Poll failed on endpoint {}: {}",
                                endpoint.address(),
                                e
                            );
                            break;
                        }
                    }
                }
                log::trace!("Poll loop exited for endpoint {}", endpoint.address());
            }));
        }
        log::debug!(
            "Consumer {} started on endpoint {} with {} poll loops",
            self.id,
            self.endpoint.address(),
            loops
        );
        Ok(())
    }

    /// Stop the poll loops and detach from the endpoint. Completion is
    /// bounded by the endpoint's poll timeout. Idempotent.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let handles: Vec<JoinHandle<()>> = match self.handles.lock() {
            Ok(mut handles) => handles.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        for handle in handles {
            let _ = handle.await;
        }
        self.endpoint.detach_consumer(self.id);
        log::debug!(
            "Consumer {} stopped on endpoint {}",
            self.id,
            self.endpoint.address()
        );
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        // fallback detach for consumers dropped without an explicit stop;
        // loops see the cleared flag within one poll timeout
        if self.running.swap(false, Ordering::SeqCst) {
            self.endpoint.detach_consumer(self.id);
        }
    }
}

/// Route one polled task: through the multicast dispatcher when the
/// endpoint fans out, otherwise straight through this consumer's
/// processor.
async fn deliver(endpoint: &Arc<QueueEndpoint>, processor: &Arc<dyn Processor>, task: Task) {
    if endpoint.is_multiple_consumers() {
        match endpoint.consumer_dispatcher() {
            Ok(Some(dispatcher)) => dispatcher.dispatch(task).await,
            Ok(None) => {
                // consumer set emptied between poll and dispatch
                log::warn!(
                    "No dispatcher available on endpoint {}, task {} dropped",
                    endpoint.address(),
                    task.id
                );
                task.complete(None);
            }
            Err(e) => {
                log::error!(
                    "Dispatcher rebuild failed on endpoint {}: {}",
                    endpoint.address(),
                    e
                );
                task.complete(None);
            }
        }
        return;
    }

    let task_id = task.id;
    match processor.process(task.clone()).await {
        Ok(reply) => {
            task.complete(reply);
        }
        Err(e) => {
            log::warn!(
                "Processing task {} failed on endpoint {}: {}",
                task_id,
                endpoint.address(),
                e
            );
            // resolve the slot so a waiting producer never hangs
            task.complete(None);
        }
    }
}

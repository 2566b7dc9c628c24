//! Multicast fan-out of one queued task to every attached consumer
//!
//! Built from a snapshot of the attached consumers' processors at rebuild
//! time; any attach or detach invalidates the current dispatcher and the
//! next pulled task rebuilds it. Branches run concurrently on dedicated
//! spawned worker tasks; a failure or panic in one branch never cancels
//! delivery to its siblings.

use crate::queue::consumer::Processor;
use crate::queue::task::Task;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct MulticastDispatcher {
    endpoint_name: String,
    processors: Vec<Arc<dyn Processor>>,
    stopped: AtomicBool,
}

impl MulticastDispatcher {
    pub(crate) fn new(endpoint_name: String, processors: Vec<Arc<dyn Processor>>) -> Self {
        Self {
            endpoint_name,
            processors,
            stopped: AtomicBool::new(false),
        }
    }

    /// Number of consumers in this dispatcher's snapshot.
    pub fn fan_out(&self) -> usize {
        self.processors.len()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Mark this dispatcher stale. In-flight fan-out rounds finish; no new
    /// round starts through a stopped dispatcher.
    pub(crate) fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Hand `task` to every processor in the snapshot concurrently and
    /// wait for all branches. Branch failures are isolated and logged;
    /// aggregation beyond that belongs to the host pipeline. The reply
    /// slot is resolved once the round completes (multicast replies are
    /// not aggregated).
    pub(crate) async fn dispatch(&self, task: Task) {
        if self.is_stopped() {
            log::trace!(
                "Dispatcher for endpoint {} is stopped, task {} dropped",
                self.endpoint_name,
                task.id
            );
            task.complete(None);
            return;
        }

        let handles: Vec<_> = self
            .processors
            .iter()
            .map(|processor| {
                let processor = Arc::clone(processor);
                let branch_task = task.clone();
                tokio::spawn(async move { processor.process(branch_task).await })
            })
            .collect();

        let results = futures::future::join_all(handles).await;
        for (branch, result) in results.into_iter().enumerate() {
            match result {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    log::warn!(
                        "Multicast branch {} failed for task {} on endpoint {}: {}",
                        branch,
                        task.id,
                        self.endpoint_name,
                        e
                    );
                }
                Err(join_error) => {
                    log::error!(
                        "Multicast branch {} panicked for task {} on endpoint {}: {}",
                        branch,
                        task.id,
                        self.endpoint_name,
                        join_error
                    );
                }
            }
        }

        task.complete(None);
    }
}

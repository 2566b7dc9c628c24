//! Producer handle for submitting tasks to an endpoint
//!
//! Producers are tracked by the endpoint for introspection only; they hold
//! no dispatch-relevant state. The handle keeps a weak endpoint reference
//! and detaches itself on drop.

use crate::queue::endpoint::QueueEndpoint;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::task::{Task, WaitForTaskToComplete};
use std::sync::{Arc, Weak};

pub struct Producer {
    id: u64,
    endpoint: Weak<QueueEndpoint>,
}

impl Producer {
    pub(crate) fn new(id: u64, endpoint: Weak<QueueEndpoint>) -> Self {
        Self { id, endpoint }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    fn endpoint(&self) -> QueueResult<Arc<QueueEndpoint>> {
        self.endpoint
            .upgrade()
            .ok_or_else(|| QueueError::OperationFailed {
                message: "endpoint no longer exists".to_string(),
            })
    }

    /// Fire-and-forget submit with the endpoint's backpressure policy.
    ///
    /// Fails with `QueueFull` (non-blocking mode), `QueueFullTimeout`
    /// (blocking mode, timeout elapsed) or `NoConsumers` (failIfNoConsumers
    /// with an empty consumer set).
    pub async fn send(&self, task: Task) -> QueueResult<()> {
        self.endpoint()?.submit(task).await
    }

    /// Submit, then wait for the task's reply according to the endpoint's
    /// waitForTaskToComplete policy.
    ///
    /// `Always` installs a reply slot when the task lacks one;
    /// `IfReplyExpected` waits only when the task already declares one;
    /// `Never` returns right after the enqueue. A reply that does not
    /// arrive within the configured timeout surfaces as `ReplyTimeout`;
    /// the task itself stays consumed.
    pub async fn send_and_wait(&self, mut task: Task) -> QueueResult<Option<String>> {
        let endpoint = self.endpoint()?;
        let config = endpoint.config()?;

        let wait = match config.wait_for_task_to_complete {
            WaitForTaskToComplete::Never => false,
            WaitForTaskToComplete::IfReplyExpected => task.expects_reply(),
            WaitForTaskToComplete::Always => {
                task.ensure_reply_slot();
                true
            }
        };

        // keep a handle sharing the reply slot; the queued clone moves on
        let pending = task.clone();
        endpoint.submit(task).await?;

        if !wait {
            return Ok(None);
        }
        pending.wait_reply(config.timeout()).await
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        if let Some(endpoint) = self.endpoint.upgrade() {
            endpoint.detach_producer(self.id);
        }
    }
}

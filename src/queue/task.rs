//! Task model for the queue system
//!
//! A task is an opaque unit of work: a payload plus an optional reply slot
//! a producer can wait on. Tasks are cheap to clone; clones share the reply
//! slot, so a multicast fan-out of one task still resolves a single
//! producer-side wait.

use crate::core::sync::lock_mutex;
use crate::queue::error::{QueueError, QueueResult};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Notify;

/// Process-wide correlation id source. Starts from 1 so 0 reads as "unset"
/// in dumps.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Reply-wait policy for producers submitting tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WaitForTaskToComplete {
    /// Fire-and-forget, never wait for the reply slot.
    Never,
    /// Wait only when the task declares a reply slot.
    #[default]
    IfReplyExpected,
    /// Always wait; a reply slot is installed if the task lacks one.
    Always,
}

#[derive(Debug)]
enum ReplyState {
    Pending,
    Done(Option<String>),
}

/// Shared reply slot. Completed at most once; later completions are ignored.
#[derive(Debug)]
pub(crate) struct ReplySlot {
    state: Mutex<ReplyState>,
    ready: Notify,
}

impl ReplySlot {
    fn new() -> Self {
        Self {
            state: Mutex::new(ReplyState::Pending),
            ready: Notify::new(),
        }
    }

    /// First completion wins; returns whether this call populated the slot.
    fn complete(&self, reply: Option<String>) -> bool {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(_) => return false,
        };
        if matches!(*state, ReplyState::Done(_)) {
            return false;
        }
        *state = ReplyState::Done(reply);
        drop(state);
        self.ready.notify_waiters();
        true
    }

    async fn wait(&self, timeout: Duration) -> Option<Option<String>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // Register interest before checking state so a completion
            // between the check and the await is not missed.
            let notified = self.ready.notified();
            {
                let state = self.state.lock().ok()?;
                if let ReplyState::Done(ref reply) = *state {
                    return Some(reply.clone());
                }
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return None;
            }
        }
    }

    fn peek(&self) -> QueueResult<Option<Option<String>>> {
        let state = lock_mutex(self.state.lock(), |message| QueueError::OperationFailed {
            message,
        })?;
        Ok(match *state {
            ReplyState::Pending => None,
            ReplyState::Done(ref reply) => Some(reply.clone()),
        })
    }
}

/// An opaque unit of work submitted to a queue endpoint.
#[derive(Debug, Clone)]
pub struct Task {
    /// Correlation identity, unique within the process.
    pub id: u64,
    /// When the task was created.
    pub created_at: SystemTime,
    /// Application-specific payload.
    pub payload: String,
    reply: Option<Arc<ReplySlot>>,
}

impl Task {
    /// Create a fire-and-forget task with no reply slot.
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            id: NEXT_TASK_ID.fetch_add(1, Ordering::SeqCst),
            created_at: SystemTime::now(),
            payload: payload.into(),
            reply: None,
        }
    }

    /// Create a task carrying a reply slot a producer can wait on.
    pub fn with_reply(payload: impl Into<String>) -> Self {
        let mut task = Self::new(payload);
        task.reply = Some(Arc::new(ReplySlot::new()));
        task
    }

    /// Whether this task declares a reply slot.
    pub fn expects_reply(&self) -> bool {
        self.reply.is_some()
    }

    /// Install a reply slot if the task does not already carry one.
    /// Used by the `Always` wait policy.
    pub(crate) fn ensure_reply_slot(&mut self) {
        if self.reply.is_none() {
            self.reply = Some(Arc::new(ReplySlot::new()));
        }
    }

    /// Populate the reply slot, waking any waiting producer. A no-op for
    /// tasks without a slot or already-completed slots (first write wins).
    pub fn complete(&self, reply: Option<String>) -> bool {
        match self.reply {
            Some(ref slot) => slot.complete(reply),
            None => false,
        }
    }

    /// Wait until the reply slot is populated or `timeout` elapses.
    pub async fn wait_reply(&self, timeout: Duration) -> QueueResult<Option<String>> {
        let slot = self
            .reply
            .as_ref()
            .ok_or_else(|| QueueError::OperationFailed {
                message: format!("task {} has no reply slot to wait on", self.id),
            })?;
        match slot.wait(timeout).await {
            Some(reply) => Ok(reply),
            None => Err(QueueError::ReplyTimeout {
                task_id: self.id,
                waited_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Non-blocking look at the reply slot: `None` while pending.
    pub fn reply_if_done(&self) -> QueueResult<Option<Option<String>>> {
        match self.reply {
            Some(ref slot) => slot.peek(),
            None => Ok(None),
        }
    }

    /// Read-only view for browse dumps.
    pub fn snapshot(&self, include_payload: bool) -> TaskSnapshot {
        TaskSnapshot {
            id: self.id,
            created_at_ms: self
                .created_at
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
            expects_reply: self.expects_reply(),
            payload: include_payload.then(|| self.payload.clone()),
        }
    }
}

/// Serializable read-only view of a queued task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: u64,
    pub created_at_ms: u64,
    pub expects_reply: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

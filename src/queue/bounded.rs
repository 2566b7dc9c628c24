//! Bounded FIFO queue, the single synchronisation point between producers
//! and consumers
//!
//! Strict FIFO, capacity-limited, with async backpressure: a full queue
//! either rejects immediately or suspends the offering task until space
//! opens or a timeout elapses. Polling is bounded by a poll timeout so
//! consumer loops can re-check their stop flag instead of parking forever.

use crate::core::sync::lock_mutex;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::task::{Task, TaskSnapshot};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

/// Factory for the physical queue behind an endpoint.
///
/// Registry-backed endpoints hand this to the registry so the first
/// registrant controls how the shared queue is built.
pub trait QueueFactory: Send + Sync {
    fn create(&self, capacity: Option<usize>) -> BoundedQueue;
}

/// Default factory: plain [`BoundedQueue`] with the requested capacity.
#[derive(Debug, Default)]
pub struct DefaultQueueFactory;

impl QueueFactory for DefaultQueueFactory {
    fn create(&self, capacity: Option<usize>) -> BoundedQueue {
        BoundedQueue::new(capacity)
    }
}

/// Capacity-bounded FIFO holding area for tasks.
#[derive(Debug)]
pub struct BoundedQueue {
    tasks: Mutex<VecDeque<Task>>,
    /// `usize::MAX` is the unbounded sentinel.
    capacity: usize,
    task_available: Notify,
    space_available: Notify,
}

impl BoundedQueue {
    /// Create an empty queue. `None` or `Some(0)` means effectively
    /// unbounded (limited only by memory).
    pub fn new(capacity: Option<usize>) -> Self {
        let capacity = match capacity {
            Some(n) if n > 0 => n,
            _ => usize::MAX,
        };
        Self {
            tasks: Mutex::new(VecDeque::new()),
            capacity,
            task_available: Notify::new(),
            space_available: Notify::new(),
        }
    }

    /// Declared capacity, `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        (self.capacity != usize::MAX).then_some(self.capacity)
    }

    /// Current number of queued tasks.
    pub fn size(&self) -> usize {
        self.tasks.lock().map(|tasks| tasks.len()).unwrap_or(0)
    }

    /// Enqueue a task.
    ///
    /// On a full queue: rejects with [`QueueError::QueueFull`] when
    /// `block_when_full` is false, otherwise suspends until space opens or
    /// `timeout` elapses ([`QueueError::QueueFullTimeout`]).
    pub async fn offer(
        &self,
        task: Task,
        block_when_full: bool,
        timeout: Duration,
    ) -> QueueResult<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut task = Some(task);
        loop {
            // Register for space notifications before inspecting the queue
            // so a poll between the unlock and the await is not missed.
            let space = self.space_available.notified();
            {
                let mut tasks = lock_mutex(self.tasks.lock(), |message| {
                    QueueError::OperationFailed { message }
                })?;
                if tasks.len() < self.capacity {
                    tasks.push_back(task.take().ok_or_else(|| QueueError::OperationFailed {
                        message: "offer retried after the task was enqueued".to_string(),
                    })?);
                    drop(tasks);
                    self.task_available.notify_one();
                    return Ok(());
                }
                if !block_when_full {
                    return Err(QueueError::QueueFull {
                        capacity: self.capacity,
                    });
                }
            }
            if tokio::time::timeout_at(deadline, space).await.is_err() {
                return Err(QueueError::QueueFullTimeout {
                    capacity: self.capacity,
                    waited_ms: timeout.as_millis() as u64,
                });
            }
        }
    }

    /// Remove and return the head task.
    ///
    /// Returns `Ok(None)` when `timeout` elapses with nothing available.
    /// A `None` timeout waits until a task arrives.
    pub async fn poll(&self, timeout: Option<Duration>) -> QueueResult<Option<Task>> {
        let deadline = timeout.map(|t| tokio::time::Instant::now() + t);
        loop {
            let available = self.task_available.notified();
            {
                let mut tasks = lock_mutex(self.tasks.lock(), |message| {
                    QueueError::OperationFailed { message }
                })?;
                if let Some(task) = tasks.pop_front() {
                    drop(tasks);
                    self.space_available.notify_one();
                    return Ok(Some(task));
                }
            }
            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, available).await.is_err() {
                        return Ok(None);
                    }
                }
                None => available.await,
            }
        }
    }

    /// Purge every queued task, returning how many were dropped.
    pub fn drain_all(&self) -> QueueResult<usize> {
        let drained = {
            let mut tasks = lock_mutex(self.tasks.lock(), |message| QueueError::OperationFailed {
                message,
            })?;
            let drained = tasks.len();
            tasks.clear();
            drained
        };
        // Every blocked offer can make progress now.
        self.space_available.notify_waiters();
        Ok(drained)
    }

    /// Read-only snapshot of the queued tasks, head first.
    pub fn pending(&self) -> QueueResult<Vec<Task>> {
        let tasks = lock_mutex(self.tasks.lock(), |message| QueueError::OperationFailed {
            message,
        })?;
        Ok(tasks.iter().cloned().collect())
    }

    /// Read-only browse of the index range `[from, to)`; does not remove.
    /// Indices past the tail are clamped.
    pub fn peek_range(
        &self,
        from: usize,
        to: usize,
        include_payload: bool,
    ) -> QueueResult<Vec<TaskSnapshot>> {
        let tasks = lock_mutex(self.tasks.lock(), |message| QueueError::OperationFailed {
            message,
        })?;
        let to = to.min(tasks.len());
        if from >= to {
            return Ok(Vec::new());
        }
        Ok(tasks
            .iter()
            .skip(from)
            .take(to - from)
            .map(|task| task.snapshot(include_payload))
            .collect())
    }
}

//! Endpoint configuration surface
//!
//! Recognized options and their defaults. Hosts typically deserialize this
//! from their own configuration format; URI parsing is a host concern.

use crate::queue::task::WaitForTaskToComplete;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options recognised by a queue endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EndpointConfig {
    /// Queue capacity; `None` means unbounded.
    pub size: Option<usize>,
    /// Poll loops spawned per consumer.
    pub concurrent_consumers: usize,
    /// Fan each task out to every attached consumer instead of exactly one.
    pub multiple_consumers: bool,
    /// When producers wait for a task's reply slot.
    pub wait_for_task_to_complete: WaitForTaskToComplete,
    /// Reply wait and blocking-offer timeout, in milliseconds.
    pub timeout_ms: u64,
    /// Block the producer on a full queue instead of rejecting.
    pub block_when_full: bool,
    /// Upper bound on a single consumer poll, in milliseconds. Stop
    /// requests are honoured within one poll timeout.
    pub poll_timeout_ms: u64,
    /// Drain the queue when the endpoint stops.
    pub purge_when_stopping: bool,
    /// Reject sends while no consumer is attached.
    pub fail_if_no_consumers: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            size: None,
            concurrent_consumers: 1,
            multiple_consumers: false,
            wait_for_task_to_complete: WaitForTaskToComplete::IfReplyExpected,
            timeout_ms: 30_000,
            block_when_full: false,
            poll_timeout_ms: 1_000,
            purge_when_stopping: false,
            fail_if_no_consumers: false,
        }
    }
}

impl EndpointConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

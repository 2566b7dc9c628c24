//! Process-wide registry of shared queues
//!
//! Maps a logical queue name to one physical [`BoundedQueue`] so
//! independently created endpoints referring to the same name share it.
//! The registry is an injectable service passed to endpoints, never
//! ambient global state. A single mutex guards the whole table; this path
//! is only exercised at endpoint construction and teardown, not on the
//! task hot path.

use crate::core::sync::lock_mutex;
use crate::queue::bounded::{BoundedQueue, QueueFactory};
use crate::queue::endpoint::QueueEndpoint;
use crate::queue::error::{QueueError, QueueResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Entry describing one shared queue.
#[derive(Clone)]
pub struct QueueReference {
    pub queue: Arc<BoundedQueue>,
    /// Capacity declared by the first registrant; `None` means "use
    /// whatever the queue already has".
    pub size: Option<usize>,
    /// multipleConsumers flag recorded at first creation. Conflicts are
    /// enforced at consumer-creation time on the endpoint, not here.
    pub multiple_consumers: bool,
}

/// Shared table of logical queue name to physical queue.
#[derive(Default)]
pub struct QueueRegistry {
    entries: Mutex<HashMap<String, QueueReference>>,
}

impl QueueRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Derive the registry key from an endpoint address: the scheme and
    /// any query suffix are stripped, surrounding slashes trimmed.
    /// `sedaq://orders?size=10` and `orders` map to the same key.
    pub fn queue_key(address: &str) -> String {
        let address = address.split('?').next().unwrap_or(address);
        let address = address.strip_prefix("sedaq:").unwrap_or(address);
        address.trim_matches('/').to_string()
    }

    /// Return the existing entry for `key`, or create one via `factory`.
    ///
    /// The first registrant's physical queue and flags win; later callers
    /// get the existing entry regardless of the capacity or flag they
    /// request, and can resynchronize their own view from the returned
    /// declared size.
    pub fn get_or_create(
        &self,
        key: &str,
        size: Option<usize>,
        multiple_consumers: bool,
        factory: &dyn QueueFactory,
    ) -> QueueResult<QueueReference> {
        let mut entries = lock_mutex(self.entries.lock(), |message| QueueError::OperationFailed {
            message,
        })?;
        if let Some(existing) = entries.get(key) {
            log::debug!("Reusing shared queue {} (size: {:?})", key, existing.size);
            return Ok(existing.clone());
        }
        let reference = QueueReference {
            queue: Arc::new(factory.create(size)),
            size,
            multiple_consumers,
        };
        log::info!(
            "Created shared queue {} with size {:?}, multipleConsumers {}",
            key,
            size,
            multiple_consumers
        );
        entries.insert(key.to_string(), reference.clone());
        Ok(reference)
    }

    /// Non-mutating lookup.
    pub fn lookup(&self, key: &str) -> Option<QueueReference> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    /// Drop the entry for `key`. Idempotent; a later `get_or_create`
    /// builds a fresh physical queue.
    pub fn release(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            if entries.remove(key).is_some() {
                log::debug!("Released shared queue {}", key);
            }
        }
    }

    /// Shutdown notification hook: the endpoint being shut down releases
    /// its shared entry so a re-created endpoint starts fresh.
    pub fn on_shutdown_endpoint(&self, endpoint: &QueueEndpoint) {
        self.release(&endpoint.queue_key());
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! Public API for the queue system
//!
//! External modules should import from here rather than directly from the
//! internal modules. See the module documentation on [`crate::queue`] for
//! usage examples and architecture details.

// Endpoint, lifecycle and registry
pub use crate::queue::endpoint::{EndpointState, QueueEndpoint, StopOutcome};
pub use crate::queue::registry::{QueueRegistry, QueueReference};

// Handles and the processing callback
pub use crate::queue::consumer::{Consumer, Processor};
pub use crate::queue::producer::Producer;

// Queue primitive and configuration
pub use crate::queue::bounded::{BoundedQueue, DefaultQueueFactory, QueueFactory};
pub use crate::queue::config::EndpointConfig;

// Task model
pub use crate::queue::task::{Task, TaskSnapshot, WaitForTaskToComplete};

// Error handling
pub use crate::queue::error::{QueueError, QueueResult};

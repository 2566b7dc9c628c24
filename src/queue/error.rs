//! Queue Error Types

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue is full (capacity: {capacity})")]
    QueueFull { capacity: usize },

    #[error("Queue is full (capacity: {capacity}), gave up blocking after {waited_ms}ms")]
    QueueFullTimeout { capacity: usize, waited_ms: u64 },

    #[error("No reply for task {task_id} within {waited_ms}ms")]
    ReplyTimeout { task_id: u64, waited_ms: u64 },

    #[error(
        "Cannot use existing queue {key}: the existing queue multipleConsumers \
         {existing} does not match given multipleConsumers {requested}"
    )]
    ConsumerConfigMismatch {
        key: String,
        existing: bool,
        requested: bool,
    },

    #[error("No consumers available on endpoint {name}")]
    NoConsumers { name: String },

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

//! Staged Queue Endpoint Component
//!
//! A named, shared, bounded work queue that decouples producers submitting
//! units of work from one or more consumers processing them, with
//! configurable fan-out, backpressure and coordinated shutdown.
//!
//! # Overview
//!
//! - **Shared by name**: endpoints created with the same logical name
//!   against the same [`QueueRegistry`] share one physical queue
//! - **Backpressure**: a full queue rejects immediately or blocks the
//!   producer up to a timeout
//! - **Fan-out**: with `multipleConsumers` enabled every attached consumer
//!   receives each task; otherwise exactly one consumer does
//! - **Bounded shutdown**: consumer poll loops re-check their stop flag
//!   every poll timeout, and endpoint stop/shutdown defers while consumers
//!   remain attached
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐              ┌───────────────────────────────┐
//! │ Producer │── offer ───▶ │ QueueEndpoint                 │
//! └──────────┘              │   └─ BoundedQueue (FIFO)      │
//! ┌──────────┐              │        shared via             │
//! │ Producer │── offer ───▶ │        QueueRegistry by name  │
//! └──────────┘              └──────────────┬────────────────┘
//!                                     poll │
//!                       ┌─────────────────┴──────────────────┐
//!                       │ single-consumer: one Consumer      │
//!                       │ multicast: MulticastDispatcher     │
//!                       │   fans out to every Consumer       │
//!                       └────────────────────────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use sedaq::queue::api::{
//!     EndpointConfig, Processor, QueueEndpoint, QueueRegistry, QueueResult, Task,
//! };
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Processor for Echo {
//!     async fn process(&self, task: Task) -> QueueResult<Option<String>> {
//!         Ok(Some(task.payload.clone()))
//!     }
//! }
//!
//! # async fn example() -> QueueResult<()> {
//! let registry = QueueRegistry::new();
//! let endpoint = QueueEndpoint::with_registry("orders", EndpointConfig::default(), registry);
//! endpoint.start()?;
//!
//! let consumer = endpoint.create_consumer(Arc::new(Echo))?;
//! consumer.start()?;
//!
//! let producer = endpoint.create_producer()?;
//! let reply = producer.send_and_wait(Task::with_reply("ping")).await?;
//! assert_eq!(reply.as_deref(), Some("ping"));
//!
//! consumer.stop().await;
//! endpoint.shutdown()?;
//! # Ok(())
//! # }
//! ```

pub mod api;
mod bounded;
mod config;
mod consumer;
mod endpoint;
mod error;
mod multicast;
mod producer;
mod registry;
mod task;

pub use bounded::{BoundedQueue, DefaultQueueFactory, QueueFactory};
pub use config::EndpointConfig;
pub use consumer::{Consumer, Processor};
pub use endpoint::{EndpointState, QueueEndpoint, StopOutcome};
pub use error::{QueueError, QueueResult};
pub use multicast::MulticastDispatcher;
pub use producer::Producer;
pub use registry::{QueueRegistry, QueueReference};
pub use task::{Task, TaskSnapshot, WaitForTaskToComplete};

#[cfg(test)]
mod tests;

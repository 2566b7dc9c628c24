//! sedaq - in-process staged queue endpoints
//!
//! Named, shared, bounded work queues that decouple producers from one or
//! more consumers, with configurable fan-out, backpressure and coordinated
//! shutdown. See the [`queue`] module for the full API.

pub mod core;
pub mod queue;

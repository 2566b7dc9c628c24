//! Test modules for the queue system
//!
//! Tests are organized by functional area, mirroring the source modules:
//! queue primitive, registry sharing, endpoint behavior, handles,
//! multicast fan-out, lifecycle coordination and concurrency.

mod bounded;
mod edge_cases;

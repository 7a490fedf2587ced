//! Orchestrator service
//!
//! Wires the simulation together: validated configuration, sampled
//! instrument pools, seeded per-symbol books, a condvar-backed work queue
//! between one producer and a hardware-sized worker pool, and the optional
//! WebSocket broadcaster.

pub mod orchestrator;
pub mod queue;

pub use orchestrator::{Orchestrator, OrchestratorError, RunSummary};
pub use queue::OrderQueue;
pub use types::config::{Config, LogLevel};

//! Dependency-graph task scheduling.
//!
//! A [`TaskGraph`] holds serializable task payloads and their
//! dependencies; executors run the graph dependency-first, either
//! inline ([`SequentialExecutor`]) or with one worker process per task
//! ([`ProcessExecutor`]). Task failures are outcomes, not executor
//! errors: a failed task poisons its transitive dependents and leaves
//! independent branches running.

pub mod cache;
pub mod error;
pub mod executor;
pub mod graph;

pub use cache::TaskCache;
pub use error::{Result, TaskGraphError};
pub use executor::{
    ProcessExecutor, SequentialExecutor, TaskFn, TaskOutcome, TaskResult, run_worker,
};
pub use graph::{Task, TaskGraph};

//! Draining the job queue into the worker pool.
//!
//! - [`dispatcher`] - the long-lived loop: waits for jobs, tracks idle time
//!   and triggers the idle shutdown.
//! - [`coordinator`] - fans one job out over the pool and joins on it.
//! - [`processor`] - what a worker does with one line.

pub mod coordinator;
pub mod dispatcher;
pub mod processor;

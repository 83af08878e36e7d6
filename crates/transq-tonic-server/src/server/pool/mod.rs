//! Bounded pool of translation workers.
//!
//! - [`manager`] - [`manager::WorkerPool`], the shared work channel and
//!   coordinated shutdown.
//! - [`worker`] - the per-worker receive loop.
//! - [`request`] - messages exchanged between the dispatcher and workers.

pub mod manager;
pub mod request;
pub mod worker;

use std::sync::Arc;
use transq::{JobQueue, RateLimiter};

/// State every worker shares: where results go, the throttle in front of the
/// translation service, and the service itself.
pub struct WorkerContext<T> {
    pub queue: Arc<JobQueue>,
    pub limiter: RateLimiter,
    pub translator: T,
}

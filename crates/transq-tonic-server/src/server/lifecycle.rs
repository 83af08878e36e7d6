//! Process-wide run state of the daemon.
//!
//! [`DaemonLifecycle`] is a cloneable handle shared by the RPC gateway, the
//! dispatcher and the signal handler. It holds the `running` flag read by the
//! serving side and a cancellation token that everything long-lived waits on.
//! Shutdown happens at most once, whichever path triggers it first.

use core::{
    fmt,
    sync::atomic::{AtomicBool, Ordering},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use transq::JobQueue;

/// Why the daemon is stopping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownReason {
    /// No job arrived for the configured idle timeout.
    IdleTimeout,
    /// Ctrl+C or SIGTERM.
    Signal,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdleTimeout => f.write_str("idle timeout"),
            Self::Signal => f.write_str("signal"),
        }
    }
}

#[derive(Clone)]
pub struct DaemonLifecycle {
    inner: Arc<LifecycleInner>,
}

struct LifecycleInner {
    running: AtomicBool,
    stop: CancellationToken,
    queue: Arc<JobQueue>,
}

impl DaemonLifecycle {
    pub fn new(queue: Arc<JobQueue>) -> Self {
        Self {
            inner: Arc::new(LifecycleInner {
                running: AtomicBool::new(true),
                stop: CancellationToken::new(),
                queue,
            }),
        }
    }

    /// `true` until shutdown has been initiated.
    pub fn should_continue(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Stops the daemon: clears the running flag, closes the job queue to new
    /// submissions and wakes everything waiting in [`stopped`].
    ///
    /// Returns `true` for the call that actually performed the shutdown and
    /// `false` for every later call, which has no effect.
    ///
    /// [`stopped`]: Self::stopped
    pub fn initiate_shutdown(&self, reason: ShutdownReason) -> bool {
        if !self.inner.running.swap(false, Ordering::AcqRel) {
            return false;
        }

        #[cfg(feature = "tracing")]
        tracing::info!(%reason, "Translation daemon will stop");
        #[cfg(not(feature = "tracing"))]
        let _ = reason;

        self.inner.queue.close();
        self.inner.stop.cancel();
        true
    }

    /// Resolves once shutdown has been initiated.
    pub async fn stopped(&self) {
        self.inner.stop.cancelled().await;
    }
}

use crate::server::{
    dispatch::coordinator::dispatch_job,
    lifecycle::{DaemonLifecycle, ShutdownReason},
    pool::manager::WorkerPool,
    telemetry::record_batch_duration,
};
use core::time::Duration;
use std::sync::Arc;
use tokio::{
    sync::watch,
    time::{Instant, timeout},
};
use transq::{Error as QueueError, JobQueue, Stopwatch};

/// Where the dispatch loop currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatcherState {
    /// Queue empty; idle time is accumulating.
    Idle,
    /// A job is being fanned out and joined.
    Dispatching,
    /// The loop has exited and will not pick up more work.
    ShuttingDown,
}

/// The long-lived loop that drains the job queue.
///
/// Jobs are taken strictly in submission order and dispatched one at a time;
/// the next job is only dequeued after every line of the current one has
/// completed. The idle timer is reset when a job is picked up and again when
/// it finishes, and it is only checked while waiting for the next job, so an
/// idle shutdown never races in-flight work.
pub struct Dispatcher {
    queue: Arc<JobQueue>,
    pool: Arc<WorkerPool>,
    lifecycle: DaemonLifecycle,
    idle_timeout: Duration,
    state: watch::Sender<DispatcherState>,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<JobQueue>,
        pool: Arc<WorkerPool>,
        lifecycle: DaemonLifecycle,
        idle_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(DispatcherState::Idle);
        Self {
            queue,
            pool,
            lifecycle,
            idle_timeout,
            state,
        }
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<DispatcherState> {
        self.state.subscribe()
    }

    /// Publishes `next`; subscribers are only notified on an actual change.
    fn transition(&self, next: DispatcherState) {
        self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            #[cfg(feature = "tracing")]
            tracing::debug!("Dispatcher {:?} -> {:?}", *state, next);
            *state = next;
            true
        });
    }

    /// Runs until the idle timeout fires or the daemon is stopped elsewhere.
    ///
    /// On idle timeout this initiates the daemon shutdown itself. A batch in
    /// flight when the daemon is stopped externally is abandoned: workers
    /// skip the lines they have not started.
    ///
    /// # Errors
    ///
    /// Only on idle-timer misuse, which indicates a bug in this loop.
    pub async fn run(self) -> transq_tonic_core::Result<()> {
        let mut idle = Stopwatch::new();
        idle.start()?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Dispatcher started, idle timeout {} minutes",
            self.idle_timeout.as_secs() / 60
        );

        loop {
            let remaining = self.idle_timeout.saturating_sub(idle.elapsed());
            let next = tokio::select! {
                () = self.lifecycle.stopped() => break,
                next = timeout(remaining, self.queue.dequeue()) => next,
            };

            let job = match next {
                Ok(Ok(job)) => job,
                Ok(Err(QueueError::QueueClosed)) => break,
                Ok(Err(_e)) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Unexpected queue error: {_e}");
                    break;
                }
                Err(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::info!(
                        "Daemon idle for {:.1} minutes, timeout reached",
                        idle.elapsed_minutes()
                    );
                    self.lifecycle
                        .initiate_shutdown(ShutdownReason::IdleTimeout);
                    break;
                }
            };

            self.transition(DispatcherState::Dispatching);
            idle.restart();

            let started = Instant::now();
            let _lines = job.len();
            let _language = job.language();

            let fut = dispatch_job(job, &self.pool);
            #[cfg(feature = "tracing")]
            let fut = {
                use tracing::Instrument;
                fut.instrument(tracing::info_span!("batch", lines = _lines, lang = %_language))
            };

            tokio::select! {
                result = fut => match result {
                    Ok(_report) => {
                        record_batch_duration(started.elapsed().as_secs_f64() * 1000.0);
                        #[cfg(feature = "tracing")]
                        tracing::info!(
                            translated = _report.translated,
                            failed = _report.failed,
                            cancelled = _report.cancelled,
                            "Batch of {} lines into {_language} completed in {:?}",
                            _report.total(),
                            started.elapsed()
                        );
                    }
                    Err(_e) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("Batch dispatch failed: {_e}");
                    }
                },
                () = self.lifecycle.stopped() => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Shutdown requested with a batch in flight");
                    break;
                }
            }

            idle.restart();
            // Straight on to the next job while the backlog lasts.
            if self.queue.is_empty() {
                self.transition(DispatcherState::Idle);
            }
        }

        self.transition(DispatcherState::ShuttingDown);
        let _idle_for = idle.stop()?;
        #[cfg(feature = "tracing")]
        tracing::debug!("Dispatcher stopped after {:?} without new work", _idle_for);

        Ok(())
    }
}

//! Asynchronous worker pool for per-line translation calls.
//!
//! [`WorkerPool`] owns a fixed set of worker tasks that all consume from one
//! bounded work channel. Whichever worker is free takes the next line, so
//! the number of translation calls in flight never exceeds the number of
//! workers and a slow call only ever occupies its own worker. Shutdown is
//! coordinated through a shared [`CancellationToken`] plus one
//! acknowledgement per worker.

use crate::server::pool::{WorkerContext, request::WorkRequest, worker::worker_loop};
use core::time::Duration;
use std::sync::Arc;
use tokio::{
    sync::{Mutex, mpsc, oneshot},
    time::timeout,
};
use tokio_util::sync::CancellationToken;
use transq::Translator;
use transq_tonic_core::Error;

pub struct WorkerPool {
    work_tx: mpsc::Sender<WorkRequest>,
    num_workers: usize,
    shutdown_token: CancellationToken,
    shutdown_timeout: Duration,
}

impl WorkerPool {
    /// Spawns `num_workers` worker tasks sharing `ctx` and one work channel.
    ///
    /// The channel has room for a single staged [`WorkRequest`]: a large job
    /// cannot flood the pool, and a line is only taken once a worker is free.
    pub fn spawn<T: Translator>(
        num_workers: usize,
        ctx: Arc<WorkerContext<T>>,
        shutdown_timeout: Duration,
    ) -> Self {
        let shutdown_token = CancellationToken::new();
        let (work_tx, work_rx) = mpsc::channel(1);
        let work_rx = Arc::new(Mutex::new(work_rx));

        for worker_id in 0..num_workers {
            tokio::spawn(worker_loop(
                worker_id,
                Arc::clone(&work_rx),
                Arc::clone(&ctx),
                shutdown_token.clone(),
            ));
        }

        Self {
            work_tx,
            num_workers,
            shutdown_token,
            shutdown_timeout,
        }
    }

    pub const fn size(&self) -> usize {
        self.num_workers
    }

    /// Hands a [`WorkRequest`] to the first free worker, waiting while every
    /// worker is busy and the staged slot is taken.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The pool is shutting down (`shutdown_token` was cancelled).
    /// - Every worker has exited and the work channel is closed.
    pub async fn dispatch(&self, request: WorkRequest) -> Result<(), Error> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::ServiceShutdown);
        }

        self.work_tx
            .send(request)
            .await
            .map_err(|_| Error::ChannelError {
                context: "work channel closed".to_string(),
            })
    }

    /// Shuts down all workers in the pool.
    ///
    /// - Cancels the shared [`CancellationToken`]: no new work is accepted
    ///   and lines still staged in the channel are skipped.
    /// - Sends one [`WorkRequest::Shutdown`] per worker. Each worker leaves
    ///   its loop after taking one, so every idle worker takes exactly one.
    /// - Waits up to `shutdown_timeout` for each acknowledgement.
    ///
    /// A translation call already in progress is not interrupted; a worker
    /// stuck in one past the timeout is left behind when the runtime exits.
    /// Calling this more than once is harmless.
    pub async fn shutdown(&self) -> Result<(), Error> {
        if self.shutdown_token.is_cancelled() {
            return Ok(());
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Cancelling pending work via shutdown token");
        self.shutdown_token.cancel();

        #[cfg(feature = "tracing")]
        tracing::debug!("Notifying {} workers to shut down", self.num_workers);

        let acks = (0..self.num_workers).map(|_i| async move {
            let (tx, rx) = oneshot::channel();
            let ack = async {
                self.work_tx
                    .send(WorkRequest::Shutdown { response: tx })
                    .await
                    .map_err(|e| e.to_string())?;
                rx.await.map_err(|e| e.to_string())
            };

            match timeout(self.shutdown_timeout, ack).await {
                Ok(Ok(())) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("Shutdown {_i} acknowledged");
                }
                Ok(Err(_e)) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Shutdown {_i} failed: {_e}");
                }
                Err(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Shutdown {_i} not acknowledged in time");
                }
            }
        });

        futures::future::join_all(acks).await;

        #[cfg(feature = "tracing")]
        tracing::info!("Worker pool shutdown complete");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::pool::request::LineOutcome;
    use core::num::NonZeroU32;
    use tokio::time::{Instant, sleep};
    use transq::{
        EchoTranslator, JobQueue, Language, RateLimiter, TranslateError, WorkItem,
    };

    /// Takes ten seconds for "slow" and no time for anything else.
    struct OneSlowLine;

    impl Translator for OneSlowLine {
        async fn translate(
            &self,
            text: &str,
            _target: Language,
        ) -> core::result::Result<String, TranslateError> {
            if text == "slow" {
                sleep(Duration::from_secs(10)).await;
            }
            Ok(text.to_string())
        }
    }

    fn pool(num_workers: usize) -> (WorkerPool, Arc<JobQueue>) {
        let queue = Arc::new(JobQueue::new());
        let ctx = Arc::new(WorkerContext {
            queue: Arc::clone(&queue),
            limiter: RateLimiter::new(NonZeroU32::new(1000).unwrap()),
            translator: EchoTranslator,
        });
        (
            WorkerPool::spawn(num_workers, ctx, Duration::from_secs(1)),
            queue,
        )
    }

    fn translate(text: &str, done: &mpsc::Sender<LineOutcome>) -> WorkRequest {
        WorkRequest::Translate {
            item: WorkItem {
                text: text.into(),
                language: Language::En,
            },
            done: done.clone(),
        }
    }

    #[tokio::test]
    async fn workers_record_results_and_report_outcomes() {
        let (pool, queue) = pool(2);
        let (done_tx, mut done_rx) = mpsc::channel(4);

        for text in ["a", "b", "c", "d"] {
            pool.dispatch(translate(text, &done_tx))
                .await
                .unwrap();
        }
        drop(done_tx);

        let mut outcomes = Vec::new();
        while let Some(outcome) = done_rx.recv().await {
            outcomes.push(outcome);
        }
        assert_eq!(outcomes, vec![LineOutcome::Translated; 4]);

        let mut results = queue.drain_results();
        results.sort();
        assert_eq!(results, ["a", "b", "c", "d"]);
    }

    #[tokio::test(start_paused = true)]
    async fn free_worker_takes_lines_queued_after_a_slow_one() {
        let queue = Arc::new(JobQueue::new());
        let ctx = Arc::new(WorkerContext {
            queue: Arc::clone(&queue),
            limiter: RateLimiter::new(NonZeroU32::new(1000).unwrap()),
            translator: OneSlowLine,
        });
        let pool = WorkerPool::spawn(2, ctx, Duration::from_secs(1));
        assert_eq!(pool.size(), 2);

        let start = Instant::now();
        let (done_tx, mut done_rx) = mpsc::channel(5);
        for text in ["slow", "a", "b", "c", "d"] {
            pool.dispatch(translate(text, &done_tx)).await.unwrap();
        }
        drop(done_tx);

        for _ in 0..4 {
            assert_eq!(done_rx.recv().await, Some(LineOutcome::Translated));
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        let mut fast = queue.drain_results();
        fast.sort();
        assert_eq!(fast, ["a", "b", "c", "d"]);

        assert_eq!(done_rx.recv().await, Some(LineOutcome::Translated));
        assert_eq!(start.elapsed(), Duration::from_secs(10));
        assert_eq!(queue.drain_results(), ["slow"]);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_is_acknowledged_by_every_worker() {
        let (pool, _queue) = pool(4);
        let start = Instant::now();
        pool.shutdown().await.unwrap();
        // Any missing acknowledgement would have waited out the timeout.
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn refuses_work_after_shutdown() {
        let (pool, _queue) = pool(2);
        pool.shutdown().await.unwrap();
        pool.shutdown().await.unwrap();

        let (done_tx, _done_rx) = mpsc::channel(1);
        let err = pool
            .dispatch(translate("late", &done_tx))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ServiceShutdown));
    }
}

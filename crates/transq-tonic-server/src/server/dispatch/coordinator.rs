use crate::server::pool::{
    manager::WorkerPool,
    request::{LineOutcome, WorkRequest},
};
use tokio::sync::mpsc;
use transq::Job;

/// Per-job tally of line outcomes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub translated: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl BatchReport {
    fn record(&mut self, outcome: &LineOutcome) {
        match outcome {
            LineOutcome::Translated => self.translated += 1,
            LineOutcome::Failed(_) => self.failed += 1,
            LineOutcome::Cancelled => self.cancelled += 1,
        }
    }

    pub const fn total(&self) -> usize {
        self.translated + self.failed + self.cancelled
    }
}

/// Fans a job out over the worker pool and waits for every line to finish.
///
/// Each line becomes a [`WorkRequest::Translate`] carrying a clone of one
/// completion sender. Once every line has been handed out this function's own
/// sender is dropped, so the completion channel closes exactly when the last
/// worker reports back. That closing is the join barrier: this function does
/// not return while any line of the job is still in flight.
///
/// The completion channel is sized to the job so workers never wait on it.
///
/// # Errors
///
/// If the pool refuses a line (shutdown, closed worker channel) the
/// remaining lines are not dispatched. Lines already handed out are still
/// awaited, then the dispatch error is returned.
pub async fn dispatch_job(
    job: Job,
    pool: &WorkerPool,
) -> transq_tonic_core::Result<BatchReport> {
    let (done_tx, mut done_rx) = mpsc::channel(job.len());
    let mut dispatch_error = None;

    for item in job.into_work_items() {
        let request = WorkRequest::Translate {
            item,
            done: done_tx.clone(),
        };
        if let Err(e) = pool.dispatch(request).await {
            dispatch_error = Some(e);
            break;
        }
    }
    drop(done_tx);

    let mut report = BatchReport::default();
    while let Some(outcome) = done_rx.recv().await {
        report.record(&outcome);
    }

    dispatch_error.map_or(Ok(report), Err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::pool::WorkerContext;
    use core::{
        num::NonZeroU32,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };
    use std::sync::Arc;
    use transq::{JobQueue, Language, RateLimiter, TranslateError, Translator};
    use transq_tonic_core::Error;

    /// Tracks how many calls are running at once.
    #[derive(Default)]
    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Translator for Gauge {
        async fn translate(&self, text: &str, _target: Language) -> Result<String, TranslateError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            if text == "broken" {
                return Err(TranslateError::Transport {
                    reason: "connection reset".into(),
                });
            }
            Ok(text.to_uppercase())
        }
    }

    fn setup(num_workers: usize) -> (WorkerPool, Arc<WorkerContext<Gauge>>) {
        let ctx = Arc::new(WorkerContext {
            queue: Arc::new(JobQueue::new()),
            limiter: RateLimiter::new(NonZeroU32::new(10_000).unwrap()),
            translator: Gauge::default(),
        });
        let pool = WorkerPool::spawn(num_workers, Arc::clone(&ctx), Duration::from_secs(1));
        (pool, ctx)
    }

    fn job(lines: &[&str]) -> Job {
        Job::new(lines.iter().map(ToString::to_string).collect(), Language::En).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn joins_on_every_line_with_bounded_concurrency() {
        let (pool, ctx) = setup(3);
        let lines: Vec<String> = (0..20).map(|i| format!("line {i}")).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();

        let report = dispatch_job(job(&refs), &pool).await.unwrap();

        assert_eq!(report.translated, 20);
        assert_eq!(report.total(), 20);
        // Returned only after the join barrier: everything is recorded.
        assert_eq!(ctx.queue.pending_result_count(), 20);
        assert_eq!(ctx.translator.current.load(Ordering::SeqCst), 0);
        assert!(ctx.translator.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_line_does_not_abort_the_batch() {
        let (pool, ctx) = setup(2);

        let report = dispatch_job(job(&["hola", "broken", "amigo"]), &pool)
            .await
            .unwrap();

        assert_eq!(
            report,
            BatchReport {
                translated: 2,
                failed: 1,
                cancelled: 0
            }
        );
        let mut results = ctx.queue.drain_results();
        results.sort();
        assert_eq!(results, ["AMIGO", "HOLA"]);
    }

    #[tokio::test]
    async fn shut_down_pool_rejects_the_job() {
        let (pool, ctx) = setup(2);
        pool.shutdown().await.unwrap();

        let err = dispatch_job(job(&["hola"]), &pool).await.unwrap_err();
        assert!(matches!(err, Error::ServiceShutdown));
        assert_eq!(ctx.queue.pending_result_count(), 0);
    }
}

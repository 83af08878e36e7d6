use crate::server::{
    pool::{WorkerContext, request::LineOutcome},
    telemetry::{increment_lines_translated, increment_translation_failures, record_rate_limit_wait},
};
use tokio_util::sync::CancellationToken;
use transq::{Translator, WorkItem};

/// Translates a single line within a worker.
///
/// Waits for a rate-limiter slot, calls the translator and, on success,
/// appends the translation to the shared result buffer. A failed call is
/// logged and reported as [`LineOutcome::Failed`]; nothing is written for
/// that line and it is not retried.
///
/// If the pool is shutting down, the line is skipped, including while it is
/// still waiting for the rate limiter.
#[allow(clippy::used_underscore_binding)]
#[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(worker = _worker_id, lang = %item.language)))]
pub async fn handle_work_item<T: Translator>(
    _worker_id: usize,
    item: WorkItem,
    ctx: &WorkerContext<T>,
    cancelled: &CancellationToken,
) -> LineOutcome {
    let waited = tokio::select! {
        biased;
        () = cancelled.cancelled() => return LineOutcome::Cancelled,
        waited = ctx.limiter.admit() => waited,
    };
    if !waited.is_zero() {
        record_rate_limit_wait(waited.as_secs_f64() * 1000.0);
    }

    match ctx.translator.translate_item(&item).await {
        Ok(translated) => {
            ctx.queue.record_result(translated);
            increment_lines_translated(1);
            LineOutcome::Translated
        }
        Err(e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %e, "Translation failed, dropping line");
            increment_translation_failures();
            LineOutcome::Failed(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::num::NonZeroU32;
    use std::sync::Arc;
    use transq::{JobQueue, Language, RateLimiter, TranslateError};

    struct Failing;

    impl Translator for Failing {
        async fn translate(&self, _text: &str, _target: Language) -> Result<String, TranslateError> {
            Err(TranslateError::Timeout)
        }
    }

    fn ctx<T>(translator: T) -> WorkerContext<T> {
        WorkerContext {
            queue: Arc::new(JobQueue::new()),
            limiter: RateLimiter::new(NonZeroU32::new(1).unwrap()),
            translator,
        }
    }

    fn item(text: &str) -> WorkItem {
        WorkItem {
            text: text.into(),
            language: Language::It,
        }
    }

    #[tokio::test]
    async fn failed_call_writes_no_result() {
        let ctx = ctx(Failing);
        let outcome = handle_work_item(0, item("ciao"), &ctx, &CancellationToken::new()).await;

        assert_eq!(outcome, LineOutcome::Failed(TranslateError::Timeout));
        assert_eq!(ctx.queue.pending_result_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_rate_limit_wait() {
        let ctx = ctx(transq::EchoTranslator);
        let token = CancellationToken::new();

        assert_eq!(
            handle_work_item(0, item("uno"), &ctx, &token).await,
            LineOutcome::Translated
        );

        // The window is full; the next line would wait a second for a slot.
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(core::time::Duration::from_millis(100)).await;
            canceller.cancel();
        });
        let start = tokio::time::Instant::now();
        assert_eq!(
            handle_work_item(0, item("due"), &ctx, &token).await,
            LineOutcome::Cancelled
        );
        assert!(start.elapsed() < core::time::Duration::from_secs(1));
        assert_eq!(ctx.queue.drain_results(), ["uno"]);
    }
}

use crate::server::{
    dispatch::processor::handle_work_item,
    pool::{WorkerContext, request::WorkRequest},
};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use transq::Translator;

/// Worker task responsible for processing [`WorkRequest`] messages.
///
/// All workers of a pool share one receiver. A worker holds the receiver
/// lock only while waiting for the next request, so a worker busy with a
/// slow translation never keeps work from the others. Each line is handled
/// to completion: rate-limiter wait, translation call, result recorded and
/// outcome reported on the batch's completion channel. The worker runs until
/// it takes a [`WorkRequest::Shutdown`] or the channel closes.
///
/// # Arguments
///
/// - `worker_id`: Numeric identifier used in logs and spans.
/// - `rx`: Receiver shared by every worker of the pool.
/// - `ctx`: Queue, rate limiter and translator shared by the pool.
/// - `cancelled`: Pool-wide shutdown token; pending lines are skipped once it
///   fires.
pub async fn worker_loop<T: Translator>(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<WorkRequest>>>,
    ctx: Arc<WorkerContext<T>>,
    cancelled: CancellationToken,
) {
    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} started");

    loop {
        let Some(work) = rx.lock().await.recv().await else {
            break;
        };

        match work {
            WorkRequest::Translate { item, done } => {
                let outcome = handle_work_item(worker_id, item, &ctx, &cancelled).await;
                if let Err(_e) = done.send(outcome).await {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Worker {worker_id} finished a line for an abandoned batch");
                }
            }
            WorkRequest::Shutdown { response } => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Worker {worker_id} received shutdown signal");

                if response.send(()).is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Worker {worker_id} failed to acknowledge shutdown");
                }
                break;
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} stopped");
}

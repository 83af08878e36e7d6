//! gRPC front end over the shared job queue.
//!
//! [`TranslationQueueService`] implements the [`TranslationQueue`] service
//! from the protobuf schema. Every call is short: submissions are validated
//! and queued for the dispatcher, polls drain or count the shared result
//! buffer. No handler waits on translation work.

use crate::server::{
    lifecycle::DaemonLifecycle,
    telemetry::{
        increment_jobs_submitted, increment_results_polled, increment_submit_errors,
        record_lines_per_job,
    },
};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use transq::{Job, JobQueue};
use transq_tonic_core::{
    Error,
    proto::{
        PendingResultCountRequest, PendingResultCountResponse, PollResultsRequest,
        PollResultsResponse, SubmitRequest, SubmitResponse,
        translation_queue_server::TranslationQueue,
    },
};

#[derive(Clone)]
pub struct TranslationQueueService {
    queue: Arc<JobQueue>,
    lifecycle: DaemonLifecycle,
}

impl TranslationQueueService {
    pub const fn new(queue: Arc<JobQueue>, lifecycle: DaemonLifecycle) -> Self {
        Self { queue, lifecycle }
    }

    fn accept(&self, req: SubmitRequest) -> Result<usize, Error> {
        if !self.lifecycle.should_continue() {
            return Err(Error::ServiceShutdown);
        }
        let job = Job::try_from(req)?;
        let lines = job.len();
        self.queue.enqueue(job)?;
        Ok(lines)
    }
}

#[tonic::async_trait]
impl TranslationQueue for TranslationQueueService {
    /// Queues one job and returns immediately.
    ///
    /// Unsupported languages and empty jobs are rejected with
    /// `INVALID_ARGUMENT`; submissions after shutdown began get
    /// `UNAVAILABLE`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            skip_all,
            fields(lines = req.get_ref().lines.len(), lang = %req.get_ref().language)
        )
    )]
    async fn submit(
        &self,
        req: Request<SubmitRequest>,
    ) -> Result<Response<SubmitResponse>, Status> {
        match self.accept(req.into_inner()) {
            Ok(lines) => {
                increment_jobs_submitted();
                record_lines_per_job(lines as f64);
                #[cfg(feature = "tracing")]
                tracing::info!("Queued job of {lines} lines");
                Ok(Response::new(SubmitResponse {
                    queued_lines: lines as u64,
                }))
            }
            Err(e) => {
                increment_submit_errors();
                #[cfg(feature = "tracing")]
                tracing::warn!("Rejected submission: {e}");
                Err(e.into())
            }
        }
    }

    /// Returns every translated line accumulated so far and clears the buffer.
    async fn poll_results(
        &self,
        _req: Request<PollResultsRequest>,
    ) -> Result<Response<PollResultsResponse>, Status> {
        let lines = self.queue.drain_results();
        increment_results_polled(lines.len() as u64);
        #[cfg(feature = "tracing")]
        tracing::debug!("Drained {} results", lines.len());
        Ok(Response::new(lines.into()))
    }

    async fn pending_result_count(
        &self,
        _req: Request<PendingResultCountRequest>,
    ) -> Result<Response<PendingResultCountResponse>, Status> {
        Ok(Response::new(self.queue.pending_result_count().into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::lifecycle::ShutdownReason;
    use core::net::SocketAddr;
    use tokio::net::TcpListener;
    use tokio_stream::wrappers::TcpListenerStream;
    use tonic::{Code, transport::Channel};
    use transq_tonic_core::proto::{
        translation_queue_client::TranslationQueueClient,
        translation_queue_server::TranslationQueueServer,
    };

    struct Daemon {
        queue: Arc<JobQueue>,
        lifecycle: DaemonLifecycle,
        client: TranslationQueueClient<Channel>,
    }

    async fn serve() -> Daemon {
        let queue = Arc::new(JobQueue::new());
        let lifecycle = DaemonLifecycle::new(Arc::clone(&queue));
        let service = TranslationQueueService::new(Arc::clone(&queue), lifecycle.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(
            tonic::transport::Server::builder()
                .add_service(TranslationQueueServer::new(service))
                .serve_with_incoming(TcpListenerStream::new(listener)),
        );

        let client = TranslationQueueClient::connect(format!("http://{addr}"))
            .await
            .unwrap();
        Daemon {
            queue,
            lifecycle,
            client,
        }
    }

    fn submit_request(lines: &[&str], language: &str) -> SubmitRequest {
        SubmitRequest {
            lines: lines.iter().map(ToString::to_string).collect(),
            language: language.to_string(),
        }
    }

    #[tokio::test]
    async fn submit_queues_a_job() {
        let mut daemon = serve().await;

        let resp = daemon
            .client
            .submit(submit_request(&["hola", "mundo"], "de"))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(resp.queued_lines, 2);

        let job = daemon.queue.try_dequeue().unwrap();
        assert_eq!(job.lines(), ["hola", "mundo"]);
        assert_eq!(job.language(), transq::Language::De);
    }

    #[tokio::test]
    async fn submit_rejects_invalid_jobs() {
        let mut daemon = serve().await;

        let status = daemon
            .client
            .submit(submit_request(&["bonjour"], "fr"))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);

        let status = daemon
            .client
            .submit(submit_request(&[], "en"))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);

        assert!(daemon.queue.is_empty());
    }

    #[tokio::test]
    async fn poll_drains_and_count_tracks_results() {
        let mut daemon = serve().await;
        daemon.queue.record_result("hello".into());
        daemon.queue.record_result("world".into());

        let count = daemon
            .client
            .pending_result_count(PendingResultCountRequest {})
            .await
            .unwrap()
            .into_inner()
            .count;
        assert_eq!(count, 2);

        let lines = daemon
            .client
            .poll_results(PollResultsRequest {})
            .await
            .unwrap()
            .into_inner()
            .lines;
        assert_eq!(lines, ["hello", "world"]);

        let lines = daemon
            .client
            .poll_results(PollResultsRequest {})
            .await
            .unwrap()
            .into_inner()
            .lines;
        assert!(lines.is_empty());

        let count = daemon
            .client
            .pending_result_count(PendingResultCountRequest {})
            .await
            .unwrap()
            .into_inner()
            .count;
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn submissions_after_shutdown_are_unavailable() {
        let mut daemon = serve().await;
        daemon.lifecycle.initiate_shutdown(ShutdownReason::Signal);

        let status = daemon
            .client
            .submit(submit_request(&["hola"], "en"))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::Unavailable);
        assert!(daemon.queue.is_empty());
    }
}

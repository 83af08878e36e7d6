//! Thin wrapper over the generated `TranslationQueue` client.

use crate::error::CliError;
use core::time::Duration;
use tokio::time::{Instant, sleep, timeout};
use tonic::{
    Code, Status,
    codec::CompressionEncoding,
    transport::{Channel, Endpoint},
};
use transq::Language;
use transq_tonic_core::proto::{
    PendingResultCountRequest, PollResultsRequest, SubmitRequest,
    translation_queue_client::TranslationQueueClient,
};

/// Outcome of waiting for a submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collected {
    pub lines: Vec<String>,
    pub expected: usize,
}

impl Collected {
    pub fn is_complete(&self) -> bool {
        self.lines.len() >= self.expected
    }
}

pub struct DaemonClient {
    inner: TranslationQueueClient<Channel>,
    addr: String,
}

impl DaemonClient {
    /// Connects to the daemon, failing after `connect_timeout` instead of
    /// hanging on an unresponsive address.
    pub async fn connect(addr: &str, connect_timeout: Duration) -> Result<Self, CliError> {
        let endpoint = Endpoint::from_shared(addr.to_string())
            .map_err(|e| CliError::InvalidAddress {
                addr: addr.to_string(),
                reason: e.to_string(),
            })?
            .connect_timeout(connect_timeout);

        let unreachable = |reason: String| CliError::DaemonUnreachable {
            addr: addr.to_string(),
            reason,
        };
        let channel = timeout(connect_timeout, endpoint.connect())
            .await
            .map_err(|_| unreachable(format!("no answer within {connect_timeout:?}")))?
            .map_err(|e| unreachable(e.to_string()))?;

        let inner = TranslationQueueClient::new(channel)
            .send_compressed(CompressionEncoding::Zstd)
            .accept_compressed(CompressionEncoding::Zstd);

        Ok(Self {
            inner,
            addr: addr.to_string(),
        })
    }

    /// One cheap round trip, so a dead daemon is reported before anything is
    /// submitted.
    pub async fn check_alive(&mut self) -> Result<(), CliError> {
        self.pending_result_count()
            .await
            .map(|_| ())
            .map_err(|status| self.unreachable(status))
    }

    fn unreachable(&self, status: Status) -> CliError {
        CliError::DaemonUnreachable {
            addr: self.addr.clone(),
            reason: status.to_string(),
        }
    }

    /// A daemon that stopped (or is stopping) after the liveness check
    /// answers `Unavailable`; that still means "start the daemon".
    fn rpc_error(&self, status: Status) -> CliError {
        match status.code() {
            Code::Unavailable => self.unreachable(status),
            _ => CliError::Rpc(status),
        }
    }

    /// Submits one job and returns how many lines the daemon queued.
    pub async fn submit(&mut self, lines: Vec<String>, language: Language) -> Result<usize, CliError> {
        let resp = self
            .inner
            .submit(SubmitRequest {
                lines,
                language: language.code().to_string(),
            })
            .await
            .map_err(|status| self.rpc_error(status))?
            .into_inner();
        Ok(resp.queued_lines as usize)
    }

    pub async fn pending_result_count(&mut self) -> Result<usize, Status> {
        let resp = self
            .inner
            .pending_result_count(PendingResultCountRequest {})
            .await?
            .into_inner();
        Ok(resp.count as usize)
    }

    pub async fn poll_results(&mut self) -> Result<Vec<String>, CliError> {
        match self.inner.poll_results(PollResultsRequest {}).await {
            Ok(resp) => Ok(resp.into_inner().lines),
            Err(status) => Err(self.rpc_error(status)),
        }
    }

    /// Polls the result count until `expected` translations are buffered or
    /// `wait_timeout` passes, then drains whatever is there.
    ///
    /// A line whose translation failed never shows up, so a job with a
    /// failure always runs into the timeout.
    pub async fn wait_for_results(
        &mut self,
        expected: usize,
        wait_timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Collected, CliError> {
        let deadline = Instant::now() + wait_timeout;
        loop {
            let ready = self
                .pending_result_count()
                .await
                .map_err(|status| self.rpc_error(status))?;
            tracing::debug!("{ready} of {expected} translations ready");
            if ready >= expected || Instant::now() >= deadline {
                break;
            }
            sleep(poll_interval.min(deadline.saturating_duration_since(Instant::now()))).await;
        }

        let lines = self.poll_results().await?;
        Ok(Collected { lines, expected })
    }
}

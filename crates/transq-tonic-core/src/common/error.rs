//! Error types for the translation queue service.
//!
//! This module defines the central `Error` enum for everything that can go
//! wrong between an RPC arriving and a job being queued or results being
//! drained. It implements `From<Error>` for `tonic::Status` so handlers can
//! propagate with `?` and clients see a meaningful status code.
//!
//! ## Error Cases
//! - `ChannelError`: An internal communication failure between tasks or
//!   workers.
//! - `ServiceShutdown`: A request arrived while the daemon was shutting down.
//! - `Queue`: The job queue rejected the operation. Malformed jobs (no
//!   lines, unsupported language) surface here as `InvalidArgument`.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the translation queue service.
#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    /// Internal channel send/receive failure (e.g., closed or full channel).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// The daemon is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,

    /// Rejected by the job queue or job validation.
    #[error(transparent)]
    Queue(#[from] transq::Error),
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::ChannelError { context } => {
                Status::internal(format!("Channel error: {context}"))
            }
            Error::ServiceShutdown => Status::unavailable("Service is shutting down"),
            Error::Queue(transq::Error::QueueClosed) => {
                Status::unavailable("Service is shutting down")
            }
            Error::Queue(e @ (transq::Error::EmptyJob | transq::Error::UnsupportedLanguage { .. })) => {
                Status::invalid_argument(e.to_string())
            }
            Error::Queue(e @ (transq::Error::TimerAlreadyStarted | transq::Error::TimerNotStarted)) => {
                Status::internal(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn maps_to_grpc_status_codes() {
        let cases = [
            (
                Error::ChannelError {
                    context: "worker 0 channel closed".into(),
                },
                Code::Internal,
            ),
            (Error::ServiceShutdown, Code::Unavailable),
            (Error::Queue(transq::Error::QueueClosed), Code::Unavailable),
            (Error::Queue(transq::Error::EmptyJob), Code::InvalidArgument),
            (
                Error::Queue(transq::Error::UnsupportedLanguage { code: "fr".into() }),
                Code::InvalidArgument,
            ),
            (
                Error::Queue(transq::Error::TimerNotStarted),
                Code::Internal,
            ),
        ];

        for (err, code) in cases {
            assert_eq!(Status::from(err).code(), code);
        }
    }

    #[test]
    fn unsupported_language_message_reaches_client() {
        let status = Status::from(Error::Queue(transq::Error::UnsupportedLanguage {
            code: "fr".into(),
        }));
        assert!(status.message().contains("\"fr\""));
    }
}

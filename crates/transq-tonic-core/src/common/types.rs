//! Conversions between wire messages and queue types, plus shared defaults.

use crate::{
    Error,
    proto::{PendingResultCountResponse, PollResultsResponse, SubmitRequest},
};
use transq::{Job, Language};

/// Address the daemon binds by default.
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:50051";

/// Endpoint the client dials by default; matches [`DEFAULT_SERVER_ADDR`].
pub const DEFAULT_DAEMON_URL: &str = "http://127.0.0.1:50051";

impl TryFrom<SubmitRequest> for Job {
    type Error = Error;

    fn try_from(req: SubmitRequest) -> Result<Self, Self::Error> {
        let language = req.language.parse::<Language>()?;
        Ok(Self::new(req.lines, language)?)
    }
}

impl From<Vec<String>> for PollResultsResponse {
    fn from(lines: Vec<String>) -> Self {
        Self { lines }
    }
}

impl From<usize> for PendingResultCountResponse {
    fn from(count: usize) -> Self {
        Self {
            count: count as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_request_becomes_job() {
        let job = Job::try_from(SubmitRequest {
            lines: vec!["hola".into(), "mundo".into()],
            language: "it".into(),
        })
        .unwrap();
        assert_eq!(job.language(), Language::It);
        assert_eq!(job.lines(), ["hola", "mundo"]);
    }

    #[test]
    fn submit_request_validation() {
        let unsupported = Job::try_from(SubmitRequest {
            lines: vec!["bonjour".into()],
            language: "fr".into(),
        });
        assert!(matches!(
            unsupported,
            Err(Error::Queue(transq::Error::UnsupportedLanguage { .. }))
        ));

        let empty = Job::try_from(SubmitRequest {
            lines: Vec::new(),
            language: "en".into(),
        });
        assert!(matches!(empty, Err(Error::Queue(transq::Error::EmptyJob))));
    }
}

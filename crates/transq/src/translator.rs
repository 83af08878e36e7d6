//! The seam in front of the remote translation service.

use crate::{Language, WorkItem};

/// Failure of a single translation call.
///
/// These never abort a batch: the worker that sees one logs it and drops the
/// line.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TranslateError {
    /// The request never got a response (DNS, connect, TLS, ...).
    #[error("transport error: {reason}")]
    Transport { reason: String },

    /// The call did not complete within the configured timeout.
    #[error("translation request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("translation service returned {code}: {body}")]
    Status { code: u16, body: String },

    /// The service answered successfully but the payload was unusable.
    #[error("malformed translation response: {reason}")]
    MalformedResponse { reason: String },
}

/// Translates a single piece of text into a target language.
///
/// Implementations are called concurrently from every worker and must be
/// safe to share. Rate limiting happens in front of this trait, not inside
/// it.
pub trait Translator: Send + Sync + 'static {
    fn translate(
        &self,
        text: &str,
        target: Language,
    ) -> impl Future<Output = Result<String, TranslateError>> + Send;

    /// Convenience wrapper for dispatching a [`WorkItem`].
    fn translate_item(
        &self,
        item: &WorkItem,
    ) -> impl Future<Output = Result<String, TranslateError>> + Send {
        self.translate(&item.text, item.language)
    }
}

/// Returns every line unchanged. Useful for exercising the daemon without
/// credentials for a real service.
#[derive(Clone, Copy, Debug, Default)]
pub struct EchoTranslator;

impl Translator for EchoTranslator {
    async fn translate(&self, text: &str, _target: Language) -> Result<String, TranslateError> {
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echo_returns_input() {
        let item = WorkItem {
            text: "hola".into(),
            language: Language::De,
        };
        assert_eq!(EchoTranslator.translate_item(&item).await, Ok("hola".into()));
    }
}

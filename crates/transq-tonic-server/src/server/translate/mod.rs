//! Translation backends the daemon can be configured with.

pub mod google;

use crate::server::config::BackendConfig;
use google::GoogleTranslator;
use transq::{EchoTranslator, Language, TranslateError, Translator};

/// The backend selected at startup.
pub enum Backend {
    Google(GoogleTranslator),
    Echo(EchoTranslator),
}

impl Backend {
    /// Builds the backend described by `config`.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client for the Google backend cannot be created.
    pub fn from_config(config: &BackendConfig) -> anyhow::Result<Self> {
        Ok(match config {
            BackendConfig::Google {
                api_key,
                endpoint,
                request_timeout,
            } => Self::Google(GoogleTranslator::new(
                endpoint.clone(),
                api_key.clone(),
                *request_timeout,
            )?),
            BackendConfig::Echo => Self::Echo(EchoTranslator),
        })
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Google(_) => "google",
            Self::Echo(_) => "echo",
        }
    }
}

impl Translator for Backend {
    async fn translate(&self, text: &str, target: Language) -> Result<String, TranslateError> {
        match self {
            Self::Google(google) => google.translate(text, target).await,
            Self::Echo(echo) => echo.translate(text, target).await,
        }
    }
}

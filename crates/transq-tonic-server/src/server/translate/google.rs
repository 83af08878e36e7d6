//! Google Cloud Translation API (v2, "basic") client.
//!
//! Each call posts one line:
//!
//! ```text
//! POST {endpoint}?key={api_key}
//! {"q": "...", "target": "de", "format": "text"}
//! ```
//!
//! and reads `data.translations[0].translatedText` from the response. The
//! source language is left for the service to detect.

use core::time::Duration;
use serde::{Deserialize, Serialize};
use transq::{Language, TranslateError, Translator};

pub struct GoogleTranslator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    target: &'a str,
    format: &'static str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    data: TranslationList,
}

#[derive(Deserialize)]
struct TranslationList {
    translations: Vec<Translation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

impl GoogleTranslator {
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be built (e.g. the TLS
    /// backend fails to initialize).
    pub fn new(endpoint: String, api_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("transq-daemon/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

fn transport_error(err: reqwest::Error) -> TranslateError {
    if err.is_timeout() {
        TranslateError::Timeout
    } else {
        TranslateError::Transport {
            reason: err.to_string(),
        }
    }
}

impl Translator for GoogleTranslator {
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(lang = %target)))]
    async fn translate(&self, text: &str, target: Language) -> Result<String, TranslateError> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&TranslateRequest {
                q: text,
                target: target.code(),
                format: "text",
            })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslateError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let payload: TranslateResponse =
            response
                .json()
                .await
                .map_err(|e| TranslateError::MalformedResponse {
                    reason: e.to_string(),
                })?;

        payload
            .data
            .translations
            .into_iter()
            .next()
            .map(|translation| translation.translated_text)
            .ok_or_else(|| TranslateError::MalformedResponse {
                reason: "response contained no translations".to_string(),
            })
    }
}

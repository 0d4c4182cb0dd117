//! Vision model backends.
//!
//! [`VisionBackend`] is the seam between the identifier and the network.
//! [`GeminiBackend`] talks to a Gemini-style `generateContent` endpoint with
//! the API key passed as the `key` query parameter.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::IdentificationConfig;
use crate::error::{Error, Result};

use super::wire::{GenerateContentRequest, GenerateContentResponse, ImagePayload};
use super::IdentifyError;

/// Longest slice of an error body kept in a [`IdentifyError::RemoteService`].
const MAX_ERROR_BODY: usize = 200;

/// A multimodal model that answers a prompt about an image.
#[async_trait]
pub trait VisionBackend: Send + Sync + std::fmt::Debug {
    /// Whether the backend has the credentials it needs.
    fn is_configured(&self) -> bool;

    /// Send `prompt` with `image` and return the model's text answer.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifyError::RemoteService`] for transport failures and
    /// non-2xx statuses, [`IdentifyError::ResponseParse`] when the envelope
    /// carries no text, and [`IdentifyError::NotConfigured`] without
    /// credentials.
    async fn generate(
        &self,
        prompt: &str,
        image: &ImagePayload,
    ) -> std::result::Result<String, IdentifyError>;
}

/// HTTP backend for the `generateContent` API.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl GeminiBackend {
    /// Create a backend for `api_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("wildwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Create a backend from the identification settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &IdentificationConfig) -> Result<Self> {
        Self::new(config.api_url.clone(), config.api_key(), config.timeout())
    }

    /// The endpoint this backend posts to.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl VisionBackend for GeminiBackend {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(
        &self,
        prompt: &str,
        image: &ImagePayload,
    ) -> std::result::Result<String, IdentifyError> {
        let key = self.api_key.as_deref().ok_or(IdentifyError::NotConfigured)?;
        let body = GenerateContentRequest::new(prompt, image);

        debug!(
            "Posting {} bytes of {} to {}",
            image.data.len(),
            image.mime_type,
            self.api_url
        );

        // Errors carry the request URL, which includes the key; strip it.
        let response = self
            .client
            .post(&self.api_url)
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| IdentifyError::RemoteService {
                status: None,
                message: e.without_url().to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(IdentifyError::RemoteService {
                status: Some(status.as_u16()),
                message: truncate(&text, MAX_ERROR_BODY),
            });
        }

        let envelope: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|e| IdentifyError::ResponseParse {
                    reason: format!("invalid response envelope: {}", e.without_url()),
                })?;

        envelope
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| IdentifyError::ResponseParse {
                reason: "empty response from model".to_string(),
            })
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

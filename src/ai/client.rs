//! Ollama API client module
//!
//! Encapsulates the text-generation call against a locally hosted model.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use crate::errors::ClassifyError;

/// Transport-level cap on a single request. The classifier's deadline is much
/// shorter; this only bounds requests whose caller already gave up.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// A black-box text generator: prompt in, reply text out.
///
/// Implementations may be slow, return prose instead of JSON, or fail
/// outright. Callers enforce their own deadline.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the model cannot be reached or answers with
    /// something other than reply text.
    async fn generate(&self, prompt: &str) -> Result<String, ClassifyError>;
}

/// Client for Ollama's non-streaming `/api/generate` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    model_name: String,
}

impl OllamaClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model_name: model_name.into(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model_name
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, ClassifyError> {
        debug!(
            model = %self.model_name,
            prompt_chars = prompt.chars().count(),
            "Sending generate request to Ollama"
        );

        let request_body = json!({
            "model": self.model_name,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": 0 }
        });

        // Fresh handle per call; nothing is pooled between complaints.
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClassifyError::Http(format!("Failed to build Ollama HTTP client: {e}")))?;

        let response = client
            .post(self.generate_url())
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ClassifyError::Http(format!("Ollama request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|e| {
                format!("Failed to read error response body (status {status}): {e}")
            });
            return Err(ClassifyError::Model(format!(
                "Ollama returned status {status}: {error_text}"
            )));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| ClassifyError::Model(format!("Failed to parse Ollama response: {e}")))?;

        response_json
            .get("response")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| ClassifyError::Model("No `response` text in Ollama reply".to_string()))
    }
}

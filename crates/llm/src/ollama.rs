//! Ollama gateway implementation.
//!
//! Talks to a local Ollama daemon via its native `/api/generate`
//! endpoint, non-streaming. Connection problems and HTTP error statuses
//! surface as connectivity errors; a body that fails to decode as JSON is
//! a payload error.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use keepsake_core::error::GatewayError;
use keepsake_core::gateway::{Gateway, Generation, GenerationLog, GenerationRecord, TaskKind};
use tracing::{debug, warn};

/// A gateway backed by a local Ollama daemon.
pub struct OllamaGateway {
    base_url: String,
    model: String,
    client: reqwest::Client,
    log: Option<Arc<dyn GenerationLog>>,
}

impl OllamaGateway {
    /// Create a new Ollama gateway for `model` at `base_url`
    /// (e.g. `http://localhost:11434`).
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
            log: None,
        }
    }

    /// Attach an audit sink; every `generate` call gets recorded to it.
    pub fn with_generation_log(mut self, log: Arc<dyn GenerationLog>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Gateway for OllamaGateway {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(
        &self,
        prompt: &str,
        task: TaskKind,
        attribute: Option<&str>,
    ) -> Result<Generation, GatewayError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        debug!(model = %self.model, task = task.as_str(), "Sending generation request");
        let sent_at = Utc::now();

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Connectivity(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Ollama returned an error status");
            return Err(GatewayError::Connectivity(format!(
                "HTTP {}: {}",
                status.as_u16(),
                error_body
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Payload(format!("Failed to decode response body: {e}")))?;
        let received_at = Utc::now();

        // Ollama puts the completion in "response"; tolerate it missing.
        let text = payload
            .get("response")
            .and_then(|value| value.as_str())
            .unwrap_or_default()
            .to_string();

        let generation = Generation {
            text,
            raw: Some(payload),
        };

        if let Some(log) = &self.log {
            log.record(GenerationRecord {
                model: self.model.clone(),
                task,
                attribute: attribute.map(str::to_string),
                prompt: prompt.to_string(),
                response: generation.text.clone(),
                raw: generation.raw.clone(),
                sent_at,
                received_at,
            })
            .await;
        }

        Ok(generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_normalizes_base_url() {
        let gateway = OllamaGateway::new("http://localhost:11434/", "llama3.1:8b");
        assert_eq!(gateway.base_url, "http://localhost:11434");
        assert_eq!(gateway.model(), "llama3.1:8b");
        assert_eq!(gateway.name(), "ollama");
    }

    #[tokio::test]
    async fn unreachable_daemon_is_a_connectivity_error() {
        // Port 9 (discard) is never running an Ollama daemon.
        let gateway = OllamaGateway::new("http://127.0.0.1:9", "llama3.1:8b");
        let err = gateway
            .generate("hello", TaskKind::General, None)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Connectivity(_)));
    }
}

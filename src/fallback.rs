//! Sequential fallback across an ordered list of model identifiers.
//!
//! A prompt is sent to the first model; a retryable failure (quota, rate
//! limit, overload, 503/429) moves on to the next model immediately. Any other
//! failure, or a retryable failure on the last model, ends the run.

use async_trait::async_trait;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{LensError, Result};

const RETRYABLE_MARKERS: &[&str] = &["quota", "rate limit", "503", "overload"];

/// A single failed upstream attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct UpstreamError {
    /// HTTP status, when the upstream answered at all.
    pub status: Option<u16>,
    pub message: String,
}

impl UpstreamError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Transient failures worth retrying against the next model.
    ///
    /// Timeouts match no marker, so a timed-out attempt ends the chain.
    pub fn is_retryable(&self) -> bool {
        if matches!(self.status, Some(503) | Some(429)) {
            return true;
        }
        let message = self.message.to_lowercase();
        RETRYABLE_MARKERS
            .iter()
            .any(|marker| message.contains(marker))
    }
}

/// One network call against a named model.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Fails when the backend cannot issue calls at all (e.g. no API key).
    fn ensure_ready(&self) -> Result<()> {
        Ok(())
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
    ) -> std::result::Result<String, UpstreamError>;
}

/// Sends prompts through an ordered model list, first success wins.
#[derive(Debug, Clone)]
pub struct ModelFallbackClient<B> {
    backend: B,
    models: Vec<String>,
}

impl<B: ModelBackend> ModelFallbackClient<B> {
    /// Blank entries are dropped; order is preserved.
    pub fn new(backend: B, models: Vec<String>) -> Self {
        let models = models
            .into_iter()
            .map(|model| model.trim().to_owned())
            .filter(|model| !model.is_empty())
            .collect();
        Self { backend, models }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Checks credentials and the model list without issuing a call.
    pub fn ensure_ready(&self) -> Result<()> {
        self.backend.ensure_ready()?;
        if self.models.is_empty() {
            return Err(LensError::Configuration(
                "no model endpoints configured".to_owned(),
            ));
        }
        Ok(())
    }

    pub async fn send(&self, prompt: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(LensError::InvalidInput("prompt must not be empty".to_owned()));
        }
        self.ensure_ready()?;

        let span = tracing::info_span!("fallback", request_id = %Uuid::new_v4());
        self.run_chain(prompt).instrument(span).await
    }

    async fn run_chain(&self, prompt: &str) -> Result<String> {
        let last = self.models.len() - 1;

        for (index, model) in self.models.iter().enumerate() {
            tracing::info!("trying model {}: {model}", index + 1);

            match self.backend.generate(model, prompt).await {
                Ok(text) => {
                    tracing::info!("model {} ({model}) succeeded", index + 1);
                    return Ok(text);
                }
                Err(err) => {
                    tracing::warn!("model {} ({model}) failed: {err}", index + 1);

                    if err.is_retryable() && index < last {
                        tracing::info!("retryable failure, switching to model {}", index + 2);
                        continue;
                    }
                    return Err(LensError::AllModelsFailed(err.message));
                }
            }
        }

        Err(LensError::FallbackExhausted)
    }
}

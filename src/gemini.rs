use std::error::Error as StdError;

use async_trait::async_trait;
use reqwest::Url;

use crate::error::{LensError, Result};
use crate::fallback::{ModelBackend, UpstreamError};
use crate::model::{GenerateContentRequest, GenerateContentResponse, GoogleErrorEnvelope};
use crate::session::HttpSession;
use crate::util::truncate_chars;

const ERROR_SNIPPET_CHARS: usize = 1000;

/// Gemini `generateContent` over the shared HTTP session.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    session: HttpSession,
}

impl GeminiBackend {
    pub fn new(session: HttpSession) -> Self {
        Self { session }
    }

    fn transport_error(&self, err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            return UpstreamError::new(
                None,
                format!("request timed out after {:?}", self.session.timeout()),
            );
        }
        let status = err.status().map(|status| status.as_u16());
        // The URL carries the API key.
        let err = err.without_url();
        UpstreamError::new(status, describe(&err))
    }
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    fn ensure_ready(&self) -> Result<()> {
        match self.session.api_key() {
            Some(_) => Ok(()),
            None => Err(LensError::missing_api_key()),
        }
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
    ) -> std::result::Result<String, UpstreamError> {
        let api_key = self
            .session
            .api_key()
            .ok_or_else(|| UpstreamError::new(None, "GEMINI_API_KEY not configured"))?;
        let url = generate_url(self.session.base_url(), model)
            .map_err(|err| UpstreamError::new(None, format!("invalid model url: {err}")))?;

        let response = self
            .session
            .client()
            .post(url)
            .query(&[("key", api_key)])
            .json(&GenerateContentRequest::from_prompt(prompt))
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| self.transport_error(err))?;

        if !(200..300).contains(&status) {
            return Err(status_error(status, &body));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body).map_err(|err| {
            UpstreamError::new(Some(status), format!("malformed response: {err}"))
        })?;

        parsed.first_text().map(str::to_owned).ok_or_else(|| {
            tracing::debug!(
                "response without candidate text: {}",
                truncate_chars(&body, ERROR_SNIPPET_CHARS)
            );
            UpstreamError::new(Some(status), "malformed response: no candidate text")
        })
    }
}

/// `{base}/v1beta/models/{model}:generateContent`. Accepts ids with or
/// without the `models/` prefix.
fn generate_url(base: &Url, model: &str) -> std::result::Result<Url, url::ParseError> {
    let model = model.trim().trim_start_matches("models/");
    base.join(&format!("v1beta/models/{model}:generateContent"))
}

fn status_error(status: u16, body: &str) -> UpstreamError {
    let detail = serde_json::from_str::<GoogleErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| truncate_chars(body.trim(), ERROR_SNIPPET_CHARS));

    let message = if detail.is_empty() {
        format!("Request failed with status code {status}")
    } else {
        format!("Request failed with status code {status}: {detail}")
    };
    UpstreamError::new(Some(status), message)
}

fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

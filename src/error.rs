/// Failures surfaced by the model fallback client and the curve resolver.
#[derive(Debug, thiserror::Error)]
pub enum LensError {
    /// Missing credentials or an empty model list.
    #[error("{0}")]
    Configuration(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Every model was tried, or a terminal failure stopped the chain.
    #[error("All models failed. Last error: {0}")]
    AllModelsFailed(String),

    #[error("All fallback models exhausted")]
    FallbackExhausted,

    #[error("curve generation failed: {0}")]
    CurveGeneration(String),
}

impl LensError {
    pub fn missing_api_key() -> Self {
        Self::Configuration("GEMINI_API_KEY not configured".to_owned())
    }
}

pub type Result<T> = std::result::Result<T, LensError>;

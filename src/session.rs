use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, ClientBuilder, Url};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Wrapper around the configured HTTP client and upstream credentials.
#[derive(Debug, Clone)]
pub struct HttpSession {
    client: Client,
    base: Url,
    api_key: Option<String>,
    timeout: Duration,
}

/// Minimal data required to build an HTTP session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub timeout: Duration,
}

impl SessionConfig {
    pub fn new(api_key: Option<String>, api_base: String, timeout: Duration) -> Self {
        Self {
            api_key,
            api_base,
            timeout,
        }
    }
}

impl HttpSession {
    /// Build a new HTTP session. A missing API key is not an error here; calls
    /// made without one fail with a configuration error instead.
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = ClientBuilder::new()
            .default_headers(default_headers)
            .timeout(config.timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .context("building HTTP client")?;

        let base = Url::parse(&config.api_base)
            .with_context(|| format!("parsing API base URL `{}`", config.api_base))?;

        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_owned);

        Ok(Self {
            client,
            base,
            api_key,
            timeout: config.timeout,
        })
    }

    /// Returns reference to the inner `reqwest::Client`.
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Per-request timeout applied by the client.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

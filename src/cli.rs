use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};

use crate::curve::LabelMatching;
use crate::fallback::ModelFallbackClient;
use crate::gemini::GeminiBackend;
use crate::model;
use crate::server::DEFAULT_LISTEN_ADDR;
use crate::session::{HttpSession, SessionConfig, DEFAULT_API_BASE};
use anyhow::{anyhow, Context as AnyhowContext, Result};

/// What a one-shot run asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Time and space complexity of the input code.
    Complexity,
    /// Bug report and improved version of the input code.
    Debug,
    /// Solution for the input problem statement (needs `--language`).
    Create,
    /// Curve data for the input complexity label.
    Graph,
}

/// Command-line options for the complexity assistant.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Gemini-backed code complexity, debugging and solution helper", long_about = None)]
pub struct CliArgs {
    /// Gemini API key.
    #[arg(long = "api-key", env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model identifiers in fallback order (repeat or comma-separate).
    #[arg(
        long = "model",
        env = "GEMINI_MODELS",
        value_delimiter = ',',
        default_values_t = model::default_models()
    )]
    pub models: Vec<String>,

    /// Root URL of the Gemini API.
    #[arg(long = "api-base", env = "GEMINI_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// What to do with the input in one-shot mode.
    #[arg(long = "mode", value_enum, default_value_t = Mode::Complexity)]
    pub mode: Mode,

    /// Input text: code, a problem statement, or a complexity label.
    #[arg(long = "text", conflicts_with_all = ["prompt_file", "stdin_prompt"])]
    pub prompt: Option<String>,

    /// Read the input from the specified file.
    #[arg(long = "prompt-file", value_name = "PATH", conflicts_with_all = ["prompt", "stdin_prompt"])]
    pub prompt_file: Option<PathBuf>,

    /// Read the input from STDIN (until EOF).
    #[arg(long = "stdin-prompt", action = ArgAction::SetTrue, conflicts_with_all = ["prompt", "prompt_file"])]
    pub stdin_prompt: bool,

    /// Target language for `--mode create`.
    #[arg(long = "language")]
    pub language: Option<String>,

    /// Number of curve points for `--mode graph`.
    #[arg(long = "points", default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..=500))]
    pub points: u32,

    /// Send unrecognised complexity labels to the model instead of charting them as linear.
    #[arg(long = "strict", action = ArgAction::SetTrue)]
    pub strict: bool,

    /// Run the HTTP API instead of executing a single request.
    #[arg(long = "serve", action = ArgAction::SetTrue)]
    pub serve: bool,

    /// Listen address for the HTTP API.
    #[arg(long = "listen", value_name = "ADDR", env = "ALGOLENS_LISTEN", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen: String,

    /// Network timeout (seconds) applied to each model attempt.
    #[arg(long = "timeout", default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..=300))]
    timeout_secs: u64,
}

impl CliArgs {
    /// Returns the configured network timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn label_matching(&self) -> LabelMatching {
        if self.strict {
            LabelMatching::Strict
        } else {
            LabelMatching::DefaultLinear
        }
    }

    /// Resolve the input text based on CLI inputs.
    pub fn resolve_input(&self) -> Result<String> {
        let input = if let Some(prompt) = &self.prompt {
            prompt.clone()
        } else if let Some(path) = &self.prompt_file {
            fs::read_to_string(path)
                .with_context(|| format!("reading prompt file {}", path.display()))?
        } else if self.stdin_prompt {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("reading prompt from stdin")?;
            buf
        } else {
            return Err(anyhow!(
                "no input given; use --text, --prompt-file or --stdin-prompt"
            ));
        };

        if input.trim().is_empty() {
            return Err(anyhow!("input was empty"));
        }
        Ok(input)
    }

    /// Convert CLI arguments into a session configuration.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.api_key.clone(), self.api_base.clone(), self.timeout())
    }

    /// Build the fallback client over the configured models.
    pub fn fallback_client(&self) -> Result<ModelFallbackClient<GeminiBackend>> {
        let session = HttpSession::new(&self.session_config())?;
        Ok(ModelFallbackClient::new(
            GeminiBackend::new(session),
            self.models.clone(),
        ))
    }
}

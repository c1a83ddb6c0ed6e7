mod cli;
mod curve;
mod error;
mod extract;
mod fallback;
mod gemini;
mod model;
mod prompts;
mod server;
mod session;
mod util;

use anyhow::{anyhow, Result};
use clap::Parser;
use cli::{CliArgs, Mode};
use curve::{CurveResolver, RngJitter};

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

async fn run(args: CliArgs) -> Result<()> {
    let input = args.resolve_input()?;
    let client = args.fallback_client()?;

    match args.mode {
        Mode::Complexity => {
            let analysis = client.send(&prompts::complexity(&input)).await?;
            println!("{analysis}");
            if extract::has_complexity_info(&analysis) {
                let found = extract::extract_complexities(&analysis);
                println!("\ntime: {}  space: {}", found.time, found.space);
            }
        }
        Mode::Debug => {
            println!("{}", client.send(&prompts::debug(&input)).await?);
        }
        Mode::Create => {
            let language = args
                .language
                .as_deref()
                .map(str::trim)
                .filter(|language| !language.is_empty())
                .ok_or_else(|| anyhow!("--language is required for --mode create"))?;
            println!("{}", client.send(&prompts::create(&input, language)).await?);
        }
        Mode::Graph => {
            let resolver = CurveResolver::new(std::sync::Arc::new(client));
            let mut jitter = RngJitter::from_entropy();
            let curve = resolver
                .resolve(&input, args.points, args.label_matching(), &mut jitter)
                .await?;
            println!("{}", serde_json::to_string_pretty(&curve)?);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    let args = CliArgs::parse();

    let result = if args.serve {
        server::run_server(&args).await
    } else {
        run(args).await
    };

    if let Err(error) = result {
        tracing::error!("{error:?}");
        std::process::exit(1);
    }
}

//! FedGate Development CLI
//!
//! Loads configuration, builds a broker with an in-memory user directory and
//! prints the authorization redirect for each configured provider. Useful for
//! checking client ids, callback URLs and scopes before wiring the broker
//! into a web application.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use fg_broker::{AuthBroker, InMemoryUserDirectory};
use fg_config::{ConfigLoader, FedGateConfig};

/// FedGate Development CLI
#[derive(Parser, Debug)]
#[command(name = "fg-dev")]
#[command(about = "Print login redirects for the configured identity providers")]
struct Args {
    /// Configuration file (falls back to the standard search paths)
    #[arg(long, short, env = "FEDGATE_CONFIG")]
    config: Option<String>,

    /// Only print the redirect for this provider id
    #[arg(long, short)]
    provider: Option<String>,

    /// Print redirects as JSON lines
    #[arg(long)]
    json: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    example_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.example_config {
        print!("{}", FedGateConfig::example_toml());
        return Ok(());
    }

    fg_common::init_logging("fg-dev");

    let loader = match &args.config {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load().context("Failed to load configuration")?;

    if config.providers.is_empty() {
        bail!("No providers configured; run with --example-config for a template");
    }

    let broker = AuthBroker::from_config(&config, Arc::new(InMemoryUserDirectory::new()))
        .context("Failed to build broker")?;

    let provider_ids = match &args.provider {
        Some(id) => vec![id.clone()],
        None => broker.providers().provider_ids(),
    };

    info!(providers = provider_ids.len(), "Broker ready");

    for provider_id in provider_ids {
        let target = broker
            .begin_login(&provider_id)
            .with_context(|| format!("Cannot start login for {}", provider_id))?;

        if args.json {
            let line = serde_json::json!({
                "providerId": provider_id,
                "url": target.url,
                "state": target.state,
            });
            println!("{}", line);
        } else {
            println!("{:<12} {}", provider_id, target.url);
        }
    }

    Ok(())
}

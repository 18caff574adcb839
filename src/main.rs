//! Bearer Strategy - authenticate a single request from the command line
//!
//! Loads a strategy configuration, runs one request through it and prints
//! the resulting identity as JSON, or `anonymous`.

use anyhow::Context;
use bearer_strategy::auth::{AuthContext, AuthOutcome, AuthRequest, JwtStrategy, Strategy};
use bearer_strategy::config::Config;
use bearer_strategy::telemetry;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Bearer Strategy - JWT bearer authentication
#[derive(Parser, Debug)]
#[command(name = "bearer-strategy")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "strategy.yaml")]
    config: PathBuf,

    /// Value of the Authorization header, e.g. "Bearer eyJ..."
    #[arg(short, long)]
    authorization: Option<String>,

    /// Extra request header as NAME=VALUE (repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Request path and query string
    #[arg(short, long, default_value = "/")]
    uri: String,

    /// Request method
    #[arg(short, long, default_value = "GET")]
    method: String,

    /// Scope requested for this call
    #[arg(short, long, default_value = "")]
    scope: String,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{}'", raw)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    telemetry::init_subscriber(&config.logging)?;
    info!(
        "Starting bearer-strategy v{}",
        bearer_strategy::VERSION
    );

    let strategy = JwtStrategy::from_config(&config.strategy)?;

    let mut request = AuthRequest::from_uri(&args.method, &args.uri);
    for (name, value) in &args.headers {
        request = request.with_header(name, value);
    }
    if let Some(authorization) = &args.authorization {
        request = request.with_header("authorization", authorization);
    }

    let outcome = strategy
        .authenticate(&AuthContext::new(request), &args.scope)
        .await?;

    match outcome {
        AuthOutcome::Authenticated(identity) => {
            println!("{}", serde_json::to_string_pretty(&identity)?)
        }
        AuthOutcome::Anonymous => println!("anonymous"),
    }

    Ok(())
}

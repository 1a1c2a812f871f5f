//! Galley CLI
//!
//! Command-line interface for the Galley restaurant AI gateway.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use galley_api::{ApiConfig, ApiServer};
use galley_cache::make_key;
use galley_core::traits::CompletionClient;
use galley_core::types::{Completion, Domain, PromptContext, ResultEnvelope, Task};
use galley_gateway::HttpGateway;

/// Galley - AI advice for restaurant operations
#[derive(Parser)]
#[command(name = "galley")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "GALLEY_PORT", default_value = "3001")]
        port: u16,
        /// Bind address
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,
    },

    /// Print the cache key for a request body
    Fingerprint {
        /// Operation id, e.g. inventory_prediction
        operation: String,
        /// JSON file holding the request body
        file: PathBuf,
    },

    /// Send one request to the model provider, bypassing the cache
    Ask {
        /// Task name, e.g. inventory_prediction or menu-recommendations
        task: String,
        /// JSON file holding the request body
        file: PathBuf,
    },

    /// List the available AI tasks
    Tasks,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "galley=debug,info"
    } else {
        "galley=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(cli.log_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!cli.log_json).then(tracing_subscriber::fmt::layer))
        .init();

    match cli.command {
        Commands::Serve { port, bind } => cmd_serve(port, &bind).await,
        Commands::Fingerprint { operation, file } => cmd_fingerprint(&operation, &file),
        Commands::Ask { task, file } => cmd_ask(&task, &file).await,
        Commands::Tasks => cmd_tasks(),
    }
}

fn read_body(path: &Path) -> Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Run API server
async fn cmd_serve(port: u16, bind: &str) -> Result<()> {
    println!("{}", "🍳 Starting Galley API server...".cyan().bold());
    println!("   {} http://{}:{}", "Listening on:".green(), bind, port);
    println!("   {} http://{}:{}/health", "Health check:".dimmed(), bind, port);

    let config = ApiConfig::from_env();
    if config.gateway.api_key.is_empty() {
        println!(
            "\n   {}",
            "⚠️  OPENAI_API_KEY is not set; AI routes will return errors.".yellow()
        );
    }
    println!("\n   Press Ctrl+C to stop.\n");

    let server = ApiServer::new(config).context("Invalid server configuration")?;

    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;
    server.run(addr).await?;

    Ok(())
}

/// Print the fingerprint of a body
fn cmd_fingerprint(operation: &str, file: &Path) -> Result<()> {
    let body = read_body(file)?;
    let key = make_key(operation, &body);

    println!("{}", key);
    match operation.parse::<Task>() {
        Ok(task) => debug!(task = %task, ttl_secs = task.cache_ttl().as_secs(), "Known task"),
        Err(_) => debug!(operation, "Not a catalog task; key computed anyway"),
    }

    Ok(())
}

/// One-off gateway call
async fn cmd_ask(task: &str, file: &Path) -> Result<()> {
    let task: Task = task.parse()?;
    let body = read_body(file)?;

    println!("{} {}", "🤖 Asking:".cyan().bold(), task.description());

    let config = ApiConfig::from_env();
    let profile = config.gateway.profile(task.domain());
    let gateway = HttpGateway::with_config(config.gateway).context("Invalid gateway configuration")?;

    let context = PromptContext::for_task(task, &body);
    let envelope = match gateway.complete(&profile, &context).await {
        Completion::Success { text } => ResultEnvelope::success(text),
        Completion::Failure { error } => ResultEnvelope::error(error),
    };

    println!("{}", serde_json::to_string_pretty(&envelope)?);

    if let ResultEnvelope::Error { message } = envelope {
        bail!("{} failed: {}", task.operation(), message);
    }
    Ok(())
}

/// List tasks
fn cmd_tasks() -> Result<()> {
    for domain in Domain::ALL {
        println!(
            "\n{} {}",
            domain.as_str().to_uppercase().yellow().bold(),
            format!("(cache {}s, temperature {})", domain.cache_ttl().as_secs(), domain.temperature()).dimmed()
        );
        for task in Task::ALL.iter().filter(|t| t.domain() == domain) {
            println!("   {:<24} {}", task.operation().green(), task.description());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from(["galley", "ask", "inventory-prediction", "body.json"]).unwrap();
        match cli.command {
            Commands::Ask { task, file } => {
                assert_eq!(task.parse::<Task>().unwrap(), Task::InventoryPrediction);
                assert_eq!(file, PathBuf::from("body.json"));
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_read_body_rejects_missing_file() {
        assert!(read_body(Path::new("/nonexistent/galley-body.json")).is_err());
    }
}

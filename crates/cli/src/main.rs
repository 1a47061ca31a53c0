//! Switchyard CLI: the main entry point.
//!
//! Commands:
//! - `init`       Write a default config file
//! - `ask`        Route a single message and print the outcome
//! - `chat`       Interactive conversation through the router
//! - `providers`  Probe every provider and show its health
//! - `status`     Show configuration and configured providers

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use switchyard_core::tier::RouteTier;

mod commands;
mod context;
mod tools;
mod wiring;

#[derive(Parser)]
#[command(
    name = "switchyard",
    about = "Switchyard: provider rotation and tool-augmented dialogue routing",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.switchyard/config.toml)
    #[arg(short, long, global = true, env = "SWITCHYARD_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Route one message and print the answer
    Ask {
        #[arg(short, long)]
        message: String,

        /// Send as a privileged caller
        #[arg(long)]
        admin: bool,

        /// Intent label used for the caching decision
        #[arg(long)]
        intent: Option<String>,

        /// Skip classification (local | cloud)
        #[arg(long)]
        tier: Option<RouteTier>,

        /// Appended to the system prompt
        #[arg(long)]
        system: Option<String>,
    },

    /// Interactive chat that keeps conversation history
    Chat {
        #[arg(long)]
        admin: bool,
    },

    /// Probe every configured provider
    Providers,

    /// Show configuration and configured providers
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let config_path = cli.config;
    match cli.command {
        Commands::Init { force } => commands::init::run(config_path, force)?,
        Commands::Ask {
            message,
            admin,
            intent,
            tier,
            system,
        } => {
            commands::ask::run(
                config_path,
                commands::ask::AskArgs {
                    message,
                    admin,
                    intent,
                    tier,
                    system,
                },
            )
            .await?
        }
        Commands::Chat { admin } => commands::chat::run(config_path, admin).await?,
        Commands::Providers => commands::providers::run(config_path).await?,
        Commands::Status { json } => commands::status::run(config_path, json).await?,
    }

    Ok(())
}

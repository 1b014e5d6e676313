//! BuildTrack CLI tool.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod client;
mod commands;

#[derive(Parser)]
#[command(name = "buildtrack")]
#[command(about = "BuildTrack CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// API server URL
    #[arg(long, env = "BUILDTRACK_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger a build
    Trigger {
        /// Target environment (dev, qa, staging, prod)
        environment: String,
        /// API base URL baked into the build
        base_url: String,
    },
    /// List recent builds
    List {
        /// Maximum number of builds to show
        #[arg(long, default_value = "20")]
        limit: u32,
    },
    /// Show build details
    Show {
        /// Build ID
        id: String,
    },
    /// Stream build changes as they happen
    Watch,
    /// Validate a server configuration file
    Validate {
        /// Path to the configuration file
        #[arg(default_value = "buildtrack.kdl")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Trigger {
            environment,
            base_url,
        } => {
            commands::builds::trigger(&cli.api_url, &environment, &base_url).await?;
        }
        Commands::List { limit } => {
            commands::builds::list(&cli.api_url, limit).await?;
        }
        Commands::Show { id } => {
            commands::builds::show(&cli.api_url, &id).await?;
        }
        Commands::Watch => {
            commands::watch::watch(&cli.api_url).await?;
        }
        Commands::Validate { path } => {
            commands::validate(&path)?;
        }
    }

    Ok(())
}

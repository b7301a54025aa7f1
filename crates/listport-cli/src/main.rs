mod commands;

use clap::{Parser, Subcommand};
use listport_core::{AppConfig, Platform};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "listport")]
#[command(about = "Import marketplace product listings through metered scraping vendors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape a product URL and print the normalized product as JSON.
    Scrape {
        url: String,
        /// Bypass the response cache.
        #[arg(long)]
        force_refresh: bool,
        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,
    },
    /// Show the marketplace, product id and canonical URL for a product URL.
    Detect { url: String },
    /// List registered providers and the configured chain per platform.
    Providers,
    /// Print the estimated cost of one scrape.
    Cost {
        /// Provider name, e.g. `apify` or `oxylabs+vision`.
        provider: String,
        platform: Platform,
    },
}

/// Used until a command loads `LISTPORT_LOG_LEVEL` from the app config.
const DEFAULT_LOG_LEVEL: &str = "info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scrape {
            url,
            force_refresh,
            pretty,
        } => {
            let config = load_config()?;
            commands::run_scrape(&config, &url, force_refresh, pretty).await?;
        }
        Commands::Providers => {
            let config = load_config()?;
            commands::run_providers(&config)?;
        }
        Commands::Detect { url } => {
            init_tracing(DEFAULT_LOG_LEVEL)?;
            commands::run_detect(&url)?;
        }
        Commands::Cost { provider, platform } => {
            init_tracing(DEFAULT_LOG_LEVEL)?;
            commands::run_cost(&provider, platform);
        }
    }

    Ok(())
}

/// Loads `.env` and the app config, then installs logging at its level.
fn load_config() -> anyhow::Result<AppConfig> {
    let config = listport_core::load_app_config()?;
    init_tracing(&config.log_level)?;
    Ok(config)
}

fn init_tracing(log_level: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

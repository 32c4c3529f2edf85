use anyhow::Context;
use clap::{Parser, Subcommand};
use configuration::Configuration;
use database::{Database, Repository};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use xeac_client::XeacClient;

/// The main entry point for the curator exhibit backend.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment overrides (e.g. RUST_LOG) from a .env file if present.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    // A missing or malformed settings document is fatal: better to stop here
    // than to fail on the first request.
    let config = Configuration::load(&cli.config)
        .with_context(|| format!("cannot load configuration from {}", cli.config.display()))?;
    let url = config.database_url(cli.test_db)?;
    let db = Database::connect(url).await.context("database connection failed")?;
    let repository = Repository::new(db.pool().clone());

    match cli.command {
        Commands::Serve { addr } => web_server::run_server(addr, repository).await,
        Commands::Ingest {
            identifier,
            major,
            minor,
        } => handle_ingest(&repository, &identifier, major, minor).await,
    }
}

/// Content-management backend for beacon-addressed museum exhibits.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the settings document.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Use the test database URL from the settings document.
    #[arg(long)]
    test_db: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the exhibit HTTP API.
    Serve {
        /// Address to listen on.
        #[arg(long, default_value = "0.0.0.0:3000")]
        addr: SocketAddr,
    },
    /// Scrape an archival description and attach it to a display item.
    Ingest {
        /// XEAC record identifier, e.g. "p_0001".
        #[arg(long)]
        identifier: String,

        /// Beacon major id of the display item to attach to.
        #[arg(long)]
        major: i64,

        /// Beacon minor id of the display item to attach to.
        #[arg(long)]
        minor: i64,
    },
}

/// Fetches one XEAC biography and stores it as a media resource on the
/// display item identified by the beacon pair.
async fn handle_ingest(
    repository: &Repository,
    identifier: &str,
    major: i64,
    minor: i64,
) -> anyhow::Result<()> {
    let item = repository
        .find_display_item_by_beacon(major, minor)
        .await?
        .with_context(|| format!("no display item for beacon {major}/{minor}"))?;

    let client = XeacClient::new();
    let (resource, created) = client.fetch_resource(repository, identifier, &item).await?;

    if created {
        tracing::info!(id = resource.id, "Stored new media resource");
    } else {
        tracing::info!(id = resource.id, "Media resource already present");
    }
    println!("{}", serde_json::to_string_pretty(&resource.projection())?);
    Ok(())
}

use configuration::Configuration;
use database::{Database, Repository};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

// This main function is the entry point when running `cargo run -p web-server`.
// The full application binary (`curator serve`) is the usual front door; this
// one reads `config.json` from the working directory and serves on :3000.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Configuration::load("config.json")?;
    let db = Database::connect(config.database_url(false)?).await?;
    let repository = Repository::new(db.pool().clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    web_server::run_server(addr, repository).await
}

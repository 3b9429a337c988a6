use std::sync::Arc;

use anyhow::Result;
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rest_api::config::load_server_config;
use rest_api::{seed, start_server};
use storage::{ClinicStore, SledAccountStorage};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_server_config(None)?;
    info!("opening clinic store at {}", config.data_directory);
    let store = ClinicStore::open(&config.data_directory)?;
    let accounts = Arc::new(SledAccountStorage::new(store.db())?);

    seed::run(&store, accounts.as_ref()).await?;

    start_server(config, store, accounts).await
}

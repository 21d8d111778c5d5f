// src/main.rs
use std::env;

use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

use property_pilot::storage::ReceiptStore;
use property_pilot::{backend, database};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let pool = database::db::connection::get_db_pool().await?;
    database::db::migrate::run_migrations(&pool).await?;

    let base_dir = env::var("RECEIPTS_BASE_DIR").unwrap_or_else(|_| "receipts".to_string());
    let receipts = ReceiptStore::new(base_dir);
    tracing::info!("storing receipts under {}", receipts.base_dir().display());

    backend::run_server(pool, receipts).await
}

pub mod handlers;
pub mod routes;

use axum::{routing::get, Router};
use sqlx::{Pool, Sqlite};
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::storage::ReceiptStore;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Sqlite>,
    pub receipts: Arc<ReceiptStore>,
}

pub async fn run_server(pool: Pool<Sqlite>, receipts: ReceiptStore) -> anyhow::Result<()> {
    let state = AppState {
        db: pool,
        receipts: Arc::new(receipts),
    };

    let app = Router::new()
        .route("/health", get(|| async { "Backend is running" }))
        .merge(routes::api_routes())
        .with_state(state);

    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
        .parse()?;
    tracing::info!("server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

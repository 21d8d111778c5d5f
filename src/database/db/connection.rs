use anyhow::Context;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::env;

pub async fn get_db_pool() -> anyhow::Result<Pool<Sqlite>> {
    let db_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .context("failed to connect to database")
}

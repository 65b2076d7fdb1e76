use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

/// Initialize a PostgreSQL connection pool and apply pending migrations.
pub async fn init_db(database_url: &str) -> Result<PgPool, sqlx::Error> {
    info!("Connecting to database...");

    // Create a new PostgreSQL connection pool with a maximum of 5 connections
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("Database connection established");
    Ok(pool)
}

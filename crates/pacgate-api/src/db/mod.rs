//! # Database Persistence Layer
//!
//! PostgreSQL persistence for companies, API keys and fiscal documents via
//! SQLx. The functions here are thin, pool-taking queries; the
//! [`StatusStore`](crate::store::StatusStore) semantics (compare-and-set,
//! not-found vs conflict) live in [`crate::store::postgres`].
//!
//! The database is **optional**. Without `DATABASE_URL` the service runs on
//! the in-memory store and nothing survives a restart.

pub mod companies;
pub mod documents;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Open the connection pool and apply embedded migrations.
///
/// Returns `None` if no URL is configured (in-memory mode). Returns `Err` if
/// the URL is set but the connection or migration fails.
pub async fn init_pool(
    database_url: Option<&str>,
    max_connections: u32,
) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = database_url else {
        tracing::warn!(
            "DATABASE_URL not set; running with the in-memory store. \
             Documents will not survive restarts."
        );
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;
    tracing::info!(max_connections, "connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    Ok(Some(pool))
}

/// Build a decode error for a row that does not map onto a domain record.
pub(crate) fn corrupt_row(id: impl std::fmt::Display, reason: impl std::fmt::Display) -> sqlx::Error {
    tracing::error!(%id, %reason, "stored row does not decode into a domain record");
    sqlx::Error::Decode(format!("row {id}: {reason}").into())
}

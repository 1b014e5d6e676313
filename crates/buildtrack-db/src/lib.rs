//! Database layer for BuildTrack.
//!
//! Provides the build repository trait, a PostgreSQL implementation, an
//! in-memory implementation, and the change feed that publishes row changes.

pub mod error;
pub mod feed;
pub mod repo;

pub use error::{DbError, DbResult};
pub use feed::ChangeFeed;
pub use repo::*;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Create a new database connection pool.
pub async fn create_pool(database_url: &str) -> DbResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Run database migrations.
pub async fn run_migrations(pool: &PgPool) -> DbResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

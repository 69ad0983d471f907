//! Persistence layer: entity models, the generic registry and its stores.
//!
//! - [`record`]: the [`Record`](record::Record) trait every entity implements.
//! - [`store`]: the [`Store`](store::Store) seam with PostgreSQL and
//!   in-memory backends.
//! - [`registry`]: generic CRUD + preload + outbox event emission.
//! - [`models`]: entity rows, response DTOs and request DTOs.
//! - [`repositories`]: per-entity registry wiring, lookups and seeds.

use sqlx::postgres::PgPoolOptions;

pub mod error;
pub mod models;
pub mod outbox;
pub mod preload;
pub mod record;
pub mod registry;
pub mod repositories;
pub mod seed;
pub mod store;

pub use error::DbError;
pub use registry::{EntityRequest, Registry, RegistryParams};
pub use store::memory::MemoryStore;
pub use store::postgres::PgStore;
pub use store::Store;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify the pool can reach the server.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations under `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}

//! Repository layer for database operations

pub mod workflow;

use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};

pub use workflow::{Openaccess, Theses, WorkflowKind, WorkflowRepository};

use crate::{config::DatabaseConfig, error::AppResult};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Sqlite>,
    pub theses: WorkflowRepository<Theses>,
    pub openaccess: WorkflowRepository<Openaccess>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            theses: WorkflowRepository::new(pool.clone()),
            openaccess: WorkflowRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect to the configured database
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;

        tracing::info!("Connected to database");
        Ok(Self::new(pool))
    }

    /// Apply pending migrations
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(sqlx::Error::from)?;

        tracing::info!("Database migrations completed");
        Ok(())
    }
}

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use crate::database::sqlite::models::{NewPage, Page, PageStatus, PageUpdate};
use crate::database::sqlite::queries::PageQueries;


pub mod models;
pub mod queries;

pub type DbPool = Pool<Sqlite>;

/// Catalog of indexed pages, backed by SQLite
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(database_url: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_url)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    pub async fn initialize_from_config_dir(config_dir: &Path) -> Result<Self> {
        let db_path = config_dir.join("catalog.db");
        let db_url = db_path.to_string_lossy();

        std::fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        Self::new(db_url.as_ref()).await
    }

    pub async fn create_page(&self, page: NewPage) -> Result<Page> {
        PageQueries::create(&self.pool, page).await
    }

    pub async fn get_page(&self, id: i64) -> Result<Option<Page>> {
        PageQueries::get_by_id(&self.pool, id).await
    }

    pub async fn get_page_by_page_id(&self, page_id: &str) -> Result<Option<Page>> {
        PageQueries::get_by_page_id(&self.pool, page_id).await
    }

    pub async fn list_pages(&self) -> Result<Vec<Page>> {
        PageQueries::list_all(&self.pool).await
    }

    pub async fn list_pages_by_status(&self, status: PageStatus) -> Result<Vec<Page>> {
        PageQueries::list_by_status(&self.pool, status).await
    }

    pub async fn update_page(&self, id: i64, update: PageUpdate) -> Result<Option<Page>> {
        PageQueries::update(&self.pool, id, update).await
    }

    pub async fn delete_page(&self, id: i64) -> Result<bool> {
        PageQueries::delete(&self.pool, id).await
    }

    pub async fn total_chunk_count(&self) -> Result<i64> {
        PageQueries::count_chunks(&self.pool).await
    }
}

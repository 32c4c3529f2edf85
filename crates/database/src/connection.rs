//! Connection pool construction and idempotent schema bootstrap.

use crate::error::DbError;
use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;
use std::sync::Once;
use std::time::Duration;

static INSTALL_DRIVERS: Once = Once::new();

/// The concrete engine behind a connection URL. Only the DDL dialect
/// branches on this; everything else goes through the Any driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    Sqlite,
}

impl Backend {
    fn from_url(url: &str) -> Result<Self, DbError> {
        if url.starts_with("postgres:") || url.starts_with("postgresql:") {
            Ok(Backend::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(Backend::Sqlite)
        } else {
            let scheme = url.split(':').next().unwrap_or(url);
            Err(DbError::UnsupportedScheme(scheme.to_string()))
        }
    }

    fn id_column(self) -> &'static str {
        match self {
            Backend::Postgres => "id BIGSERIAL PRIMARY KEY",
            Backend::Sqlite => "id INTEGER PRIMARY KEY AUTOINCREMENT",
        }
    }
}

/// Owns the connection pool for one configured database.
///
/// Constructed once at startup from the configured URL and passed down;
/// cloning shares the underlying pool. Connecting ensures the full schema
/// exists, so a fresh database is usable immediately.
#[derive(Debug, Clone)]
pub struct Database {
    pool: AnyPool,
    backend: Backend,
}

impl Database {
    /// Connects to `url`, establishing the schema if it is missing.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);
        let backend = Backend::from_url(url)?;

        let pool = AnyPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await?;

        let db = Self { pool, backend };
        db.ensure_schema().await?;
        db.seed().await?;
        Ok(db)
    }

    /// The shared connection pool.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Idempotent "create if missing" over all entity tables and indexes.
    async fn ensure_schema(&self) -> Result<(), DbError> {
        for statement in schema_statements(self.backend) {
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        tracing::debug!(backend = ?self.backend, "Schema bootstrap complete");
        Ok(())
    }

    /// Data-seeding hook run once after the schema bootstrap. Intentionally
    /// empty; curation happens through the repository and the XEAC client.
    async fn seed(&self) -> Result<(), DbError> {
        Ok(())
    }
}

fn schema_statements(backend: Backend) -> Vec<String> {
    let id = backend.id_column();
    vec![
        format!(
            "CREATE TABLE IF NOT EXISTS display_items ( \
                {id}, \
                beacon_major_id BIGINT NOT NULL, \
                beacon_minor_id BIGINT NOT NULL, \
                title TEXT, \
                cover_image TEXT \
            )"
        ),
        // The beacon pair is the external lookup key; the unique index keeps
        // duplicate pairs out and makes get-or-create race-safe.
        "CREATE UNIQUE INDEX IF NOT EXISTS ux_display_items_beacon \
            ON display_items (beacon_major_id, beacon_minor_id)"
            .to_string(),
        "CREATE INDEX IF NOT EXISTS ix_display_items_title ON display_items (title)".to_string(),
        format!(
            "CREATE TABLE IF NOT EXISTS collections ( \
                {id}, \
                name TEXT NOT NULL, \
                curator TEXT \
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS items_collections ( \
                {id}, \
                item_id BIGINT NOT NULL REFERENCES display_items (id) ON DELETE CASCADE, \
                collection_id BIGINT NOT NULL REFERENCES collections (id) ON DELETE CASCADE \
            )"
        ),
        "CREATE UNIQUE INDEX IF NOT EXISTS ux_items_collections_pair \
            ON items_collections (item_id, collection_id)"
            .to_string(),
        "CREATE INDEX IF NOT EXISTS ix_items_collections_collection \
            ON items_collections (collection_id)"
            .to_string(),
        format!(
            "CREATE TABLE IF NOT EXISTS media_resources ( \
                {id}, \
                display_item_id BIGINT NOT NULL REFERENCES display_items (id) ON DELETE CASCADE, \
                title TEXT, \
                snippet TEXT, \
                description TEXT, \
                direct_url TEXT \
            )"
        ),
        "CREATE INDEX IF NOT EXISTS ix_media_resources_item \
            ON media_resources (display_item_id)"
            .to_string(),
    ]
}

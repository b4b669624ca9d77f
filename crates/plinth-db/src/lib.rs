//! # plinth-db
//!
//! PostgreSQL database layer for the plinth collection manager.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for all core entities
//! - The paginated, search-filtered miniature query engine
//! - The append-only audit log store
//!
//! ## Example
//!
//! ```rust,ignore
//! use plinth_core::{ListMiniaturesRequest, MiniatureRepository};
//! use plinth_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/plinth").await?;
//!
//!     let page = db
//!         .miniatures
//!         .list(ListMiniaturesRequest {
//!             page: 0,
//!             page_size: 25,
//!             search: Some("goblin".to_string()),
//!         })
//!         .await?;
//!
//!     println!("{} of {} miniatures", page.rows.len(), page.total);
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod catalog;
pub mod lookups;
pub mod miniatures;
pub mod pool;
pub mod tags;
pub mod taxonomy;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use plinth_core::*;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

// Re-export repository implementations
pub use audit::PgAuditLogRepository;
pub use catalog::PgCatalogRepository;
pub use lookups::PgLookupRepository;
pub use miniatures::PgMiniatureRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use tags::PgTagRepository;
pub use taxonomy::{PgCategoryRepository, PgTypeRepository};

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Miniature repository (paginated query engine + write steps).
    pub miniatures: PgMiniatureRepository,
    /// Tag repository (lazy get-or-create).
    pub tags: PgTagRepository,
    /// Type taxonomy repository.
    pub types: PgTypeRepository,
    /// Category repository.
    pub categories: PgCategoryRepository,
    /// Product catalog repository (company/line/set).
    pub catalog: PgCatalogRepository,
    /// Painter and base-size lookups.
    pub lookups: PgLookupRepository,
    /// Append-only audit history.
    pub audit: PgAuditLogRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            miniatures: PgMiniatureRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            types: PgTypeRepository::new(pool.clone()),
            categories: PgCategoryRepository::new(pool.clone()),
            catalog: PgCatalogRepository::new(pool.clone()),
            lookups: PgLookupRepository::new(pool.clone()),
            audit: PgAuditLogRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

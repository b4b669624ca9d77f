//! Painter and base-size lookup repository.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use plinth_core::{BaseSize, Error, LookupRepository, Painter, Result};

/// PostgreSQL implementation of LookupRepository.
pub struct PgLookupRepository {
    pool: Pool<Postgres>,
}

impl PgLookupRepository {
    /// Create a new PgLookupRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LookupRepository for PgLookupRepository {
    async fn list_painters(&self) -> Result<Vec<Painter>> {
        sqlx::query_as::<_, Painter>("SELECT id, name FROM painter ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }

    async fn list_base_sizes(&self) -> Result<Vec<BaseSize>> {
        sqlx::query_as::<_, BaseSize>("SELECT id, name FROM base_size ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }
}

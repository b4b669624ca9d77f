//! Tag repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use tracing::debug;

use plinth_core::{Error, Result, Tag, TagRepository, TagWithUsage};

/// PostgreSQL implementation of TagRepository.
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    /// Create a new PgTagRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn list(&self) -> Result<Vec<TagWithUsage>> {
        let tags = sqlx::query_as::<_, TagWithUsage>(
            r#"
            SELECT t.id, t.name, COUNT(mt.miniature_id) AS miniature_count
            FROM tag t
            LEFT JOIN miniature_tag mt ON mt.tag_id = t.id
            GROUP BY t.id, t.name
            ORDER BY t.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(tags)
    }

    async fn get_or_create(&self, name: &str) -> Result<Tag> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("tag name cannot be empty".to_string()));
        }

        // Pre-check by case-insensitive name. Read-then-insert, so a
        // concurrent writer can still slip a duplicate past us; there is
        // no unique constraint backing this up.
        let existing = sqlx::query_as::<_, Tag>(
            "SELECT id, name FROM tag WHERE LOWER(name) = LOWER($1) ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        if let Some(tag) = existing {
            return Ok(tag);
        }

        let tag = sqlx::query_as::<_, Tag>("INSERT INTO tag (name) VALUES ($1) RETURNING id, name")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "tags",
            op = "create",
            tag_id = tag.id,
            "Created tag lazily"
        );

        Ok(tag)
    }
}

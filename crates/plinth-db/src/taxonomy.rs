//! Type and category repository implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use plinth_core::{
    Category, CategoryRepository, Error, MiniType, Result, TypeRepository, TypeWithCategories,
};

/// PostgreSQL implementation of TypeRepository.
pub struct PgTypeRepository {
    pool: Pool<Postgres>,
}

impl PgTypeRepository {
    /// Create a new PgTypeRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TypeRepository for PgTypeRepository {
    async fn list_with_categories(&self) -> Result<Vec<TypeWithCategories>> {
        let types = sqlx::query_as::<_, MiniType>("SELECT id, name FROM mini_type ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        let type_ids: Vec<i64> = types.iter().map(|t| t.id).collect();
        let category_rows = sqlx::query(
            r#"
            SELECT tc.type_id, c.id, c.name
            FROM type_category tc
            JOIN category c ON c.id = tc.category_id
            WHERE tc.type_id = ANY($1)
            ORDER BY tc.type_id, c.name
            "#,
        )
        .bind(&type_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut by_type: HashMap<i64, Vec<Category>> = HashMap::new();
        for row in category_rows {
            by_type.entry(row.get("type_id")).or_default().push(Category {
                id: row.get("id"),
                name: row.get("name"),
            });
        }

        Ok(types
            .into_iter()
            .map(|t| TypeWithCategories {
                categories: by_type.remove(&t.id).unwrap_or_default(),
                id: t.id,
                name: t.name,
            })
            .collect())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<MiniType>> {
        let found = sqlx::query_as::<_, MiniType>(
            "SELECT id, name FROM mini_type WHERE LOWER(name) = LOWER($1) ORDER BY id LIMIT 1",
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(found)
    }

    async fn insert(&self, name: &str) -> Result<MiniType> {
        let created = sqlx::query_as::<_, MiniType>(
            "INSERT INTO mini_type (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name.trim())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(created)
    }

    async fn rename(&self, id: i64, name: &str) -> Result<()> {
        let result = sqlx::query("UPDATE mini_type SET name = $1 WHERE id = $2")
            .bind(name.trim())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("type {id}")));
        }
        Ok(())
    }

    async fn replace_categories(&self, type_id: i64, category_ids: &[i64]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query("DELETE FROM type_category WHERE type_id = $1")
            .bind(type_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        for category_id in category_ids {
            sqlx::query(
                "INSERT INTO type_category (type_id, category_id) VALUES ($1, $2) \
                 ON CONFLICT (type_id, category_id) DO NOTHING",
            )
            .bind(type_id)
            .bind(category_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM mini_type WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("type {id}")));
        }
        Ok(())
    }

    async fn assignment_count(&self, id: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM miniature_type WHERE type_id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;

        Ok(count)
    }
}

/// PostgreSQL implementation of CategoryRepository.
pub struct PgCategoryRepository {
    pool: Pool<Postgres>,
}

impl PgCategoryRepository {
    /// Create a new PgCategoryRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn list(&self) -> Result<Vec<Category>> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT id, name FROM category ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(Error::Database)?;

        Ok(categories)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Category>> {
        let found = sqlx::query_as::<_, Category>(
            "SELECT id, name FROM category WHERE LOWER(name) = LOWER($1) ORDER BY id LIMIT 1",
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(found)
    }

    async fn insert(&self, name: &str) -> Result<Category> {
        let created = sqlx::query_as::<_, Category>(
            "INSERT INTO category (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name.trim())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(created)
    }

    async fn rename(&self, id: i64, name: &str) -> Result<()> {
        let result = sqlx::query("UPDATE category SET name = $1 WHERE id = $2")
            .bind(name.trim())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("category {id}")));
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM category WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("category {id}")));
        }
        Ok(())
    }

    async fn type_reference_count(&self, id: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM type_category WHERE category_id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;

        Ok(count)
    }
}

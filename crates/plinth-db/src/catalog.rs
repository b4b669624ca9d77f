//! Product catalog repository implementation.
//!
//! Three-level hierarchy: company -> product line -> product set.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use plinth_core::{CatalogRepository, Company, Error, ProductLine, ProductSet, Result};

/// PostgreSQL implementation of CatalogRepository.
pub struct PgCatalogRepository {
    pool: Pool<Postgres>,
}

impl PgCatalogRepository {
    /// Create a new PgCatalogRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn list_companies(&self) -> Result<Vec<Company>> {
        sqlx::query_as::<_, Company>("SELECT id, name FROM company ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }

    async fn insert_company(&self, name: &str) -> Result<Company> {
        sqlx::query_as::<_, Company>("INSERT INTO company (name) VALUES ($1) RETURNING id, name")
            .bind(name.trim())
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)
    }

    async fn rename_company(&self, id: i64, name: &str) -> Result<()> {
        let result = sqlx::query("UPDATE company SET name = $1 WHERE id = $2")
            .bind(name.trim())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("company {id}")));
        }
        Ok(())
    }

    async fn delete_company(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM company WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("company {id}")));
        }
        Ok(())
    }

    async fn list_product_lines(&self) -> Result<Vec<ProductLine>> {
        sqlx::query_as::<_, ProductLine>(
            "SELECT id, name, company_id FROM product_line ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)
    }

    async fn insert_product_line(&self, company_id: i64, name: &str) -> Result<ProductLine> {
        sqlx::query_as::<_, ProductLine>(
            "INSERT INTO product_line (name, company_id) VALUES ($1, $2) \
             RETURNING id, name, company_id",
        )
        .bind(name.trim())
        .bind(company_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)
    }

    async fn rename_product_line(&self, id: i64, name: &str) -> Result<()> {
        let result = sqlx::query("UPDATE product_line SET name = $1 WHERE id = $2")
            .bind(name.trim())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("product line {id}")));
        }
        Ok(())
    }

    async fn delete_product_line(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM product_line WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("product line {id}")));
        }
        Ok(())
    }

    async fn list_product_sets(&self) -> Result<Vec<ProductSet>> {
        sqlx::query_as::<_, ProductSet>(
            "SELECT id, name, product_line_id FROM product_set ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)
    }

    async fn insert_product_set(&self, product_line_id: i64, name: &str) -> Result<ProductSet> {
        sqlx::query_as::<_, ProductSet>(
            "INSERT INTO product_set (name, product_line_id) VALUES ($1, $2) \
             RETURNING id, name, product_line_id",
        )
        .bind(name.trim())
        .bind(product_line_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)
    }

    async fn rename_product_set(&self, id: i64, name: &str) -> Result<()> {
        let result = sqlx::query("UPDATE product_set SET name = $1 WHERE id = $2")
            .bind(name.trim())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("product set {id}")));
        }
        Ok(())
    }

    async fn delete_product_set(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM product_set WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("product set {id}")));
        }
        Ok(())
    }
}

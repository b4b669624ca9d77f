//! Miniature repository implementation.
//!
//! The listing queries here are the paginated query engine: one
//! range-bounded, optionally ILIKE-filtered select for the page plus a
//! count of all matching rows, then batched `= ANY(...)` queries to
//! attach types, categories, and tags for the whole page at once. The
//! nested shape never costs one query per row.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use tracing::debug;

use plinth_core::{
    AssignedType, Category, Company, Error, ListMiniaturesRequest, Miniature, MiniatureFields,
    MiniatureOverview, MiniaturePage, MiniatureRepository, ProductChain, ProductLine, ProductSet,
    Result, Tag, TypeAssignment,
};

use crate::escape_like;

/// PostgreSQL implementation of MiniatureRepository.
pub struct PgMiniatureRepository {
    pool: Pool<Postgres>,
}

impl PgMiniatureRepository {
    /// Create a new PgMiniatureRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Normalize a search term into an ILIKE pattern, or None when the
    /// term is empty/whitespace.
    fn search_pattern(search: Option<&str>) -> Option<String> {
        let term = search?.trim();
        if term.is_empty() {
            return None;
        }
        Some(format!("%{}%", escape_like(term)))
    }

    /// Base select for the scalar row joined with the product chain.
    const BASE_SELECT: &'static str = r#"
        SELECT m.id, m.name, m.description, m.location, m.quantity,
               m.painted_by_id, m.base_size_id, m.product_set_id,
               m.in_use_since, m.created_at, m.updated_at,
               ps.id   AS set_id,     ps.name AS set_name,
               ps.product_line_id     AS set_line_id,
               pl.id   AS line_id,    pl.name AS line_name,
               pl.company_id          AS line_company_id,
               co.id   AS company_id, co.name AS company_name
        FROM miniature m
        LEFT JOIN product_set ps  ON ps.id = m.product_set_id
        LEFT JOIN product_line pl ON pl.id = ps.product_line_id
        LEFT JOIN company co      ON co.id = pl.company_id
    "#;

    fn map_base_row(row: &sqlx::postgres::PgRow) -> (Miniature, Option<ProductChain>) {
        let miniature = Miniature {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            location: row.get("location"),
            quantity: row.get("quantity"),
            painted_by_id: row.get("painted_by_id"),
            base_size_id: row.get("base_size_id"),
            product_set_id: row.get("product_set_id"),
            in_use_since: row.get("in_use_since"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        };

        let product = match (
            row.get::<Option<i64>, _>("set_id"),
            row.get::<Option<i64>, _>("line_id"),
            row.get::<Option<i64>, _>("company_id"),
        ) {
            (Some(set_id), Some(line_id), Some(company_id)) => Some(ProductChain {
                set: ProductSet {
                    id: set_id,
                    name: row.get("set_name"),
                    product_line_id: row.get("set_line_id"),
                },
                line: ProductLine {
                    id: line_id,
                    name: row.get("line_name"),
                    company_id: row.get("line_company_id"),
                },
                company: Company {
                    id: company_id,
                    name: row.get("company_name"),
                },
            }),
            _ => None,
        };

        (miniature, product)
    }

    /// Attach types (with categories) and tags to a batch of scalar
    /// rows. Three queries for the whole batch, regardless of its size.
    async fn assemble(
        &self,
        bases: Vec<(Miniature, Option<ProductChain>)>,
    ) -> Result<Vec<MiniatureOverview>> {
        if bases.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = bases.iter().map(|(m, _)| m.id).collect();

        let type_rows = sqlx::query(
            r#"
            SELECT mt.miniature_id, t.id AS type_id, t.name, mt.proxy_type
            FROM miniature_type mt
            JOIN mini_type t ON t.id = mt.type_id
            WHERE mt.miniature_id = ANY($1)
            ORDER BY mt.miniature_id, mt.proxy_type ASC, t.name ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let type_ids: Vec<i64> = type_rows
            .iter()
            .map(|row| row.get::<i64, _>("type_id"))
            .collect();

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

        let mut categories_by_type: HashMap<i64, Vec<Category>> = HashMap::new();
        for row in category_rows {
            categories_by_type
                .entry(row.get("type_id"))
                .or_default()
                .push(Category {
                    id: row.get("id"),
                    name: row.get("name"),
                });
        }

        let mut types_by_miniature: HashMap<i64, Vec<AssignedType>> = HashMap::new();
        for row in type_rows {
            let type_id: i64 = row.get("type_id");
            types_by_miniature
                .entry(row.get("miniature_id"))
                .or_default()
                .push(AssignedType {
                    type_id,
                    name: row.get("name"),
                    proxy_type: row.get("proxy_type"),
                    categories: categories_by_type.get(&type_id).cloned().unwrap_or_default(),
                });
        }

        let tag_rows = sqlx::query(
            r#"
            SELECT mt.miniature_id, t.id, t.name
            FROM miniature_tag mt
            JOIN tag t ON t.id = mt.tag_id
            WHERE mt.miniature_id = ANY($1)
            ORDER BY mt.miniature_id, t.name
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut tags_by_miniature: HashMap<i64, Vec<Tag>> = HashMap::new();
        for row in tag_rows {
            tags_by_miniature
                .entry(row.get("miniature_id"))
                .or_default()
                .push(Tag {
                    id: row.get("id"),
                    name: row.get("name"),
                });
        }

        Ok(bases
            .into_iter()
            .map(|(miniature, product)| {
                let id = miniature.id;
                MiniatureOverview {
                    miniature,
                    types: types_by_miniature.remove(&id).unwrap_or_default(),
                    tags: tags_by_miniature.remove(&id).unwrap_or_default(),
                    product,
                }
            })
            .collect())
    }
}

#[async_trait]
impl MiniatureRepository for PgMiniatureRepository {
    async fn list(&self, req: ListMiniaturesRequest) -> Result<MiniaturePage> {
        let pattern = Self::search_pattern(req.search.as_deref());

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM miniature m WHERE $1::text IS NULL OR m.name ILIKE $1",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        let query = format!(
            "{} WHERE $1::text IS NULL OR m.name ILIKE $1 \
             ORDER BY m.name ASC, m.id ASC LIMIT $2 OFFSET $3",
            Self::BASE_SELECT
        );
        let rows = sqlx::query(&query)
            .bind(&pattern)
            .bind(req.page_size)
            .bind(req.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        let bases = rows.iter().map(Self::map_base_row).collect();
        let overviews = self.assemble(bases).await?;

        debug!(
            subsystem = "db",
            component = "miniatures",
            op = "list",
            page = req.page,
            search = req.search.as_deref().unwrap_or(""),
            result_count = overviews.len(),
            total,
            "Listed miniatures"
        );

        Ok(MiniaturePage {
            rows: overviews,
            total,
        })
    }

    async fn list_all(&self) -> Result<Vec<MiniatureOverview>> {
        let query = format!("{} ORDER BY m.name ASC, m.id ASC", Self::BASE_SELECT);
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        let bases = rows.iter().map(Self::map_base_row).collect();
        self.assemble(bases).await
    }

    async fn fetch_overview(&self, id: i64) -> Result<MiniatureOverview> {
        let query = format!("{} WHERE m.id = $1", Self::BASE_SELECT);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::MiniatureNotFound(id))?;

        let mut overviews = self.assemble(vec![Self::map_base_row(&row)]).await?;
        // assemble() preserves input order and length
        Ok(overviews.remove(0))
    }

    async fn insert(&self, fields: &MiniatureFields) -> Result<Miniature> {
        let miniature = sqlx::query_as::<_, Miniature>(
            r#"
            INSERT INTO miniature
                (name, description, location, quantity,
                 painted_by_id, base_size_id, product_set_id, in_use_since)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, name, description, location, quantity,
                      painted_by_id, base_size_id, product_set_id,
                      in_use_since, created_at, updated_at
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.location)
        .bind(fields.quantity)
        .bind(fields.painted_by_id)
        .bind(fields.base_size_id)
        .bind(fields.product_set_id)
        .bind(fields.in_use_since)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(miniature)
    }

    async fn update_fields(&self, id: i64, fields: &MiniatureFields) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE miniature
            SET name = $1, description = $2, location = $3, quantity = $4,
                painted_by_id = $5, base_size_id = $6, product_set_id = $7,
                in_use_since = $8, updated_at = NOW()
            WHERE id = $9
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.location)
        .bind(fields.quantity)
        .bind(fields.painted_by_id)
        .bind(fields.base_size_id)
        .bind(fields.product_set_id)
        .bind(fields.in_use_since)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::MiniatureNotFound(id));
        }
        Ok(())
    }

    async fn replace_types(&self, id: i64, types: &[TypeAssignment]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query("DELETE FROM miniature_type WHERE miniature_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        for assignment in types {
            sqlx::query(
                "INSERT INTO miniature_type (miniature_id, type_id, proxy_type) \
                 VALUES ($1, $2, $3)",
            )
            .bind(id)
            .bind(assignment.type_id)
            .bind(assignment.proxy_type)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn replace_tags(&self, id: i64, tag_ids: &[i64]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query("DELETE FROM miniature_tag WHERE miniature_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        for tag_id in tag_ids {
            sqlx::query(
                "INSERT INTO miniature_tag (miniature_id, tag_id) VALUES ($1, $2) \
                 ON CONFLICT (miniature_id, tag_id) DO NOTHING",
            )
            .bind(id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn assign_type(&self, id: i64, assignment: TypeAssignment) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // At most one assignment may be the main type. An incoming main
        // demotes whatever currently holds the flag.
        if !assignment.proxy_type {
            sqlx::query(
                "UPDATE miniature_type SET proxy_type = TRUE \
                 WHERE miniature_id = $1 AND proxy_type = FALSE AND type_id <> $2",
            )
            .bind(id)
            .bind(assignment.type_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        sqlx::query(
            "INSERT INTO miniature_type (miniature_id, type_id, proxy_type) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (miniature_id, type_id) DO UPDATE SET proxy_type = EXCLUDED.proxy_type",
        )
        .bind(id)
        .bind(assignment.type_id)
        .bind(assignment.proxy_type)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn remove_type(&self, id: i64, type_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let removed: Option<(bool,)> = sqlx::query_as(
            "DELETE FROM miniature_type WHERE miniature_id = $1 AND type_id = $2 \
             RETURNING proxy_type",
        )
        .bind(id)
        .bind(type_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?;

        // Removing the main type promotes the first remaining assignment.
        if let Some((false,)) = removed {
            sqlx::query(
                r#"
                UPDATE miniature_type SET proxy_type = FALSE
                WHERE miniature_id = $1
                  AND type_id = (
                      SELECT type_id FROM miniature_type
                      WHERE miniature_id = $1
                      ORDER BY type_id ASC
                      LIMIT 1
                  )
                "#,
            )
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn set_in_use(&self, id: i64, since: Option<DateTime<Utc>>) -> Result<()> {
        let result =
            sqlx::query("UPDATE miniature SET in_use_since = $1, updated_at = NOW() WHERE id = $2")
                .bind(since)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::MiniatureNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM miniature WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::MiniatureNotFound(id));
        }
        Ok(())
    }
}

//! Audit log repository for miniature history entries.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use plinth_core::{AuditAction, AuditLogEntry, AuditLogRepository, Error, NewAuditEntry, Result};

/// PostgreSQL implementation of AuditLogRepository. Entries are
/// append-only; there is no update or delete surface.
pub struct PgAuditLogRepository {
    pool: Pool<Postgres>,
}

impl PgAuditLogRepository {
    /// Create a new PgAuditLogRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLogRepository for PgAuditLogRepository {
    async fn append(&self, entry: NewAuditEntry) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO audit_log (user_id, miniature_id, action, changes, metadata)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&entry.user_id)
        .bind(entry.miniature_id)
        .bind(entry.action.as_str())
        .bind(&entry.changes)
        .bind(&entry.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn list_for_miniature(&self, miniature_id: i64) -> Result<Vec<AuditLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, miniature_id, action, changes, metadata, created_at
            FROM audit_log
            WHERE miniature_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(miniature_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter()
            .map(|row| {
                let action: String = row.get("action");
                let action = AuditAction::parse(&action)
                    .ok_or_else(|| Error::Internal(format!("unknown audit action: {action}")))?;
                Ok(AuditLogEntry {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    miniature_id: row.get("miniature_id"),
                    action,
                    changes: row.get("changes"),
                    metadata: row.get("metadata"),
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }
}

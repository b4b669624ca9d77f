//! Audit trail service.
//!
//! Sits between the write service and the audit log repository. Update
//! logging is diff-driven: an entry is written only when the tracked
//! fields actually differ. Create/delete/image/type events always log,
//! recording a snapshot instead of a diff.
//!
//! Audit persistence is best-effort: a failure here is logged at WARN
//! and swallowed, never allowed to block or roll back the primary write
//! it annotates. No authenticated user means no attribution is
//! possible, so nothing is written and that is not an error either.

use std::sync::Arc;

use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use plinth_core::{
    detect_changes, AuditAction, AuditLogRepository, IdentityProvider, MiniatureSnapshot,
    NewAuditEntry,
};

/// Diff-driven, best-effort writer for the miniature history log.
pub struct AuditService {
    repo: Arc<dyn AuditLogRepository>,
    identity: Arc<dyn IdentityProvider>,
}

impl AuditService {
    pub fn new(repo: Arc<dyn AuditLogRepository>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { repo, identity }
    }

    /// Log an update as a field-level change-set. A no-op diff writes
    /// nothing at all.
    pub async fn log_update(
        &self,
        miniature_id: i64,
        before: &MiniatureSnapshot,
        after: &MiniatureSnapshot,
    ) {
        let Some(user) = self.identity.current_user() else {
            debug!(
                subsystem = "audit",
                miniature_id, "no authenticated user, skipping audit entry"
            );
            return;
        };

        let Some(changes) = detect_changes(before, after) else {
            debug!(
                subsystem = "audit",
                miniature_id, "no tracked fields changed, skipping audit entry"
            );
            return;
        };

        self.append(NewAuditEntry {
            user_id: user.id,
            miniature_id,
            action: AuditAction::MiniatureUpdate,
            changes: Some(json!(changes)),
            metadata: None,
        })
        .await;
    }

    /// Log a creation with the full initial snapshot. Always writes.
    pub async fn log_create(&self, miniature_id: i64, snapshot: &MiniatureSnapshot) {
        let Some(user) = self.identity.current_user() else {
            return;
        };
        self.append(NewAuditEntry {
            user_id: user.id,
            miniature_id,
            action: AuditAction::MiniatureCreate,
            changes: None,
            metadata: Some(json!(snapshot)),
        })
        .await;
    }

    /// Log a deletion with the last known snapshot. Always writes.
    pub async fn log_delete(&self, miniature_id: i64, snapshot: &MiniatureSnapshot) {
        let Some(user) = self.identity.current_user() else {
            return;
        };
        self.append(NewAuditEntry {
            user_id: user.id,
            miniature_id,
            action: AuditAction::MiniatureDelete,
            changes: None,
            metadata: Some(json!(snapshot)),
        })
        .await;
    }

    /// Log an image upload/replace/delete. Always writes.
    pub async fn log_image(&self, action: AuditAction, miniature_id: i64, metadata: JsonValue) {
        let Some(user) = self.identity.current_user() else {
            return;
        };
        self.append(NewAuditEntry {
            user_id: user.id,
            miniature_id,
            action,
            changes: None,
            metadata: Some(metadata),
        })
        .await;
    }

    /// Log a single type assign/unassign. Always writes.
    pub async fn log_type_event(&self, action: AuditAction, miniature_id: i64, metadata: JsonValue) {
        let Some(user) = self.identity.current_user() else {
            return;
        };
        self.append(NewAuditEntry {
            user_id: user.id,
            miniature_id,
            action,
            changes: None,
            metadata: Some(metadata),
        })
        .await;
    }

    async fn append(&self, entry: NewAuditEntry) {
        let action = entry.action;
        let miniature_id = entry.miniature_id;
        match self.repo.append(entry).await {
            Ok(id) => debug!(
                subsystem = "audit",
                op = "append",
                miniature_id,
                action = action.as_str(),
                entry_id = id,
                "audit entry written"
            ),
            Err(e) => warn!(
                subsystem = "audit",
                op = "append",
                miniature_id,
                action = action.as_str(),
                error = %e,
                "failed to write audit entry, continuing"
            ),
        }
    }
}

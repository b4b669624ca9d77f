//! Miniature write service.
//!
//! Every write is three strictly sequential steps: upsert the scalar
//! row, replace the type associations, replace the tag associations.
//! They are separate backend calls with no enclosing transaction. The
//! ordering matters twice over: type/tag replacement needs the id the
//! scalar step produced (on create), and running the steps back to back
//! keeps the window where a reader can observe a half-written entity as
//! short as it can be without a transaction.
//!
//! A failing step aborts the remaining ones and propagates; the steps
//! that already ran stay persisted. There is no compensating rollback.
//! That partial-write gap matches the system this service fronts and is
//! documented in DESIGN.md rather than papered over here.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use plinth_cache::PageCache;
use plinth_core::{
    ensure_single_main, AuditAction, ChangeBus, ChangeEvent, Error, MiniatureFields,
    MiniatureInput, MiniatureOverview, MiniatureRepository, MiniatureSnapshot, Result,
    TagInput, TagRepository, TypeAssignment, WatchedTable,
};

use crate::audit::AuditService;
use crate::images::ImageStore;

/// Fallback foreign keys applied when the caller leaves painter or
/// base size unset.
#[derive(Debug, Clone, Copy)]
pub struct WriteDefaults {
    pub painted_by_id: i64,
    pub base_size_id: i64,
}

/// Orchestrates miniature writes: validation, the three-step write
/// sequence, temp-tag reconciliation, audit logging, image cleanup,
/// cache invalidation, and change-feed emission.
pub struct MiniatureService {
    minis: Arc<dyn MiniatureRepository>,
    tags: Arc<dyn TagRepository>,
    images: Arc<dyn ImageStore>,
    audit: AuditService,
    bus: Arc<ChangeBus>,
    page_cache: Option<Arc<PageCache<MiniatureOverview>>>,
    defaults: WriteDefaults,
}

impl MiniatureService {
    pub fn new(
        minis: Arc<dyn MiniatureRepository>,
        tags: Arc<dyn TagRepository>,
        images: Arc<dyn ImageStore>,
        audit: AuditService,
        bus: Arc<ChangeBus>,
        defaults: WriteDefaults,
    ) -> Self {
        Self {
            minis,
            tags,
            images,
            audit,
            bus,
            page_cache: None,
            defaults,
        }
    }

    /// Invalidate this page cache after every successful write, on top
    /// of the change-feed emission.
    pub fn with_page_cache(mut self, cache: Arc<PageCache<MiniatureOverview>>) -> Self {
        self.page_cache = Some(cache);
        self
    }

    /// Client-side validation, run before any backend call.
    fn validate(input: &MiniatureInput) -> Result<()> {
        if input.name.trim().is_empty() {
            return Err(Error::InvalidInput("name is required".to_string()));
        }
        if input.quantity < 0 {
            return Err(Error::InvalidInput(
                "quantity must be zero or greater".to_string(),
            ));
        }
        Ok(())
    }

    fn resolve_fields(&self, input: &MiniatureInput) -> MiniatureFields {
        MiniatureFields {
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            location: input.location.trim().to_string(),
            quantity: input.quantity,
            painted_by_id: input.painted_by_id.unwrap_or(self.defaults.painted_by_id),
            base_size_id: input.base_size_id.unwrap_or(self.defaults.base_size_id),
            product_set_id: input.product_set_id,
            in_use_since: input.in_use_since,
        }
    }

    fn normalized_types(input: &MiniatureInput) -> Vec<TypeAssignment> {
        let mut types = input.types.clone();
        ensure_single_main(&mut types);
        types
    }

    /// Reconcile tag inputs to real ids. Temporary (negative) ids are
    /// resolved by case-insensitive get-or-create on the tag name;
    /// duplicates collapse, first occurrence wins.
    async fn resolve_tags(&self, inputs: &[TagInput]) -> Result<Vec<i64>> {
        let mut ids = Vec::with_capacity(inputs.len());
        let mut seen = HashSet::new();
        for input in inputs {
            let id = if input.is_temporary() {
                let tag = self.tags.get_or_create(&input.name).await?;
                debug!(
                    subsystem = "service",
                    component = "miniatures",
                    temp_id = input.id,
                    tag_id = tag.id,
                    "reconciled temporary tag id"
                );
                tag.id
            } else {
                input.id
            };
            if seen.insert(id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    fn after_snapshot(
        fields: &MiniatureFields,
        types: &[TypeAssignment],
        tag_ids: &[i64],
    ) -> MiniatureSnapshot {
        MiniatureSnapshot {
            name: fields.name.clone(),
            description: fields.description.clone(),
            location: fields.location.clone(),
            quantity: fields.quantity,
            painted_by_id: fields.painted_by_id,
            base_size_id: fields.base_size_id,
            product_set_id: fields.product_set_id,
            in_use_since: fields.in_use_since,
            types: types.to_vec(),
            tags: tag_ids.to_vec(),
        }
    }

    fn invalidate_and_emit(&self, change: ChangeEvent) {
        if let Some(cache) = &self.page_cache {
            cache.invalidate();
        }
        self.bus.emit(change);
    }

    /// Create a miniature. Steps: insert scalars (backend assigns the
    /// id), replace types, replace tags.
    pub async fn create(&self, input: MiniatureInput) -> Result<MiniatureOverview> {
        Self::validate(&input)?;
        let fields = self.resolve_fields(&input);
        let types = Self::normalized_types(&input);

        let miniature = self.minis.insert(&fields).await?;
        self.minis.replace_types(miniature.id, &types).await?;
        let tag_ids = self.resolve_tags(&input.tags).await?;
        self.minis.replace_tags(miniature.id, &tag_ids).await?;

        let snapshot = Self::after_snapshot(&fields, &types, &tag_ids);
        self.audit.log_create(miniature.id, &snapshot).await;
        self.invalidate_and_emit(ChangeEvent::insert(WatchedTable::Miniatures, miniature.id));

        info!(
            subsystem = "service",
            component = "miniatures",
            op = "create",
            miniature_id = miniature.id,
            "created miniature"
        );
        self.minis.fetch_overview(miniature.id).await
    }

    /// Update a miniature. Same three steps against an existing row,
    /// with the before-state captured first for the audit diff.
    pub async fn update(&self, id: i64, input: MiniatureInput) -> Result<MiniatureOverview> {
        Self::validate(&input)?;
        let before = self.minis.fetch_overview(id).await?.snapshot();

        let fields = self.resolve_fields(&input);
        let types = Self::normalized_types(&input);

        self.minis.update_fields(id, &fields).await?;
        self.minis.replace_types(id, &types).await?;
        let tag_ids = self.resolve_tags(&input.tags).await?;
        self.minis.replace_tags(id, &tag_ids).await?;

        let after = Self::after_snapshot(&fields, &types, &tag_ids);
        self.audit.log_update(id, &before, &after).await;
        self.invalidate_and_emit(ChangeEvent::update(WatchedTable::Miniatures, id));

        self.minis.fetch_overview(id).await
    }

    /// Delete a miniature. The image goes first, best-effort; the row
    /// delete cascades the associations on the backend.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let before = self.minis.fetch_overview(id).await?.snapshot();

        if let Err(e) = self.images.delete(id).await {
            warn!(
                subsystem = "service",
                component = "miniatures",
                op = "delete",
                miniature_id = id,
                error = %e,
                "image deletion failed, deleting row anyway"
            );
        }

        self.minis.delete(id).await?;

        self.audit.log_delete(id, &before).await;
        self.invalidate_and_emit(ChangeEvent::delete(WatchedTable::Miniatures, id));

        info!(
            subsystem = "service",
            component = "miniatures",
            op = "delete",
            miniature_id = id,
            "deleted miniature"
        );
        Ok(())
    }

    /// Check a miniature out (mark it in use as of now).
    pub async fn mark_in_use(&self, id: i64) -> Result<()> {
        self.set_in_use(id, true).await
    }

    /// Check a miniature back in (clear the in-use marker).
    pub async fn clear_in_use(&self, id: i64) -> Result<()> {
        self.set_in_use(id, false).await
    }

    async fn set_in_use(&self, id: i64, in_use: bool) -> Result<()> {
        let before = self.minis.fetch_overview(id).await?.snapshot();
        let since = in_use.then(Utc::now);

        self.minis.set_in_use(id, since).await?;

        let mut after = before.clone();
        after.in_use_since = since;
        self.audit.log_update(id, &before, &after).await;
        self.invalidate_and_emit(ChangeEvent::update(WatchedTable::Miniatures, id));
        Ok(())
    }

    /// Add a single type assignment. When the new assignment is the
    /// main type, the repository demotes the previous main, so the
    /// miniature never ends up with two.
    pub async fn assign_type(&self, id: i64, assignment: TypeAssignment) -> Result<()> {
        self.minis.assign_type(id, assignment).await?;
        self.audit
            .log_type_event(AuditAction::TypeAssign, id, json!(assignment))
            .await;
        self.invalidate_and_emit(ChangeEvent::update(WatchedTable::Miniatures, id));
        Ok(())
    }

    /// Remove a type assignment. If it was the main type, the backend
    /// promotes the first remaining assignment.
    pub async fn remove_type(&self, id: i64, type_id: i64) -> Result<()> {
        self.minis.remove_type(id, type_id).await?;
        self.audit
            .log_type_event(AuditAction::TypeUnassign, id, json!({ "type_id": type_id }))
            .await;
        self.invalidate_and_emit(ChangeEvent::update(WatchedTable::Miniatures, id));
        Ok(())
    }

    /// Upload or replace the miniature's image.
    pub async fn attach_image(
        &self,
        id: i64,
        bytes: Vec<u8>,
        filename: &str,
        replacing: bool,
    ) -> Result<String> {
        let path = self.images.upload(id, bytes, filename).await?;
        let action = if replacing {
            AuditAction::ImageReplace
        } else {
            AuditAction::ImageUpload
        };
        self.audit
            .log_image(action, id, json!({ "path": path }))
            .await;
        self.invalidate_and_emit(ChangeEvent::update(WatchedTable::Miniatures, id));
        Ok(path)
    }

    /// Remove the miniature's image (the row stays).
    pub async fn remove_image(&self, id: i64) -> Result<()> {
        self.images.delete(id).await?;
        self.audit
            .log_image(AuditAction::ImageDelete, id, json!({ "miniature_id": id }))
            .await;
        self.invalidate_and_emit(ChangeEvent::update(WatchedTable::Miniatures, id));
        Ok(())
    }
}

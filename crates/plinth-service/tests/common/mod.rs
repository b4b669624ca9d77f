//! Stateful in-memory fakes for service tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use plinth_cache::PageCache;
use plinth_core::{
    AssignedType, AuditLogEntry, AuditLogRepository, Category, CategoryRepository, ChangeBus,
    Error, ListMiniaturesRequest, MiniType, Miniature, MiniatureFields, MiniaturePage,
    MiniatureOverview, MiniatureRepository, NewAuditEntry, Result, StaticIdentity, Tag,
    TagRepository, TagWithUsage, TypeAssignment, TypeRepository, TypeWithCategories,
};
use plinth_service::{AuditService, ImageStore, MiniatureService, WriteDefaults};

// =============================================================================
// MINIATURE REPOSITORY FAKE
// =============================================================================

/// In-memory miniature store with per-step failure injection.
#[derive(Default)]
pub struct InMemoryMiniatures {
    next_id: AtomicI64,
    pub rows: Mutex<BTreeMap<i64, Miniature>>,
    pub types: Mutex<HashMap<i64, Vec<TypeAssignment>>>,
    pub tags: Mutex<HashMap<i64, Vec<i64>>>,
    pub fail_replace_types: AtomicBool,
    pub fail_replace_tags: AtomicBool,
}

impl InMemoryMiniatures {
    fn overview_of(&self, miniature: Miniature) -> MiniatureOverview {
        let id = miniature.id;
        let types = self
            .types
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|a| AssignedType {
                type_id: a.type_id,
                name: format!("type-{}", a.type_id),
                proxy_type: a.proxy_type,
                categories: vec![],
            })
            .collect();
        let tags = self
            .tags
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|tag_id| Tag {
                id: tag_id,
                name: format!("tag-{tag_id}"),
            })
            .collect();
        MiniatureOverview {
            miniature,
            types,
            tags,
            product: None,
        }
    }

    pub fn stored_types(&self, id: i64) -> Vec<TypeAssignment> {
        self.types.lock().unwrap().get(&id).cloned().unwrap_or_default()
    }

    pub fn stored_tags(&self, id: i64) -> Vec<i64> {
        self.tags.lock().unwrap().get(&id).cloned().unwrap_or_default()
    }

    pub fn stored_row(&self, id: i64) -> Option<Miniature> {
        self.rows.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl MiniatureRepository for InMemoryMiniatures {
    async fn list(&self, req: ListMiniaturesRequest) -> Result<MiniaturePage> {
        let rows = self.rows.lock().unwrap();
        let mut matching: Vec<Miniature> = rows
            .values()
            .filter(|m| match req.search.as_deref() {
                Some(term) => m.name.to_lowercase().contains(&term.to_lowercase()),
                None => true,
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        let total = matching.len() as i64;
        drop(rows);

        let start = (req.offset() as usize).min(matching.len());
        let end = (start + req.page_size as usize).min(matching.len());
        let page = matching[start..end]
            .iter()
            .cloned()
            .map(|m| self.overview_of(m))
            .collect();
        Ok(MiniaturePage { rows: page, total })
    }

    async fn list_all(&self) -> Result<Vec<MiniatureOverview>> {
        let rows: Vec<Miniature> = self.rows.lock().unwrap().values().cloned().collect();
        Ok(rows.into_iter().map(|m| self.overview_of(m)).collect())
    }

    async fn fetch_overview(&self, id: i64) -> Result<MiniatureOverview> {
        let row = self
            .rows
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(Error::MiniatureNotFound(id))?;
        Ok(self.overview_of(row))
    }

    async fn insert(&self, fields: &MiniatureFields) -> Result<Miniature> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        let miniature = Miniature {
            id,
            name: fields.name.clone(),
            description: fields.description.clone(),
            location: fields.location.clone(),
            quantity: fields.quantity,
            painted_by_id: fields.painted_by_id,
            base_size_id: fields.base_size_id,
            product_set_id: fields.product_set_id,
            in_use_since: fields.in_use_since,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().insert(id, miniature.clone());
        Ok(miniature)
    }

    async fn update_fields(&self, id: i64, fields: &MiniatureFields) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows.get_mut(&id).ok_or(Error::MiniatureNotFound(id))?;
        row.name = fields.name.clone();
        row.description = fields.description.clone();
        row.location = fields.location.clone();
        row.quantity = fields.quantity;
        row.painted_by_id = fields.painted_by_id;
        row.base_size_id = fields.base_size_id;
        row.product_set_id = fields.product_set_id;
        row.in_use_since = fields.in_use_since;
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn replace_types(&self, id: i64, types: &[TypeAssignment]) -> Result<()> {
        if self.fail_replace_types.load(Ordering::SeqCst) {
            return Err(Error::Internal("type replace failed".to_string()));
        }
        self.types.lock().unwrap().insert(id, types.to_vec());
        Ok(())
    }

    async fn replace_tags(&self, id: i64, tag_ids: &[i64]) -> Result<()> {
        if self.fail_replace_tags.load(Ordering::SeqCst) {
            return Err(Error::Internal("tag replace failed".to_string()));
        }
        self.tags.lock().unwrap().insert(id, tag_ids.to_vec());
        Ok(())
    }

    async fn assign_type(&self, id: i64, assignment: TypeAssignment) -> Result<()> {
        let mut types = self.types.lock().unwrap();
        let list = types.entry(id).or_default();
        // Incoming main demotes the current one, as the contract says.
        if !assignment.proxy_type {
            for a in list.iter_mut() {
                if a.type_id != assignment.type_id {
                    a.proxy_type = true;
                }
            }
        }
        match list.iter_mut().find(|a| a.type_id == assignment.type_id) {
            Some(existing) => existing.proxy_type = assignment.proxy_type,
            None => list.push(assignment),
        }
        Ok(())
    }

    async fn remove_type(&self, id: i64, type_id: i64) -> Result<()> {
        let mut types = self.types.lock().unwrap();
        let list = types.entry(id).or_default();
        let removed_main = list
            .iter()
            .find(|a| a.type_id == type_id)
            .map(|a| !a.proxy_type)
            .unwrap_or(false);
        list.retain(|a| a.type_id != type_id);
        if removed_main {
            if let Some(first) = list.first_mut() {
                first.proxy_type = false;
            }
        }
        Ok(())
    }

    async fn set_in_use(&self, id: i64, since: Option<DateTime<Utc>>) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows.get_mut(&id).ok_or(Error::MiniatureNotFound(id))?;
        row.in_use_since = since;
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let removed = self.rows.lock().unwrap().remove(&id);
        if removed.is_none() {
            return Err(Error::MiniatureNotFound(id));
        }
        self.types.lock().unwrap().remove(&id);
        self.tags.lock().unwrap().remove(&id);
        Ok(())
    }
}

// =============================================================================
// TAG REPOSITORY FAKE
// =============================================================================

/// In-memory tag store with case-insensitive get-or-create.
pub struct InMemoryTags {
    next_id: AtomicI64,
    pub tags: Mutex<Vec<Tag>>,
}

impl Default for InMemoryTags {
    fn default() -> Self {
        Self {
            next_id: AtomicI64::new(100),
            tags: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TagRepository for InMemoryTags {
    async fn list(&self) -> Result<Vec<TagWithUsage>> {
        Ok(self
            .tags
            .lock()
            .unwrap()
            .iter()
            .map(|t| TagWithUsage {
                id: t.id,
                name: t.name.clone(),
                miniature_count: 0,
            })
            .collect())
    }

    async fn get_or_create(&self, name: &str) -> Result<Tag> {
        let name = name.trim();
        let mut tags = self.tags.lock().unwrap();
        if let Some(existing) = tags.iter().find(|t| t.name.eq_ignore_ascii_case(name)) {
            return Ok(existing.clone());
        }
        let tag = Tag {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            name: name.to_string(),
        };
        tags.push(tag.clone());
        Ok(tag)
    }
}

// =============================================================================
// AUDIT REPOSITORY FAKE
// =============================================================================

/// Audit repository that records entries and can be told to fail.
#[derive(Default)]
pub struct RecordingAudit {
    pub entries: Mutex<Vec<NewAuditEntry>>,
    pub fail: AtomicBool,
}

impl RecordingAudit {
    pub fn recorded(&self) -> Vec<NewAuditEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditLogRepository for RecordingAudit {
    async fn append(&self, entry: NewAuditEntry) -> Result<i64> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Internal("audit store unavailable".to_string()));
        }
        let mut entries = self.entries.lock().unwrap();
        entries.push(entry);
        Ok(entries.len() as i64)
    }

    async fn list_for_miniature(&self, miniature_id: i64) -> Result<Vec<AuditLogEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .enumerate()
            .filter(|(_, e)| e.miniature_id == miniature_id)
            .map(|(i, e)| AuditLogEntry {
                id: i as i64 + 1,
                user_id: e.user_id.clone(),
                miniature_id: e.miniature_id,
                action: e.action,
                changes: e.changes.clone(),
                metadata: e.metadata.clone(),
                created_at: Utc::now(),
            })
            .collect())
    }
}

// =============================================================================
// IMAGE STORE FAKE
// =============================================================================

/// Image store recording calls, with failure injection.
#[derive(Default)]
pub struct RecordingImages {
    pub uploads: Mutex<Vec<(i64, String)>>,
    pub delete_attempts: AtomicUsize,
    pub fail_delete: AtomicBool,
}

#[async_trait]
impl ImageStore for RecordingImages {
    async fn upload(&self, miniature_id: i64, _bytes: Vec<u8>, filename: &str) -> Result<String> {
        let path = plinth_service::storage_path(miniature_id);
        self.uploads
            .lock()
            .unwrap()
            .push((miniature_id, filename.to_string()));
        Ok(path)
    }

    async fn delete(&self, _miniature_id: i64) -> Result<()> {
        self.delete_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Error::Request("image endpoint unreachable".to_string()));
        }
        Ok(())
    }

    fn display_url(&self, miniature_id: i64) -> String {
        plinth_service::storage_path(miniature_id)
    }
}

// =============================================================================
// TAXONOMY FAKES
// =============================================================================

#[derive(Default)]
pub struct InMemoryTypes {
    next_id: AtomicI64,
    pub types: Mutex<Vec<MiniType>>,
    pub categories_by_type: Mutex<HashMap<i64, Vec<i64>>>,
    /// type id -> how many miniatures carry it
    pub assignment_counts: Mutex<HashMap<i64, i64>>,
}

#[async_trait]
impl TypeRepository for InMemoryTypes {
    async fn list_with_categories(&self) -> Result<Vec<TypeWithCategories>> {
        let by_type = self.categories_by_type.lock().unwrap().clone();
        Ok(self
            .types
            .lock()
            .unwrap()
            .iter()
            .map(|t| TypeWithCategories {
                id: t.id,
                name: t.name.clone(),
                categories: by_type
                    .get(&t.id)
                    .map(|ids| {
                        ids.iter()
                            .map(|&id| Category {
                                id,
                                name: format!("category-{id}"),
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<MiniType>> {
        Ok(self
            .types
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name.trim()))
            .cloned())
    }

    async fn insert(&self, name: &str) -> Result<MiniType> {
        let created = MiniType {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            name: name.to_string(),
        };
        self.types.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn rename(&self, id: i64, name: &str) -> Result<()> {
        let mut types = self.types.lock().unwrap();
        let t = types
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::NotFound(format!("type {id}")))?;
        t.name = name.to_string();
        Ok(())
    }

    async fn replace_categories(&self, type_id: i64, category_ids: &[i64]) -> Result<()> {
        self.categories_by_type
            .lock()
            .unwrap()
            .insert(type_id, category_ids.to_vec());
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut types = self.types.lock().unwrap();
        let before = types.len();
        types.retain(|t| t.id != id);
        if types.len() == before {
            return Err(Error::NotFound(format!("type {id}")));
        }
        Ok(())
    }

    async fn assignment_count(&self, id: i64) -> Result<i64> {
        Ok(*self.assignment_counts.lock().unwrap().get(&id).unwrap_or(&0))
    }
}

#[derive(Default)]
pub struct InMemoryCategories {
    next_id: AtomicI64,
    pub categories: Mutex<Vec<Category>>,
    /// category id -> how many types reference it
    pub reference_counts: Mutex<HashMap<i64, i64>>,
}

#[async_trait]
impl CategoryRepository for InMemoryCategories {
    async fn list(&self) -> Result<Vec<Category>> {
        Ok(self.categories.lock().unwrap().clone())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Category>> {
        Ok(self
            .categories
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
            .cloned())
    }

    async fn insert(&self, name: &str) -> Result<Category> {
        let created = Category {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            name: name.to_string(),
        };
        self.categories.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn rename(&self, id: i64, name: &str) -> Result<()> {
        let mut categories = self.categories.lock().unwrap();
        let c = categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::NotFound(format!("category {id}")))?;
        c.name = name.to_string();
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut categories = self.categories.lock().unwrap();
        let before = categories.len();
        categories.retain(|c| c.id != id);
        if categories.len() == before {
            return Err(Error::NotFound(format!("category {id}")));
        }
        Ok(())
    }

    async fn type_reference_count(&self, id: i64) -> Result<i64> {
        Ok(*self.reference_counts.lock().unwrap().get(&id).unwrap_or(&0))
    }
}

// =============================================================================
// SERVICE WIRING
// =============================================================================

pub struct Harness {
    pub service: MiniatureService,
    pub minis: Arc<InMemoryMiniatures>,
    pub tags: Arc<InMemoryTags>,
    pub audit: Arc<RecordingAudit>,
    pub images: Arc<RecordingImages>,
    pub cache: Arc<PageCache<MiniatureOverview>>,
    pub bus: Arc<ChangeBus>,
}

/// Wire a MiniatureService over the in-memory fakes.
pub fn harness_with_identity(identity: StaticIdentity) -> Harness {
    let minis = Arc::new(InMemoryMiniatures::default());
    let tags = Arc::new(InMemoryTags::default());
    let audit_repo = Arc::new(RecordingAudit::default());
    let images = Arc::new(RecordingImages::default());
    let cache = Arc::new(PageCache::with_default_ttl());
    let bus = Arc::new(ChangeBus::new(32));

    let service = MiniatureService::new(
        minis.clone(),
        tags.clone(),
        images.clone(),
        AuditService::new(audit_repo.clone(), Arc::new(identity)),
        bus.clone(),
        WriteDefaults {
            painted_by_id: 1,
            base_size_id: 1,
        },
    )
    .with_page_cache(cache.clone());

    Harness {
        service,
        minis,
        tags,
        audit: audit_repo,
        images,
        cache,
        bus,
    }
}

pub fn harness() -> Harness {
    harness_with_identity(StaticIdentity::user("user-1"))
}

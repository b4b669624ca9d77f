//! Core data models for plinth.
//!
//! These types are shared across all plinth crates and represent the
//! domain entities of the collection: miniatures, their type taxonomy,
//! tags, and the product catalog they belong to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// =============================================================================
// MINIATURE TYPES
// =============================================================================

/// Scalar row of a miniature (without associations).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Miniature {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub location: String,
    /// Number of physical models on hand. Never negative.
    pub quantity: i32,
    pub painted_by_id: i64,
    pub base_size_id: i64,
    pub product_set_id: Option<i64>,
    /// Non-null while the miniature is checked out / on the table.
    pub in_use_since: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A type assignment on a miniature.
///
/// `proxy_type = false` marks the single "main" type; every other
/// assignment is a proxy (stand-in) type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeAssignment {
    pub type_id: i64,
    pub proxy_type: bool,
}

impl TypeAssignment {
    /// Main (non-proxy) assignment for a type.
    pub fn main(type_id: i64) -> Self {
        Self {
            type_id,
            proxy_type: false,
        }
    }

    /// Proxy (secondary) assignment for a type.
    pub fn proxy(type_id: i64) -> Self {
        Self {
            type_id,
            proxy_type: true,
        }
    }
}

/// Normalize a set of type assignments so at most one is the main type.
///
/// An empty list stays empty. If no assignment is marked main, the first
/// one is promoted; if several are, the first keeps the flag and the rest
/// are demoted to proxies. This is the promotion rule applied when the
/// main type is removed: the first remaining assignment becomes main.
pub fn ensure_single_main(assignments: &mut [TypeAssignment]) {
    if assignments.is_empty() {
        return;
    }
    let mut seen_main = false;
    for a in assignments.iter_mut() {
        if !a.proxy_type {
            if seen_main {
                a.proxy_type = true;
            }
            seen_main = true;
        }
    }
    if !seen_main {
        assignments[0].proxy_type = false;
    }
}

/// A type assigned to a miniature, expanded for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedType {
    pub type_id: i64,
    pub name: String,
    pub proxy_type: bool,
    pub categories: Vec<Category>,
}

impl AssignedType {
    /// Collapse to the bare assignment pair used for diffing and writes.
    pub fn assignment(&self) -> TypeAssignment {
        TypeAssignment {
            type_id: self.type_id,
            proxy_type: self.proxy_type,
        }
    }
}

/// A miniature with its full nested shape: types (with categories),
/// tags, and the product chain up through the company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiniatureOverview {
    pub miniature: Miniature,
    pub types: Vec<AssignedType>,
    pub tags: Vec<Tag>,
    pub product: Option<ProductChain>,
}

impl MiniatureOverview {
    /// Snapshot of the tracked fields for audit diffing.
    pub fn snapshot(&self) -> MiniatureSnapshot {
        MiniatureSnapshot {
            name: self.miniature.name.clone(),
            description: self.miniature.description.clone(),
            location: self.miniature.location.clone(),
            quantity: self.miniature.quantity,
            painted_by_id: self.miniature.painted_by_id,
            base_size_id: self.miniature.base_size_id,
            product_set_id: self.miniature.product_set_id,
            in_use_since: self.miniature.in_use_since,
            types: self.types.iter().map(AssignedType::assignment).collect(),
            tags: self.tags.iter().map(|t| t.id).collect(),
        }
    }
}

/// One page of miniature overviews plus the total matching count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiniaturePage {
    pub rows: Vec<MiniatureOverview>,
    pub total: i64,
}

/// The audited view of a miniature: exactly the fields the diff engine
/// tracks. Timestamps and display-only fields are deliberately absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiniatureSnapshot {
    pub name: String,
    pub description: Option<String>,
    pub location: String,
    pub quantity: i32,
    pub painted_by_id: i64,
    pub base_size_id: i64,
    pub product_set_id: Option<i64>,
    pub in_use_since: Option<DateTime<Utc>>,
    pub types: Vec<TypeAssignment>,
    pub tags: Vec<i64>,
}

/// Scalar fields of a miniature as written by the write service, with
/// the painter/base-size defaults already applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiniatureFields {
    pub name: String,
    pub description: Option<String>,
    pub location: String,
    pub quantity: i32,
    pub painted_by_id: i64,
    pub base_size_id: i64,
    pub product_set_id: Option<i64>,
    pub in_use_since: Option<DateTime<Utc>>,
}

/// Caller-facing input for creating or updating a miniature.
///
/// `painted_by_id`/`base_size_id` fall back to configured defaults when
/// absent. Tags may carry temporary negative ids (not yet persisted);
/// those are reconciled to real ids before the write completes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MiniatureInput {
    pub name: String,
    pub description: Option<String>,
    pub location: String,
    pub quantity: i32,
    pub painted_by_id: Option<i64>,
    pub base_size_id: Option<i64>,
    pub product_set_id: Option<i64>,
    pub in_use_since: Option<DateTime<Utc>>,
    pub types: Vec<TypeAssignment>,
    pub tags: Vec<TagInput>,
}

/// A tag reference in a write request. `id < 0` marks a tag that only
/// exists client-side and must be resolved by name before persisting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagInput {
    pub id: i64,
    pub name: String,
}

impl TagInput {
    /// Whether this is a client-side temporary id awaiting reconciliation.
    pub fn is_temporary(&self) -> bool {
        self.id < 0
    }
}

// =============================================================================
// TAXONOMY TYPES
// =============================================================================

/// Taxonomy node a miniature can be typed as.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MiniType {
    pub id: i64,
    pub name: String,
}

/// A type together with its categories, as rendered in admin screens
/// and miniature forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeWithCategories {
    pub id: i64,
    pub name: String,
    pub categories: Vec<Category>,
}

/// Flat category node, many-to-many with types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Free-form label, lazily created by case-insensitive name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// A tag with how many miniatures currently carry it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TagWithUsage {
    pub id: i64,
    pub name: String,
    pub miniature_count: i64,
}

// =============================================================================
// LOOKUP TYPES
// =============================================================================

/// Painter lookup entry (who painted the miniature).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Painter {
    pub id: i64,
    pub name: String,
}

/// Base-size lookup entry (25mm round, 32mm round, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BaseSize {
    pub id: i64,
    pub name: String,
}

// =============================================================================
// PRODUCT CATALOG TYPES
// =============================================================================

/// Top level of the product taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Company {
    pub id: i64,
    pub name: String,
}

/// Product line within a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductLine {
    pub id: i64,
    pub name: String,
    pub company_id: i64,
}

/// Product set within a product line; the level a miniature references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductSet {
    pub id: i64,
    pub name: String,
    pub product_line_id: i64,
}

/// A product set resolved up through its line and company, fetched as
/// one nested shape so rendering needs no extra round trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductChain {
    pub set: ProductSet,
    pub line: ProductLine,
    pub company: Company,
}

// =============================================================================
// AUDIT TYPES
// =============================================================================

/// What a history entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    MiniatureCreate,
    MiniatureUpdate,
    MiniatureDelete,
    ImageUpload,
    ImageReplace,
    ImageDelete,
    TypeAssign,
    TypeUnassign,
}

impl AuditAction {
    /// Stable string form stored in the audit table.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::MiniatureCreate => "miniature_create",
            AuditAction::MiniatureUpdate => "miniature_update",
            AuditAction::MiniatureDelete => "miniature_delete",
            AuditAction::ImageUpload => "image_upload",
            AuditAction::ImageReplace => "image_replace",
            AuditAction::ImageDelete => "image_delete",
            AuditAction::TypeAssign => "type_assign",
            AuditAction::TypeUnassign => "type_unassign",
        }
    }

    /// Parse the stored string form back into an action.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "miniature_create" => Some(AuditAction::MiniatureCreate),
            "miniature_update" => Some(AuditAction::MiniatureUpdate),
            "miniature_delete" => Some(AuditAction::MiniatureDelete),
            "image_upload" => Some(AuditAction::ImageUpload),
            "image_replace" => Some(AuditAction::ImageReplace),
            "image_delete" => Some(AuditAction::ImageDelete),
            "type_assign" => Some(AuditAction::TypeAssign),
            "type_unassign" => Some(AuditAction::TypeUnassign),
            _ => None,
        }
    }
}

/// Immutable history record of a change made to a miniature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub user_id: String,
    pub miniature_id: i64,
    pub action: AuditAction,
    /// Field name -> `{from, to}` delta map; null for unconditional
    /// actions (create/delete/image) which record a snapshot instead.
    pub changes: Option<JsonValue>,
    pub metadata: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

/// An audit entry about to be appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAuditEntry {
    pub user_id: String,
    pub miniature_id: i64,
    pub action: AuditAction,
    pub changes: Option<JsonValue>,
    pub metadata: Option<JsonValue>,
}

/// Authenticated user identity consumed for audit attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: String,
    pub email: Option<String>,
}

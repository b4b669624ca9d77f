//! Core traits for plinth abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::*;

// =============================================================================
// MINIATURE REPOSITORY
// =============================================================================

/// Request for one page of miniatures.
#[derive(Debug, Clone)]
pub struct ListMiniaturesRequest {
    /// Zero-based page number.
    pub page: u32,
    /// Rows per page.
    pub page_size: i64,
    /// Case-insensitive substring filter over the name field.
    pub search: Option<String>,
}

impl ListMiniaturesRequest {
    /// First page with the default page size and no filter.
    pub fn first_page(page_size: i64) -> Self {
        Self {
            page: 0,
            page_size,
            search: None,
        }
    }

    /// Row offset this request starts at.
    pub fn offset(&self) -> i64 {
        i64::from(self.page) * self.page_size
    }
}

/// Repository for miniature reads and the individual write steps the
/// write service sequences. Each write step is a separate backend call;
/// the service layer deliberately does not wrap them in one transaction.
#[async_trait]
pub trait MiniatureRepository: Send + Sync {
    /// One page of overviews, ordered by name, plus the total matching
    /// count. The nested shape (types, categories, tags, product chain)
    /// is assembled with batched queries, never per-row.
    async fn list(&self, req: ListMiniaturesRequest) -> Result<MiniaturePage>;

    /// Every miniature in the collection, same nested shape. Used by
    /// admin/export views that render the whole table at once.
    async fn list_all(&self) -> Result<Vec<MiniatureOverview>>;

    /// A single miniature with its full nested shape.
    async fn fetch_overview(&self, id: i64) -> Result<MiniatureOverview>;

    /// Insert the scalar row; the backend assigns the id.
    async fn insert(&self, fields: &MiniatureFields) -> Result<Miniature>;

    /// Update the scalar row.
    async fn update_fields(&self, id: i64, fields: &MiniatureFields) -> Result<()>;

    /// Replace the full type-association set (delete all, reinsert).
    async fn replace_types(&self, id: i64, types: &[TypeAssignment]) -> Result<()>;

    /// Replace the full tag-association set (delete all, reinsert).
    async fn replace_tags(&self, id: i64, tag_ids: &[i64]) -> Result<()>;

    /// Add a single type assignment. Assigning a new main demotes the
    /// current main to a proxy, so at most one main survives.
    async fn assign_type(&self, id: i64, assignment: TypeAssignment) -> Result<()>;

    /// Remove a single type assignment. Removing the main type promotes
    /// the first remaining assignment to main.
    async fn remove_type(&self, id: i64, type_id: i64) -> Result<()>;

    /// Set or clear the in-use marker.
    async fn set_in_use(&self, id: i64, since: Option<DateTime<Utc>>) -> Result<()>;

    /// Delete the row; the backend cascades the association tables.
    async fn delete(&self, id: i64) -> Result<()>;
}

// =============================================================================
// TAG REPOSITORY
// =============================================================================

/// Repository for free-form tags.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// All tags with usage counts, ordered by name.
    async fn list(&self) -> Result<Vec<TagWithUsage>>;

    /// Find a tag by case-insensitive name, creating it when absent.
    ///
    /// The lookup-then-insert is a pre-check, not an atomic constraint;
    /// a concurrent writer can still create a duplicate.
    async fn get_or_create(&self, name: &str) -> Result<Tag>;
}

// =============================================================================
// TAXONOMY REPOSITORIES
// =============================================================================

/// Repository for the type taxonomy.
#[async_trait]
pub trait TypeRepository: Send + Sync {
    /// All types with their categories, ordered by name.
    async fn list_with_categories(&self) -> Result<Vec<TypeWithCategories>>;

    /// Case-insensitive name lookup used by the uniqueness pre-check.
    async fn find_by_name(&self, name: &str) -> Result<Option<MiniType>>;

    async fn insert(&self, name: &str) -> Result<MiniType>;

    async fn rename(&self, id: i64, name: &str) -> Result<()>;

    /// Replace the type's category associations (delete all, reinsert).
    async fn replace_categories(&self, type_id: i64, category_ids: &[i64]) -> Result<()>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// How many miniatures currently carry this type.
    async fn assignment_count(&self, id: i64) -> Result<i64>;
}

/// Repository for flat categories.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Category>>;

    /// Case-insensitive name lookup used by the uniqueness pre-check.
    async fn find_by_name(&self, name: &str) -> Result<Option<Category>>;

    async fn insert(&self, name: &str) -> Result<Category>;

    async fn rename(&self, id: i64, name: &str) -> Result<()>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// How many types reference this category. A non-zero count blocks
    /// deletion.
    async fn type_reference_count(&self, id: i64) -> Result<i64>;
}

// =============================================================================
// PRODUCT CATALOG REPOSITORY
// =============================================================================

/// Repository for the company -> product line -> product set hierarchy.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list_companies(&self) -> Result<Vec<Company>>;
    async fn insert_company(&self, name: &str) -> Result<Company>;
    async fn rename_company(&self, id: i64, name: &str) -> Result<()>;
    async fn delete_company(&self, id: i64) -> Result<()>;

    async fn list_product_lines(&self) -> Result<Vec<ProductLine>>;
    async fn insert_product_line(&self, company_id: i64, name: &str) -> Result<ProductLine>;
    async fn rename_product_line(&self, id: i64, name: &str) -> Result<()>;
    async fn delete_product_line(&self, id: i64) -> Result<()>;

    async fn list_product_sets(&self) -> Result<Vec<ProductSet>>;
    async fn insert_product_set(&self, product_line_id: i64, name: &str) -> Result<ProductSet>;
    async fn rename_product_set(&self, id: i64, name: &str) -> Result<()>;
    async fn delete_product_set(&self, id: i64) -> Result<()>;
}

// =============================================================================
// LOOKUP REPOSITORY
// =============================================================================

/// Repository for the small painter/base-size lookup tables.
#[async_trait]
pub trait LookupRepository: Send + Sync {
    async fn list_painters(&self) -> Result<Vec<Painter>>;
    async fn list_base_sizes(&self) -> Result<Vec<BaseSize>>;
}

// =============================================================================
// AUDIT LOG REPOSITORY
// =============================================================================

/// Append-only repository for the miniature history log.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Append an entry, returning its id.
    async fn append(&self, entry: NewAuditEntry) -> Result<i64>;

    /// Entries for a miniature, newest first.
    async fn list_for_miniature(&self, miniature_id: i64) -> Result<Vec<AuditLogEntry>>;
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Supplies the current user for audit attribution. Absence of a user
/// means "no audit possible", not an error.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<UserRef>;
}

/// Fixed identity, for tests and single-user deployments.
#[derive(Debug, Clone)]
pub struct StaticIdentity(pub Option<UserRef>);

impl StaticIdentity {
    pub fn user(id: impl Into<String>) -> Self {
        Self(Some(UserRef {
            id: id.into(),
            email: None,
        }))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<UserRef> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_request_offset() {
        let req = ListMiniaturesRequest {
            page: 3,
            page_size: 25,
            search: None,
        };
        assert_eq!(req.offset(), 75);
        assert_eq!(ListMiniaturesRequest::first_page(10).offset(), 0);
    }

    #[test]
    fn test_static_identity() {
        assert!(StaticIdentity::anonymous().current_user().is_none());
        let user = StaticIdentity::user("u-1").current_user().unwrap();
        assert_eq!(user.id, "u-1");
        assert!(user.email.is_none());
    }
}

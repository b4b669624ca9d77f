//! Type and category administration.
//!
//! Name uniqueness is enforced with a case-insensitive pre-check read
//! before the insert: read-then-write, no database constraint behind
//! it, so two concurrent creators can still both get through. The
//! taxonomy tests note that race.

use std::sync::Arc;

use tracing::info;

use plinth_core::{
    Category, CategoryRepository, ChangeBus, ChangeEvent, Error, MiniType, Result,
    TypeRepository, WatchedTable,
};

/// Admin surface for the type/category taxonomy.
pub struct TaxonomyService {
    types: Arc<dyn TypeRepository>,
    categories: Arc<dyn CategoryRepository>,
    bus: Arc<ChangeBus>,
}

impl TaxonomyService {
    pub fn new(
        types: Arc<dyn TypeRepository>,
        categories: Arc<dyn CategoryRepository>,
        bus: Arc<ChangeBus>,
    ) -> Self {
        Self {
            types,
            categories,
            bus,
        }
    }

    /// Create a type, associating it with the given categories.
    pub async fn create_type(&self, name: &str, category_ids: &[i64]) -> Result<MiniType> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("type name is required".to_string()));
        }
        if self.types.find_by_name(name).await?.is_some() {
            return Err(Error::Conflict(format!("type \"{name}\" already exists")));
        }

        let created = self.types.insert(name).await?;
        self.types
            .replace_categories(created.id, category_ids)
            .await?;
        self.bus
            .emit(ChangeEvent::insert(WatchedTable::MiniTypes, created.id));

        info!(
            subsystem = "service",
            component = "taxonomy",
            op = "create_type",
            type_id = created.id,
            "created type"
        );
        Ok(created)
    }

    /// Rename a type. Renaming to its own current name (in any casing)
    /// is allowed; colliding with a different type is not.
    pub async fn rename_type(&self, id: i64, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("type name is required".to_string()));
        }
        if let Some(existing) = self.types.find_by_name(name).await? {
            if existing.id != id {
                return Err(Error::Conflict(format!("type \"{name}\" already exists")));
            }
        }

        self.types.rename(id, name).await?;
        self.bus
            .emit(ChangeEvent::update(WatchedTable::MiniTypes, id));
        Ok(())
    }

    /// Replace the categories associated with a type.
    pub async fn set_type_categories(&self, id: i64, category_ids: &[i64]) -> Result<()> {
        self.types.replace_categories(id, category_ids).await?;
        self.bus
            .emit(ChangeEvent::update(WatchedTable::MiniTypes, id));
        Ok(())
    }

    /// Delete a type. Blocked while any miniature still carries it.
    pub async fn delete_type(&self, id: i64) -> Result<()> {
        let in_use = self.types.assignment_count(id).await?;
        if in_use > 0 {
            return Err(Error::Conflict(format!(
                "type is assigned to {in_use} miniature(s)"
            )));
        }

        self.types.delete(id).await?;
        self.bus
            .emit(ChangeEvent::delete(WatchedTable::MiniTypes, id));
        Ok(())
    }

    /// Create a category.
    pub async fn create_category(&self, name: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("category name is required".to_string()));
        }
        if self.categories.find_by_name(name).await?.is_some() {
            return Err(Error::Conflict(format!(
                "category \"{name}\" already exists"
            )));
        }

        let created = self.categories.insert(name).await?;
        self.bus
            .emit(ChangeEvent::insert(WatchedTable::Categories, created.id));
        Ok(created)
    }

    /// Rename a category, with the same collision rule as types.
    pub async fn rename_category(&self, id: i64, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("category name is required".to_string()));
        }
        if let Some(existing) = self.categories.find_by_name(name).await? {
            if existing.id != id {
                return Err(Error::Conflict(format!(
                    "category \"{name}\" already exists"
                )));
            }
        }

        self.categories.rename(id, name).await?;
        self.bus
            .emit(ChangeEvent::update(WatchedTable::Categories, id));
        Ok(())
    }

    /// Delete a category. Blocked while any type references it.
    pub async fn delete_category(&self, id: i64) -> Result<()> {
        let referenced = self.categories.type_reference_count(id).await?;
        if referenced > 0 {
            return Err(Error::Conflict(format!(
                "category is referenced by {referenced} type(s)"
            )));
        }

        self.categories.delete(id).await?;
        self.bus
            .emit(ChangeEvent::delete(WatchedTable::Categories, id));
        Ok(())
    }
}

//! Mock repositories shared by the cache integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use plinth_core::{
    BaseSize, CatalogRepository, Company, Error, ListMiniaturesRequest, LookupRepository,
    MiniType, Miniature, MiniatureFields, MiniaturePage, MiniatureOverview, MiniatureRepository,
    Painter, ProductLine, ProductSet, Result, TypeAssignment, TypeRepository, TypeWithCategories,
};

fn unused<T>(what: &str) -> Result<T> {
    Err(Error::Internal(format!("not used by this test: {what}")))
}

/// Lookup repository that counts fetches and can be told to fail.
#[derive(Default)]
pub struct MockLookups {
    pub painter_fetches: AtomicUsize,
    pub base_size_fetches: AtomicUsize,
    pub fail_painters: AtomicBool,
    /// Simulated network latency so concurrent callers overlap.
    pub latency: Option<Duration>,
}

impl MockLookups {
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Default::default()
        }
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            sleep(latency).await;
        }
    }
}

#[async_trait]
impl LookupRepository for MockLookups {
    async fn list_painters(&self) -> Result<Vec<Painter>> {
        self.delay().await;
        self.painter_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_painters.load(Ordering::SeqCst) {
            return Err(Error::Internal("painter query failed".to_string()));
        }
        Ok(vec![Painter {
            id: 1,
            name: "Unpainted".to_string(),
        }])
    }

    async fn list_base_sizes(&self) -> Result<Vec<BaseSize>> {
        self.delay().await;
        self.base_size_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(vec![BaseSize {
            id: 1,
            name: "25mm round".to_string(),
        }])
    }
}

/// Catalog repository that counts list fetches.
#[derive(Default)]
pub struct MockCatalog {
    pub company_fetches: AtomicUsize,
    pub line_fetches: AtomicUsize,
    pub set_fetches: AtomicUsize,
}

#[async_trait]
impl CatalogRepository for MockCatalog {
    async fn list_companies(&self) -> Result<Vec<Company>> {
        self.company_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(vec![Company {
            id: 1,
            name: "Griffin Forge".to_string(),
        }])
    }

    async fn insert_company(&self, _name: &str) -> Result<Company> {
        unused("insert_company")
    }

    async fn rename_company(&self, _id: i64, _name: &str) -> Result<()> {
        unused("rename_company")
    }

    async fn delete_company(&self, _id: i64) -> Result<()> {
        unused("delete_company")
    }

    async fn list_product_lines(&self) -> Result<Vec<ProductLine>> {
        self.line_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(vec![ProductLine {
            id: 1,
            name: "Skirmish Core".to_string(),
            company_id: 1,
        }])
    }

    async fn insert_product_line(&self, _company_id: i64, _name: &str) -> Result<ProductLine> {
        unused("insert_product_line")
    }

    async fn rename_product_line(&self, _id: i64, _name: &str) -> Result<()> {
        unused("rename_product_line")
    }

    async fn delete_product_line(&self, _id: i64) -> Result<()> {
        unused("delete_product_line")
    }

    async fn list_product_sets(&self) -> Result<Vec<ProductSet>> {
        self.set_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(vec![ProductSet {
            id: 1,
            name: "Starter Warband".to_string(),
            product_line_id: 1,
        }])
    }

    async fn insert_product_set(&self, _product_line_id: i64, _name: &str) -> Result<ProductSet> {
        unused("insert_product_set")
    }

    async fn rename_product_set(&self, _id: i64, _name: &str) -> Result<()> {
        unused("rename_product_set")
    }

    async fn delete_product_set(&self, _id: i64) -> Result<()> {
        unused("delete_product_set")
    }
}

/// Type repository that counts taxonomy fetches.
#[derive(Default)]
pub struct MockTypes {
    pub taxonomy_fetches: AtomicUsize,
}

#[async_trait]
impl TypeRepository for MockTypes {
    async fn list_with_categories(&self) -> Result<Vec<TypeWithCategories>> {
        self.taxonomy_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(vec![TypeWithCategories {
            id: 1,
            name: "Infantry".to_string(),
            categories: vec![],
        }])
    }

    async fn find_by_name(&self, _name: &str) -> Result<Option<MiniType>> {
        unused("find_by_name")
    }

    async fn insert(&self, _name: &str) -> Result<MiniType> {
        unused("insert")
    }

    async fn rename(&self, _id: i64, _name: &str) -> Result<()> {
        unused("rename")
    }

    async fn replace_categories(&self, _type_id: i64, _category_ids: &[i64]) -> Result<()> {
        unused("replace_categories")
    }

    async fn delete(&self, _id: i64) -> Result<()> {
        unused("delete")
    }

    async fn assignment_count(&self, _id: i64) -> Result<i64> {
        unused("assignment_count")
    }
}

/// Build an overview with the given id/name and no associations.
pub fn overview(id: i64, name: &str) -> MiniatureOverview {
    let now = chrono::Utc::now();
    MiniatureOverview {
        miniature: Miniature {
            id,
            name: name.to_string(),
            description: None,
            location: "Shelf A".to_string(),
            quantity: 1,
            painted_by_id: 1,
            base_size_id: 1,
            product_set_id: None,
            in_use_since: None,
            created_at: now,
            updated_at: now,
        },
        types: vec![],
        tags: vec![],
        product: None,
    }
}

/// Miniature repository serving canned pages, counting list calls, with
/// optional per-call latency so supersession can be exercised.
#[derive(Default)]
pub struct MockMiniatures {
    pub list_calls: AtomicUsize,
    pub latency: Option<Duration>,
}

impl MockMiniatures {
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Default::default()
        }
    }
}

#[async_trait]
impl MiniatureRepository for MockMiniatures {
    async fn list(&self, req: ListMiniaturesRequest) -> Result<MiniaturePage> {
        if let Some(latency) = self.latency {
            sleep(latency).await;
        }
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let label = match req.search.as_deref() {
            Some(term) => format!("match:{term}:page{}", req.page),
            None => format!("all:page{}", req.page),
        };
        Ok(MiniaturePage {
            rows: vec![overview(i64::from(req.page) + 1, &label)],
            total: 41,
        })
    }

    async fn list_all(&self) -> Result<Vec<MiniatureOverview>> {
        unused("list_all")
    }

    async fn fetch_overview(&self, _id: i64) -> Result<MiniatureOverview> {
        unused("fetch_overview")
    }

    async fn insert(&self, _fields: &MiniatureFields) -> Result<Miniature> {
        unused("insert")
    }

    async fn update_fields(&self, _id: i64, _fields: &MiniatureFields) -> Result<()> {
        unused("update_fields")
    }

    async fn replace_types(&self, _id: i64, _types: &[TypeAssignment]) -> Result<()> {
        unused("replace_types")
    }

    async fn replace_tags(&self, _id: i64, _tag_ids: &[i64]) -> Result<()> {
        unused("replace_tags")
    }

    async fn assign_type(&self, _id: i64, _assignment: TypeAssignment) -> Result<()> {
        unused("assign_type")
    }

    async fn remove_type(&self, _id: i64, _type_id: i64) -> Result<()> {
        unused("remove_type")
    }

    async fn set_in_use(
        &self,
        _id: i64,
        _since: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<()> {
        unused("set_in_use")
    }

    async fn delete(&self, _id: i64) -> Result<()> {
        unused("delete")
    }
}

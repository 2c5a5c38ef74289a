//! Product catalog reads, optionally cached with `moka`, and the seed
//! catalog.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, info, instrument};

use owldoor_core::{ProductId, Won};

use crate::backend::{Direction, DocumentPath, DocumentStore, DocumentWrite, IdToken, Query};
use crate::error::{Result, StorefrontError};
use crate::models::product::PRODUCTS;
use crate::models::{Product, decode_with_id, to_fields};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CatalogKey {
    All,
    Product(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CatalogEntry {
    All(Arc<Vec<Product>>),
    Product(Box<Product>),
}

/// Cached access to the `products` collection.
#[derive(Clone)]
pub struct CatalogService {
    documents: Arc<dyn DocumentStore>,
    /// `None` when caching is disabled.
    cache: Option<Cache<CatalogKey, CatalogEntry>>,
}

impl CatalogService {
    /// Create a catalog reader whose entries live for `ttl`.
    ///
    /// A zero `ttl` disables caching.
    #[must_use]
    pub fn new(documents: Arc<dyn DocumentStore>, ttl: Duration) -> Self {
        let cache =
            (!ttl.is_zero()).then(|| Cache::builder().max_capacity(1000).time_to_live(ttl).build());
        Self { documents, cache }
    }

    async fn cached(&self, key: &CatalogKey) -> Option<CatalogEntry> {
        match &self.cache {
            Some(cache) => cache.get(key).await,
            None => None,
        }
    }

    async fn remember(&self, key: CatalogKey, entry: CatalogEntry) {
        if let Some(cache) = &self.cache {
            cache.insert(key, entry).await;
        }
    }

    /// Every product, ascending by `order`.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Read` if the query fails or a product
    /// document is malformed.
    #[instrument(skip(self, auth))]
    pub async fn list(&self, auth: Option<&IdToken>) -> Result<Vec<Product>> {
        if let Some(CatalogEntry::All(products)) = self.cached(&CatalogKey::All).await {
            debug!("Cache hit for product list");
            return Ok(products.as_ref().clone());
        }

        let query = Query::collection(PRODUCTS).order_by("order", Direction::Ascending);
        let products: Vec<Product> = self
            .documents
            .query(auth, &query)
            .await
            .and_then(|docs| docs.into_iter().map(decode_with_id::<Product>).collect())
            .map_err(StorefrontError::Read)?;

        self.remember(CatalogKey::All, CatalogEntry::All(Arc::new(products.clone())))
            .await;
        Ok(products)
    }

    /// One product, or `None` when no document has this ID.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Read` if the read fails or the document is
    /// malformed.
    #[instrument(skip(self, auth), fields(product_id = %id))]
    pub async fn get(&self, auth: Option<&IdToken>, id: &ProductId) -> Result<Option<Product>> {
        let key = CatalogKey::Product(id.clone());
        if let Some(CatalogEntry::Product(product)) = self.cached(&key).await {
            debug!("Cache hit for product");
            return Ok(Some(*product));
        }

        let path = DocumentPath::new(PRODUCTS, id.as_str());
        let Some(document) = self
            .documents
            .get(auth, &path)
            .await
            .map_err(StorefrontError::Read)?
        else {
            return Ok(None);
        };
        let product: Product = decode_with_id(document).map_err(StorefrontError::Read)?;

        self.remember(key, CatalogEntry::Product(Box::new(product.clone())))
            .await;
        Ok(Some(product))
    }

    /// Upsert the seed catalog and drop cached reads.
    ///
    /// Returns the number of products written.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Write` on the first failed write; products
    /// written before it stay written.
    #[instrument(skip(self, auth))]
    pub async fn seed(&self, auth: Option<&IdToken>) -> Result<usize> {
        let products = seed_catalog();
        let result = self.write_all(auth, &products).await;
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
        result?;

        info!(count = products.len(), "Product catalog seeded");
        Ok(products.len())
    }

    async fn write_all(&self, auth: Option<&IdToken>, products: &[Product]) -> Result<()> {
        for product in products {
            let write = DocumentWrite::new(to_fields(product).map_err(StorefrontError::Write)?);
            let path = DocumentPath::new(PRODUCTS, product.id.as_str());
            self.documents
                .set(auth, &path, &write)
                .await
                .map_err(StorefrontError::Write)?;
        }
        Ok(())
    }
}

/// The fixed launch catalog.
#[must_use]
pub fn seed_catalog() -> Vec<Product> {
    let product = |id: &str,
                   name: &str,
                   category: &str,
                   price: i64,
                   original_price: i64,
                   description: &str,
                   badge: &str,
                   image: &str,
                   order: u32| Product {
        id: ProductId::new(id),
        name: name.to_string(),
        category: category.to_string(),
        price: Won::new(price),
        original_price: Won::new(original_price),
        description: description.to_string(),
        badge: badge.to_string(),
        image: image.to_string(),
        order,
    };

    vec![
        product(
            "product_1",
            "프리미엄 현관중문",
            "현관중문",
            1_200_000,
            1_500_000,
            "단열 + 방음 + 보안",
            "BEST",
            "https://images.unsplash.com/photo-1558618666-fcd25c85cd64?w=600&h=450&fit=crop",
            1,
        ),
        product(
            "product_2",
            "3연동 중문",
            "중문",
            800_000,
            1_000_000,
            "슬라이딩 시스템",
            "",
            "https://images.unsplash.com/photo-1600585154340-be6161a56a0c?w=600&h=450&fit=crop",
            2,
        ),
        product(
            "product_3",
            "4연동 중문",
            "중문",
            1_000_000,
            1_200_000,
            "프리미엄 슬라이딩",
            "NEW",
            "https://images.unsplash.com/photo-1600566753190-17f0baa2a6c3?w=600&h=450&fit=crop",
            3,
        ),
        product(
            "product_4",
            "자동 중문 시스템",
            "자동중문",
            1_500_000,
            1_800_000,
            "센서 + 자동개폐",
            "HOT",
            "https://images.unsplash.com/photo-1600607687939-ce8a6c25118c?w=600&h=450&fit=crop",
            4,
        ),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::backend::{DocumentError, DocumentErrorKind};

    fn service(backend: &MemoryBackend) -> CatalogService {
        CatalogService::new(Arc::new(backend.clone()), Duration::from_secs(300))
    }

    #[test]
    fn test_seed_catalog_is_ordered_and_unique() {
        let catalog = seed_catalog();
        let orders: Vec<u32> = catalog.iter().map(|p| p.order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4]);
        assert_eq!(catalog[1].badge(), None);
        assert_eq!(catalog[0].discount_percent(), Some(20));
    }

    #[tokio::test]
    async fn test_list_is_served_from_cache() {
        let backend = MemoryBackend::new();
        let catalog = service(&backend);
        catalog.seed(None).await.unwrap();

        let first = catalog.list(None).await.unwrap();
        assert_eq!(first.len(), 4);

        // A failing backend is not consulted while the entry is fresh.
        backend.fail_next_document(DocumentError::new(DocumentErrorKind::Unavailable, "down"));
        let second = catalog.list(None).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_seed_invalidates_cached_product() {
        let backend = MemoryBackend::new();
        let catalog = service(&backend);
        let path = DocumentPath::new(PRODUCTS, "product_1");
        let mut stale = to_fields(&seed_catalog()[0]).unwrap();
        stale.insert("name".into(), json!("구형 중문"));
        backend.insert_document(&path, stale);

        let before = catalog.get(None, &ProductId::new("product_1")).await.unwrap().unwrap();
        assert_eq!(before.name, "구형 중문");

        catalog.seed(None).await.unwrap();
        let after = catalog.get(None, &ProductId::new("product_1")).await.unwrap().unwrap();
        assert_eq!(after.name, "프리미엄 현관중문");
    }

    #[tokio::test]
    async fn test_missing_product_is_not_cached() {
        let backend = MemoryBackend::new();
        let catalog = service(&backend);

        assert!(catalog.get(None, &ProductId::new("product_9")).await.unwrap().is_none());
        catalog.seed(None).await.unwrap();
        assert!(catalog.get(None, &ProductId::new("product_4")).await.unwrap().is_some());
    }
}

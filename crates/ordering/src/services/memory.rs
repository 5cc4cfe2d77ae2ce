//! In-memory catalog and inventory ledger.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{ProductId, StoreId, UserId};
use domain::{Money, ProductSnapshot, StoreSnapshot};
use tokio::sync::Mutex;

use super::catalog::{Catalog, CatalogError};
use super::inventory::InventoryLedger;

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    stores: HashMap<StoreId, StoreSnapshot>,
    products: HashMap<ProductId, ProductSnapshot>,
    fail_next_reserves: usize,
    fail_on_release: bool,
    reservations: u64,
    releases: u64,
}

/// In-memory catalog that is also the inventory ledger for its products.
///
/// Stock lives behind a single mutex, so each reservation checks and
/// decrements under one lock acquisition.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    state: Arc<Mutex<InMemoryCatalogState>>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an active store owned by `owner_id`.
    pub async fn add_store(&self, owner_id: UserId) -> StoreSnapshot {
        let store = StoreSnapshot {
            id: StoreId::new(),
            owner_id,
            is_active: true,
        };
        self.insert_store(store).await;
        store
    }

    /// Inserts or replaces a store.
    pub async fn insert_store(&self, store: StoreSnapshot) {
        self.state.lock().await.stores.insert(store.id, store);
    }

    /// Adds an active product to a store.
    pub async fn add_product(&self, store_id: StoreId, price: Money, stock: u32) -> ProductSnapshot {
        let product = ProductSnapshot {
            id: ProductId::new(),
            store_id,
            price,
            stock,
            is_active: true,
        };
        self.insert_product(product).await;
        product
    }

    /// Inserts or replaces a product.
    pub async fn insert_product(&self, product: ProductSnapshot) {
        self.state.lock().await.products.insert(product.id, product);
    }

    /// Returns the current stock of a product.
    pub async fn stock_of(&self, product_id: ProductId) -> Option<u32> {
        self.state
            .lock()
            .await
            .products
            .get(&product_id)
            .map(|p| p.stock)
    }

    /// Changes the catalog price of a product.
    pub async fn set_price(&self, product_id: ProductId, price: Money) {
        if let Some(product) = self.state.lock().await.products.get_mut(&product_id) {
            product.price = price;
        }
    }

    /// Activates or deactivates a product.
    pub async fn set_product_active(&self, product_id: ProductId, active: bool) {
        if let Some(product) = self.state.lock().await.products.get_mut(&product_id) {
            product.is_active = active;
        }
    }

    /// Activates or deactivates a store.
    pub async fn set_store_active(&self, store_id: StoreId, active: bool) {
        if let Some(store) = self.state.lock().await.stores.get_mut(&store_id) {
            store.is_active = active;
        }
    }

    /// Makes the next `count` reserve calls fail with a conflict.
    pub async fn fail_next_reserves(&self, count: usize) {
        self.state.lock().await.fail_next_reserves = count;
    }

    /// Configures every release call to fail.
    pub async fn set_fail_on_release(&self, fail: bool) {
        self.state.lock().await.fail_on_release = fail;
    }

    /// Returns the number of successful reservations so far.
    pub async fn reservation_count(&self) -> u64 {
        self.state.lock().await.reservations
    }

    /// Returns the number of successful releases so far.
    pub async fn release_count(&self) -> u64 {
        self.state.lock().await.releases
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn get_store(&self, store_id: StoreId) -> Result<Option<StoreSnapshot>, CatalogError> {
        Ok(self.state.lock().await.stores.get(&store_id).copied())
    }

    async fn get_product(
        &self,
        product_id: ProductId,
    ) -> Result<Option<ProductSnapshot>, CatalogError> {
        Ok(self.state.lock().await.products.get(&product_id).copied())
    }
}

#[async_trait]
impl InventoryLedger for InMemoryCatalog {
    async fn reserve(&self, product_id: ProductId, quantity: u32) -> Result<(), CatalogError> {
        let mut state = self.state.lock().await;

        if state.fail_next_reserves > 0 {
            state.fail_next_reserves -= 1;
            return Err(CatalogError::Conflict(format!(
                "reservation of product {product_id} forced to fail"
            )));
        }

        let product = state
            .products
            .get_mut(&product_id)
            .ok_or(CatalogError::ProductNotFound(product_id))?;

        if product.stock < quantity {
            return Err(CatalogError::InsufficientStock {
                product_id,
                requested: quantity,
                available: product.stock,
            });
        }

        product.stock -= quantity;
        state.reservations += 1;
        Ok(())
    }

    async fn release(&self, product_id: ProductId, quantity: u32) -> Result<(), CatalogError> {
        let mut state = self.state.lock().await;

        if state.fail_on_release {
            return Err(CatalogError::Unavailable(format!(
                "release of product {product_id} forced to fail"
            )));
        }

        let product = state
            .products
            .get_mut(&product_id)
            .ok_or(CatalogError::ProductNotFound(product_id))?;

        let current = product.stock;
        product.stock = current.checked_add(quantity).ok_or_else(|| {
            CatalogError::Conflict(format!(
                "releasing {quantity} units of product {product_id} overflows stock {current}"
            ))
        })?;
        state.releases += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded(stock: u32) -> (InMemoryCatalog, ProductSnapshot) {
        let catalog = InMemoryCatalog::new();
        let store = catalog.add_store(UserId::new()).await;
        let product = catalog
            .add_product(store.id, Money::from_cents(1000), stock)
            .await;
        (catalog, product)
    }

    #[tokio::test]
    async fn test_reserve_and_release() {
        let (catalog, product) = seeded(5).await;

        catalog.reserve(product.id, 3).await.unwrap();
        assert_eq!(catalog.stock_of(product.id).await, Some(2));

        catalog.release(product.id, 3).await.unwrap();
        assert_eq!(catalog.stock_of(product.id).await, Some(5));
        assert_eq!(catalog.reservation_count().await, 1);
        assert_eq!(catalog.release_count().await, 1);
    }

    #[tokio::test]
    async fn test_reserve_more_than_available() {
        let (catalog, product) = seeded(2).await;

        let err = catalog.reserve(product.id, 3).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogError::InsufficientStock {
                requested: 3,
                available: 2,
                ..
            }
        ));
        assert_eq!(catalog.stock_of(product.id).await, Some(2));
    }

    #[tokio::test]
    async fn test_reserve_exact_stock_leaves_zero() {
        let (catalog, product) = seeded(4).await;
        catalog.reserve(product.id, 4).await.unwrap();
        assert_eq!(catalog.stock_of(product.id).await, Some(0));
    }

    #[tokio::test]
    async fn test_release_overflow_is_reported() {
        let (catalog, product) = seeded(u32::MAX - 1).await;

        let err = catalog.release(product.id, 2).await.unwrap_err();
        assert!(matches!(err, CatalogError::Conflict(_)));
        assert_eq!(catalog.stock_of(product.id).await, Some(u32::MAX - 1));
        assert_eq!(catalog.release_count().await, 0);

        catalog.release(product.id, 1).await.unwrap();
        assert_eq!(catalog.stock_of(product.id).await, Some(u32::MAX));
    }

    #[tokio::test]
    async fn test_reserve_unknown_product() {
        let catalog = InMemoryCatalog::new();
        let err = catalog.reserve(ProductId::new(), 1).await.unwrap_err();
        assert!(matches!(err, CatalogError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn test_fail_next_reserves_counts_down() {
        let (catalog, product) = seeded(10).await;
        catalog.fail_next_reserves(2).await;

        assert!(matches!(
            catalog.reserve(product.id, 1).await,
            Err(CatalogError::Conflict(_))
        ));
        assert!(matches!(
            catalog.reserve(product.id, 1).await,
            Err(CatalogError::Conflict(_))
        ));
        catalog.reserve(product.id, 1).await.unwrap();
        assert_eq!(catalog.stock_of(product.id).await, Some(9));
    }

    #[tokio::test]
    async fn test_fail_on_release() {
        let (catalog, product) = seeded(3).await;
        catalog.reserve(product.id, 1).await.unwrap();
        catalog.set_fail_on_release(true).await;

        assert!(matches!(
            catalog.release(product.id, 1).await,
            Err(CatalogError::Unavailable(_))
        ));
        assert_eq!(catalog.stock_of(product.id).await, Some(2));
    }

    #[tokio::test]
    async fn test_concurrent_reservations_never_oversell() {
        let (catalog, product) = seeded(10).await;

        let handles: Vec<_> = (0..25)
            .map(|_| {
                let catalog = catalog.clone();
                tokio::spawn(async move { catalog.reserve(product.id, 1).await })
            })
            .collect();

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 10);
        assert_eq!(catalog.stock_of(product.id).await, Some(0));
    }
}

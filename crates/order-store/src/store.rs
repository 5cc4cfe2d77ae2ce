use async_trait::async_trait;
use common::{OrderId, StoreId, UserId};
use domain::{Order, OrderStatus};

use crate::{OrderStoreError, Result};

/// Core trait for order persistence.
///
/// Implementations must be thread-safe (Send + Sync). Soft-deleted orders
/// are invisible to every read method. Listings are newest-first by
/// creation time and use `limit`/`offset` exactly as given.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order together with all of its line items.
    ///
    /// Either the order and every line item become visible, or nothing does.
    /// Fails with `DuplicateIdempotencyKey` if the order carries a key already
    /// used by the same user.
    async fn create(&self, order: &Order) -> Result<()>;

    /// Retrieves an order by ID with its line items attached.
    async fn get_by_id(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Retrieves the order a user placed with the given idempotency key.
    async fn find_by_idempotency_key(&self, user_id: UserId, key: &str) -> Result<Option<Order>>;

    /// Lists orders placed by a user, returning the page and the total count.
    async fn list_by_user(
        &self,
        user_id: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Order>, u64)>;

    /// Lists orders placed against a store, returning the page and the total count.
    async fn list_by_store(
        &self,
        store_id: StoreId,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Order>, u64)>;

    /// Sets the status of an order and returns the updated order.
    async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order>;

    /// Marks an order as deleted without removing it.
    async fn soft_delete(&self, order_id: OrderId) -> Result<()>;
}

/// Extension trait providing convenience methods for order stores.
#[async_trait]
pub trait OrderStoreExt: OrderStore {
    /// Retrieves an order, failing with `NotFound` if it is absent.
    async fn get_existing(&self, order_id: OrderId) -> Result<Order> {
        self.get_by_id(order_id)
            .await?
            .ok_or(OrderStoreError::NotFound(order_id))
    }

    /// Checks if an order exists and is not deleted.
    async fn order_exists(&self, order_id: OrderId) -> Result<bool> {
        Ok(self.get_by_id(order_id).await?.is_some())
    }
}

// Blanket implementation for all OrderStore implementations
impl<T: OrderStore + ?Sized> OrderStoreExt for T {}

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, StoreId, UserId};
use domain::{Order, OrderStatus};
use tokio::sync::RwLock;

use crate::{OrderStoreError, Result, store::OrderStore};

#[derive(Debug, Default)]
struct InMemoryState {
    /// Orders in insertion order.
    orders: Vec<Order>,
    fail_on_create: bool,
}

/// In-memory order store implementation for testing.
///
/// This implementation keeps all orders in memory and provides
/// the same interface as the PostgreSQL implementation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail every subsequent `create` call.
    pub async fn set_fail_on_create(&self, fail: bool) {
        self.state.write().await.fail_on_create = fail;
    }

    /// Returns the number of stored orders, including soft-deleted ones.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    async fn list_where(
        &self,
        matches: impl Fn(&Order) -> bool,
        limit: usize,
        offset: usize,
    ) -> (Vec<Order>, u64) {
        let state = self.state.read().await;
        let mut found: Vec<(usize, &Order)> = state
            .orders
            .iter()
            .enumerate()
            .filter(|(_, o)| !o.is_deleted() && matches(o))
            .collect();

        // Newest first; later insertions win ties on equal timestamps
        found.sort_by(|(ia, a), (ib, b)| b.created_at.cmp(&a.created_at).then(ib.cmp(ia)));

        let total = found.len() as u64;
        let page = found
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, o)| o.clone())
            .collect();

        (page, total)
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;

        if state.fail_on_create {
            return Err(OrderStoreError::Unavailable(
                "order store configured to fail on create".to_string(),
            ));
        }

        if let Some(key) = &order.idempotency_key {
            let duplicate = state.orders.iter().any(|o| {
                o.user_id == order.user_id && o.idempotency_key.as_deref() == Some(key.as_str())
            });
            if duplicate {
                return Err(OrderStoreError::DuplicateIdempotencyKey {
                    user_id: order.user_id,
                    key: key.clone(),
                });
            }
        }

        state.orders.push(order.clone());
        Ok(())
    }

    async fn get_by_id(&self, order_id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .find(|o| o.id == order_id && !o.is_deleted())
            .cloned())
    }

    async fn find_by_idempotency_key(&self, user_id: UserId, key: &str) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .find(|o| {
                o.user_id == user_id && o.idempotency_key.as_deref() == Some(key) && !o.is_deleted()
            })
            .cloned())
    }

    async fn list_by_user(
        &self,
        user_id: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Order>, u64)> {
        Ok(self
            .list_where(|o| o.user_id == user_id, limit, offset)
            .await)
    }

    async fn list_by_store(
        &self,
        store_id: StoreId,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Order>, u64)> {
        Ok(self
            .list_where(|o| o.store_id == store_id, limit, offset)
            .await)
    }

    async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == order_id && !o.is_deleted())
            .ok_or(OrderStoreError::NotFound(order_id))?;

        order.status = status;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn soft_delete(&self, order_id: OrderId) -> Result<()> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == order_id && !o.is_deleted())
            .ok_or(OrderStoreError::NotFound(order_id))?;

        let now = Utc::now();
        order.deleted_at = Some(now);
        order.updated_at = now;
        Ok(())
    }
}

//! High-level ordering API.

use common::{OrderId, StoreId};
use domain::{ListScope, Order, PlaceOrder, Principal, TransitionPolicy, UpdateOrderStatus};
use order_store::{OrderStore, OrderStoreExt, Page, Pagination};

use crate::authorizer::OrderAuthorizer;
use crate::error::Result;
use crate::placement::PlacementCoordinator;
use crate::services::{Catalog, InventoryLedger};
use crate::transitions::StatusTransitionMachine;

/// Entry point for every order operation.
///
/// Wires the placement coordinator, the authorizer and the status machine
/// over one order store, one catalog and one inventory ledger.
pub struct OrderingService<S, C, L>
where
    S: OrderStore + Clone,
    C: Catalog + Clone,
    L: InventoryLedger,
{
    store: S,
    placement: PlacementCoordinator<S, C, L>,
    authorizer: OrderAuthorizer<C>,
    transitions: StatusTransitionMachine<S, C>,
}

impl<S, C, L> OrderingService<S, C, L>
where
    S: OrderStore + Clone,
    C: Catalog + Clone,
    L: InventoryLedger,
{
    /// Creates a new ordering service with the permissive transition policy.
    pub fn new(store: S, catalog: C, ledger: L) -> Self {
        let authorizer = OrderAuthorizer::new(catalog.clone());
        Self {
            placement: PlacementCoordinator::new(store.clone(), catalog, ledger),
            transitions: StatusTransitionMachine::new(store.clone(), authorizer.clone()),
            authorizer,
            store,
        }
    }

    /// Replaces the status transition policy.
    pub fn with_transition_policy(mut self, policy: TransitionPolicy) -> Self {
        self.transitions = self.transitions.with_policy(policy);
        self
    }

    /// Returns the active transition policy.
    pub fn transition_policy(&self) -> TransitionPolicy {
        self.transitions.policy()
    }

    /// Places an order.
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<Order> {
        self.placement.place_order(cmd).await
    }

    /// Loads an order the principal is allowed to see.
    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub async fn get_order(&self, order_id: OrderId, principal: &Principal) -> Result<Order> {
        let order = self.store.get_existing(order_id).await?;

        self.authorizer.authorize_view(&order, principal).await?;
        Ok(order)
    }

    /// Lists orders visible through the principal's scope.
    ///
    /// `limit` and `offset` are raw caller input and are clamped before use.
    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id, role = %principal.role))]
    pub async fn list_orders(
        &self,
        principal: &Principal,
        store_filter: Option<StoreId>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Page<Order>> {
        let pagination = Pagination::clamped(limit, offset);

        let (orders, total) = match ListScope::resolve(principal, store_filter) {
            ListScope::OwnOrders(user_id) => {
                self.store
                    .list_by_user(user_id, pagination.limit, pagination.offset)
                    .await?
            }
            ListScope::Store(store_id) => {
                self.store
                    .list_by_store(store_id, pagination.limit, pagination.offset)
                    .await?
            }
        };

        Ok(Page::new(orders, total, pagination))
    }

    /// Changes the status of an order.
    pub async fn update_order_status(
        &self,
        cmd: UpdateOrderStatus,
        principal: &Principal,
    ) -> Result<Order> {
        self.transitions.update_status(cmd, principal).await
    }

    /// Soft-deletes an order. Only superusers and the store owner may do so.
    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub async fn delete_order(&self, order_id: OrderId, principal: &Principal) -> Result<()> {
        let order = self.store.get_existing(order_id).await?;

        self.authorizer.authorize_delete(&order, principal).await?;
        self.store.soft_delete(order_id).await?;

        tracing::info!("order deleted");
        Ok(())
    }
}

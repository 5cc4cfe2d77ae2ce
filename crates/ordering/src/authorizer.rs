//! Order access checks backed by catalog store ownership.

use common::{StoreId, UserId};
use domain::{Order, Principal, access};

use crate::error::{OrderError, Result};
use crate::services::Catalog;

/// Decides whether a principal may read or change an order.
///
/// The owner of the order's store is only looked up when the cheaper
/// checks (superuser, placing user) have not already granted access.
#[derive(Clone)]
pub struct OrderAuthorizer<C: Catalog> {
    catalog: C,
}

impl<C: Catalog> OrderAuthorizer<C> {
    /// Creates a new authorizer.
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    /// Returns the owner of a store, or None if the store is unknown.
    pub async fn store_owner(&self, store_id: StoreId) -> Result<Option<UserId>> {
        Ok(self
            .catalog
            .get_store(store_id)
            .await?
            .map(|store| store.owner_id))
    }

    /// Fails with `PermissionDenied` unless the principal may read the order.
    pub async fn authorize_view(&self, order: &Order, principal: &Principal) -> Result<()> {
        if access::can_view(order, principal, None) {
            return Ok(());
        }

        let owner = self.store_owner(order.store_id).await?;
        if access::can_view(order, principal, owner) {
            Ok(())
        } else {
            Err(deny(order, principal, "view"))
        }
    }

    /// Fails with `PermissionDenied` unless the principal may change the
    /// order's status.
    pub async fn authorize_status_change(
        &self,
        order: &Order,
        principal: &Principal,
    ) -> Result<()> {
        self.authorize_mutation(order, principal, "update").await
    }

    /// Fails with `PermissionDenied` unless the principal may delete the order.
    pub async fn authorize_delete(&self, order: &Order, principal: &Principal) -> Result<()> {
        self.authorize_mutation(order, principal, "delete").await
    }

    async fn authorize_mutation(
        &self,
        order: &Order,
        principal: &Principal,
        action: &'static str,
    ) -> Result<()> {
        if access::can_mutate_status(order, principal, None) {
            return Ok(());
        }

        let owner = self.store_owner(order.store_id).await?;
        if access::can_mutate_status(order, principal, owner) {
            Ok(())
        } else {
            Err(deny(order, principal, action))
        }
    }
}

fn deny(order: &Order, principal: &Principal, action: &'static str) -> OrderError {
    metrics::counter!("order_access_denied_total", "action" => action).increment(1);
    tracing::warn!(
        order_id = %order.id,
        user_id = %principal.user_id,
        role = %principal.role,
        action,
        "order access denied"
    );
    OrderError::PermissionDenied {
        user_id: principal.user_id,
        order_id: order.id,
        action,
    }
}

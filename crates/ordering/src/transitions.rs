//! Order status changes.

use domain::{Order, Principal, TransitionPolicy, UpdateOrderStatus};
use order_store::{OrderStore, OrderStoreExt};

use crate::authorizer::OrderAuthorizer;
use crate::error::{OrderError, Result};
use crate::services::Catalog;

/// Applies status changes to stored orders.
///
/// Permission is checked before the transition policy, so a principal who
/// may not touch the order learns nothing about its current status.
pub struct StatusTransitionMachine<S: OrderStore, C: Catalog> {
    store: S,
    authorizer: OrderAuthorizer<C>,
    policy: TransitionPolicy,
}

impl<S: OrderStore, C: Catalog> StatusTransitionMachine<S, C> {
    /// Creates a machine with the default (permissive) policy.
    pub fn new(store: S, authorizer: OrderAuthorizer<C>) -> Self {
        Self {
            store,
            authorizer,
            policy: TransitionPolicy::default(),
        }
    }

    /// Replaces the transition policy.
    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    /// Moves an order to `cmd.status` on behalf of `principal`.
    #[tracing::instrument(
        skip(self, principal),
        fields(order_id = %cmd.order_id, to = %cmd.status, user_id = %principal.user_id)
    )]
    pub async fn update_status(
        &self,
        cmd: UpdateOrderStatus,
        principal: &Principal,
    ) -> Result<Order> {
        let order = self.store.get_existing(cmd.order_id).await?;

        self.authorizer
            .authorize_status_change(&order, principal)
            .await?;

        if !self.policy.allows(order.status, cmd.status) {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: cmd.status,
            });
        }

        let updated = self.store.update_status(cmd.order_id, cmd.status).await?;

        metrics::counter!(
            "order_status_updates_total",
            "from" => order.status.as_str(),
            "to" => cmd.status.as_str()
        )
        .increment(1);
        tracing::info!(from = %order.status, "order status updated");

        Ok(updated)
    }
}

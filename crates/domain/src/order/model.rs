//! Order entity.

use chrono::{DateTime, SubsecRound, Utc};
use common::{OrderId, StoreId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

use super::{LineItem, Money, OrderStatus};

/// A placed order with its immutable line items.
///
/// Only `status` and `updated_at` change after creation; `deleted_at`
/// is set once by a soft delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,

    /// User who placed the order.
    pub user_id: UserId,

    /// Store the order was placed against.
    pub store_id: StoreId,

    /// Delivery person, once assigned.
    pub delivery_person_id: Option<UserId>,

    /// Current fulfillment status.
    pub status: OrderStatus,

    /// Sum of every line item subtotal.
    pub total: Money,

    /// Line items in cart order.
    pub items: Vec<LineItem>,

    /// Caller-supplied key used to de-duplicate retried placements.
    pub idempotency_key: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Builds a new pending order, computing the total from the line items.
    pub fn place(
        user_id: UserId,
        store_id: StoreId,
        items: Vec<LineItem>,
        idempotency_key: Option<String>,
    ) -> Result<Self, DomainError> {
        if items.is_empty() {
            return Err(DomainError::EmptyCart);
        }

        let total = sum_line_items(&items)?;
        // Microseconds, the finest precision the order tables keep.
        let now = Utc::now().trunc_subsecs(6);

        Ok(Self {
            id: OrderId::new(),
            user_id,
            store_id,
            delivery_person_id: None,
            status: OrderStatus::Pending,
            total,
            items,
            idempotency_key,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Recomputes the total from the line items.
    pub fn computed_total(&self) -> Result<Money, DomainError> {
        sum_line_items(&self.items)
    }

    /// Returns true if the order has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

fn sum_line_items(items: &[LineItem]) -> Result<Money, DomainError> {
    items.iter().try_fold(Money::zero(), |total, item| {
        item.subtotal()
            .and_then(|subtotal| total.checked_add(subtotal))
            .ok_or(DomainError::TotalOverflow)
    })
}

#[cfg(test)]
mod tests {
    use common::ProductId;

    use super::*;

    fn items() -> Vec<LineItem> {
        vec![
            LineItem::new(ProductId::new(), 3, Money::from_cents(1000)),
            LineItem::new(ProductId::new(), 2, Money::from_cents(250)),
        ]
    }

    #[test]
    fn test_place_computes_total() {
        let order = Order::place(UserId::new(), StoreId::new(), items(), None).unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total, Money::from_cents(3500));
        assert_eq!(order.computed_total().unwrap(), order.total);
        assert!(order.delivery_person_id.is_none());
        assert!(!order.is_deleted());
    }

    #[test]
    fn test_place_timestamps_have_microsecond_precision() {
        let order = Order::place(UserId::new(), StoreId::new(), items(), None).unwrap();

        assert_eq!(order.created_at.timestamp_subsec_nanos() % 1_000, 0);
        assert_eq!(order.created_at, order.updated_at);
    }

    #[test]
    fn test_place_preserves_item_order() {
        let line_items = items();
        let first = line_items[0].product_id;
        let order = Order::place(UserId::new(), StoreId::new(), line_items, None).unwrap();
        assert_eq!(order.items[0].product_id, first);
    }

    #[test]
    fn test_place_rejects_empty_items() {
        let result = Order::place(UserId::new(), StoreId::new(), vec![], None);
        assert_eq!(result.unwrap_err(), DomainError::EmptyCart);
    }

    #[test]
    fn test_place_detects_overflow() {
        let huge = vec![
            LineItem::new(ProductId::new(), 2, Money::from_cents(i64::MAX / 2)),
            LineItem::new(ProductId::new(), 1, Money::from_cents(10)),
        ];
        let result = Order::place(UserId::new(), StoreId::new(), huge, None);
        assert_eq!(result.unwrap_err(), DomainError::TotalOverflow);
    }

    #[test]
    fn test_order_serialization_roundtrip() {
        let order = Order::place(
            UserId::new(),
            StoreId::new(),
            items(),
            Some("retry-1".to_string()),
        )
        .unwrap();
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, back);
    }
}

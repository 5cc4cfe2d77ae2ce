//! Read-only views of catalog entities consumed by order placement.

use common::{ProductId, StoreId, UserId};
use serde::{Deserialize, Serialize};

use crate::order::Money;

/// A store as seen by the ordering core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub id: StoreId,
    pub owner_id: UserId,
    pub is_active: bool,
}

/// A product as seen by the ordering core.
///
/// `stock` is informational; the inventory ledger is the authority on
/// whether a reservation succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub store_id: StoreId,
    pub price: Money,
    pub stock: u32,
    pub is_active: bool,
}

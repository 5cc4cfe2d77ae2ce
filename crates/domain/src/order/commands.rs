//! Order commands.

use common::{OrderId, ProductId, StoreId, UserId};

use crate::error::DomainError;

use super::{CartItem, OrderStatus};

/// Command to place a new order from a cart.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    /// The user placing the order.
    pub buyer_id: UserId,

    /// The store the cart belongs to.
    pub store_id: StoreId,

    /// Requested products, in cart order.
    pub items: Vec<CartItem>,

    /// Optional key that makes retries of the same placement return the same order.
    pub idempotency_key: Option<String>,
}

impl PlaceOrder {
    /// Longest idempotency key, in bytes, an order can be stored with.
    pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

    /// Creates a new PlaceOrder command.
    pub fn new(buyer_id: UserId, store_id: StoreId, items: Vec<CartItem>) -> Self {
        Self {
            buyer_id,
            store_id,
            items,
            idempotency_key: None,
        }
    }

    /// Adds a cart line.
    pub fn item(mut self, product_id: ProductId, quantity: i64) -> Self {
        self.items.push(CartItem::new(product_id, quantity));
        self
    }

    /// Attaches an idempotency key. Blank keys are ignored.
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.idempotency_key = if key.trim().is_empty() {
            None
        } else {
            Some(key)
        };
        self
    }
}

/// Command to move an order to a new status.
#[derive(Debug, Clone, Copy)]
pub struct UpdateOrderStatus {
    /// The order to update.
    pub order_id: OrderId,

    /// The requested status.
    pub status: OrderStatus,
}

impl UpdateOrderStatus {
    /// Creates a new UpdateOrderStatus command.
    pub fn new(order_id: OrderId, status: OrderStatus) -> Self {
        Self { order_id, status }
    }

    /// Parses the requested status from its wire name.
    pub fn parse(order_id: OrderId, status: &str) -> Result<Self, DomainError> {
        Ok(Self::new(order_id, status.parse()?))
    }
}

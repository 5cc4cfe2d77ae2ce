//! Domain error types.

use common::ProductId;
use thiserror::Error;

/// Errors raised while validating order data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The cart contains no items.
    #[error("Cart is empty")]
    EmptyCart,

    /// A requested quantity is below 1 or out of range.
    #[error("Invalid quantity {quantity} for product {product_id} (must be at least 1)")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },

    /// A catalog price is negative.
    #[error("Invalid price for product {product_id}: {price_cents} cents")]
    InvalidPrice {
        product_id: ProductId,
        price_cents: i64,
    },

    /// The status string is not one of the legal values.
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// The role string is not one of the legal values.
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// The order total does not fit the money representation.
    #[error("Order total overflows")]
    TotalOverflow,
}

use common::{OrderId, UserId};
use thiserror::Error;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum OrderStoreError {
    /// The order does not exist or has been soft-deleted.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// An order with the same idempotency key already exists for this user.
    #[error("Duplicate idempotency key '{key}' for user {user_id}")]
    DuplicateIdempotencyKey { user_id: UserId, key: String },

    /// A stored row could not be mapped back to a valid order.
    #[error("Corrupt order record {order_id}: {reason}")]
    Corrupt { order_id: OrderId, reason: String },

    /// The store was told to fail (in-memory test hook) or is otherwise unavailable.
    #[error("Order store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, OrderStoreError>;

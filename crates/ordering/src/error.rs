//! Ordering error types.

use common::{OrderId, ProductId, StoreId, UserId};
use domain::{DomainError, OrderStatus};
use order_store::OrderStoreError;
use thiserror::Error;

use crate::services::CatalogError;

/// Coarse classification of an [`OrderError`], used by callers to pick a
/// response without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Inactive,
    InvalidInput,
    InsufficientStock,
    PermissionDenied,
    Conflict,
    Internal,
}

impl ErrorKind {
    /// Returns a stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Inactive => "inactive",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Errors that can occur while placing, reading or updating orders.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The cart contains no items.
    #[error("Cart is empty")]
    EmptyCart,

    /// The store does not exist.
    #[error("Store not found: {0}")]
    StoreNotFound(StoreId),

    /// The store exists but does not accept orders.
    #[error("Store is inactive: {0}")]
    StoreInactive(StoreId),

    /// A cart product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// A cart product exists but is not for sale.
    #[error("Product is inactive: {0}")]
    ProductInactive(ProductId),

    /// A cart product belongs to a different store.
    #[error("Product {product_id} does not belong to store {store_id}")]
    ProductStoreMismatch {
        product_id: ProductId,
        store_id: StoreId,
    },

    /// A cart quantity is below 1 or out of range.
    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },

    /// The idempotency key does not fit the stored column.
    #[error("Idempotency key is {length} bytes, at most {max} allowed")]
    IdempotencyKeyTooLong { length: usize, max: usize },

    /// The catalog holds a negative price.
    #[error("Invalid price for product {product_id}: {price_cents} cents")]
    InvalidPrice {
        product_id: ProductId,
        price_cents: i64,
    },

    /// Not enough stock to fulfil a cart line.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The status value is not one of the legal values.
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// The role value is not one of the legal values.
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// The transition policy rejects this status change.
    #[error("Cannot transition order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The order does not exist or has been deleted.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The principal may not perform this action on the order.
    #[error("User {user_id} may not {action} order {order_id}")]
    PermissionDenied {
        user_id: UserId,
        order_id: OrderId,
        action: &'static str,
    },

    /// A concurrent operation won a race this one cannot recover from.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Releasing reservations after a failed placement failed; stock has leaked.
    #[error("Compensation failed after '{cause}': {reason} (leaked {leaked:?})")]
    CompensationFailed {
        cause: String,
        reason: String,
        leaked: Vec<(ProductId, u32)>,
    },

    /// The order total does not fit the money representation.
    #[error("Order total overflows")]
    TotalOverflow,

    /// Order store error.
    #[error("Order store error: {0}")]
    Store(OrderStoreError),

    /// Catalog or inventory error.
    #[error("Catalog error: {0}")]
    Catalog(CatalogError),
}

impl OrderError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::StoreNotFound(_)
            | OrderError::ProductNotFound(_)
            | OrderError::OrderNotFound(_) => ErrorKind::NotFound,
            OrderError::StoreInactive(_) | OrderError::ProductInactive(_) => ErrorKind::Inactive,
            OrderError::EmptyCart
            | OrderError::ProductStoreMismatch { .. }
            | OrderError::InvalidQuantity { .. }
            | OrderError::IdempotencyKeyTooLong { .. }
            | OrderError::InvalidStatus(_)
            | OrderError::InvalidRole(_)
            | OrderError::InvalidTransition { .. } => ErrorKind::InvalidInput,
            OrderError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            OrderError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            OrderError::Conflict(_) => ErrorKind::Conflict,
            OrderError::InvalidPrice { .. }
            | OrderError::CompensationFailed { .. }
            | OrderError::TotalOverflow
            | OrderError::Store(_)
            | OrderError::Catalog(_) => ErrorKind::Internal,
        }
    }
}

impl From<DomainError> for OrderError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::EmptyCart => OrderError::EmptyCart,
            DomainError::InvalidQuantity {
                product_id,
                quantity,
            } => OrderError::InvalidQuantity {
                product_id,
                quantity,
            },
            DomainError::InvalidPrice {
                product_id,
                price_cents,
            } => OrderError::InvalidPrice {
                product_id,
                price_cents,
            },
            DomainError::InvalidStatus(status) => OrderError::InvalidStatus(status),
            DomainError::InvalidRole(role) => OrderError::InvalidRole(role),
            DomainError::TotalOverflow => OrderError::TotalOverflow,
        }
    }
}

impl From<OrderStoreError> for OrderError {
    fn from(err: OrderStoreError) -> Self {
        match err {
            OrderStoreError::NotFound(order_id) => OrderError::OrderNotFound(order_id),
            OrderStoreError::DuplicateIdempotencyKey { key, .. } => {
                OrderError::Conflict(format!("idempotency key '{key}' already used"))
            }
            other => OrderError::Store(other),
        }
    }
}

impl From<CatalogError> for OrderError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::ProductNotFound(product_id) => OrderError::ProductNotFound(product_id),
            CatalogError::InsufficientStock {
                product_id,
                requested,
                available,
            } => OrderError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            CatalogError::Conflict(reason) => OrderError::Conflict(reason),
            other => OrderError::Catalog(other),
        }
    }
}

/// Convenience type alias for ordering results.
pub type Result<T> = std::result::Result<T, OrderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(OrderError::EmptyCart.kind(), ErrorKind::InvalidInput);
        assert_eq!(
            OrderError::StoreInactive(StoreId::new()).kind(),
            ErrorKind::Inactive
        );
        assert_eq!(
            OrderError::OrderNotFound(OrderId::new()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            OrderError::IdempotencyKeyTooLong {
                length: 300,
                max: 255
            }
            .kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            OrderError::CompensationFailed {
                cause: "boom".to_string(),
                reason: "down".to_string(),
                leaked: vec![],
            }
            .kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_store_not_found_becomes_order_not_found() {
        let id = OrderId::new();
        let err: OrderError = OrderStoreError::NotFound(id).into();
        assert!(matches!(err, OrderError::OrderNotFound(found) if found == id));
    }

    #[test]
    fn test_catalog_stock_error_keeps_counts() {
        let product_id = ProductId::new();
        let err: OrderError = CatalogError::InsufficientStock {
            product_id,
            requested: 3,
            available: 2,
        }
        .into();

        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert!(matches!(
            err,
            OrderError::InsufficientStock {
                requested: 3,
                available: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_domain_status_error_maps() {
        let err: OrderError = DomainError::InvalidStatus("lost".to_string()).into();
        assert!(matches!(err, OrderError::InvalidStatus(ref s) if s == "lost"));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}

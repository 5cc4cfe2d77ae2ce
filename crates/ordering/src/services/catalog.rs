//! Catalog collaborator trait and its error type.

use async_trait::async_trait;
use common::{ProductId, StoreId};
use domain::{ProductSnapshot, StoreSnapshot};
use thiserror::Error;

/// Errors reported by catalog and inventory collaborators.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Not enough stock to satisfy a reservation.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The reservation lost a race it could not resolve.
    #[error("Reservation conflict: {0}")]
    Conflict(String),

    /// The collaborator is unavailable.
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read access to stores and products.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Looks up a store, active or not.
    async fn get_store(&self, store_id: StoreId) -> Result<Option<StoreSnapshot>, CatalogError>;

    /// Looks up a product, active or not.
    async fn get_product(
        &self,
        product_id: ProductId,
    ) -> Result<Option<ProductSnapshot>, CatalogError>;
}

//! Inventory ledger trait.

use async_trait::async_trait;
use common::ProductId;

use super::catalog::CatalogError;

/// Authority over product stock.
///
/// `reserve` is an atomic check-and-decrement: two reservations that
/// together exceed the available stock never both succeed. Every `release`
/// pairs with exactly one earlier successful `reserve` of the same quantity.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Takes `quantity` units of a product out of stock.
    async fn reserve(&self, product_id: ProductId, quantity: u32) -> Result<(), CatalogError>;

    /// Returns `quantity` previously reserved units to stock.
    async fn release(&self, product_id: ProductId, quantity: u32) -> Result<(), CatalogError>;
}

//! Catalog and inventory collaborators with in-memory and PostgreSQL implementations.

pub mod catalog;
pub mod inventory;
pub mod memory;
pub mod postgres;

pub use catalog::{Catalog, CatalogError};
pub use inventory::InventoryLedger;
pub use memory::InMemoryCatalog;
pub use postgres::PostgresCatalog;

//! Order placement and lifecycle for a multi-tenant marketplace.
//!
//! This crate turns carts into orders without overselling stock:
//! 1. Each cart line is validated against the catalog and its stock reserved
//! 2. The order and its line items are persisted in one step
//! 3. On any failure, reservations made so far are released in reverse order
//!
//! It also enforces who may read, update or delete an order, and which
//! status changes are allowed.

pub mod authorizer;
pub mod error;
pub mod placement;
pub mod service;
pub mod services;
pub mod transitions;

pub use authorizer::OrderAuthorizer;
pub use error::{ErrorKind, OrderError, Result};
pub use placement::{PlacementCoordinator, ReservationLog};
pub use service::OrderingService;
pub use services::{Catalog, CatalogError, InMemoryCatalog, InventoryLedger, PostgresCatalog};
pub use transitions::StatusTransitionMachine;

//! Domain layer for the ordering system.
//!
//! This crate provides:
//! - the Order entity with its immutable, price-snapshotted line items
//! - the order status lifecycle and its transition table
//! - roles, principals and the order access policy
//! - read-only catalog snapshots consumed during placement

pub mod access;
pub mod catalog;
pub mod error;
pub mod order;

pub use access::{ListScope, Principal, Role};
pub use catalog::{ProductSnapshot, StoreSnapshot};
pub use error::DomainError;
pub use order::{
    CartItem, LineItem, Money, Order, OrderStatus, PlaceOrder, TransitionPolicy,
    UpdateOrderStatus,
};

//! Identifier types shared by every crate in the ordering workspace.

mod types;

pub use types::{LineItemId, OrderId, ProductId, StoreId, UserId};

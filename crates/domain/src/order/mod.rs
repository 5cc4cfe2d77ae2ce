//! Order entity and related types.

mod commands;
mod model;
mod state;
mod value_objects;

pub use commands::{PlaceOrder, UpdateOrderStatus};
pub use model::Order;
pub use state::{OrderStatus, TransitionPolicy};
pub use value_objects::{CartItem, LineItem, Money};

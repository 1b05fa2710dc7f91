//! Shared identifier and value types for the confectionery shop backend.

mod money;
mod types;

pub use money::Money;
pub use types::{OrderId, OrderItemId, ProductId, UserId};

//! Persistence boundary for the confectionery shop backend.
//!
//! Exposes the [`ShopStore`] trait together with two implementations:
//! a PostgreSQL-backed store for production and an in-memory store for
//! tests. Every order-item mutation is atomic: the stock check and the
//! stock adjustment happen inside a single transaction with the product
//! row held for the duration.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use common::{Money, OrderId, OrderItemId, ProductId, UserId};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use model::{NewProduct, NewUser, Order, OrderItem, Product, ProductPatch, User};
pub use postgres::PostgresStore;
pub use store::ShopStore;

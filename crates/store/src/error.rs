use thiserror::Error;

use common::{OrderId, OrderItemId, ProductId};

/// Errors that can occur when interacting with the shop store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The order item does not exist within the order.
    #[error("Order item not found: {0}")]
    ItemNotFound(OrderItemId),

    /// A user with this email is already registered.
    #[error("A user with email {0} already exists")]
    DuplicateEmail(String),

    /// The (order, product) pair already has a line item.
    #[error("Product {product_id} is already in order {order_id}")]
    DuplicateItem {
        order_id: OrderId,
        product_id: ProductId,
    },

    /// The product is referenced by live order items and cannot be
    /// deleted.
    #[error("Product {0} is referenced by existing order items")]
    ProductInUse(ProductId),

    /// The product cannot cover the requested stock delta.
    /// The check-then-adjust sequence aborts before any persisted change.
    #[error(
        "Insufficient stock for product {product_id}: {available} available, {requested} requested"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: i32,
        requested: i32,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

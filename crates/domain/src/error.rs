//! Domain error types.

use thiserror::Error;

use common::{OrderId, OrderItemId, ProductId};
use store::StoreError;

use crate::recommendation::RecommendationMessage;

/// Errors that can occur during domain operations.
///
/// `InsufficientStock` is the only recoverable outcome: it carries the
/// full recommendation payload so the caller can retry with a substitute
/// product. Everything else is terminal for the request.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Order absent or not owned by the caller.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Product absent.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Order item absent within the order.
    #[error("Order item not found: {0}")]
    ItemNotFound(OrderItemId),

    /// Stock cannot cover the requested quantity. Carries substitute
    /// recommendations; the payload is never partial.
    #[error("{}", recommendations.detail)]
    InsufficientStock {
        recommendations: RecommendationMessage,
    },

    /// The order already has a line item for this product.
    #[error("Product is already in the order")]
    DuplicateItem,

    /// Quantity must be at least 1.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: i32 },

    /// Malformed input rejected before reaching the mutation logic.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An error occurred in the shop store.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OrderNotFound(id) => DomainError::OrderNotFound(id),
            StoreError::ProductNotFound(id) => DomainError::ProductNotFound(id),
            StoreError::ItemNotFound(id) => DomainError::ItemNotFound(id),
            StoreError::DuplicateItem { .. } => DomainError::DuplicateItem,
            // InsufficientStock is intercepted by the mutation service so
            // the recommendation payload can be attached; reaching this
            // arm means an internal path missed it.
            other => DomainError::Store(other),
        }
    }
}

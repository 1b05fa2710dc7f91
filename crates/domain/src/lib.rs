//! Domain layer for the confectionery shop backend.
//!
//! This crate provides the behavioral core of the system:
//! - Recommendation engine: substitute products ranked by shared
//!   ingredients, with cross-category backfill, capped at three results
//! - Order mutation service: ownership-checked, stock-aware add/update/
//!   remove of order line items
//! - Catalog service: validated product CRUD

pub mod catalog;
pub mod error;
pub mod recommendation;
pub mod service;

pub use catalog::CatalogService;
pub use error::DomainError;
pub use recommendation::{
    MAX_RECOMMENDATIONS, RecommendationEngine, RecommendationMessage, RecommendedProduct,
    prepare_recommendation_message, rank_alternatives,
};
pub use service::OrderMutationService;

pub use common::{Money, OrderId, OrderItemId, ProductId, UserId};
pub use store::{NewProduct, NewUser, Order, OrderItem, Product, ProductPatch, ShopStore, User};

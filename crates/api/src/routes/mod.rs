//! Route handlers and shared application state.

pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod users;

use domain::{CatalogService, OrderMutationService};
use store::ShopStore;

use crate::auth::JwtAuth;

/// Shared application state accessible from all handlers.
pub struct AppState<S: ShopStore> {
    pub store: S,
    pub orders: OrderMutationService<S>,
    pub catalog: CatalogService<S>,
    pub auth: JwtAuth,
}

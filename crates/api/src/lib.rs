//! HTTP API server for the confectionery shop backend.
//!
//! Provides REST endpoints for user auth, the product catalog and
//! stock-aware order management, with structured logging (tracing) and
//! Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use domain::{CatalogService, OrderMutationService};
use store::ShopStore;

use auth::JwtAuth;
use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: ShopStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/auth/register", post(routes::users::register::<S>))
        .route("/auth/login", post(routes::users::login::<S>))
        .route("/auth/me", get(routes::users::me::<S>))
        .route("/products", post(routes::products::create::<S>))
        .route("/products", get(routes::products::list::<S>))
        .route("/products/{id}", get(routes::products::get::<S>))
        .route("/products/{id}", put(routes::products::update::<S>))
        .route("/products/{id}", delete(routes::products::delete::<S>))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/items", post(routes::orders::add_item::<S>))
        .route(
            "/orders/{id}/items/{item_id}",
            put(routes::orders::update_item::<S>),
        )
        .route(
            "/orders/{id}/items/{item_id}",
            delete(routes::orders::remove_item::<S>),
        )
        .route("/orders/{id}/shortages", get(routes::orders::shortages::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state: services over the given store plus the
/// token authority.
pub fn create_state<S: ShopStore + Clone + 'static>(store: S, auth: JwtAuth) -> Arc<AppState<S>> {
    Arc::new(AppState {
        orders: OrderMutationService::new(store.clone()),
        catalog: CatalogService::new(store.clone()),
        store,
        auth,
    })
}

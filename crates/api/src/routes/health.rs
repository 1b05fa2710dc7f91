//! Liveness probe.

use axum::Json;
use serde::Serialize;

/// Probe payload naming the service so a fleet dashboard can tell the
/// shop backend apart from its neighbours.
#[derive(Serialize)]
pub struct HealthResponse {
    pub service: &'static str,
    pub status: &'static str,
}

/// GET /health — the server is up and answering requests.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: "candy-shop-api",
        status: "ok",
    })
}

//! System endpoints

use axum::Json;

use bootrelay_api::responses::HealthResponse;

/// Liveness check for the daemon itself. Unauthenticated.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

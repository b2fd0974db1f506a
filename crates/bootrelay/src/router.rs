//! HTTP router configuration

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::api::{ops, system};
use crate::auth::require_operator;
use crate::state::AppState;

/// Create the application router. Everything except `/health` sits
/// behind the operator allow-list.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/whoami", get(ops::whoami))
        .route("/host/online", get(ops::online))
        .route("/host/status", get(ops::status))
        .route("/host/ip", get(ops::current_ip))
        .route("/host/power-switch", post(ops::power_switch))
        .route("/host/reset-switch", post(ops::reset_switch))
        .route("/host/power-on", post(ops::power_on_request))
        .route("/host/power-on/confirm", post(ops::power_on_confirm))
        .route("/host/shutdown", post(ops::shutdown_request))
        .route("/host/shutdown/confirm", post(ops::shutdown_confirm))
        .route("/host/cancel", post(ops::cancel_operation))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_operator,
        ));

    Router::new()
        .route("/health", get(system::health))
        .merge(protected)
        .with_state(state)
}

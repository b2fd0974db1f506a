//! Operator allow-list middleware
//!
//! Every route except `/health` requires a caller identity carried in a
//! configurable header. Unknown identities get a fixed denial message and
//! an info-level log line; the request never reaches a handler.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::info;

use crate::api::error::AppError;
use crate::state::AppState;

/// Denial body for callers outside the allow-list. Deliberately the same
/// for "no header" and "unknown identity".
pub const DENIAL_MESSAGE: &str = "you are not authorized to operate this relay";

/// Authenticated caller identity, inserted into request extensions for
/// handlers that echo it back
#[derive(Debug, Clone)]
pub struct Identity(pub String);

/// Trim surrounding whitespace; identities are compared exactly otherwise
#[must_use]
pub fn normalize_identity(raw: &str) -> String {
    raw.trim().to_string()
}

/// Allow-list gate. An empty allow-list denies everyone.
pub async fn require_operator(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = &state.config.auth.identity_header;

    let identity = request
        .headers()
        .get(header)
        .and_then(|v| v.to_str().ok())
        .map(normalize_identity)
        .filter(|id| !id.is_empty());

    let Some(identity) = identity else {
        info!(header = %header, "request without caller identity rejected");
        return Err(AppError::unauthorized(DENIAL_MESSAGE));
    };

    if !state
        .config
        .auth
        .allowed_operators
        .iter()
        .any(|allowed| allowed == &identity)
    {
        info!(identity = %identity, "identity outside allow-list rejected");
        return Err(AppError::unauthorized(DENIAL_MESSAGE));
    }

    request.extensions_mut().insert(Identity(identity));
    Ok(next.run(request).await)
}

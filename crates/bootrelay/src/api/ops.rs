//! Power, reset, boot and status endpoints
//!
//! All handlers run behind the operator allow-list. The host actor
//! serializes relay operations through its mailbox; handlers just ask
//! and translate the outcome.

use axum::{Extension, Json, extract::State};
use tracing::{info, instrument};
use uuid::Uuid;

use bootrelay_api::requests::{ConfirmAnswer, PowerOnConfirmRequest, ShutdownConfirmRequest};
use bootrelay_api::responses::{
    ConfirmationResponse, IpResponse, OnlineResponse, OperationResponse, StatusResponse,
    WhoamiResponse,
};
use bootrelay_core::{
    ForceShutdown, GetStatus, OperationOutcome, PowerOn, PressPower, PressReset, QueryOnline,
};

use crate::api::error::AppError;
use crate::auth::Identity;
use crate::confirm::PendingAction;
use crate::ip;
use crate::state::AppState;

fn outcome_response(outcome: OperationOutcome) -> OperationResponse {
    OperationResponse {
        kind: outcome.kind.to_string(),
        detail: outcome.detail,
        output: outcome.output,
    }
}

fn ask_failed<E: std::fmt::Display>(e: E) -> AppError {
    AppError::internal(format!("host actor unavailable: {e}"))
}

/// GET /host/online
pub async fn online(State(state): State<AppState>) -> Result<Json<OnlineResponse>, AppError> {
    let online = state.host.ask(QueryOnline).await.map_err(ask_failed)?;
    Ok(Json(OnlineResponse { online }))
}

/// GET /host/status
pub async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, AppError> {
    let status = state.host.ask(GetStatus).await.map_err(ask_failed)?;
    Ok(Json(StatusResponse {
        state: status.state.to_string(),
        last_outcome: status.last_outcome.map(outcome_response),
    }))
}

/// GET /host/ip
pub async fn current_ip() -> Json<IpResponse> {
    let (local_ip, public_ip) = tokio::join!(ip::local_ip(), ip::public_ip());
    Json(IpResponse {
        local_ip,
        public_ip,
    })
}

/// GET /whoami
pub async fn whoami(Extension(identity): Extension<Identity>) -> Json<WhoamiResponse> {
    Json(WhoamiResponse {
        identity: identity.0,
    })
}

/// POST /host/power-switch
#[instrument(skip_all, fields(operator = %identity.0))]
pub async fn power_switch(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
) -> Result<Json<OperationResponse>, AppError> {
    let outcome = state.host.ask(PressPower).await.map_err(ask_failed)?;
    Ok(Json(outcome_response(outcome)))
}

/// POST /host/reset-switch
#[instrument(skip_all, fields(operator = %identity.0))]
pub async fn reset_switch(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
) -> Result<Json<OperationResponse>, AppError> {
    let outcome = state.host.ask(PressReset).await.map_err(ask_failed)?;
    Ok(Json(outcome_response(outcome)))
}

/// POST /host/power-on
///
/// First phase: refuse when the host is already up, otherwise hand out
/// a token plus the OS choices.
#[instrument(skip_all, fields(operator = %identity.0))]
pub async fn power_on_request(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
) -> Result<Json<ConfirmationResponse>, AppError> {
    let online = state.host.ask(QueryOnline).await.map_err(ask_failed)?;
    if online {
        return Err(AppError::conflict("host is already online"));
    }

    let token = state.confirmations.issue(PendingAction::PowerOn);
    Ok(Json(ConfirmationResponse {
        token,
        message: "choose the OS to boot".to_string(),
        choices: Some(state.boot_choices.clone()),
    }))
}

/// POST /host/power-on/confirm
#[instrument(skip_all, fields(operator = %identity.0, os = %request.os))]
pub async fn power_on_confirm(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Json(request): Json<PowerOnConfirmRequest>,
) -> Result<Json<OperationResponse>, AppError> {
    state
        .confirmations
        .take(request.token, PendingAction::PowerOn)?;

    let job_id = Uuid::new_v4();
    info!(job_id = %job_id, os = %request.os, "power-on confirmed");

    let outcome = state
        .host
        .ask(PowerOn {
            os: request.os,
            job_id,
        })
        .await
        .map_err(ask_failed)?;

    Ok(Json(outcome_response(outcome)))
}

/// POST /host/shutdown
///
/// First phase of the forced power-off exchange.
#[instrument(skip_all, fields(operator = %identity.0))]
pub async fn shutdown_request(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
) -> Result<Json<ConfirmationResponse>, AppError> {
    let token = state.confirmations.issue(PendingAction::Shutdown);
    Ok(Json(ConfirmationResponse {
        token,
        message: "this cuts power without a clean shutdown; confirm with yes or no".to_string(),
        choices: None,
    }))
}

/// POST /host/shutdown/confirm
#[instrument(skip_all, fields(operator = %identity.0))]
pub async fn shutdown_confirm(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Json(request): Json<ShutdownConfirmRequest>,
) -> Result<Json<OperationResponse>, AppError> {
    state
        .confirmations
        .take(request.token, PendingAction::Shutdown)?;

    if request.answer == ConfirmAnswer::No {
        info!("shutdown declined by operator");
        return Ok(Json(outcome_response(OperationOutcome::aborted(
            "shutdown canceled",
        ))));
    }

    info!("forced shutdown confirmed");
    let outcome = state.host.ask(ForceShutdown).await.map_err(ask_failed)?;
    Ok(Json(outcome_response(outcome)))
}

/// POST /host/cancel
///
/// Raise the cancellation flag. An operation waiting for the host to
/// come online notices it at the next poll iteration; an idle actor
/// never sees it because each operation clears the flag on entry.
#[instrument(skip_all, fields(operator = %identity.0))]
pub async fn cancel_operation(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
) -> Json<OperationResponse> {
    state
        .cancel
        .store(true, std::sync::atomic::Ordering::SeqCst);
    info!("cancellation requested");

    Json(OperationResponse {
        kind: "aborted".to_string(),
        detail: "cancellation requested".to_string(),
        output: None,
    })
}

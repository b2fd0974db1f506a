//! Response types for the API

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Result of a liveness query against the controlled host
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OnlineResponse {
    pub online: bool,
}

/// Local and public addresses of the relay board itself
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IpResponse {
    pub local_ip: Option<String>,
    pub public_ip: Option<String>,
}

/// First phase of a two-step exchange: the caller must come back with
/// the token (and, for power-on, an OS choice).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfirmationResponse {
    pub token: Uuid,
    pub message: String,
    /// OS names the caller may choose from (power-on only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
}

/// Terminal result of a power/boot operation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OperationResponse {
    /// Outcome kind: success, timeout, auth_failure, command_failure, aborted
    pub kind: String,
    pub detail: String,
    /// Captured remote command output, when a privileged command ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Current orchestrator state plus the last terminal outcome
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<OperationResponse>,
}

/// Echo of the caller identity, for discovering one's own id
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WhoamiResponse {
    pub identity: String,
}

//! Request types for the API

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Second phase of the power-on exchange: pick the OS to boot.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PowerOnConfirmRequest {
    /// Token handed out by the first phase
    pub token: Uuid,
    /// One of the OS names offered in the first phase
    pub os: String,
}

/// Second phase of the force-shutdown exchange.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShutdownConfirmRequest {
    /// Token handed out by the first phase
    pub token: Uuid,
    pub answer: ConfirmAnswer,
}

/// Yes/no answer for destructive confirmations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmAnswer {
    Yes,
    No,
}

//! Broadcast event types emitted by the orchestrator

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type")]
pub enum RelayEvent {
    StateChanged {
        host: String,
        from: String,
        to: String,
    },
    RelayPulsed {
        host: String,
        channel: String,
        hold_ms: u64,
    },
    OperationCompleted {
        host: String,
        operation: String,
        kind: String,
        detail: String,
    },
    OperationFailed {
        host: String,
        operation: String,
        kind: String,
        detail: String,
    },
}

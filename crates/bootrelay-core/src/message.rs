//! Message types for actor communication
//!
//! Message handlers are implemented in the actor module.

use kameo_macros::Reply;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::OpState;

// ============================================================================
// HostActor Messages
// ============================================================================

/// Power the host on and boot it into the chosen OS
#[derive(Debug)]
pub struct PowerOn {
    /// One of the declared OS names
    pub os: String,
    /// Correlation id for the privileged-command audit trail
    pub job_id: Uuid,
}

/// Plain short press of the power switch
#[derive(Debug)]
pub struct PressPower;

/// Plain short press of the reset switch
#[derive(Debug)]
pub struct PressReset;

/// Long hold of the power switch. Only sent after the operator answered
/// the two-step confirmation with "yes".
#[derive(Debug)]
pub struct ForceShutdown;

/// Pure liveness read, never touches relay state
#[derive(Debug)]
pub struct QueryOnline;

/// Get current state and last terminal outcome
#[derive(Debug)]
pub struct GetStatus;

// ============================================================================
// Replies
// ============================================================================

/// Terminal classification of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Timeout,
    AuthFailure,
    CommandFailure,
    Aborted,
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OutcomeKind::Success => "success",
            OutcomeKind::Timeout => "timeout",
            OutcomeKind::AuthFailure => "auth_failure",
            OutcomeKind::CommandFailure => "command_failure",
            OutcomeKind::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Fully-populated result of an orchestrator-level operation
#[derive(Debug, Clone, Serialize, Deserialize, Reply)]
pub struct OperationOutcome {
    pub kind: OutcomeKind,
    /// Human-readable detail for the operator
    pub detail: String,
    /// Captured remote command output, when a privileged command ran
    pub output: Option<String>,
}

impl OperationOutcome {
    pub fn success(detail: impl Into<String>) -> Self {
        Self {
            kind: OutcomeKind::Success,
            detail: detail.into(),
            output: None,
        }
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self {
            kind: OutcomeKind::Timeout,
            detail: detail.into(),
            output: None,
        }
    }

    pub fn aborted(detail: impl Into<String>) -> Self {
        Self {
            kind: OutcomeKind::Aborted,
            detail: detail.into(),
            output: None,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Success
    }
}

/// Host status response
#[derive(Debug, Clone, Reply)]
pub struct HostStatus {
    /// Host name
    pub name: String,
    /// Current operation state
    pub state: OpState,
    /// Last terminal outcome, if any operation has run
    pub last_outcome: Option<OperationOutcome>,
}

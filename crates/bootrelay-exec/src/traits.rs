//! Session and probe traits

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ExecError;
use crate::result::CommandResult;

/// An authenticated remote session, good for privileged one-shot commands.
///
/// Sessions are single-use: the caller closes them after the command
/// sequence completes, regardless of outcome.
#[async_trait]
pub trait RemoteSession: Send {
    /// Execute one command with elevated rights, capturing exit status,
    /// stdout and stderr. The `job_id` ties the audit log entries of a
    /// single operation together.
    ///
    /// An `Ok` result means the command ran to completion; callers decide
    /// success from the exit status (`CommandResult::success`).
    async fn run_privileged(&mut self, job_id: Uuid, cmd: &str)
    -> Result<CommandResult, ExecError>;

    /// Close the session. Errors during teardown are logged, not surfaced.
    async fn close(self: Box<Self>);
}

/// Opens authenticated sessions to the controlled host.
///
/// One authentication attempt per call; no internal retry.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect(&self, timeout: Duration) -> Result<Box<dyn RemoteSession>, ExecError>;
}

/// Host reachability check, used as a proxy for "finished booting".
///
/// A negative result is a normal `false`, never an error.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn is_online(&self) -> bool;
}

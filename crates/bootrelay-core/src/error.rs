//! Core error types for bootrelay-core

use thiserror::Error;

use crate::relay::RelayError;
use bootrelay_exec::ExecError;

/// Errors that can occur during a power/boot operation
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// Relay actuator fault. Indicates a broken physical setup and is
    /// surfaced as fatal rather than converted into an outcome.
    #[error("relay fault: {0}")]
    Relay(#[from] RelayError),

    /// Remote session error (connect, auth, transport)
    #[error("session error: {0}")]
    Session(#[from] ExecError),

    /// Privileged command completed with a non-zero exit status
    #[error("privileged command exited with status {status}: {stderr}")]
    CommandFailed {
        /// Remote exit status
        status: i32,
        /// Captured stdout
        stdout: String,
        /// Captured stderr
        stderr: String,
    },

    /// OS name not present in the boot entry table
    #[error("unknown OS: {0}")]
    UnknownOs(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),
}

//! Error types for bootrelay-exec

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to the controlled host
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// Failed to connect to remote host
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication rejected or credential unusable
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Connection or command exceeded its deadline
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// Timeout duration that was exceeded
        timeout: Duration,
    },

    /// SSH key error
    #[error("SSH key error: {0}")]
    SshKeyError(String),

    /// I/O error during execution
    #[error("I/O error: {0}")]
    IoError(String),

    /// Session already closed or never established
    #[error("not connected")]
    NotConnected,

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    ConfigError(String),
}

//! Result types for command execution

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Result of a privileged command execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Exit status code (0 for success)
    pub status: i32,
    /// stdout output
    pub stdout: String,
    /// stderr output
    pub stderr: String,
    /// Time taken to execute
    pub duration: Duration,
}

impl CommandResult {
    /// Check if command succeeded (exit code exactly 0)
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Combine stdout and stderr
    #[must_use]
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Connection information for the controlled host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Host address
    pub host: String,
    /// Port (default 22)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Username
    pub user: String,
    /// Upper bound for a single privileged command
    #[serde(default = "default_command_timeout")]
    pub command_timeout: Duration,
}

fn default_port() -> u16 {
    22
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(30)
}

impl ConnectionInfo {
    /// Create new connection info
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            command_timeout: default_command_timeout(),
        }
    }

    /// Set custom port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the per-command timeout
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_requires_exit_zero() {
        let ok = CommandResult {
            status: 0,
            stdout: "done".into(),
            stderr: String::new(),
            duration: Duration::from_millis(5),
        };
        let failed = CommandResult {
            status: 1,
            stdout: String::new(),
            stderr: "denied".into(),
            duration: Duration::from_millis(5),
        };

        assert!(ok.success());
        assert!(!failed.success());
    }

    #[test]
    fn combined_output_appends_stderr() {
        let result = CommandResult {
            status: 1,
            stdout: "out".into(),
            stderr: "err".into(),
            duration: Duration::from_millis(1),
        };

        assert_eq!(result.combined_output(), "out\nerr");
    }
}

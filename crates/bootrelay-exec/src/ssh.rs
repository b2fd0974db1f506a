//! SSH session handling using the russh crate

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use russh::keys::ssh_key;
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key};
use russh::{ChannelMsg, Disconnect, client};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::ExecError;
use crate::keys::{AuthMethod, ResolvedKey};
use crate::result::{CommandResult, ConnectionInfo};
use crate::traits::{RemoteSession, SessionConnector};

/// SSH client handler for russh
#[derive(Debug)]
struct SshClientHandler;

impl client::Handler for SshClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        // Accept all server keys (like StrictHostKeyChecking=no)
        // In production, this should verify against known_hosts
        Ok(true)
    }
}

/// Resolved authentication material
#[derive(Debug)]
enum ResolvedAuth {
    Key(ResolvedKey),
    Password(String),
}

/// Opens single-use SSH sessions to the controlled host.
///
/// Each `connect` call makes exactly one authentication attempt; retries
/// are the orchestrator's decision, never taken here.
pub struct SshConnector {
    /// Connection configuration
    conn_info: ConnectionInfo,
    /// Resolved credential
    auth: ResolvedAuth,
    /// Password for sudo elevation, when key-based elevation is not set up
    sudo_password: Option<String>,
}

impl std::fmt::Debug for SshConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshConnector")
            .field("conn_info", &self.conn_info)
            .finish_non_exhaustive()
    }
}

impl SshConnector {
    /// Create a new connector
    ///
    /// # Errors
    /// Returns `ExecError::SshKeyError` if key resolution fails
    pub fn new(
        conn_info: ConnectionInfo,
        auth: &AuthMethod,
        sudo_password: Option<String>,
    ) -> Result<Self, ExecError> {
        let auth = match auth {
            AuthMethod::Key(source) => {
                let key = source
                    .resolve()
                    .map_err(|e| ExecError::SshKeyError(e.to_string()))?;
                ResolvedAuth::Key(key)
            }
            AuthMethod::Password(password) => {
                if password.is_empty() {
                    return Err(ExecError::ConfigError("empty SSH password".to_string()));
                }
                ResolvedAuth::Password(password.clone())
            }
        };

        Ok(Self {
            conn_info,
            auth,
            sudo_password,
        })
    }

    /// Get connection info
    pub fn connection_info(&self) -> &ConnectionInfo {
        &self.conn_info
    }
}

#[async_trait]
impl SessionConnector for SshConnector {
    #[instrument(skip(self), fields(host = %self.conn_info.host))]
    async fn connect(
        &self,
        connect_timeout: Duration,
    ) -> Result<Box<dyn RemoteSession>, ExecError> {
        info!(
            host = %self.conn_info.host,
            port = self.conn_info.port,
            user = %self.conn_info.user,
            "connecting to SSH"
        );

        let config = Arc::new(client::Config::default());
        let handler = SshClientHandler;

        let mut session = timeout(
            connect_timeout,
            client::connect(
                config,
                (&self.conn_info.host[..], self.conn_info.port),
                handler,
            ),
        )
        .await
        .map_err(|_| ExecError::Timeout {
            timeout: connect_timeout,
        })?
        .map_err(|e| ExecError::ConnectionFailed(e.to_string()))?;

        match &self.auth {
            ResolvedAuth::Key(key) => {
                let key_pair = load_secret_key(key.path(), None)
                    .map_err(|e| ExecError::SshKeyError(e.to_string()))?;

                let hash_alg = session
                    .best_supported_rsa_hash()
                    .await
                    .ok()
                    .flatten()
                    .flatten();
                let auth_res = session
                    .authenticate_publickey(
                        &self.conn_info.user,
                        PrivateKeyWithHashAlg::new(Arc::new(key_pair), hash_alg),
                    )
                    .await
                    .map_err(|e| ExecError::AuthenticationFailed(e.to_string()))?;

                if !auth_res.success() {
                    return Err(ExecError::AuthenticationFailed(
                        "public key authentication rejected".to_string(),
                    ));
                }
            }
            ResolvedAuth::Password(password) => {
                let auth_res = session
                    .authenticate_password(&self.conn_info.user, password)
                    .await
                    .map_err(|e| ExecError::AuthenticationFailed(e.to_string()))?;

                if !auth_res.success() {
                    return Err(ExecError::AuthenticationFailed(
                        "password authentication rejected".to_string(),
                    ));
                }
            }
        }

        info!(host = %self.conn_info.host, "SSH connected and authenticated");

        Ok(Box::new(SshSession {
            handle: Some(session),
            host: self.conn_info.host.clone(),
            sudo_password: self.sudo_password.clone(),
            command_timeout: self.conn_info.command_timeout,
        }))
    }
}

/// A live authenticated SSH session
pub struct SshSession {
    handle: Option<client::Handle<SshClientHandler>>,
    host: String,
    sudo_password: Option<String>,
    command_timeout: Duration,
}

impl SshSession {
    async fn execute(&mut self, cmd: &str) -> Result<CommandResult, ExecError> {
        let session = self.handle.as_mut().ok_or(ExecError::NotConnected)?;

        let start = Instant::now();

        let mut channel = session
            .channel_open_session()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        channel
            .exec(true, cmd)
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        let mut status = -1;
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        loop {
            let msg = channel.wait().await;

            match msg {
                Some(ChannelMsg::Data { data }) => {
                    stdout.extend_from_slice(&data);
                }
                Some(ChannelMsg::ExtendedData { data, ext }) => {
                    if ext == 1 {
                        // stderr
                        stderr.extend_from_slice(&data);
                    }
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    status = exit_status.cast_signed();
                }
                Some(ChannelMsg::Eof) | None => break,
                _ => {}
            }
        }

        let duration = start.elapsed();
        let stdout = String::from_utf8_lossy(&stdout).to_string();
        let stderr = String::from_utf8_lossy(&stderr).to_string();

        Ok(CommandResult {
            status,
            stdout,
            stderr,
            duration,
        })
    }
}

#[async_trait]
impl RemoteSession for SshSession {
    #[instrument(skip(self, cmd), fields(host = %self.host, job_id = %job_id))]
    async fn run_privileged(
        &mut self,
        job_id: Uuid,
        cmd: &str,
    ) -> Result<CommandResult, ExecError> {
        let elevated = elevate(cmd, self.sudo_password.as_deref());

        // Audit entry before execution, so aborted commands still leave a trace
        info!(job_id = %job_id, command = %cmd, "running privileged command");

        let command_timeout = self.command_timeout;
        let result = timeout(command_timeout, self.execute(&elevated))
            .await
            .map_err(|_| ExecError::Timeout {
                timeout: command_timeout,
            })??;

        info!(
            job_id = %job_id,
            status = result.status,
            duration = ?result.duration,
            "privileged command finished"
        );

        Ok(result)
    }

    async fn close(self: Box<Self>) {
        if let Some(session) = self.handle {
            if let Err(e) = session
                .disconnect(Disconnect::ByApplication, "", "English")
                .await
            {
                warn!(host = %self.host, error = %e, "SSH disconnect failed");
            } else {
                debug!(host = %self.host, "SSH disconnected");
            }
        }
    }
}

/// Quote a string for POSIX sh
#[must_use]
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Wrap a command for privileged execution.
///
/// With a sudo password configured the password goes over stdin via
/// `sudo -S`; otherwise non-interactive sudo is assumed (`sudo -n`).
fn elevate(cmd: &str, sudo_password: Option<&str>) -> String {
    match sudo_password {
        Some(password) => format!(
            "printf '%s\\n' {} | sudo -S -p '' sh -c {}",
            shell_quote(password),
            shell_quote(cmd)
        ),
        None => format!("sudo -n sh -c {}", shell_quote(cmd)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn elevate_without_password_uses_noninteractive_sudo() {
        assert_eq!(
            elevate("grub-reboot 1", None),
            "sudo -n sh -c 'grub-reboot 1'"
        );
    }

    #[test]
    fn elevate_with_password_pipes_stdin() {
        let wrapped = elevate("grub-reboot 1", Some("hunter2"));
        assert!(wrapped.starts_with("printf '%s\\n' 'hunter2' | sudo -S"));
        assert!(wrapped.ends_with("sh -c 'grub-reboot 1'"));
    }
}

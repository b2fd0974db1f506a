//! Configuration loading and validation
//!
//! Loaded once at startup; the daemon refuses to serve on invalid
//! configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use bootrelay_core::NotifyLevel;

/// Top-level configuration for the bootrelay daemon
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Daemon server settings
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Operator allow-list
    #[serde(default)]
    pub auth: AuthConfig,
    /// The controlled host
    pub host: HostConfig,
    /// Relay wiring
    pub relay: RelayConfig,
    /// Boot entry table
    pub boot: BootConfig,
    /// Online-wait policy
    #[serde(default)]
    pub poll: PollConfig,
    /// Operator notification channel
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Daemon server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Address and port to bind to
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Durable log file (console-only when unset)
    pub log_file: Option<PathBuf>,
    /// Durable-log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            log_file: None,
            log_level: default_log_level(),
        }
    }
}

/// Operator allow-list settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Header carrying the caller identity
    #[serde(default = "default_identity_header")]
    pub identity_header: String,
    /// Identities allowed to operate the relay. Empty means deny all.
    #[serde(default)]
    pub allowed_operators: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            identity_header: default_identity_header(),
            allowed_operators: Vec::new(),
        }
    }
}

/// Connection settings for the controlled host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    /// Display name for logs and events
    #[serde(default = "default_host_name")]
    pub name: String,
    /// IP address or hostname
    pub addr: String,
    /// SSH port
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,
    /// SSH user
    pub user: String,
    /// Path to SSH private key
    pub ssh_key: Option<PathBuf>,
    /// Environment variable holding a base64 SSH key
    pub ssh_key_env: Option<String>,
    /// SSH password (when no key is configured)
    pub ssh_password: Option<String>,
    /// Password for sudo elevation (omit for passwordless sudo)
    pub sudo_password: Option<String>,
    /// SSH connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Per-privileged-command timeout in seconds
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    /// Liveness probe timeout in seconds
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

/// GPIO driver selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayDriver {
    /// Linux sysfs GPIO (production)
    #[default]
    Sysfs,
    /// Log-only lines, for running off-target
    Log,
}

/// Relay wiring and pulse timing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub driver: RelayDriver,
    /// GPIO pin wired to the power switch contact
    pub power_pin: u32,
    /// GPIO pin wired to the reset switch contact
    pub reset_pin: u32,
    /// Normal button press duration
    #[serde(default = "default_short_press_ms")]
    pub short_press_ms: u64,
    /// Forced power-off hold duration
    #[serde(default = "default_long_hold_ms")]
    pub long_hold_ms: u64,
}

/// Boot entry table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootConfig {
    /// OS that boots without boot-loader intervention
    pub default_os: String,
    /// Boot-loader entry index per non-default OS
    #[serde(default)]
    pub entries: BTreeMap<String, u32>,
    /// Environment block path on the controlled host
    #[serde(default = "default_grubenv_path")]
    pub grubenv_path: String,
}

/// Online-wait policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between liveness checks, in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
    /// Maximum number of checks before reporting a timeout
    #[serde(default = "default_poll_max_attempts")]
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval_secs(),
            max_attempts: default_poll_max_attempts(),
        }
    }
}

/// Operator notification channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Webhook endpoint for mirrored messages (disabled when unset)
    pub webhook_url: Option<String>,
    /// Target channel/chat identity passed along with each message
    pub channel_id: Option<String>,
    /// Minimum level mirrored to the channel, independent of the log level
    #[serde(default = "default_notify_level")]
    pub level: NotifyLevel,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            channel_id: None,
            level: default_notify_level(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_identity_header() -> String {
    "x-operator-id".to_string()
}

fn default_host_name() -> String {
    "host".to_string()
}

fn default_ssh_port() -> u16 {
    22
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_command_timeout_secs() -> u64 {
    30
}

fn default_probe_timeout_secs() -> u64 {
    2
}

fn default_short_press_ms() -> u64 {
    1000
}

fn default_long_hold_ms() -> u64 {
    5000
}

fn default_grubenv_path() -> String {
    "/boot/grub/grubenv".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_poll_max_attempts() -> u32 {
    20
}

fn default_notify_level() -> NotifyLevel {
    NotifyLevel::Error
}

/// Startup configuration errors. All of these are fatal: the daemon must
/// not begin serving requests with a broken configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("host.addr must not be empty")]
    MissingHostAddr,

    #[error("host.user must not be empty")]
    MissingHostUser,

    #[error("exactly one of host.ssh_key, host.ssh_key_env or host.ssh_password is required")]
    MissingCredential,

    #[error("boot.default_os must not be empty")]
    MissingDefaultOs,

    #[error("boot.entries assigns an index to the default OS {0}; the default needs none")]
    DefaultOsHasEntry(String),

    #[error("relay.power_pin and relay.reset_pin must differ")]
    DuplicatePins,

    #[error("relay pulse durations must be non-zero")]
    ZeroPulseDuration,

    #[error("poll.interval_secs and poll.max_attempts must be non-zero")]
    ZeroPollBound,
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &PathBuf) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from the environment variable or common paths
    pub fn load_default() -> eyre::Result<Self> {
        if let Ok(path) = std::env::var("BOOTRELAY_CONFIG") {
            return Self::load(&PathBuf::from(path));
        }

        let paths = [
            PathBuf::from("bootrelay.toml"),
            PathBuf::from("/etc/bootrelay/bootrelay.toml"),
            dirs::config_dir()
                .map(|p| p.join("bootrelay/bootrelay.toml"))
                .unwrap_or_default(),
        ];

        for path in paths {
            if path.exists() {
                return Self::load(&path);
            }
        }

        eyre::bail!("no config file found (set BOOTRELAY_CONFIG or create bootrelay.toml)")
    }

    /// Check startup invariants
    ///
    /// # Errors
    /// Returns the first violated invariant
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.addr.trim().is_empty() {
            return Err(ConfigError::MissingHostAddr);
        }
        if self.host.user.trim().is_empty() {
            return Err(ConfigError::MissingHostUser);
        }

        let credentials = [
            self.host.ssh_key.is_some(),
            self.host.ssh_key_env.is_some(),
            self.host.ssh_password.as_deref().is_some_and(|p| !p.is_empty()),
        ];
        if credentials.iter().filter(|c| **c).count() != 1 {
            return Err(ConfigError::MissingCredential);
        }

        if self.boot.default_os.trim().is_empty() {
            return Err(ConfigError::MissingDefaultOs);
        }
        if self.boot.entries.contains_key(&self.boot.default_os) {
            return Err(ConfigError::DefaultOsHasEntry(self.boot.default_os.clone()));
        }

        if self.relay.power_pin == self.relay.reset_pin {
            return Err(ConfigError::DuplicatePins);
        }
        if self.relay.short_press_ms == 0 || self.relay.long_hold_ms == 0 {
            return Err(ConfigError::ZeroPulseDuration);
        }

        if self.poll.interval_secs == 0 || self.poll.max_attempts == 0 {
            return Err(ConfigError::ZeroPollBound);
        }

        Ok(())
    }

    /// Pulse timing in core terms
    #[must_use]
    pub fn pulse_timing(&self) -> bootrelay_core::PulseTiming {
        bootrelay_core::PulseTiming {
            short_press: Duration::from_millis(self.relay.short_press_ms),
            long_hold: Duration::from_millis(self.relay.long_hold_ms),
        }
    }

    /// Poll policy in core terms
    #[must_use]
    pub fn poll_policy(&self) -> bootrelay_core::PollPolicy {
        bootrelay_core::PollPolicy {
            interval: Duration::from_secs(self.poll.interval_secs),
            max_attempts: self.poll.max_attempts,
        }
    }
}

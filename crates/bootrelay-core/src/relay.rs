//! Relay actuator: GPIO-driven power and reset switch lines

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info};

/// The two physical channels wired to the front-panel header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelId {
    Power,
    Reset,
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelId::Power => f.write_str("power"),
            ChannelId::Reset => f.write_str("reset"),
        }
    }
}

/// Relay actuator faults. These indicate broken wiring or a
/// misconfigured pin, not a retryable condition.
#[derive(Error, Debug, Clone)]
pub enum RelayError {
    #[error("gpio setup failed for pin {pin}: {detail}")]
    Setup { pin: u32, detail: String },

    #[error("gpio write failed: {0}")]
    Write(String),
}

/// An idempotent on/off output line
pub trait RelayLine: Send + Sync {
    /// Drive the line high (asserted) or low (idle)
    fn set_active(&self, active: bool) -> Result<(), RelayError>;
}

/// A named relay channel with the assert/hold/release contract.
///
/// `pulse` never returns (or drops) with the line left asserted: release
/// is guaranteed through a drop guard even when the pulse future is
/// cancelled mid-hold.
pub struct RelayChannel {
    id: ChannelId,
    line: Arc<dyn RelayLine>,
}

struct AssertGuard<'a> {
    line: &'a dyn RelayLine,
    id: ChannelId,
    armed: bool,
}

impl Drop for AssertGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.line.set_active(false) {
                error!(channel = %self.id, error = %e, "failed to release relay line");
            }
        }
    }
}

impl RelayChannel {
    pub fn new(id: ChannelId, line: Arc<dyn RelayLine>) -> Self {
        Self { id, line }
    }

    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Assert the channel, hold for `hold`, then release.
    ///
    /// Emulates a human button press; the hold duration is not a
    /// cancellation point for callers that await the pulse to completion.
    pub async fn pulse(&self, hold: Duration) -> Result<(), RelayError> {
        debug!(channel = %self.id, hold_ms = hold.as_millis() as u64, "pulsing relay");

        self.line.set_active(true)?;
        let mut guard = AssertGuard {
            line: self.line.as_ref(),
            id: self.id,
            armed: true,
        };

        tokio::time::sleep(hold).await;

        guard.armed = false;
        drop(guard);
        self.line.set_active(false)?;

        debug!(channel = %self.id, "relay released");
        Ok(())
    }
}

/// Linux sysfs GPIO output line.
///
/// Exports the pin on first use, sets it to output and writes 0/1 to the
/// value file. Setup failures are fatal wiring/configuration errors.
pub struct SysfsLine {
    pin: u32,
    value_path: PathBuf,
}

impl SysfsLine {
    const SYSFS_GPIO: &'static str = "/sys/class/gpio";

    /// Export the pin and configure it as an output driven low
    ///
    /// # Errors
    /// Returns `RelayError::Setup` if the sysfs interface rejects the pin
    pub fn open(pin: u32) -> Result<Self, RelayError> {
        let base = PathBuf::from(Self::SYSFS_GPIO);
        let gpio_dir = base.join(format!("gpio{pin}"));

        if !gpio_dir.exists() {
            std::fs::write(base.join("export"), pin.to_string()).map_err(|e| {
                RelayError::Setup {
                    pin,
                    detail: e.to_string(),
                }
            })?;
            // udev needs a moment to fix up permissions on the new node
            std::thread::sleep(Duration::from_millis(100));
        }

        std::fs::write(gpio_dir.join("direction"), "out").map_err(|e| RelayError::Setup {
            pin,
            detail: e.to_string(),
        })?;

        let line = Self {
            pin,
            value_path: gpio_dir.join("value"),
        };
        line.set_active(false)?;

        info!(pin, "gpio line exported");
        Ok(line)
    }
}

impl RelayLine for SysfsLine {
    fn set_active(&self, active: bool) -> Result<(), RelayError> {
        let value = if active { "1" } else { "0" };
        std::fs::write(&self.value_path, value).map_err(|e| {
            RelayError::Write(format!("pin {}: {}", self.pin, e))
        })
    }
}

/// Log-only line for running the daemon off-target
pub struct LogLine {
    pin: u32,
}

impl LogLine {
    #[must_use]
    pub fn new(pin: u32) -> Self {
        Self { pin }
    }
}

impl RelayLine for LogLine {
    fn set_active(&self, active: bool) -> Result<(), RelayError> {
        info!(pin = self.pin, active, "relay line (log driver)");
        Ok(())
    }
}

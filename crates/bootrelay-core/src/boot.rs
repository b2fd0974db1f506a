//! Boot-target selection through the GRUB environment
//!
//! Arming a non-default entry takes two privileged commands over one
//! session: regenerate the environment block from the embedded template,
//! then `grub-reboot` the one-shot entry. Both must exit 0 before the
//! caller may assume the boot target changed.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use bootrelay_exec::ssh::shell_quote;
use bootrelay_exec::traits::{RemoteSession, SessionConnector};

use crate::error::CoreError;

static GRUBENV_TEMPLATE: &str = include_str!("../resources/grubenv.tmpl");

/// GRUB reads the environment from a fixed-size block
const GRUB_ENV_BLOCK_SIZE: usize = 1024;

/// Declared OS entries, sourced from configuration. Read-only after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootTable {
    /// OS that boots without any boot-loader intervention
    pub default_os: String,
    /// Boot-loader entry index per non-default OS
    pub entries: BTreeMap<String, u32>,
    /// Path of the environment block on the controlled host
    pub grubenv_path: String,
}

impl BootTable {
    /// All selectable OS names, default first
    #[must_use]
    pub fn os_names(&self) -> Vec<String> {
        let mut names = vec![self.default_os.clone()];
        names.extend(self.entries.keys().filter(|n| **n != self.default_os).cloned());
        names
    }

    #[must_use]
    pub fn is_default(&self, os: &str) -> bool {
        os == self.default_os
    }

    #[must_use]
    pub fn is_known(&self, os: &str) -> bool {
        self.is_default(os) || self.entries.contains_key(os)
    }

    #[must_use]
    pub fn entry_for(&self, os: &str) -> Option<u32> {
        self.entries.get(os).copied()
    }
}

/// Render the environment block for the given entry, padded to the
/// fixed block size GRUB expects.
#[must_use]
pub fn render_grubenv(entry_id: u32) -> String {
    let mut block = GRUBENV_TEMPLATE.replace("<entry_id>", &entry_id.to_string());
    while block.len() < GRUB_ENV_BLOCK_SIZE {
        block.push('#');
    }
    block
}

/// Issues the privileged command sequence that makes an OS the next boot
/// target. The default OS needs no action, so no session is opened for it.
pub struct BootSelector {
    table: BootTable,
    connect_timeout: Duration,
}

impl BootSelector {
    pub fn new(table: BootTable, connect_timeout: Duration) -> Self {
        Self {
            table,
            connect_timeout,
        }
    }

    #[must_use]
    pub fn table(&self) -> &BootTable {
        &self.table
    }

    /// Make `os` the next boot target.
    ///
    /// # Errors
    /// `CoreError::CommandFailed` when either command exits non-zero; the
    /// boot target must then be treated as unchanged.
    #[instrument(skip(self, connector), fields(job_id = %job_id, os = %os))]
    pub async fn select_next_boot(
        &self,
        connector: &dyn SessionConnector,
        job_id: Uuid,
        os: &str,
    ) -> Result<(), CoreError> {
        if self.table.is_default(os) {
            info!(os = %os, "default entry, no boot-loader action needed");
            return Ok(());
        }

        let entry = self
            .table
            .entry_for(os)
            .ok_or_else(|| CoreError::UnknownOs(os.to_string()))?;

        let mut session = connector.connect(self.connect_timeout).await?;
        let result = self.run_sequence(session.as_mut(), job_id, entry).await;
        session.close().await;

        if result.is_ok() {
            info!(os = %os, entry, "boot target armed");
        }
        result
    }

    async fn run_sequence(
        &self,
        session: &mut dyn RemoteSession,
        job_id: Uuid,
        entry: u32,
    ) -> Result<(), CoreError> {
        let env_block = render_grubenv(entry);
        let write_cmd = format!(
            "printf '%s' {} > {}",
            shell_quote(&env_block),
            shell_quote(&self.table.grubenv_path)
        );

        let written = session.run_privileged(job_id, &write_cmd).await?;
        if !written.success() {
            return Err(CoreError::CommandFailed {
                status: written.status,
                stdout: written.stdout,
                stderr: written.stderr,
            });
        }

        let armed = session
            .run_privileged(job_id, &format!("grub-reboot {entry}"))
            .await?;
        if !armed.success() {
            return Err(CoreError::CommandFailed {
                status: armed.status,
                stdout: armed.stdout,
                stderr: armed.stderr,
            });
        }

        Ok(())
    }
}

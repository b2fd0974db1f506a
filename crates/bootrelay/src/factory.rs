//! Wiring from configuration to the actor's collaborators

use std::sync::Arc;
use std::time::Duration;

use eyre::{Result, WrapErr};

use bootrelay_core::{
    BootSelector, BootTable, ChannelId, NotifyLevel, Notifier, RelayChannel, RelayLine, Reporter,
    SysfsLine, relay::LogLine,
};
use bootrelay_exec::{
    AuthMethod, ConnectionInfo, KeySource, LivenessProbe, SessionConnector, SshConnector, TcpProbe,
};

use crate::config::{Config, RelayDriver};
use crate::notify::{NullNotifier, WebhookNotifier};

/// Open both relay lines using the configured driver
pub fn build_relay_channels(config: &Config) -> Result<(RelayChannel, RelayChannel)> {
    let open = |pin: u32| -> Result<Arc<dyn RelayLine>> {
        match config.relay.driver {
            RelayDriver::Sysfs => {
                let line = SysfsLine::open(pin)
                    .wrap_err_with(|| format!("failed to open GPIO pin {pin}"))?;
                Ok(Arc::new(line))
            }
            RelayDriver::Log => Ok(Arc::new(LogLine::new(pin))),
        }
    };

    let power = RelayChannel::new(ChannelId::Power, open(config.relay.power_pin)?);
    let reset = RelayChannel::new(ChannelId::Reset, open(config.relay.reset_pin)?);
    Ok((power, reset))
}

/// Build the SSH connector from the host section
pub fn build_connector(config: &Config) -> Result<Arc<dyn SessionConnector>> {
    let host = &config.host;

    let auth = if let Some(path) = &host.ssh_key {
        AuthMethod::Key(KeySource::Path(path.clone()))
    } else if let Some(var) = &host.ssh_key_env {
        AuthMethod::Key(KeySource::Env(var.clone()))
    } else if let Some(password) = &host.ssh_password {
        AuthMethod::Password(password.clone())
    } else {
        eyre::bail!("no SSH credential configured");
    };

    let conn_info = ConnectionInfo::new(&host.addr, &host.user)
        .with_port(host.ssh_port)
        .with_command_timeout(Duration::from_secs(host.command_timeout_secs));

    let connector = SshConnector::new(conn_info, &auth, host.sudo_password.clone())
        .wrap_err("failed to build SSH connector")?;
    Ok(Arc::new(connector))
}

/// Build the liveness probe against the host's SSH port
pub fn build_probe(config: &Config) -> Arc<dyn LivenessProbe> {
    Arc::new(TcpProbe::new(
        config.host.addr.clone(),
        config.host.ssh_port,
        Duration::from_secs(config.host.probe_timeout_secs),
    ))
}

/// Build the boot-target selector from the boot section
pub fn build_selector(config: &Config) -> BootSelector {
    let table = BootTable {
        default_os: config.boot.default_os.clone(),
        entries: config.boot.entries.clone(),
        grubenv_path: config.boot.grubenv_path.clone(),
    };
    BootSelector::new(table, Duration::from_secs(config.host.connect_timeout_secs))
}

/// Build the operator reporter. Without a webhook everything above the
/// threshold is silently dropped into the null sink.
pub fn build_reporter(config: &Config) -> Reporter {
    let notifier: Arc<dyn Notifier> = match &config.notify.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(
            url.clone(),
            config.notify.channel_id.clone(),
        )),
        None => Arc::new(NullNotifier),
    };
    Reporter::new(notifier, config.notify.level)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        toml::from_str(
            r#"
            [host]
            addr = "192.168.1.50"
            user = "relay"
            ssh_password = "secret"

            [relay]
            driver = "log"
            power_pin = 21
            reset_pin = 20

            [boot]
            default_os = "Ubuntu"
            [boot.entries]
            Windows = 2
            "#,
        )
        .unwrap()
    }

    #[test]
    fn log_driver_needs_no_hardware() {
        let (power, reset) = build_relay_channels(&sample()).unwrap();
        assert_eq!(power.id(), ChannelId::Power);
        assert_eq!(reset.id(), ChannelId::Reset);
    }

    #[test]
    fn password_credential_builds_a_connector() {
        let connector = build_connector(&sample());
        assert!(connector.is_ok());
    }

    #[test]
    fn selector_carries_the_boot_table() {
        let selector = build_selector(&sample());
        assert_eq!(selector.table().default_os, "Ubuntu");
        assert_eq!(selector.table().entries["Windows"], 2);
    }

    #[test]
    fn reporter_defaults_to_error_threshold() {
        // Just checks the wiring doesn't panic without a webhook
        let _ = build_reporter(&sample());
        assert_eq!(sample().notify.level, NotifyLevel::Error);
    }
}

//! Webhook notifier and event forwarding

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use bootrelay_api::events::RelayEvent;
use bootrelay_core::{Notifier, NotifyLevel, Reporter};

/// Posts operator messages as JSON to a configured webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    channel_id: Option<String>,
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    level: NotifyLevel,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel_id: Option<&'a str>,
}

impl WebhookNotifier {
    #[must_use]
    pub fn new(url: String, channel_id: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            channel_id,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, level: NotifyLevel, message: &str) {
        let payload = WebhookPayload {
            level,
            message,
            channel_id: self.channel_id.as_deref(),
        };

        match self.client.post(&self.url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(level = %level, "notification delivered");
            }
            Ok(response) => {
                warn!(status = %response.status(), "notification rejected by webhook");
            }
            Err(e) => {
                warn!(error = %e, "notification delivery failed");
            }
        }
    }
}

/// No-op sink used when no webhook is configured
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, _level: NotifyLevel, _message: &str) {}
}

/// Consume orchestrator events and mirror them through the reporter.
/// Failed operations surface as errors, completed ones as info, relay
/// mechanics as debug.
pub fn spawn_event_forwarder(mut events: broadcast::Receiver<RelayEvent>, reporter: Reporter) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => forward(&reporter, event).await,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "event forwarder lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        debug!("event forwarder stopped");
    });
}

async fn forward(reporter: &Reporter, event: RelayEvent) {
    match event {
        RelayEvent::OperationFailed {
            host,
            operation,
            kind,
            detail,
        } => {
            reporter
                .report(
                    NotifyLevel::Error,
                    &format!("{host}: {operation} failed ({kind}): {detail}"),
                )
                .await;
        }
        RelayEvent::OperationCompleted {
            host,
            operation,
            detail,
            ..
        } => {
            reporter
                .report(NotifyLevel::Info, &format!("{host}: {operation}: {detail}"))
                .await;
        }
        RelayEvent::StateChanged { host, from, to } => {
            reporter
                .report(NotifyLevel::Debug, &format!("{host}: {from} -> {to}"))
                .await;
        }
        RelayEvent::RelayPulsed {
            host,
            channel,
            hold_ms,
        } => {
            reporter
                .report(
                    NotifyLevel::Debug,
                    &format!("{host}: {channel} pulsed for {hold_ms}ms"),
                )
                .await;
        }
    }
}

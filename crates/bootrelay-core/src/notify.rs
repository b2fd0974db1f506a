//! Operator notification channel
//!
//! Mirrors log messages at or above a configured threshold to an
//! out-of-band channel (webhook, chat), independently of the durable log.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Severity of a mirrored message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for NotifyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NotifyLevel::Debug => "debug",
            NotifyLevel::Info => "info",
            NotifyLevel::Warn => "warn",
            NotifyLevel::Error => "error",
        };
        f.write_str(name)
    }
}

/// Sink for operator-visible messages. Delivery failures are the
/// implementation's problem to log; they never propagate.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, level: NotifyLevel, message: &str);
}

/// Threshold-gated wrapper around a [`Notifier`].
#[derive(Clone)]
pub struct Reporter {
    notifier: Arc<dyn Notifier>,
    threshold: NotifyLevel,
}

impl Reporter {
    pub fn new(notifier: Arc<dyn Notifier>, threshold: NotifyLevel) -> Self {
        Self {
            notifier,
            threshold,
        }
    }

    /// Forward `message` when `level` meets the configured threshold
    pub async fn report(&self, level: NotifyLevel, message: &str) {
        if level >= self.threshold {
            self.notifier.notify(level, message).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<(NotifyLevel, String)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, level: NotifyLevel, message: &str) {
            self.messages
                .lock()
                .unwrap()
                .push((level, message.to_string()));
        }
    }

    #[tokio::test]
    async fn reporter_drops_messages_below_threshold() {
        let notifier = Arc::new(RecordingNotifier::default());
        let reporter = Reporter::new(notifier.clone(), NotifyLevel::Warn);

        reporter.report(NotifyLevel::Info, "routine").await;
        reporter.report(NotifyLevel::Error, "broken").await;

        let messages = notifier.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0], (NotifyLevel::Error, "broken".to_string()));
    }

    #[test]
    fn levels_order_by_severity() {
        assert!(NotifyLevel::Error > NotifyLevel::Warn);
        assert!(NotifyLevel::Warn > NotifyLevel::Info);
        assert!(NotifyLevel::Info > NotifyLevel::Debug);
    }
}

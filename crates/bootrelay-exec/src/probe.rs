//! Host liveness probing

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::traits::LivenessProbe;

/// Transport-level liveness probe: one TCP connection attempt against the
/// host's SSH port, bounded by a short timeout. Any failure is "offline".
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    /// Create a probe for the given host and port
    pub fn new(host: impl Into<String>, port: u16, probe_timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: probe_timeout,
        }
    }
}

#[async_trait]
impl LivenessProbe for TcpProbe {
    async fn is_online(&self) -> bool {
        match timeout(
            self.timeout,
            TcpStream::connect((&self.host[..], self.port)),
        )
        .await
        {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(host = %self.host, port = self.port, error = %e, "probe failed");
                false
            }
            Err(_) => {
                debug!(host = %self.host, port = self.port, "probe timed out");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_online_when_port_accepts() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let probe = TcpProbe::new("127.0.0.1", port, Duration::from_millis(500));
        assert!(probe.is_online().await);
    }

    #[tokio::test]
    async fn reports_offline_on_refused_connection() {
        // Bind then drop to get a port that is very likely closed
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let probe = TcpProbe::new("127.0.0.1", port, Duration::from_millis(500));
        assert!(!probe.is_online().await);
    }
}

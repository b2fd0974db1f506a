//! Address discovery for the relay board itself
//!
//! Operators behind dynamic addressing ask the daemon where it lives.
//! Both lookups are best effort; a failed lookup is `None`, not an error.

use std::time::Duration;

use tracing::debug;

/// Local address as seen on the route toward a public resolver.
/// The UDP socket is never written to; connect() just picks the
/// outbound interface.
pub async fn local_ip() -> Option<String> {
    let socket = tokio::net::UdpSocket::bind("0.0.0.0:0").await.ok()?;
    socket.connect("8.8.8.8:80").await.ok()?;
    let addr = socket.local_addr().ok()?;
    Some(addr.ip().to_string())
}

/// Public address, as reported by ipify
pub async fn public_ip() -> Option<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .ok()?;

    match client.get("https://api.ipify.org").send().await {
        Ok(response) => match response.text().await {
            Ok(body) => Some(body.trim().to_string()),
            Err(e) => {
                debug!(error = %e, "public ip body unreadable");
                None
            }
        },
        Err(e) => {
            debug!(error = %e, "public ip lookup failed");
            None
        }
    }
}

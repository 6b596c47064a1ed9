use std::net::{Ipv4Addr, SocketAddr};

use anyhow::Result;

use crate::topology::ServerConfigSet;
use crate::web::resolve_addr;

/// Checks that every configured listener responds to `GET /health`.
///
/// Listeners bound to all interfaces are checked via loopback. TLS listeners are checked over
/// HTTPS without verifying the certificate. This is used for Docker healthchecks.
pub async fn healthcheck(configs: &ServerConfigSet) -> Result<()> {
    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()?;

    for server in configs {
        let addr = connect_addr(resolve_addr(&server.address).await?);
        let scheme = if server.tls_enabled() { "https" } else { "http" };
        let url = format!("{scheme}://{addr}/health");

        tracing::debug!("sending healthcheck request to {}", url);
        let response = client.get(&url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Bad Status from {}: {}", server.role.name(), response.status());
        }
    }

    tracing::info!("OK");
    Ok(())
}

/// Maps unspecified listen addresses to the IPv4 loopback address.
///
/// Listeners on `[::]` are dual-stack or have fallen back to `0.0.0.0`, so IPv4 loopback reaches
/// them either way.
fn connect_addr(addr: SocketAddr) -> SocketAddr {
    if addr.ip().is_unspecified() {
        return SocketAddr::new(Ipv4Addr::LOCALHOST.into(), addr.port());
    }
    addr
}

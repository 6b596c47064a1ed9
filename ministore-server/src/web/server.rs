use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::{TcpListener, TcpSocket};
use tokio::signal::unix::SignalKind;
use tokio::task::JoinSet;

use crate::bootstrap::Launcher;
use crate::state::State;
use crate::topology::{ServerConfig, ServerConfigSet};
use crate::web::app::App;

/// The maximum backlog for TCP listen sockets before refusing connections.
const TCP_LISTEN_BACKLOG: u32 = 1024;

/// Serves every configured listener over HTTP until termination is requested.
///
/// All listeners are bound and their TLS material loaded before any of them starts serving. If one
/// of them cannot be set up, none is started.
#[derive(Debug)]
pub struct HttpLauncher {
    shutdown_timeout: Duration,
}

impl HttpLauncher {
    /// Creates a launcher granting `shutdown_timeout` to TLS connections on shutdown.
    pub fn new(shutdown_timeout: Duration) -> Self {
        Self { shutdown_timeout }
    }
}

/// A listener that is bound but not yet serving.
struct Bound {
    config: ServerConfig,
    listener: TcpListener,
    tls: Option<RustlsConfig>,
}

async fn bind(config: ServerConfig) -> Result<Bound> {
    let role = config.role.name();
    let addr = resolve_addr(&config.address)
        .await
        .with_context(|| format!("invalid {role} address {:?}", config.address))?;
    let listener =
        listen(addr).with_context(|| format!("failed to start {role} listener on {addr}"))?;

    let tls = match &config.tls {
        Some(paths) => {
            let tls = RustlsConfig::from_pem_file(paths.cert(), paths.key())
                .await
                .with_context(|| {
                    format!(
                        "failed to load TLS certificate {} and key {}",
                        paths.cert().display(),
                        paths.key().display()
                    )
                })?;
            Some(tls)
        }
        None => None,
    };

    tracing::info!(
        role,
        tls = tls.is_some(),
        "HTTP server listening on {}",
        listener.local_addr()?
    );

    Ok(Bound {
        config,
        listener,
        tls,
    })
}

#[async_trait]
impl Launcher for HttpLauncher {
    async fn launch(self, configs: ServerConfigSet) -> Result<()> {
        tracing::info!("Starting server");

        let mut bound = Vec::with_capacity(configs.len());
        for config in configs {
            bound.push(bind(config).await?);
        }

        let mut servers = JoinSet::new();
        for Bound {
            config,
            listener,
            tls,
        } in bound
        {
            let app = App::new(State::new(config)).graceful_shutdown(true);
            match tls {
                Some(tls) => servers.spawn(app.serve_tls(listener, tls, self.shutdown_timeout)),
                None => servers.spawn(app.serve(listener)),
            };
        }

        tokio::spawn(async move {
            elegant_departure::get_shutdown_guard().wait().await;
            tracing::info!("Shutting down ...");
        });

        elegant_departure::tokio::depart()
            .on_termination()
            .on_sigint()
            .on_signal(SignalKind::hangup())
            .on_signal(SignalKind::quit())
            .await;

        let mut result = Ok(());
        while let Some(joined) = servers.join_next().await {
            let served = match joined {
                Ok(served) => served,
                Err(error) => Err(error.into()),
            };
            if let Err(error) = served {
                tracing::error!("server failed: {error:#}");
                result = Err(error);
            }
        }

        tracing::info!("Shutdown complete");
        result
    }
}

/// Resolves a listener address.
///
/// An address of the form `:port` resolves to the unspecified IPv6 address, which [`listen`] binds
/// dual-stack. Anything else must be `host:port`, where the host is either an IP address or a name
/// resolved through the system resolver.
pub async fn resolve_addr(address: &str) -> Result<SocketAddr> {
    if let Some(port) = address.strip_prefix(':') {
        let port: u16 = port.parse().context("invalid port")?;
        return Ok(SocketAddr::from((Ipv6Addr::UNSPECIFIED, port)));
    }

    tokio::net::lookup_host(address)
        .await?
        .next()
        .context("address did not resolve")
}

/// Opens a TCP listener on the given address.
///
/// If the unspecified IPv6 address cannot be bound, for example on hosts without IPv6 support, the
/// listener falls back to all IPv4 interfaces on the same port.
pub fn listen(addr: SocketAddr) -> Result<TcpListener> {
    match bind_socket(addr) {
        Ok(listener) => Ok(listener),
        Err(error) if addr.ip() == IpAddr::V6(Ipv6Addr::UNSPECIFIED) => {
            tracing::warn!("Failed to bind to {addr}: {error}, falling back to IPv4");
            let fallback = SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), addr.port());
            Ok(bind_socket(fallback)?)
        }
        Err(error) => Err(error.into()),
    }
}

fn bind_socket(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4(),
        SocketAddr::V6(_) => TcpSocket::new_v6(),
    }?;

    #[cfg(all(unix, not(target_os = "solaris"), not(target_os = "illumos")))]
    socket.set_reuseport(true)?;
    socket.bind(addr)?;

    socket.listen(TCP_LISTEN_BACKLOG)
}

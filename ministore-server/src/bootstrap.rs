//! Turns startup parameters into a running server topology.
//!
//! Bootstrapping is a linear sequence:
//!
//! 1. validate the TLS certificate and key pair, failing fatally if only one is given,
//! 2. resolve the storage driver, falling back to the file driver on unknown input,
//! 3. build the listener configurations for the storage API and the management UI,
//! 4. hand the finished [`ServerConfigSet`] to a [`Launcher`].
//!
//! Steps 1 to 3 are available separately as [`plan`], which is used by commands that need the
//! topology without starting it.

use async_trait::async_trait;

use crate::config::Config;
use crate::driver::DriverKind;
use crate::error::ConfigError;
use crate::tls::TlsPaths;
use crate::topology::{ServerConfigSet, build_configs};

/// Starts and serves a set of listeners.
///
/// Implementations take ownership of the configurations and run until the process shuts down. The
/// default implementation is [`HttpLauncher`](crate::web::HttpLauncher).
#[async_trait]
pub trait Launcher: Send {
    /// Binds and serves all listeners in `configs`.
    ///
    /// Returns once all listeners have stopped, or with an error if any of them failed to start.
    async fn launch(self, configs: ServerConfigSet) -> anyhow::Result<()>;
}

/// Validates the startup parameters in `config` and builds the listener configurations.
///
/// The driver is only resolved once the TLS parameters have been accepted, so a fatal error
/// prevents any further processing.
pub fn plan(config: &Config) -> Result<ServerConfigSet, ConfigError> {
    let tls = TlsPaths::from_pair(&config.cert, &config.key)?;
    let driver = DriverKind::resolve(&config.driver_type);

    let configs = build_configs(
        &config.domain,
        &config.api_address,
        &config.web_address,
        driver,
        tls,
    );

    Ok(configs)
}

/// Plans the topology and hands it to `launcher`.
///
/// The launcher is invoked exactly once and only if planning succeeded. There is no retry; restarts
/// are up to the process supervisor.
pub async fn dispatch<L: Launcher>(config: &Config, launcher: L) -> anyhow::Result<()> {
    let configs = match plan(config) {
        Ok(configs) => configs,
        Err(error) => {
            tracing::error!(error = &error as &dyn std::error::Error, "invalid configuration");
            return Err(error.into());
        }
    };

    for server in &configs {
        tracing::info!(
            role = server.role.name(),
            address = %server.address,
            tls = server.tls_enabled(),
            "configured listener",
        );
    }

    launcher.launch(configs).await
}

//! The set of listeners started by the server.
//!
//! Every process serves two logical services: the storage API and the management UI. Each is
//! described by a [`ServerConfig`], and both are grouped into a [`ServerConfigSet`] that is handed
//! to a [`Launcher`](crate::bootstrap::Launcher) as a unit.

use std::path::Path;

use crate::driver::DriverKind;
use crate::tls::TlsPaths;

/// The logical service a listener provides.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ApiRole {
    /// The object storage API, backed by the given driver.
    Storage {
        /// The storage backend.
        driver: DriverKind,
    },
    /// The management UI.
    Management {
        /// Whether the UI accepts websocket connections.
        websocket: bool,
    },
}

impl ApiRole {
    /// A short name for the role, used in logs and spans.
    pub fn name(&self) -> &'static str {
        match self {
            ApiRole::Storage { .. } => "api",
            ApiRole::Management { .. } => "web",
        }
    }
}

/// Configuration for a single network listener.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ServerConfig {
    /// Domain used for routing incoming requests, may be empty.
    pub domain: String,
    /// The `host:port` or `:port` address to bind.
    pub address: String,
    /// Certificate and key if the listener terminates TLS.
    pub tls: Option<TlsPaths>,
    /// The service offered on this listener.
    pub role: ApiRole,
}

impl ServerConfig {
    /// Returns `true` if this listener terminates TLS.
    pub fn tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// The certificate path, or an empty path if TLS is disabled.
    pub fn cert_path(&self) -> &Path {
        self.tls.as_ref().map_or(Path::new(""), TlsPaths::cert)
    }

    /// The private key path, or an empty path if TLS is disabled.
    pub fn key_path(&self) -> &Path {
        self.tls.as_ref().map_or(Path::new(""), TlsPaths::key)
    }
}

/// All listeners of the server, the storage API first.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct ServerConfigSet(Vec<ServerConfig>);

impl ServerConfigSet {
    /// Returns the configuration of the first listener with the given role name.
    pub fn by_role(&self, name: &str) -> Option<&ServerConfig> {
        self.0.iter().find(|config| config.role.name() == name)
    }

    /// Iterates the listener configurations in order.
    pub fn iter(&self) -> std::slice::Iter<'_, ServerConfig> {
        self.0.iter()
    }

    /// The number of listeners.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no listeners.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<ServerConfig>> for ServerConfigSet {
    fn from(configs: Vec<ServerConfig>) -> Self {
        Self(configs)
    }
}

impl IntoIterator for ServerConfigSet {
    type Item = ServerConfig;
    type IntoIter = std::vec::IntoIter<ServerConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ServerConfigSet {
    type Item = &'a ServerConfig;
    type IntoIter = std::slice::Iter<'a, ServerConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Builds the listener configurations for the storage API and the management UI.
///
/// The API listener uses the given TLS settings. The management UI never terminates TLS, regardless
/// of the API's settings. Addresses are not validated here; invalid addresses fail when binding.
pub fn build_configs(
    domain: &str,
    api_addr: &str,
    web_addr: &str,
    driver: DriverKind,
    tls: Option<TlsPaths>,
) -> ServerConfigSet {
    let api = ServerConfig {
        domain: domain.to_owned(),
        address: api_addr.to_owned(),
        tls,
        role: ApiRole::Storage { driver },
    };

    let web = ServerConfig {
        domain: domain.to_owned(),
        address: web_addr.to_owned(),
        tls: None,
        role: ApiRole::Management { websocket: false },
    };

    ServerConfigSet(vec![api, web])
}

//! Exposes an in-process test server for use in integration tests.
//!
//! ```
//! use ministore_test::server::TestServer;
//!
//! #[tokio::main]
//! async fn main() {
//!    let server = TestServer::new().await;
//!    let url = server.api_url("/health");
//!    // use the URL in tests...
//! }
//! ```

use std::collections::BTreeMap;
use std::net::{SocketAddr, TcpListener};

use ministore_server::bootstrap;
use ministore_server::config::Config;
use ministore_server::state::State;
use ministore_server::topology::ServerConfigSet;
use ministore_server::web::App;

/// An in-process test server for use in integration tests.
///
/// This server plans the full listener topology from a [`Config`] and serves every listener on a
/// random available port on localhost, ignoring the configured addresses. TLS is not supported.
#[derive(Debug)]
pub struct TestServer {
    handles: Vec<tokio::task::JoinHandle<()>>,
    sockets: BTreeMap<&'static str, SocketAddr>,
    configs: ServerConfigSet,
}

impl TestServer {
    /// Starts a server with the default configuration.
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    /// Starts a server with the given configuration.
    pub async fn with_config(config: Config) -> Self {
        let configs = bootstrap::plan(&config).unwrap();

        let mut handles = Vec::new();
        let mut sockets = BTreeMap::new();

        for server in configs.clone() {
            assert!(!server.tls_enabled(), "TestServer does not support TLS");

            let addr = SocketAddr::from(([127, 0, 0, 1], 0));
            let listener = TcpListener::bind(addr).unwrap();
            listener.set_nonblocking(true).unwrap();
            sockets.insert(server.role.name(), listener.local_addr().unwrap());

            let app = App::new(State::new(server));
            handles.push(tokio::spawn(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                app.serve(listener).await.unwrap();
            }));
        }

        Self {
            handles,
            sockets,
            configs,
        }
    }

    /// The listener configurations this server was started with.
    pub fn configs(&self) -> &ServerConfigSet {
        &self.configs
    }

    /// The socket address of the listener with the given role name.
    pub fn addr(&self, role: &str) -> SocketAddr {
        self.sockets[role]
    }

    /// Returns a full URL on the storage API listener pointing to the given path.
    pub fn api_url(&self, path: &str) -> String {
        self.url("api", path)
    }

    /// Returns a full URL on the management UI listener pointing to the given path.
    pub fn web_url(&self, path: &str) -> String {
        self.url("web", path)
    }

    /// Returns a full URL pointing to the given path on the listener with the given role name.
    ///
    /// This URL uses the loopback IP address as hostname.
    pub fn url(&self, role: &str, path: &str) -> String {
        let socket = self.addr(role);
        let path = path.trim_start_matches('/');
        format!("http://{socket}/{path}")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

//! Module implementing the default listener launcher.
//!
//! Every configured listener is served by an [`App`], which sets up routing and middleware for a
//! single [`ServerConfig`](crate::topology::ServerConfig). It is a tower service that can be run
//! over plain TCP or TLS.
//!
//! To bind and serve a whole [`ServerConfigSet`](crate::topology::ServerConfigSet), use
//! [`HttpLauncher`], which implements [`Launcher`](crate::bootstrap::Launcher).
//!
//! # Testing
//!
//! For end-to-end tests of the listeners, see the `ministore-test` crate, which provides utilities
//! to start a test server on local ports.

mod app;
mod middleware;
mod server;

pub use app::App;
pub use server::{HttpLauncher, listen, resolve_addr};

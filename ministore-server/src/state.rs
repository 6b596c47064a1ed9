use std::sync::Arc;

use crate::topology::ServerConfig;

/// Shared reference to the [listener state](State).
pub type ServiceState = Arc<State>;

/// State of a single listener.
///
/// This structure is created when the listener starts and shared with all HTTP request handlers.
/// In request handlers, use `axum::extract::State<ServiceState>` to retrieve a shared reference to
/// it.
#[derive(Debug)]
pub struct State {
    /// The configuration this listener was started with.
    pub server: ServerConfig,
}

impl State {
    /// Creates the shared state for a listener.
    pub fn new(server: ServerConfig) -> ServiceState {
        Arc::new(Self { server })
    }
}

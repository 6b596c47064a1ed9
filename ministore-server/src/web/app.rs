use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use axum_server::tls_rustls::RustlsConfig;
use sentry::integrations::tower::{NewSentryLayer, SentryHttpLayer};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::{DefaultOnFailure, TraceLayer};
use tracing::Level;

use crate::endpoints;
use crate::state::ServiceState;
use crate::web::middleware as m;

/// The web application serving a single listener.
#[derive(Debug)]
pub struct App {
    router: axum::Router,
    graceful_shutdown: bool,
}

impl App {
    /// Creates a new application router for the given listener state.
    ///
    /// The applications sets up middlewares and routes for the listener's role. Use
    /// [`serve`](Self::serve) or [`serve_tls`](Self::serve_tls) to run the server future.
    pub fn new(state: ServiceState) -> Self {
        let role = state.server.role.name();

        // Build the router middleware into a single service which runs _after_ routing. Service
        // builder order defines layers added first will be called first. This means:
        //  - Requests go from top to bottom
        //  - Responses go from bottom to top
        let middleware = ServiceBuilder::new()
            .layer(CatchPanicLayer::custom(m::handle_panic))
            .layer(m::set_server_header())
            .layer(NewSentryLayer::new_from_top())
            .layer(SentryHttpLayer::new().enable_transaction())
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(m::make_http_span(role))
                    .on_failure(DefaultOnFailure::new().level(Level::DEBUG)),
            );

        let router = endpoints::routes().layer(middleware).with_state(state);

        App {
            router,
            graceful_shutdown: false,
        }
    }

    /// Enables or disables graceful shutdown for the server.
    ///
    /// By default, graceful shutdown is disabled.
    pub fn graceful_shutdown(mut self, enable: bool) -> Self {
        self.graceful_shutdown = enable;
        self
    }

    /// Runs the web server over plain TCP until graceful shutdown is triggered.
    ///
    /// This function creates a future that runs the server. The future must be spawned or awaited for
    /// the server to continue running.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let Self {
            router,
            graceful_shutdown,
        } = self;

        let service = router.into_make_service_with_connect_info::<SocketAddr>();

        if graceful_shutdown {
            let guard = elegant_departure::get_shutdown_guard();
            axum::serve(listener, service)
                .with_graceful_shutdown(guard.wait_owned())
                .await?;
        } else {
            axum::serve(listener, service).await?;
        }

        Ok(())
    }

    /// Runs the web server over TLS until graceful shutdown is triggered.
    ///
    /// On shutdown, open connections get `grace` to complete before they are closed. Client
    /// addresses are not recorded in request spans on TLS listeners.
    pub async fn serve_tls(
        self,
        listener: TcpListener,
        tls: RustlsConfig,
        grace: Duration,
    ) -> Result<()> {
        let Self {
            router,
            graceful_shutdown,
        } = self;

        let service = router.into_make_service();
        let handle = axum_server::Handle::new();

        // Held until the server has drained, so shutdown waits for open connections.
        let guard = if graceful_shutdown {
            let handle = handle.clone();
            let signal = elegant_departure::get_shutdown_guard();
            tokio::spawn(async move {
                signal.wait().await;
                handle.graceful_shutdown(Some(grace));
            });
            Some(elegant_departure::get_shutdown_guard())
        } else {
            None
        };

        axum_server::from_tcp_rustls(listener.into_std()?, tls)
            .handle(handle)
            .serve(service)
            .await?;

        drop(guard);
        Ok(())
    }
}

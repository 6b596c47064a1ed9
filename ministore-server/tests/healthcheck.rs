//! Runs the healthcheck command against live listeners.

use std::path::PathBuf;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use ministore_server::driver::DriverKind;
use ministore_server::healthcheck::healthcheck;
use ministore_server::state::State;
use ministore_server::tls::TlsPaths;
use ministore_server::topology::{ServerConfig, ServerConfigSet, build_configs};
use ministore_server::web::{App, listen};
use ministore_test::server::TestServer;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn live_configs(server: &TestServer) -> ServerConfigSet {
    build_configs(
        "",
        &server.addr("api").to_string(),
        &server.addr("web").to_string(),
        DriverKind::Memory,
        None,
    )
}

#[tokio::test]
async fn passes_when_all_listeners_respond() {
    ministore_test::tracing::init();
    let server = TestServer::new().await;

    healthcheck(&live_configs(&server)).await.unwrap();
}

#[tokio::test]
async fn fails_once_a_listener_is_gone() {
    let server = TestServer::new().await;
    let configs = live_configs(&server);
    healthcheck(&configs).await.unwrap();

    drop(server);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(healthcheck(&configs).await.is_err());
}

#[tokio::test]
async fn fails_when_nothing_listens() {
    let listener = listen("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let configs = build_configs("", &addr, &addr, DriverKind::File, None);
    assert!(healthcheck(&configs).await.is_err());
}

#[tokio::test]
async fn checks_tls_listener_over_https() {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let (cert, key) = (fixture("cert.pem"), fixture("key.pem"));
    let tls = TlsPaths::from_pair(cert.to_str().unwrap(), key.to_str().unwrap()).unwrap();

    let listener = listen("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let api = build_configs("", &addr, "", DriverKind::Donut, tls)
        .by_role("api")
        .unwrap()
        .clone();
    assert!(api.tls_enabled());

    let rustls_config = RustlsConfig::from_pem_file(&cert, &key).await.unwrap();
    let app = App::new(State::new(api.clone()));
    let handle = tokio::spawn(app.serve_tls(listener, rustls_config, Duration::from_secs(1)));

    healthcheck(&ServerConfigSet::from(vec![api.clone()]))
        .await
        .unwrap();

    // Plain HTTP against the TLS listener does not get a successful response.
    let plain = ServerConfig { tls: None, ..api };
    assert!(healthcheck(&ServerConfigSet::from(vec![plain])).await.is_err());

    handle.abort();
}

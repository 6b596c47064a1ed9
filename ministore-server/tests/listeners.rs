//! Blackbox tests for the listeners started from a planned topology.

use anyhow::Result;
use ministore_server::config::Config;
use ministore_server::driver::DriverKind;
use ministore_server::topology::ApiRole;
use ministore_test::server::TestServer;

#[tokio::test]
async fn both_listeners_serve_health() -> Result<()> {
    ministore_test::tracing::init();
    let server = TestServer::new().await;
    let client = reqwest::Client::new();

    for url in [server.api_url("/health"), server.web_url("/health")] {
        let response = client.get(&url).send().await?;
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let header = response.headers()[reqwest::header::SERVER].to_str()?.to_owned();
        assert!(header.starts_with("ministore/"));
        assert_eq!(response.text().await?, "OK");
    }

    Ok(())
}

#[tokio::test]
async fn listeners_report_ready() -> Result<()> {
    let server = TestServer::new().await;
    let client = reqwest::Client::new();

    let response = client.get(server.web_url("/ready")).send().await?;
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn unknown_routes_are_not_found() -> Result<()> {
    let server = TestServer::new().await;
    let client = reqwest::Client::new();

    let response = client.get(server.api_url("/v1/objects/foo")).send().await?;
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn serves_resolved_topology() -> Result<()> {
    let server = TestServer::with_config(Config {
        domain: "example.com".into(),
        driver_type: "memory".into(),
        ..Default::default()
    })
    .await;

    let configs = server.configs();
    assert_eq!(configs.len(), 2);

    let api = configs.by_role("api").unwrap();
    assert_eq!(api.domain, "example.com");
    assert_eq!(
        api.role,
        ApiRole::Storage {
            driver: DriverKind::Memory
        }
    );

    let response = reqwest::get(server.api_url("/health")).await?;
    assert!(response.status().is_success());

    Ok(())
}

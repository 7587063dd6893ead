mod common;

use anyhow::Result;
use bump_journal_api::app::cors_layer;
use bump_journal_api::config::SecurityConfig;
use reqwest::{header, StatusCode};

fn security(origins: &[&str]) -> SecurityConfig {
    SecurityConfig {
        jwt_secret: "integration-secret".to_string(),
        jwt_expiry_hours: 1,
        jwt_leeway_secs: 0,
        auth_cookie_name: common::COOKIE_NAME.to_string(),
        enable_cors: true,
        cors_origins: origins.iter().map(|o| o.to_string()).collect(),
    }
}

#[tokio::test]
async fn configured_origin_is_allowed_with_credentials() -> Result<()> {
    let server = common::spawn_server_with(cors_layer(&security(&["http://localhost:5173"]))).await?;
    let client = reqwest::Client::new();

    let res = client
        .get(server.url("/health"))
        .header(header::ORIGIN, "http://localhost:5173")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).and_then(|v| v.to_str().ok()),
        Some("http://localhost:5173")
    );
    assert_eq!(
        res.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).and_then(|v| v.to_str().ok()),
        Some("true")
    );

    let res = client
        .get(server.url("/health"))
        .header(header::ORIGIN, "http://evil.example")
        .send()
        .await?;
    assert!(res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    Ok(())
}

#[tokio::test]
async fn empty_origin_list_is_permissive() -> Result<()> {
    let server = common::spawn_server_with(cors_layer(&security(&[]))).await?;

    let res = reqwest::Client::new()
        .get(server.url("/health"))
        .header(header::ORIGIN, "http://anywhere.example")
        .send()
        .await?;
    assert_eq!(
        res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).and_then(|v| v.to_str().ok()),
        Some("*")
    );
    Ok(())
}

#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Request, StatusCode};
use pulse_common::{Metric, Signer};
use pulse_server::config::ServerConfig;
use pulse_server::server::build_state;
use pulse_server::state::AppState;
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: axum::Router,
}

impl TestContext {
    pub fn snapshot_path(&self) -> PathBuf {
        self.temp_dir.path().join("metrics.json")
    }

    pub fn signer(&self) -> &Signer {
        self.state.repo.signer()
    }
}

/// File-backed server state in a fresh temp dir.
pub async fn build_test_context(secret_key: &str) -> Result<TestContext> {
    build_test_context_with(|config| config.secret_key = secret_key.to_string()).await
}

pub async fn build_test_context_with(customize: impl FnOnce(&mut ServerConfig)) -> Result<TestContext> {
    let temp_dir = tempfile::tempdir()?;
    let mut config = ServerConfig::default();
    config.storage.store_file = Some(temp_dir.path().join("metrics.json"));
    config.storage.store_interval_secs = 0;
    customize(&mut config);

    let state = build_state(config).await?;
    let app = pulse_server::app::build_http_app(state.clone());
    Ok(TestContext {
        temp_dir,
        state,
        app,
    })
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

pub async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: impl Into<Body>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let req = builder.body(body.into()).expect("request should build");
    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let headers = resp.headers().clone();
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read")
        .to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn get(app: &axum::Router, uri: &str) -> TestResponse {
    send(app, "GET", uri, &[], Body::empty()).await
}

pub async fn post_empty(app: &axum::Router, uri: &str) -> TestResponse {
    send(app, "POST", uri, &[], Body::empty()).await
}

pub async fn post_json(app: &axum::Router, uri: &str, body: &Value) -> TestResponse {
    send(
        app,
        "POST",
        uri,
        &[("content-type", "application/json")],
        body.to_string(),
    )
    .await
}

pub fn signed_json(signer: &Signer, metric: Metric) -> Value {
    serde_json::to_value(signer.signed(metric)).expect("metric serializes")
}

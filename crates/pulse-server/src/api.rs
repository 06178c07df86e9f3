//! HTTP handlers for the metric protocol.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pulse_common::crypto::{ENCRYPTION_HEADER, ENCRYPTION_SCHEME};
use pulse_common::render::render_html;
use pulse_common::{Metric, MetricError, MetricKind};
use pulse_storage::StorageError;
use serde::Deserialize;
use serde_json::json;

use crate::state::{AppState, IngestError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("content type must be application/json")]
    UnsupportedMediaType,

    #[error("metric not found")]
    NotFound,

    #[error("{0}")]
    NotImplemented(String),

    #[error("{0}")]
    Storage(#[from] StorageError),
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::Storage(e) => ApiError::Storage(e),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn require_json(headers: &HeaderMap) -> ApiResult<()> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().starts_with("application/json"));
    if is_json {
        Ok(())
    } else {
        Err(ApiError::UnsupportedMediaType)
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid JSON: {e}")))
}

async fn list_metrics(State(state): State<AppState>) -> Html<String> {
    Html(render_html(&state.repo.to_metrics()))
}

async fn get_value(
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
) -> ApiResult<String> {
    let kind: MetricKind = kind.parse().map_err(|_| ApiError::NotFound)?;
    state
        .repo
        .metric(&name, kind)
        .map(|m| m.format_value())
        .ok_or(ApiError::NotFound)
}

/// Legacy path-encoded update; not signed.
async fn update_from_path(
    State(state): State<AppState>,
    Path((kind, name, value)): Path<(String, String, String)>,
) -> ApiResult<StatusCode> {
    let kind: MetricKind = kind
        .parse()
        .map_err(|e: MetricError| ApiError::NotImplemented(e.to_string()))?;
    let metric =
        Metric::parse(kind, &name, &value).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    state.repo.update_metric(&metric).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    state.storage.save().await?;
    Ok(StatusCode::OK)
}

async fn update_json(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Metric>> {
    require_json(&headers)?;
    let metric: Metric = parse_json(&body)?;
    state.ingest(std::slice::from_ref(&metric)).await?;
    let current = state.repo.metric(&metric.id, metric.kind).ok_or(ApiError::NotFound)?;
    Ok(Json(current))
}

#[derive(Debug, Deserialize)]
struct MetricQuery {
    id: String,
    #[serde(rename = "type")]
    kind: MetricKind,
}

async fn value_json(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Metric>> {
    require_json(&headers)?;
    let query: MetricQuery = parse_json(&body)?;
    state
        .repo
        .metric(&query.id, query.kind)
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn updates_json(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<serde_json::Value>> {
    require_json(&headers)?;

    let encryption = headers.get(ENCRYPTION_HEADER).and_then(|v| v.to_str().ok());
    let plain = match encryption {
        None => body.to_vec(),
        Some(scheme) if scheme.eq_ignore_ascii_case(ENCRYPTION_SCHEME) => {
            let decryptor = state.decryptor.as_ref().ok_or_else(|| {
                ApiError::BadRequest("encrypted payload but no private key configured".into())
            })?;
            decryptor
                .decrypt(&body)
                .map_err(|e| ApiError::BadRequest(format!("cannot decrypt payload: {e}")))?
        }
        Some(other) => {
            return Err(ApiError::BadRequest(format!(
                "unsupported payload encryption: {other}"
            )))
        }
    };

    let metrics: Vec<Metric> = parse_json(&plain)?;
    let accepted = state.ingest(&metrics).await?;
    Ok(Json(json!({ "accepted": accepted })))
}

async fn ping(State(state): State<AppState>) -> ApiResult<&'static str> {
    state.storage.ping().await?;
    Ok("ok")
}

pub fn metric_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_metrics))
        .route("/value/:kind/:name", get(get_value))
        .route("/update/:kind/:name/:value", post(update_from_path))
        .route("/update/", post(update_json))
        .route("/value/", post(value_json))
        .route("/updates/", post(updates_json))
        .route("/ping", get(ping))
}

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::ip_filter::REAL_IP_HEADER;
use crate::logging::TraceId;
use crate::state::AppState;

/// Rejects requests whose `X-Real-IP` falls outside the trusted subnet.
pub async fn ip_filter_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let real_ip = req
        .headers()
        .get(REAL_IP_HEADER)
        .and_then(|v| v.to_str().ok());

    if state.ip_filter.allows(real_ip) {
        return next.run(req).await;
    }

    let trace_id = req
        .extensions()
        .get::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_default();
    tracing::warn!(
        trace_id = %trace_id,
        real_ip = real_ip.unwrap_or_default(),
        "Request rejected: client address outside trusted subnet"
    );
    (StatusCode::FORBIDDEN, "client address is not trusted").into_response()
}

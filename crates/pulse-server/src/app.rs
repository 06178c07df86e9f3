use crate::state::AppState;
use crate::{api, logging};
use axum::middleware;
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;

/// Routes plus the middleware stack, innermost first: trusted-subnet check,
/// request logging, gzip on both directions.
pub fn build_http_app(state: AppState) -> Router {
    api::metric_routes()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::ip_filter_middleware,
        ))
        .with_state(state)
        .layer(middleware::from_fn(logging::request_logging))
        .layer(CompressionLayer::new())
        .layer(RequestDecompressionLayer::new())
}

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::PeerIpKeyExtractor, GovernorError,
    GovernorLayer,
};

/// IP-keyed governor layer
pub type IpGovernorLayer = GovernorLayer<
    PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    Body,
>;

fn ip_governor(per_ms: u64, burst: u32) -> IpGovernorLayer {
    let config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(burst)
            .finish()
            .expect("IP governor config"),
    );

    GovernorLayer::new(config).error_handler(rate_limit_error_handler)
}

/// Outermost limiter, 1000 requests per minute per IP
pub fn create_global_governor() -> IpGovernorLayer {
    ip_governor(60, 1000)
}

/// Sign-in and ride search, 100 requests per minute per IP
pub fn create_public_governor() -> IpGovernorLayer {
    ip_governor(600, 100)
}

fn json_error(status: StatusCode, message: String, headers: Option<HeaderMap>) -> Response<Body> {
    let mut response = (status, Json(json!({ "error": message }))).into_response();
    if let Some(headers) = headers {
        response.headers_mut().extend(headers);
    }
    response
}

/// Governor rejections in the same `{"error": ...}` shape as `AppError`
pub fn rate_limit_error_handler(error: GovernorError) -> Response<Body> {
    match error {
        GovernorError::TooManyRequests { wait_time, headers } => json_error(
            StatusCode::TOO_MANY_REQUESTS,
            format!("Too many requests. Please retry in {} seconds.", wait_time),
            headers,
        ),
        GovernorError::UnableToExtractKey => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "An error occurred. Please try again.".to_string(),
            None,
        ),
        GovernorError::Other { code, msg, headers } => json_error(
            code,
            msg.unwrap_or_else(|| "An error occurred. Please try again.".to_string()),
            headers,
        ),
    }
}

/// One log line per request with client, status and latency
pub async fn log_request(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let latency_ms = started.elapsed().as_millis() as u64;

    match status {
        StatusCode::TOO_MANY_REQUESTS => tracing::warn!(
            client_ip = %addr.ip(),
            %method,
            %path,
            "Rate limited"
        ),
        s if s.is_server_error() => tracing::error!(
            client_ip = %addr.ip(),
            %method,
            %path,
            status = s.as_u16(),
            latency_ms,
            "Request failed"
        ),
        s if s.is_client_error() => tracing::info!(
            client_ip = %addr.ip(),
            %method,
            %path,
            status = s.as_u16(),
            latency_ms,
            "Request rejected"
        ),
        s => tracing::debug!(
            client_ip = %addr.ip(),
            %method,
            %path,
            status = s.as_u16(),
            latency_ms,
            "Request completed"
        ),
    }

    response
}

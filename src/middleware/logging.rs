use std::time::Instant;

use axum::{
    body::{Body, to_bytes},
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use tracing::{error, info};

const MAX_LOGGED_BODY: usize = 64 * 1024;

/// Logs method, path, status and latency of every request, plus the body of 5xx responses.
pub async fn log_requests(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(req).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if !status.is_server_error() {
        info!(%method, %path, status = status.as_u16(), elapsed_ms, "request completed");
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_LOGGED_BODY).await {
        Ok(b) => b,
        Err(e) => {
            error!(%method, %path, status = status.as_u16(), elapsed_ms, "failed to read error response body: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    error!(
        %method,
        %path,
        status = status.as_u16(),
        elapsed_ms,
        body = %String::from_utf8_lossy(&bytes),
        "request failed"
    );

    // body was consumed above; rebuild it
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(bytes))
}

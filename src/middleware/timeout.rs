use std::convert::Infallible;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;

/// Absolute deadline of the current request.
#[derive(Debug, Clone, Copy)]
pub struct RequestDeadline(pub Instant);

/// Runs the rest of the chain on its own task and answers 408 if it misses the deadline.
///
/// A late handler is not aborted. Its [`CancellationToken`] is cancelled and it
/// may finish in the background.
pub async fn enforce_timeout(
    State(timeout): State<Duration>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let deadline = Instant::now() + timeout;
    let cancel = CancellationToken::new();
    req.extensions_mut().insert(RequestDeadline(deadline));
    req.extensions_mut().insert(cancel.clone());

    let path = req.uri().path().to_owned();
    let mut handle = tokio::spawn(next.run(req));

    match tokio::time::timeout_at(deadline, &mut handle).await {
        Ok(Ok(response)) => response,
        Ok(Err(join_error)) if join_error.is_panic() => {
            // hand the panic to the recovery stage
            std::panic::resume_unwind(join_error.into_panic())
        }
        Ok(Err(join_error)) => AppError::Internal(join_error.to_string()).into_response(),
        Err(_) => {
            cancel.cancel();
            tracing::warn!(%path, timeout_ms = timeout.as_millis() as u64, "request deadline exceeded");
            AppError::Timeout.into_response()
        }
    }
}

/// The request's cancellation token; a fresh, never-cancelled one outside the timeout stage.
#[derive(Debug, Clone, Default)]
pub struct RequestCancellation(pub CancellationToken);

impl<S> FromRequestParts<S> for RequestCancellation
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<CancellationToken>()
                .cloned()
                .unwrap_or_default(),
        ))
    }
}

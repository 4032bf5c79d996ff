use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use crate::auth::{AuthContext, TokenService};
use crate::error::AppError;

/// Validates the bearer token and stores the caller's [`AuthContext`] on the request.
///
/// Every failure is a plain 401; the specific reason is only logged.
pub async fn require_auth(
    State(tokens): State<Arc<TokenService>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(bearer) = req.headers().typed_get::<Authorization<Bearer>>() else {
        tracing::debug!(path = %req.uri().path(), "missing bearer token");
        return Err(AppError::Unauthorized);
    };

    let context = tokens.validate_token(bearer.token()).map_err(|kind| {
        tracing::warn!(?kind, path = %req.uri().path(), "access token rejected");
        AppError::Unauthorized
    })?;

    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .ok_or(AppError::Unauthorized)
    }
}

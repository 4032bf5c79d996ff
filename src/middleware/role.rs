use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::auth::{AuthContext, Role};
use crate::error::AppError;

/// Lets the request through only when the caller's role equals `required`.
///
/// Roles are not ordered: an admin does not pass an elevated-only gate.
pub async fn require_role(
    State(required): State<Role>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(context) = req.extensions().get::<AuthContext>().copied() else {
        return Err(AppError::Unauthorized);
    };

    if context.role != required {
        tracing::warn!(
            user_id = context.user_id,
            role = %context.role,
            required = %required,
            "role gate rejected request"
        );
        return Err(AppError::Forbidden);
    }

    Ok(next.run(req).await)
}

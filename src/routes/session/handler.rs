use axum::{Json, extract::State};

use super::model::{LoginRequest, LoginResponse, RefreshTokenRequest, RefreshTokenResponse};
use crate::{
    AppState,
    error::AppError,
    middleware::RequestCancellation,
    result::{ApiResponse, success_to_api_response},
};

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    RequestCancellation(cancel): RequestCancellation,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    let outcome = state
        .provisioning
        .login(&req.email, &req.password, &cancel)
        .await?;
    Ok(success_to_api_response(outcome.into()))
}

#[axum::debug_handler]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<Json<ApiResponse<RefreshTokenResponse>>, AppError> {
    let pair = state.provisioning.refresh_session(&req.refresh_token).await?;
    Ok(success_to_api_response(pair.into()))
}

use axum::{
    Json,
    extract::{Query, State},
};

use super::model::{
    CompleteProfileRequest, CreateElevatedUserRequest, CreateElevatedUserResponse,
    CreateSharedAccountRequest, CreateSharedAccountResponse, MessageResponse,
    ResendVerificationRequest, VerifyEmailQuery,
};
use crate::{
    AppState,
    auth::AuthContext,
    error::AppError,
    middleware::RequestCancellation,
    result::{ApiResponse, success_to_api_response},
    routes::session::LoginResponse,
    store::ProfileUpdate,
};

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

#[axum::debug_handler]
pub async fn create_elevated_user(
    State(state): State<AppState>,
    RequestCancellation(cancel): RequestCancellation,
    Json(req): Json<CreateElevatedUserRequest>,
) -> ApiResult<CreateElevatedUserResponse> {
    let created = state
        .provisioning
        .create_elevated_account(&req.email, &req.password, &cancel)
        .await?;
    Ok(success_to_api_response(created.into()))
}

#[axum::debug_handler]
pub async fn create_shared_account(
    State(state): State<AppState>,
    identity: AuthContext,
    RequestCancellation(cancel): RequestCancellation,
    Json(req): Json<CreateSharedAccountRequest>,
) -> ApiResult<CreateSharedAccountResponse> {
    let user_id = state
        .provisioning
        .create_shared_account(&identity, &req.email, &req.password, req.phone_number, &cancel)
        .await?;
    Ok(success_to_api_response(CreateSharedAccountResponse { user_id }))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    identity: AuthContext,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<MessageResponse> {
    state.provisioning.update_profile(&identity, update).await?;
    Ok(success_to_api_response(MessageResponse::new(
        "Profile updated successfully",
    )))
}

#[axum::debug_handler]
pub async fn complete_profile(
    State(state): State<AppState>,
    RequestCancellation(cancel): RequestCancellation,
    Json(req): Json<CompleteProfileRequest>,
) -> ApiResult<LoginResponse> {
    let outcome = state
        .provisioning
        .complete_profile(&req.email, &req.password, req.profile, &cancel)
        .await?;
    Ok(success_to_api_response(outcome.into()))
}

#[axum::debug_handler]
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> ApiResult<MessageResponse> {
    state.provisioning.verify_email(&query.token).await?;
    Ok(success_to_api_response(MessageResponse::new(
        "Email verified successfully",
    )))
}

#[axum::debug_handler]
pub async fn resend_verification_email(
    State(state): State<AppState>,
    Json(req): Json<ResendVerificationRequest>,
) -> ApiResult<MessageResponse> {
    state.provisioning.resend_verification(&req.email).await?;
    Ok(success_to_api_response(MessageResponse::new(
        "Verification email resent successfully",
    )))
}

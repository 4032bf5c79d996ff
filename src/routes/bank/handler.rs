use axum::{
    Json,
    extract::{Path, State},
};

use super::model::{ConfirmBankRequest, ConfirmBankResponse};
use crate::{
    AppState,
    auth::AuthContext,
    error::AppError,
    middleware::RequestCancellation,
    provisioning::BankInfo,
    result::{ApiResponse, success_to_api_response},
};

#[axum::debug_handler]
pub async fn confirm_bank(
    State(state): State<AppState>,
    identity: AuthContext,
    RequestCancellation(cancel): RequestCancellation,
    Json(req): Json<ConfirmBankRequest>,
) -> Result<Json<ApiResponse<ConfirmBankResponse>>, AppError> {
    let bound = state
        .provisioning
        .bind_bank(&identity, req.bank_id, &cancel)
        .await?;
    Ok(success_to_api_response(bound.into()))
}

#[axum::debug_handler]
pub async fn bank_info(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> Result<Json<ApiResponse<BankInfo>>, AppError> {
    let bank = state.provisioning.find_bank(&query).await?;
    Ok(success_to_api_response(bank))
}

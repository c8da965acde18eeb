// handlers/protected/payments.rs - checkout, confirmation and history

use axum::{
    extract::{Extension, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::database::models::PaymentRecord;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::SettlementResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    pub package_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutCreated {
    pub session_id: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub hr_email: Option<String>,
}

/// POST /create-checkout-session
pub async fn checkout_post(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CheckoutBody>,
) -> ApiResult<CheckoutCreated> {
    let caller = state.identity(&auth_user).await?;
    let session = state
        .settlement
        .create_checkout(&caller, body.package_name.as_deref())
        .await?;
    Ok(ApiResponse::created(CheckoutCreated { session_id: session.id, url: session.url }))
}

/// PATCH /verifyPaymentSuccess?session_id= - safe to call any number of times.
/// An unpaid session is a success with `settled: false`.
pub async fn verify(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<VerifyQuery>,
) -> ApiResult<SettlementResult> {
    let caller = state.identity(&auth_user).await?;
    let result = state
        .settlement
        .settle_payment(&caller, query.session_id.as_deref())
        .await?;

    Ok(ApiResponse::success(result))
}

/// GET /payments?hrEmail= (defaults to the caller), newest first
pub async fn get(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Vec<PaymentRecord>> {
    let caller = state.identity(&auth_user).await?;
    let hr_email = query.hr_email.unwrap_or_else(|| caller.email.clone());
    Ok(ApiResponse::success(state.settlement.list_payments(&caller, &hr_email).await?))
}

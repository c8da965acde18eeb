// handlers/protected/requests.rs - request submission, listing and decision

use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{Request, RequestFilter};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{AffiliationPayload, Decision, DecisionOutcome, NewRequest};
use crate::types::RequestStatus;

/// PATCH /requests/:id body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionBody {
    pub status: Option<String>,
    pub asset_id: Option<Uuid>,
    /// Must name the requester when present
    pub user_id: Option<String>,
    /// Must name the caller when present
    pub processed_by: Option<String>,
    #[serde(alias = "decisionDate")]
    pub date: Option<DateTime<Utc>>,
    pub company_affiliation: Option<AffiliationPayload>,
}

/// GET /requests?status=&search= - scoped to the caller
pub async fn get(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(filter): Query<RequestFilter>,
) -> ApiResult<Vec<Request>> {
    let caller = state.identity(&auth_user).await?;
    Ok(ApiResponse::success(state.lifecycle.list_requests(&caller, filter).await?))
}

/// POST /requests - employee asks for one unit of an asset
pub async fn post(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<NewRequest>,
) -> ApiResult<Request> {
    let caller = state.identity(&auth_user).await?;
    let request = state.lifecycle.submit_request(&caller, body).await?;
    Ok(ApiResponse::created(request))
}

/// PATCH /requests/:id - HR approves or rejects a pending request.
/// Exhausted stock and full quota come back as `success: false` with HTTP 200.
pub async fn patch(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<DecisionBody>,
) -> ApiResult<DecisionOutcome> {
    let caller = state.identity(&auth_user).await?;

    let status: RequestStatus = body
        .status
        .as_deref()
        .ok_or_else(|| ApiError::missing_field("status"))?
        .parse()
        .map_err(|e: crate::types::UnknownVariant| ApiError::validation_error(e.to_string(), None))?;

    if let Some(processed_by) = body.processed_by.as_deref() {
        if processed_by != caller.email {
            return Err(ApiError::forbidden("processedBy must be the calling account"));
        }
    }

    let decision = Decision {
        status,
        asset_id: body.asset_id,
        requester: body.user_id,
        date: body.date,
        affiliation: body.company_affiliation,
    };

    let outcome = state.lifecycle.decide_request(id, decision, &caller).await?;
    if outcome.success {
        Ok(ApiResponse::success(outcome))
    } else {
        let message = outcome.message.clone();
        Ok(ApiResponse::reported(outcome, message))
    }
}

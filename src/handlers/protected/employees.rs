// handlers/protected/employees.rs - HR's affiliated employees

use axum::extract::{Extension, Query, State};
use serde::Deserialize;

use crate::app::AppState;
use crate::database::models::Affiliation;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::RemovalOutcome;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeQuery {
    pub hr_email: Option<String>,
    pub employee_email: Option<String>,
}

/// GET /employees?hrEmail= (defaults to the caller)
pub async fn get(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<EmployeeQuery>,
) -> ApiResult<Vec<Affiliation>> {
    let caller = state.identity(&auth_user).await?;
    let hr_email = query.hr_email.unwrap_or_else(|| caller.email.clone());
    Ok(ApiResponse::success(state.lifecycle.list_employees(&caller, &hr_email).await?))
}

/// DELETE /employees?hrEmail=&employeeEmail=
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<EmployeeQuery>,
) -> ApiResult<RemovalOutcome> {
    let caller = state.identity(&auth_user).await?;
    let hr_email = query.hr_email.ok_or_else(|| ApiError::missing_field("hrEmail"))?;
    let employee_email = query.employee_email.ok_or_else(|| ApiError::missing_field("employeeEmail"))?;

    let outcome = state.lifecycle.remove_affiliation(&caller, &hr_email, &employee_email).await?;
    Ok(ApiResponse::success(outcome))
}

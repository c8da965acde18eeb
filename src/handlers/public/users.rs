// handlers/public/users.rs - account registration and role lookup

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{NewAccount, Registration};

/// POST /users - insert the account if its email is new
pub async fn post(
    State(state): State<AppState>,
    Json(body): Json<NewAccount>,
) -> ApiResult<Registration> {
    let registration = state.accounts.register(body).await?;
    if registration.inserted {
        Ok(ApiResponse::created(registration))
    } else {
        Ok(ApiResponse::success(registration))
    }
}

/// GET /users/:email/role
pub async fn role_get(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Value> {
    let email = email.to_lowercase();
    let role = state.accounts.role_of(&email).await?;
    Ok(ApiResponse::success(json!({ "email": email, "role": role })))
}

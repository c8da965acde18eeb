// handlers/public/packages.rs - GET /packages

use axum::extract::State;

use crate::app::AppState;
use crate::database::models::Package;
use crate::middleware::{ApiResponse, ApiResult};

pub async fn get(State(state): State<AppState>) -> ApiResult<Vec<Package>> {
    Ok(ApiResponse::success(state.accounts.list_packages().await?))
}

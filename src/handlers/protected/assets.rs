// handlers/protected/assets.rs - GET/POST /assets

use axum::{
    extract::{Extension, Query, State},
    response::Json,
};

use crate::app::AppState;
use crate::database::models::{Asset, AssetFilter};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::NewAsset;

/// GET /assets?hrEmail=&search=&available=&assetType=
pub async fn get(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(filter): Query<AssetFilter>,
) -> ApiResult<Vec<Asset>> {
    state.identity(&auth_user).await?;
    Ok(ApiResponse::success(state.assets.list_assets(filter).await?))
}

/// POST /assets - register an asset owned by the calling HR account
pub async fn post(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<NewAsset>,
) -> ApiResult<Asset> {
    let caller = state.identity(&auth_user).await?;
    let asset = state.assets.create_asset(&caller, body).await?;
    Ok(ApiResponse::created(asset))
}

// handlers/public/token.rs - POST /jwt

use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::auth::{generate_jwt, Claims};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// POST /jwt - issue a signed token for `{ email }`
pub async fn post(Json(body): Json<TokenRequest>) -> ApiResult<TokenResponse> {
    let email = body
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::missing_field("email"))?;

    let token = generate_jwt(Claims::new(email)).map_err(|e| {
        tracing::error!("Token generation failed: {}", e);
        ApiError::internal_server_error("Failed to issue token")
    })?;

    Ok(ApiResponse::success(TokenResponse { token }))
}

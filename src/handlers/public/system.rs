// handlers/public/system.rs - GET / and GET /health

use axum::{extract::State, http::StatusCode, response::{IntoResponse, Json}};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET / - service banner with the route map
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Asset Management API",
            "version": version,
            "endpoints": {
                "public": ["/health", "/jwt", "/users", "/users/:email/role", "/packages"],
                "assets": "/assets (token; POST requires hr)",
                "requests": "/requests, /requests/:id (token; PATCH requires hr)",
                "employees": "/employees?hrEmail= (hr)",
                "payments": "/create-checkout-session, /verifyPaymentSuccess, /payments (token)",
            }
        }
    }))
}

/// GET /health - round-trips to the store
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            let detail = if crate::is_production!() { "unavailable".to_string() } else { e.to_string() };
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database_error": detail
                    }
                })),
            )
        }
    }
}

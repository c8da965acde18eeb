use axum::{
    http::{HeaderValue, Method},
    middleware::from_fn,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::database::Store;
use crate::error::ApiError;
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, AuthUser};
use crate::payment::PaymentGateway;
use crate::services::{
    resolve_identity, AccountService, AssetService, CheckoutSettings, Identity, RequestLifecycle,
    SettlementHandler,
};

/// Shared handler state: the store plus the services built on it
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub accounts: AccountService,
    pub assets: AssetService,
    pub lifecycle: RequestLifecycle,
    pub settlement: SettlementHandler,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, gateway: Arc<dyn PaymentGateway>, config: &AppConfig) -> Self {
        Self {
            accounts: AccountService::new(store.clone()),
            assets: AssetService::new(store.clone()),
            lifecycle: RequestLifecycle::new(store.clone(), config.workflow.quota_policy),
            settlement: SettlementHandler::new(store.clone(), gateway, CheckoutSettings::from(&config.payment)),
            store,
        }
    }

    /// Joins the token's email with the stored account
    pub async fn identity(&self, user: &AuthUser) -> Result<Identity, ApiError> {
        Ok(resolve_identity(self.store.as_ref(), &user.email).await?)
    }
}

pub fn app(state: AppState, config: &AppConfig) -> Router {
    let mut router = Router::new()
        .merge(public_routes())
        .merge(protected_routes())
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(config.api.max_request_size_bytes));

    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security.cors_origins));
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/jwt", post(public::token_post))
        .route("/users", post(public::user_post))
        .route("/users/:email/role", get(public::user_role_get))
        .route("/packages", get(public::packages_get))
}

fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/assets", get(protected::assets_get).post(protected::assets_post))
        .route("/requests", get(protected::requests_get).post(protected::requests_post))
        .route("/requests/:id", patch(protected::request_patch))
        .route("/employees", get(protected::employees_get).delete(protected::employees_delete))
        .route("/create-checkout-session", post(protected::checkout_post))
        .route("/verifyPaymentSuccess", patch(protected::payment_verify))
        .route("/payments", get(protected::payments_get))
        .route_layer(from_fn(jwt_auth_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([axum::http::header::AUTHORIZATION, axum::http::header::CONTENT_TYPE])
}

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use asset_management_api::config::{self, AppConfig, StoreBackend};
use asset_management_api::database::{seed_packages, DatabaseManager, MemoryStore, PgStore, Store};
use asset_management_api::payment::{MemoryGateway, PaymentGateway, StripeGateway};
use asset_management_api::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting Asset Management API in {:?} mode", config.environment);

    let store = build_store(config).await?;
    let gateway = build_gateway(config)?;
    let router = app(AppState::new(store, gateway, config), config);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Listening on http://{}", bind_addr);
    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}

async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
    match config.database.backend {
        StoreBackend::Postgres => {
            let pool = DatabaseManager::connect(&config.database)
                .await
                .context("failed to connect to Postgres")?;
            if config.database.run_migrations {
                DatabaseManager::migrate(&pool).await?;
            }
            Ok(Arc::new(PgStore::new(pool)))
        }
        StoreBackend::Memory => {
            if asset_management_api::is_production!() {
                tracing::warn!("Running production with the in-memory store; data is lost on restart");
            }
            let store = MemoryStore::new();
            let packages = seed_packages(&store).await?;
            tracing::info!("Seeded {} packages into the in-memory store", packages.len());
            Ok(Arc::new(store))
        }
    }
}

fn build_gateway(config: &AppConfig) -> anyhow::Result<Arc<dyn PaymentGateway>> {
    match config.payment.stripe_secret_key.as_deref() {
        Some(key) => Ok(Arc::new(StripeGateway::new(&config.payment, key)?)),
        None => {
            tracing::warn!("STRIPE_SECRET_KEY not set; using the in-memory payment gateway");
            Ok(Arc::new(MemoryGateway::new()))
        }
    }
}

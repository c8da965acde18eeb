use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

use crate::types::QuotaPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub payment: PaymentConfig,
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Which storage adapter backs the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Without a key the API falls back to the in-memory gateway
    #[serde(skip_serializing)]
    pub stripe_secret_key: Option<String>,
    pub stripe_api_base: String,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub quota_policy: QuotaPolicy,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("STORE_BACKEND") {
            match v.as_str() {
                "postgres" => self.database.backend = StoreBackend::Postgres,
                "memory" => self.database.backend = StoreBackend::Memory,
                other => tracing::warn!("Ignoring unknown STORE_BACKEND '{}'", other),
            }
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // API overrides
        if let Some(port) = env::var("PORT").ok().and_then(|v| v.parse().ok()) {
            self.api.port = port;
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        // Payment overrides
        if let Ok(v) = env::var("STRIPE_SECRET_KEY") {
            self.payment.stripe_secret_key = Some(v).filter(|k| !k.is_empty());
        }
        if let Ok(v) = env::var("STRIPE_API_BASE") {
            self.payment.stripe_api_base = v;
        }
        if let Ok(v) = env::var("PAYMENT_CURRENCY") {
            self.payment.currency = v.to_lowercase();
        }
        if let Ok(v) = env::var("PAYMENT_SUCCESS_URL") {
            self.payment.success_url = v;
        }
        if let Ok(v) = env::var("PAYMENT_CANCEL_URL") {
            self.payment.cancel_url = v;
        }
        if let Ok(v) = env::var("PAYMENT_REQUEST_TIMEOUT_SECS") {
            self.payment.request_timeout_secs = v.parse().unwrap_or(self.payment.request_timeout_secs);
        }

        // Workflow overrides
        if let Ok(v) = env::var("WORKFLOW_QUOTA_POLICY") {
            self.workflow.quota_policy = v.parse().unwrap_or(self.workflow.quota_policy);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                backend: StoreBackend::Memory,
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:5173".to_string()],
                jwt_secret: "development-secret-change-me".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
            },
            payment: PaymentConfig {
                stripe_secret_key: None,
                stripe_api_base: "https://api.stripe.com".to_string(),
                currency: "usd".to_string(),
                success_url: "http://localhost:5173/payment-success".to_string(),
                cancel_url: "http://localhost:5173/payment-cancelled".to_string(),
                request_timeout_secs: 30,
            },
            workflow: WorkflowConfig {
                quota_policy: QuotaPolicy::Permissive,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
            },
            payment: PaymentConfig {
                stripe_secret_key: None,
                stripe_api_base: "https://api.stripe.com".to_string(),
                currency: "usd".to_string(),
                success_url: "https://staging.example.com/payment-success".to_string(),
                cancel_url: "https://staging.example.com/payment-cancelled".to_string(),
                request_timeout_secs: 15,
            },
            workflow: WorkflowConfig {
                quota_policy: QuotaPolicy::Permissive,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: false,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
            },
            payment: PaymentConfig {
                stripe_secret_key: None,
                stripe_api_base: "https://api.stripe.com".to_string(),
                currency: "usd".to_string(),
                success_url: "https://app.example.com/payment-success".to_string(),
                cancel_url: "https://app.example.com/payment-cancelled".to_string(),
                request_timeout_secs: 10,
            },
            workflow: WorkflowConfig {
                quota_policy: QuotaPolicy::Permissive,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert!(!config.security.jwt_secret.is_empty());
        assert_eq!(config.workflow.quota_policy, QuotaPolicy::Permissive);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.database.backend, StoreBackend::Postgres);
        assert!(config.security.jwt_secret.is_empty());
        assert!(!config.database.run_migrations);
    }

    #[test]
    fn secrets_are_not_serialized() {
        let mut config = AppConfig::development();
        config.payment.stripe_secret_key = Some("sk_test_123".to_string());
        let rendered = serde_json::to_string(&config).unwrap();
        assert!(!rendered.contains("sk_test_123"));
        assert!(!rendered.contains("development-secret-change-me"));
    }
}

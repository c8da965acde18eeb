pub mod account_service;
pub mod asset_service;
pub mod request_service;
pub mod settlement_service;

pub use account_service::{AccountService, NewAccount, Registration};
pub use asset_service::{AssetService, NewAsset};
pub use request_service::{
    AffiliationPayload, Decision, DecisionOutcome, NewRequest, NotApplied, RemovalOutcome, RequestLifecycle,
};
pub use settlement_service::{CheckoutSettings, SettlementHandler, SettlementResult};

use thiserror::Error;

use crate::database::models::Account;
use crate::database::{DatabaseError, Store};
use crate::payment::PaymentError;
use crate::types::Role;

/// Domain failures. Validation and authorization are raised before any
/// mutation; exhausted inventory and quota are outcomes, not errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not authorized: {0}")]
    Authorization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Persistence(#[from] DatabaseError),

    #[error(transparent)]
    PaymentProvider(#[from] PaymentError),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        ServiceError::Authorization(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }
}

/// Caller identity: the token's email joined with the stored account
#[derive(Debug, Clone)]
pub struct Identity {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub company_name: Option<String>,
    pub company_logo: Option<String>,
}

impl From<&Account> for Identity {
    fn from(account: &Account) -> Self {
        Self {
            email: account.email.clone(),
            name: account.name.clone(),
            role: account.role,
            company_name: account.company_name.clone(),
            company_logo: account.company_logo.clone(),
        }
    }
}

impl Identity {
    pub fn is_hr(&self) -> bool {
        self.role == Role::Hr
    }

    pub fn require_hr(&self) -> Result<(), ServiceError> {
        if !self.is_hr() {
            tracing::warn!("{} attempted an HR-only operation", self.email);
            return Err(ServiceError::authorization("HR role required"));
        }
        Ok(())
    }

    /// HR caller acting on its own account
    pub fn require_hr_account(&self, hr_email: &str) -> Result<(), ServiceError> {
        self.require_hr()?;
        if self.email != hr_email {
            tracing::warn!("{} attempted to act on HR account {}", self.email, hr_email);
            return Err(ServiceError::authorization("cannot act on another HR account"));
        }
        Ok(())
    }
}

/// Loads the stored account behind an authenticated email
pub async fn resolve_identity(store: &dyn Store, email: &str) -> Result<Identity, ServiceError> {
    let account = store
        .find_account(email)
        .await?
        .ok_or_else(|| ServiceError::authorization(format!("no account registered for {}", email)))?;
    Ok(Identity::from(&account))
}

/// Rejects missing or blank string inputs
pub(crate) fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, ServiceError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ServiceError::validation(format!("{} is required", field))),
    }
}

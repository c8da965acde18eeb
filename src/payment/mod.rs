// External payment-session authority: create a hosted checkout session and
// read it back once the customer returns.

pub mod memory;
pub mod stripe;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub use memory::MemoryGateway;
pub use stripe::StripeGateway;

#[derive(Debug, Error)]
pub enum PaymentError {
    /// The provider could not be reached or timed out
    #[error("payment provider unavailable: {0}")]
    Unavailable(String),

    /// The provider answered with an error status
    #[error("payment provider rejected the call ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("checkout session not found: {0}")]
    SessionNotFound(String),

    #[error("invalid payment provider response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PaymentError::InvalidResponse(err.to_string())
        } else {
            PaymentError::Unavailable(err.to_string())
        }
    }
}

/// Metadata keys attached to every checkout session
pub mod metadata {
    pub const HR_EMAIL: &str = "hr_email";
    pub const PACKAGE_NAME: &str = "package_name";
    pub const EMPLOYEE_LIMIT: &str = "employee_limit";
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub hr_email: String,
    pub package_name: String,
    pub employee_limit: i32,
    pub amount: Decimal,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutRequest {
    pub fn metadata(&self) -> HashMap<String, String> {
        HashMap::from([
            (metadata::HR_EMAIL.to_string(), self.hr_email.clone()),
            (metadata::PACKAGE_NAME.to_string(), self.package_name.clone()),
            (metadata::EMPLOYEE_LIMIT.to_string(), self.employee_limit.to_string()),
        ])
    }
}

/// Provider view of a checkout session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted page the customer is redirected to
    pub url: Option<String>,
    pub payment_intent: Option<String>,
    pub payment_status: String,
    /// Amount in the currency's minor unit
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    /// Canonical transaction id: the payment intent when present, else the session id
    pub fn transaction_id(&self) -> &str {
        self.payment_intent.as_deref().unwrap_or(&self.id)
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Amount in major units, two decimal places
    pub fn amount(&self) -> Decimal {
        Decimal::new(self.amount_total.unwrap_or(0), 2)
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, PaymentError>;

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, PaymentError>;
}

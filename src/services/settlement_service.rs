// Maps a confirmed checkout session to exactly one plan upgrade.
//
// The ledger entry keyed by transaction id is the idempotence boundary: it is
// claimed before the account is touched, and any replay that finds it returns
// the stored result without writing.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{required, Identity, ServiceError};
use crate::config::PaymentConfig;
use crate::database::models::PaymentRecord;
use crate::database::Store;
use crate::payment::{metadata, CheckoutRequest, CheckoutSession, PaymentGateway};

/// Redirect targets and currency for new checkout sessions
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

impl From<&PaymentConfig> for CheckoutSettings {
    fn from(config: &PaymentConfig) -> Self {
        Self {
            currency: config.currency.clone(),
            success_url: config.success_url.clone(),
            cancel_url: config.cancel_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResult {
    /// A ledger entry exists for the transaction after this call
    pub settled: bool,
    /// The entry existed before this call; nothing was written
    pub already_settled: bool,
    pub account_updated: bool,
    pub payment_status: String,
    pub transaction_id: String,
    pub tracking_id: Option<String>,
    pub employee_limit: Option<i32>,
    pub payment: Option<PaymentRecord>,
}

impl SettlementResult {
    fn replayed(record: PaymentRecord) -> Self {
        Self {
            settled: true,
            already_settled: true,
            account_updated: false,
            payment_status: record.status.clone(),
            transaction_id: record.transaction_id.clone(),
            tracking_id: Some(record.tracking_id.clone()),
            employee_limit: Some(record.employee_limit),
            payment: Some(record),
        }
    }

    fn unpaid(session: &CheckoutSession) -> Self {
        Self {
            settled: false,
            already_settled: false,
            account_updated: false,
            payment_status: session.payment_status.clone(),
            transaction_id: session.transaction_id().to_string(),
            tracking_id: None,
            employee_limit: None,
            payment: None,
        }
    }
}

/// `AM-` followed by ten uppercase hex characters
pub fn tracking_id() -> String {
    let raw = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("AM-{}", &raw[..10])
}

#[derive(Clone)]
pub struct SettlementHandler {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    settings: CheckoutSettings,
}

impl SettlementHandler {
    pub fn new(store: Arc<dyn Store>, gateway: Arc<dyn PaymentGateway>, settings: CheckoutSettings) -> Self {
        Self { store, gateway, settings }
    }

    /// Opens a hosted checkout for one of the offered packages
    pub async fn create_checkout(&self, caller: &Identity, package_name: Option<&str>) -> Result<CheckoutSession, ServiceError> {
        caller.require_hr()?;
        let package_name = required(package_name, "packageName")?;
        let package = self
            .store
            .find_package(package_name)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("package {}", package_name)))?;

        let session = self
            .gateway
            .create_checkout_session(CheckoutRequest {
                hr_email: caller.email.clone(),
                package_name: package.name.clone(),
                employee_limit: package.employee_limit,
                amount: package.price,
                currency: self.settings.currency.clone(),
                success_url: self.settings.success_url.clone(),
                cancel_url: self.settings.cancel_url.clone(),
            })
            .await?;

        tracing::info!("Checkout session {} opened for {} ({})", session.id, caller.email, package.name);
        Ok(session)
    }

    pub async fn settle_payment(&self, caller: &Identity, session_id: Option<&str>) -> Result<SettlementResult, ServiceError> {
        let session_id = required(session_id, "session_id")?;
        let session = self.gateway.retrieve_session(session_id).await?;
        let transaction_id = session.transaction_id().to_string();

        if let Some(record) = self.store.find_payment(&transaction_id).await? {
            if record.hr_email != caller.email {
                tracing::warn!("{} attempted to read the settlement of {}", caller.email, record.hr_email);
                return Err(ServiceError::authorization("checkout session belongs to another account"));
            }
            tracing::debug!("Transaction {} already settled as {}", transaction_id, record.tracking_id);
            return Ok(SettlementResult::replayed(record));
        }

        if !session.is_paid() {
            tracing::info!("Session {} not paid ({})", session.id, session.payment_status);
            return Ok(SettlementResult::unpaid(&session));
        }

        let hr_email = session
            .metadata(metadata::HR_EMAIL)
            .ok_or_else(|| ServiceError::validation("checkout session has no hr_email"))?;
        if hr_email != caller.email {
            tracing::warn!("{} attempted to settle a checkout for {}", caller.email, hr_email);
            return Err(ServiceError::authorization("checkout session belongs to another account"));
        }
        let package_name = session
            .metadata(metadata::PACKAGE_NAME)
            .ok_or_else(|| ServiceError::validation("checkout session has no package_name"))?;
        let package_limit: i32 = session
            .metadata(metadata::EMPLOYEE_LIMIT)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| ServiceError::validation("checkout session has no valid employee_limit"))?;

        let account = self
            .store
            .find_account(hr_email)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("account {}", hr_email)))?;
        let employee_limit = account.employee_limit.max(package_limit);

        let record = PaymentRecord {
            id: Uuid::new_v4(),
            transaction_id: transaction_id.clone(),
            hr_email: hr_email.to_string(),
            package_name: package_name.to_string(),
            employee_limit,
            amount: session.amount(),
            currency: session.currency.clone().unwrap_or_else(|| self.settings.currency.clone()),
            status: session.payment_status.clone(),
            tracking_id: tracking_id(),
            paid_at: Utc::now(),
        };

        if !self.store.insert_payment(record.clone()).await? {
            // Lost the claim to a concurrent confirmation
            let winner = self
                .store
                .find_payment(&transaction_id)
                .await?
                .ok_or_else(|| ServiceError::Conflict(format!("transaction {} claimed but not readable", transaction_id)))?;
            tracing::info!("Transaction {} settled concurrently as {}", transaction_id, winner.tracking_id);
            return Ok(SettlementResult::replayed(winner));
        }

        let account_updated = match self.store.apply_plan(hr_email, package_name, employee_limit).await {
            Ok(updated) => updated,
            Err(e) => {
                tracing::error!(
                    "Ledger entry {} recorded but plan update for {} failed: {}",
                    record.tracking_id, hr_email, e
                );
                return Err(e.into());
            }
        };

        tracing::info!(
            "Settled {} for {}: {} up to {} employees ({})",
            transaction_id, hr_email, package_name, employee_limit, record.tracking_id
        );
        Ok(SettlementResult {
            settled: true,
            already_settled: false,
            account_updated,
            payment_status: record.status.clone(),
            transaction_id,
            tracking_id: Some(record.tracking_id.clone()),
            employee_limit: Some(employee_limit),
            payment: Some(record),
        })
    }

    pub async fn list_payments(&self, caller: &Identity, hr_email: &str) -> Result<Vec<PaymentRecord>, ServiceError> {
        caller.require_hr_account(hr_email)?;
        Ok(self.store.list_payments(hr_email).await?)
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Ledger entry for one settled external transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: Uuid,
    pub transaction_id: String,
    pub hr_email: String,
    pub package_name: String,
    pub employee_limit: i32,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub tracking_id: String,
    pub paid_at: DateTime<Utc>,
}

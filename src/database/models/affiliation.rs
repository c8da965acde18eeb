use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Employee-to-company membership. Unique per (employee_email, hr_email).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Affiliation {
    pub id: Uuid,
    pub employee_email: String,
    pub employee_name: Option<String>,
    pub hr_email: String,
    pub company_name: String,
    pub company_logo: Option<String>,
    pub affiliation_date: DateTime<Utc>,
}

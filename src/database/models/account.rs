use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::Role;

/// HR or employee account, keyed by email
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub company_name: Option<String>,
    pub company_logo: Option<String>,
    pub package_name: Option<String>,
    pub employee_limit: i32,
    pub current_employees: i32,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(email: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            name: name.into(),
            role,
            company_name: None,
            company_logo: None,
            package_name: None,
            employee_limit: 0,
            current_employees: 0,
            created_at: Utc::now(),
        }
    }
}

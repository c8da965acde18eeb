use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::RequestStatus;

/// An employee's ask for one unit of an asset
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub asset_name: String,
    pub requester_email: String,
    pub requester_name: Option<String>,
    pub hr_email: String,
    pub company_name: Option<String>,
    pub note: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: RequestStatus,
    pub request_date: DateTime<Utc>,
    pub decided_by: Option<String>,
    pub decision_date: Option<DateTime<Utc>>,
}

/// Write-once status change applied only while the request is pending
#[derive(Debug, Clone)]
pub struct RequestTransition {
    pub status: RequestStatus,
    pub decided_by: String,
    pub decision_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFilter {
    pub hr_email: Option<String>,
    pub requester_email: Option<String>,
    pub status: Option<RequestStatus>,
    /// Case-insensitive substring match on the asset name
    pub search: Option<String>,
}

impl RequestFilter {
    pub fn matches(&self, request: &Request) -> bool {
        if let Some(hr_email) = &self.hr_email {
            if &request.hr_email != hr_email {
                return false;
            }
        }
        if let Some(requester) = &self.requester_email {
            if &request.requester_email != requester {
                return false;
            }
        }
        if let Some(status) = self.status {
            if request.status != status {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !request.asset_name.to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

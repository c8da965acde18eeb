use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::AssetType;

/// An equipment type owned by an HR account, with a finite available count
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: Uuid,
    pub hr_email: String,
    pub company_name: Option<String>,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub asset_type: AssetType,
    pub product_quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl Asset {
    pub fn is_available(&self) -> bool {
        self.product_quantity > 0
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetFilter {
    pub hr_email: Option<String>,
    /// Case-insensitive substring match on the asset name
    pub search: Option<String>,
    /// Only assets with at least one unit left
    pub available: Option<bool>,
    pub asset_type: Option<AssetType>,
}

impl AssetFilter {
    pub fn matches(&self, asset: &Asset) -> bool {
        if let Some(hr_email) = &self.hr_email {
            if &asset.hr_email != hr_email {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !asset.name.to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }
        if self.available == Some(true) && !asset.is_available() {
            return false;
        }
        if let Some(asset_type) = self.asset_type {
            if asset.asset_type != asset_type {
                return false;
            }
        }
        true
    }
}

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{required, Identity, ServiceError};
use crate::database::models::{Asset, AssetFilter};
use crate::database::Store;
use crate::types::AssetType;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAsset {
    pub name: Option<String>,
    pub asset_type: Option<AssetType>,
    pub product_quantity: Option<i32>,
}

#[derive(Clone)]
pub struct AssetService {
    store: Arc<dyn Store>,
}

impl AssetService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Registers an asset owned by the calling HR account
    pub async fn create_asset(&self, caller: &Identity, new: NewAsset) -> Result<Asset, ServiceError> {
        caller.require_hr()?;
        let name = required(new.name.as_deref(), "name")?;
        let quantity = new.product_quantity.unwrap_or(1);
        if quantity < 0 {
            return Err(ServiceError::validation("productQuantity cannot be negative"));
        }

        let asset = self
            .store
            .insert_asset(Asset {
                id: Uuid::new_v4(),
                hr_email: caller.email.clone(),
                company_name: caller.company_name.clone(),
                name: name.to_string(),
                asset_type: new.asset_type.unwrap_or(AssetType::Returnable),
                product_quantity: quantity,
                created_at: Utc::now(),
            })
            .await?;

        tracing::info!("Asset {} ({}) registered by {} with {} units", asset.id, asset.name, asset.hr_email, quantity);
        Ok(asset)
    }

    pub async fn list_assets(&self, filter: AssetFilter) -> Result<Vec<Asset>, ServiceError> {
        Ok(self.store.list_assets(&filter).await?)
    }
}

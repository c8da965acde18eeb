use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Subscription plan offered to HR accounts
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: Uuid,
    pub name: String,
    pub employee_limit: i32,
    pub price: Decimal,
    pub features: Vec<String>,
}

impl Package {
    /// Default plans offered to new HR accounts
    pub fn defaults() -> Vec<Package> {
        [("Basic", 5, 500), ("Standard", 10, 800), ("Premium", 20, 1500)]
            .into_iter()
            .map(|(name, limit, cents)| Package {
                id: Uuid::new_v4(),
                name: name.to_string(),
                employee_limit: limit,
                price: Decimal::new(cents, 2),
                features: vec![format!("Up to {} employees", limit), "Asset tracking".to_string()],
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_grow_with_price() {
        let packages = Package::defaults();
        assert_eq!(packages.len(), 3);
        assert!(packages.windows(2).all(|w| w[0].employee_limit < w[1].employee_limit && w[0].price < w[1].price));
    }
}

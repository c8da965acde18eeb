// In-process adapter for the storage port. Each method holds the lock for its
// whole read-check-write so conditional operations are atomic.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Account, Affiliation, Asset, AssetFilter, Package, PaymentRecord, Request, RequestFilter,
    RequestTransition,
};
use crate::database::store::{
    AccountStore, AffiliationStore, AssetStore, PackageStore, PaymentStore, RequestStore, Store,
};
use crate::types::{QuotaPolicy, RequestStatus};

#[derive(Default)]
struct Collections {
    accounts: HashMap<String, Account>,
    assets: HashMap<Uuid, Asset>,
    requests: HashMap<Uuid, Request>,
    affiliations: HashMap<(String, String), Affiliation>,
    payments: HashMap<String, PaymentRecord>,
    packages: HashMap<String, Package>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ledger entries, used by tests to assert zero-write paths
    pub async fn payment_count(&self) -> usize {
        self.inner.read().await.payments.len()
    }

    pub async fn affiliation_count(&self) -> usize {
        self.inner.read().await.affiliations.len()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_account(&self, email: &str) -> Result<Option<Account>, DatabaseError> {
        Ok(self.inner.read().await.accounts.get(email).cloned())
    }

    async fn insert_account(&self, account: Account) -> Result<bool, DatabaseError> {
        let mut db = self.inner.write().await;
        if db.accounts.contains_key(&account.email) {
            return Ok(false);
        }
        db.accounts.insert(account.email.clone(), account);
        Ok(true)
    }

    async fn try_add_employee(&self, email: &str, policy: QuotaPolicy) -> Result<Option<Account>, DatabaseError> {
        let mut db = self.inner.write().await;
        match db.accounts.get_mut(email) {
            Some(account) if policy.admits(account.current_employees, account.employee_limit) => {
                account.current_employees += 1;
                Ok(Some(account.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn remove_employee(&self, email: &str) -> Result<bool, DatabaseError> {
        let mut db = self.inner.write().await;
        match db.accounts.get_mut(email) {
            Some(account) => {
                account.current_employees = (account.current_employees - 1).max(0);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn apply_plan(&self, email: &str, package_name: &str, employee_limit: i32) -> Result<bool, DatabaseError> {
        let mut db = self.inner.write().await;
        match db.accounts.get_mut(email) {
            Some(account) => {
                account.package_name = Some(package_name.to_string());
                account.employee_limit = employee_limit;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl AssetStore for MemoryStore {
    async fn insert_asset(&self, asset: Asset) -> Result<Asset, DatabaseError> {
        if asset.product_quantity < 0 {
            return Err(DatabaseError::QueryError("product_quantity must not be negative".to_string()));
        }
        self.inner.write().await.assets.insert(asset.id, asset.clone());
        Ok(asset)
    }

    async fn find_asset(&self, id: Uuid) -> Result<Option<Asset>, DatabaseError> {
        Ok(self.inner.read().await.assets.get(&id).cloned())
    }

    async fn list_assets(&self, filter: &AssetFilter) -> Result<Vec<Asset>, DatabaseError> {
        let db = self.inner.read().await;
        let mut assets: Vec<Asset> = db.assets.values().filter(|a| filter.matches(a)).cloned().collect();
        assets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(assets)
    }

    async fn take_asset_unit(&self, id: Uuid) -> Result<Option<Asset>, DatabaseError> {
        let mut db = self.inner.write().await;
        match db.assets.get_mut(&id) {
            Some(asset) if asset.product_quantity > 0 => {
                asset.product_quantity -= 1;
                Ok(Some(asset.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn release_asset_unit(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut db = self.inner.write().await;
        match db.assets.get_mut(&id) {
            Some(asset) => {
                asset.product_quantity += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn insert_request(&self, request: Request) -> Result<Request, DatabaseError> {
        self.inner.write().await.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn find_request(&self, id: Uuid) -> Result<Option<Request>, DatabaseError> {
        Ok(self.inner.read().await.requests.get(&id).cloned())
    }

    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, DatabaseError> {
        let db = self.inner.read().await;
        let mut requests: Vec<Request> = db.requests.values().filter(|r| filter.matches(r)).cloned().collect();
        requests.sort_by(|a, b| b.request_date.cmp(&a.request_date));
        Ok(requests)
    }

    async fn transition_request(&self, id: Uuid, transition: RequestTransition) -> Result<Option<Request>, DatabaseError> {
        let mut db = self.inner.write().await;
        match db.requests.get_mut(&id) {
            Some(request) if request.status == RequestStatus::Pending => {
                request.status = transition.status;
                request.decided_by = Some(transition.decided_by);
                request.decision_date = Some(transition.decision_date);
                Ok(Some(request.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl AffiliationStore for MemoryStore {
    async fn insert_affiliation(&self, affiliation: Affiliation) -> Result<bool, DatabaseError> {
        let mut db = self.inner.write().await;
        let key = (affiliation.employee_email.clone(), affiliation.hr_email.clone());
        if db.affiliations.contains_key(&key) {
            return Ok(false);
        }
        db.affiliations.insert(key, affiliation);
        Ok(true)
    }

    async fn find_affiliation(&self, employee_email: &str, hr_email: &str) -> Result<Option<Affiliation>, DatabaseError> {
        let key = (employee_email.to_string(), hr_email.to_string());
        Ok(self.inner.read().await.affiliations.get(&key).cloned())
    }

    async fn list_affiliations(&self, hr_email: &str) -> Result<Vec<Affiliation>, DatabaseError> {
        let db = self.inner.read().await;
        let mut affiliations: Vec<Affiliation> = db
            .affiliations
            .values()
            .filter(|a| a.hr_email == hr_email)
            .cloned()
            .collect();
        affiliations.sort_by(|a, b| a.affiliation_date.cmp(&b.affiliation_date));
        Ok(affiliations)
    }

    async fn delete_affiliation(&self, employee_email: &str, hr_email: &str) -> Result<u64, DatabaseError> {
        let key = (employee_email.to_string(), hr_email.to_string());
        let removed = self.inner.write().await.affiliations.remove(&key);
        Ok(u64::from(removed.is_some()))
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn find_payment(&self, transaction_id: &str) -> Result<Option<PaymentRecord>, DatabaseError> {
        Ok(self.inner.read().await.payments.get(transaction_id).cloned())
    }

    async fn insert_payment(&self, record: PaymentRecord) -> Result<bool, DatabaseError> {
        let mut db = self.inner.write().await;
        if db.payments.contains_key(&record.transaction_id) {
            return Ok(false);
        }
        db.payments.insert(record.transaction_id.clone(), record);
        Ok(true)
    }

    async fn list_payments(&self, hr_email: &str) -> Result<Vec<PaymentRecord>, DatabaseError> {
        let db = self.inner.read().await;
        let mut records: Vec<PaymentRecord> =
            db.payments.values().filter(|p| p.hr_email == hr_email).cloned().collect();
        records.sort_by(|a, b| b.paid_at.cmp(&a.paid_at));
        Ok(records)
    }
}

#[async_trait]
impl PackageStore for MemoryStore {
    async fn list_packages(&self) -> Result<Vec<Package>, DatabaseError> {
        let db = self.inner.read().await;
        let mut packages: Vec<Package> = db.packages.values().cloned().collect();
        packages.sort_by_key(|p| p.employee_limit);
        Ok(packages)
    }

    async fn find_package(&self, name: &str) -> Result<Option<Package>, DatabaseError> {
        Ok(self.inner.read().await.packages.get(name).cloned())
    }

    async fn upsert_package(&self, package: Package) -> Result<Package, DatabaseError> {
        let mut db = self.inner.write().await;
        let stored = match db.packages.get(&package.name) {
            // Keep the original id on replace, matching ON CONFLICT DO UPDATE
            Some(existing) => Package { id: existing.id, ..package },
            None => package,
        };
        db.packages.insert(stored.name.clone(), stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

// Storage port: one trait per record kind, bundled as `Store`.
//
// Every mutating method is a single conditional operation. Callers compose
// them into multi-step workflows; nothing here spans more than one record.

use async_trait::async_trait;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Account, Affiliation, Asset, AssetFilter, Package, PaymentRecord, Request, RequestFilter,
    RequestTransition,
};
use crate::types::QuotaPolicy;

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_account(&self, email: &str) -> Result<Option<Account>, DatabaseError>;

    /// Inserts unless an account with the same email exists. Returns whether it was inserted.
    async fn insert_account(&self, account: Account) -> Result<bool, DatabaseError>;

    /// Adds one employee if `policy` admits it against the current count.
    /// Returns the updated account, or `None` when the account is missing or full.
    async fn try_add_employee(&self, email: &str, policy: QuotaPolicy) -> Result<Option<Account>, DatabaseError>;

    /// Subtracts one employee, never going below zero. Returns whether the account exists.
    async fn remove_employee(&self, email: &str) -> Result<bool, DatabaseError>;

    /// Sets plan name and employee limit. Returns whether the account exists.
    async fn apply_plan(&self, email: &str, package_name: &str, employee_limit: i32) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn insert_asset(&self, asset: Asset) -> Result<Asset, DatabaseError>;

    async fn find_asset(&self, id: Uuid) -> Result<Option<Asset>, DatabaseError>;

    async fn list_assets(&self, filter: &AssetFilter) -> Result<Vec<Asset>, DatabaseError>;

    /// Takes one unit if any is left. `None` when the asset is missing or exhausted.
    async fn take_asset_unit(&self, id: Uuid) -> Result<Option<Asset>, DatabaseError>;

    /// Returns one unit. Returns whether the asset exists.
    async fn release_asset_unit(&self, id: Uuid) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn insert_request(&self, request: Request) -> Result<Request, DatabaseError>;

    async fn find_request(&self, id: Uuid) -> Result<Option<Request>, DatabaseError>;

    /// Newest first
    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, DatabaseError>;

    /// Applies the transition only while the request is pending.
    /// `None` when the request is missing or already decided.
    async fn transition_request(&self, id: Uuid, transition: RequestTransition) -> Result<Option<Request>, DatabaseError>;
}

#[async_trait]
pub trait AffiliationStore: Send + Sync {
    /// Inserts unless one exists for the same (employee, hr) pair. Returns whether it was inserted.
    async fn insert_affiliation(&self, affiliation: Affiliation) -> Result<bool, DatabaseError>;

    async fn find_affiliation(&self, employee_email: &str, hr_email: &str) -> Result<Option<Affiliation>, DatabaseError>;

    async fn list_affiliations(&self, hr_email: &str) -> Result<Vec<Affiliation>, DatabaseError>;

    /// Returns the number of records deleted
    async fn delete_affiliation(&self, employee_email: &str, hr_email: &str) -> Result<u64, DatabaseError>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn find_payment(&self, transaction_id: &str) -> Result<Option<PaymentRecord>, DatabaseError>;

    /// Inserts unless the transaction id is already recorded. Returns whether it was inserted.
    async fn insert_payment(&self, record: PaymentRecord) -> Result<bool, DatabaseError>;

    /// Newest first
    async fn list_payments(&self, hr_email: &str) -> Result<Vec<PaymentRecord>, DatabaseError>;
}

#[async_trait]
pub trait PackageStore: Send + Sync {
    async fn list_packages(&self) -> Result<Vec<Package>, DatabaseError>;

    async fn find_package(&self, name: &str) -> Result<Option<Package>, DatabaseError>;

    /// Inserts or replaces by name
    async fn upsert_package(&self, package: Package) -> Result<Package, DatabaseError>;
}

/// Upserts `Package::defaults()`, returning the stored packages
pub async fn seed_packages(store: &dyn PackageStore) -> Result<Vec<Package>, DatabaseError> {
    let mut saved = Vec::new();
    for package in Package::defaults() {
        saved.push(store.upsert_package(package).await?);
    }
    Ok(saved)
}

#[async_trait]
pub trait Store:
    AccountStore + AssetStore + RequestStore + AffiliationStore + PaymentStore + PackageStore
{
    /// Round-trips to the backing store
    async fn ping(&self) -> Result<(), DatabaseError>;
}

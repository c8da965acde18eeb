// Asset request lifecycle: submission, HR decision and affiliation removal.
//
// Approval is a saga over three record kinds (asset, account, request) plus an
// optional affiliation insert. Each step is one conditional store operation;
// when a later step fails, the steps already applied are undone best-effort.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{required, Identity, ServiceError};
use crate::database::models::{Affiliation, Request, RequestFilter, RequestTransition};
use crate::database::Store;
use crate::types::{QuotaPolicy, RequestStatus};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRequest {
    pub asset_id: Option<Uuid>,
    /// Must name the caller when present
    pub requester_email: Option<String>,
    pub hr_email: Option<String>,
    pub note: Option<String>,
}

/// Company membership to record on first approval for an (employee, HR) pair
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliationPayload {
    /// Defaults to the requester
    pub employee_email: Option<String>,
    pub employee_name: Option<String>,
    pub hr_email: String,
    /// Defaults to the HR account's company
    pub company_name: Option<String>,
    pub company_logo: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Decision {
    pub status: RequestStatus,
    /// Defaults to the request's asset; must match it when given
    pub asset_id: Option<Uuid>,
    /// Requester email; must match the request when given
    pub requester: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub affiliation: Option<AffiliationPayload>,
}

impl Decision {
    pub fn approve() -> Self {
        Self { status: RequestStatus::Approved, asset_id: None, requester: None, date: None, affiliation: None }
    }

    pub fn reject() -> Self {
        Self { status: RequestStatus::Rejected, asset_id: None, requester: None, date: None, affiliation: None }
    }

    pub fn with_affiliation(mut self, affiliation: AffiliationPayload) -> Self {
        self.affiliation = Some(affiliation);
        self
    }
}

/// Why an approval was accepted but not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NotApplied {
    ResourceExhausted,
    QuotaExceeded,
}

impl NotApplied {
    pub fn message(&self) -> &'static str {
        match self {
            NotApplied::ResourceExhausted => "Asset is out of stock",
            NotApplied::QuotaExceeded => "Employee limit reached, upgrade your package",
        }
    }
}

/// Which steps of a decision took effect
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOutcome {
    pub success: bool,
    pub message: String,
    pub status: RequestStatus,
    pub not_applied: Option<NotApplied>,
    pub asset_updated: bool,
    pub account_updated: bool,
    pub request_updated: bool,
    pub affiliation_created: bool,
    pub request: Request,
}

impl DecisionOutcome {
    fn not_applied(reason: NotApplied, request: Request) -> Self {
        Self {
            success: false,
            message: reason.message().to_string(),
            status: request.status,
            not_applied: Some(reason),
            asset_updated: false,
            account_updated: false,
            request_updated: false,
            affiliation_created: false,
            request,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalOutcome {
    pub affiliation_deleted: bool,
    pub account_updated: bool,
}

/// Steps of an approval that have been applied and would need undoing
#[derive(Debug, Default)]
struct Applied {
    asset_unit: Option<Uuid>,
    employee_slot: Option<String>,
}

#[derive(Clone)]
pub struct RequestLifecycle {
    store: Arc<dyn Store>,
    quota_policy: QuotaPolicy,
}

impl RequestLifecycle {
    pub fn new(store: Arc<dyn Store>, quota_policy: QuotaPolicy) -> Self {
        Self { store, quota_policy }
    }

    /// Employee asks for one unit of an HR account's asset
    pub async fn submit_request(&self, requester: &Identity, new: NewRequest) -> Result<Request, ServiceError> {
        if requester.is_hr() {
            return Err(ServiceError::authorization("HR accounts cannot request assets"));
        }
        if let Some(email) = new.requester_email.as_deref() {
            if !email.eq_ignore_ascii_case(&requester.email) {
                tracing::warn!("{} attempted to file a request as {}", requester.email, email);
                return Err(ServiceError::authorization("requesterEmail must be the calling account"));
            }
        }
        let asset_id = new.asset_id.ok_or_else(|| ServiceError::validation("assetId is required"))?;
        let hr_email = required(new.hr_email.as_deref(), "hrEmail")?;

        let asset = self
            .store
            .find_asset(asset_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("asset {}", asset_id)))?;
        if asset.hr_email != hr_email {
            return Err(ServiceError::validation(format!("asset {} does not belong to {}", asset_id, hr_email)));
        }

        let request = Request {
            id: Uuid::new_v4(),
            asset_id,
            asset_name: asset.name,
            requester_email: requester.email.clone(),
            requester_name: Some(requester.name.clone()),
            hr_email: hr_email.to_string(),
            company_name: asset.company_name,
            note: new.note.filter(|n| !n.trim().is_empty()),
            status: RequestStatus::Pending,
            request_date: Utc::now(),
            decided_by: None,
            decision_date: None,
        };

        let request = self.store.insert_request(request).await?;
        tracing::info!("Request {} submitted by {} for asset {}", request.id, request.requester_email, asset_id);
        Ok(request)
    }

    /// HR decides a pending request. Exhausted inventory and full quota come
    /// back as `success: false` outcomes with nothing applied.
    pub async fn decide_request(
        &self,
        request_id: Uuid,
        decision: Decision,
        decider: &Identity,
    ) -> Result<DecisionOutcome, ServiceError> {
        let request = self
            .store
            .find_request(request_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("request {}", request_id)))?;

        decider.require_hr_account(&request.hr_email)?;
        if request.status.is_terminal() {
            return Err(ServiceError::Conflict(format!("request {} is already {}", request.id, request.status)));
        }
        if let Some(asset_id) = decision.asset_id {
            if asset_id != request.asset_id {
                return Err(ServiceError::validation("assetId does not match the request"));
            }
        }
        if let Some(requester) = decision.requester.as_deref() {
            if !requester.eq_ignore_ascii_case(&request.requester_email) {
                return Err(ServiceError::validation("userId does not match the requester"));
            }
        }

        let transition = RequestTransition {
            status: decision.status,
            decided_by: decider.email.clone(),
            decision_date: decision.date.unwrap_or_else(Utc::now),
        };

        match decision.status {
            RequestStatus::Pending => Err(ServiceError::validation("status must be approved or rejected")),
            RequestStatus::Rejected => self.reject(request, transition).await,
            RequestStatus::Approved => {
                let affiliation = self.prepare_affiliation(&request, decision.affiliation, decider)?;
                self.approve(request, transition, affiliation).await
            }
        }
    }

    async fn reject(&self, request: Request, transition: RequestTransition) -> Result<DecisionOutcome, ServiceError> {
        let updated = self
            .store
            .transition_request(request.id, transition)
            .await?
            .ok_or_else(|| ServiceError::Conflict(format!("request {} was decided concurrently", request.id)))?;

        tracing::info!("Request {} rejected by {}", updated.id, updated.decided_by.as_deref().unwrap_or(""));
        Ok(DecisionOutcome {
            success: true,
            message: "Request rejected".to_string(),
            status: updated.status,
            not_applied: None,
            asset_updated: false,
            account_updated: false,
            request_updated: true,
            affiliation_created: false,
            request: updated,
        })
    }

    async fn approve(
        &self,
        request: Request,
        transition: RequestTransition,
        affiliation: Option<Affiliation>,
    ) -> Result<DecisionOutcome, ServiceError> {
        let asset = self
            .store
            .find_asset(request.asset_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("asset {}", request.asset_id)))?;

        if !asset.is_available() {
            tracing::info!("Request {} not approved: asset {} exhausted", request.id, asset.id);
            return Ok(DecisionOutcome::not_applied(NotApplied::ResourceExhausted, request));
        }
        if self.store.take_asset_unit(asset.id).await?.is_none() {
            tracing::info!("Request {} not approved: asset {} exhausted concurrently", request.id, asset.id);
            return Ok(DecisionOutcome::not_applied(NotApplied::ResourceExhausted, request));
        }

        let mut applied = Applied { asset_unit: Some(asset.id), employee_slot: None };
        let result = self.finish_approval(request, transition, affiliation, &mut applied).await;

        match result {
            Ok(outcome) if outcome.success => Ok(outcome),
            Ok(outcome) => {
                self.compensate(&applied).await;
                Ok(outcome)
            }
            Err(err) => {
                tracing::error!("Approval failed after partial effects, compensating: {}", err);
                self.compensate(&applied).await;
                Err(err)
            }
        }
    }

    async fn finish_approval(
        &self,
        request: Request,
        transition: RequestTransition,
        affiliation: Option<Affiliation>,
        applied: &mut Applied,
    ) -> Result<DecisionOutcome, ServiceError> {
        let account = self
            .store
            .find_account(&request.hr_email)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("account {}", request.hr_email)))?;

        if !self.quota_policy.admits(account.current_employees, account.employee_limit) {
            tracing::info!(
                "Request {} not approved: {} at {}/{} employees",
                request.id, account.email, account.current_employees, account.employee_limit
            );
            return Ok(DecisionOutcome::not_applied(NotApplied::QuotaExceeded, request));
        }
        if self.store.try_add_employee(&account.email, self.quota_policy).await?.is_none() {
            tracing::info!("Request {} not approved: {} filled concurrently", request.id, account.email);
            return Ok(DecisionOutcome::not_applied(NotApplied::QuotaExceeded, request));
        }
        applied.employee_slot = Some(account.email.clone());

        let updated = self
            .store
            .transition_request(request.id, transition)
            .await?
            .ok_or_else(|| ServiceError::Conflict(format!("request {} was decided concurrently", request.id)))?;

        // The request is approved from here on; an affiliation failure is reported, not undone
        let mut message = "Request approved".to_string();
        let affiliation_created = match affiliation {
            Some(affiliation) => {
                let employee = affiliation.employee_email.clone();
                match self.store.insert_affiliation(affiliation).await {
                    Ok(created) => {
                        if created {
                            tracing::info!("Affiliated {} with {}", employee, updated.hr_email);
                        }
                        created
                    }
                    Err(e) => {
                        tracing::error!("Failed to record affiliation for {}: {}", employee, e);
                        message = "Request approved, but the affiliation could not be recorded".to_string();
                        false
                    }
                }
            }
            None => false,
        };

        tracing::info!("Request {} approved by {}", updated.id, updated.decided_by.as_deref().unwrap_or(""));
        Ok(DecisionOutcome {
            success: true,
            message,
            status: updated.status,
            not_applied: None,
            asset_updated: true,
            account_updated: true,
            request_updated: true,
            affiliation_created,
            request: updated,
        })
    }

    async fn compensate(&self, applied: &Applied) {
        if let Some(hr_email) = &applied.employee_slot {
            match self.store.remove_employee(hr_email).await {
                Ok(_) => tracing::warn!("Released employee slot on {}", hr_email),
                Err(e) => tracing::error!("Failed to release employee slot on {}: {}", hr_email, e),
            }
        }
        if let Some(asset_id) = applied.asset_unit {
            match self.store.release_asset_unit(asset_id).await {
                Ok(_) => tracing::warn!("Returned unit to asset {}", asset_id),
                Err(e) => tracing::error!("Failed to return unit to asset {}: {}", asset_id, e),
            }
        }
    }

    fn prepare_affiliation(
        &self,
        request: &Request,
        payload: Option<AffiliationPayload>,
        decider: &Identity,
    ) -> Result<Option<Affiliation>, ServiceError> {
        let Some(payload) = payload else {
            return Ok(None);
        };
        if payload.hr_email != decider.email {
            return Err(ServiceError::authorization("affiliation must name the deciding HR account"));
        }
        let employee_email = payload.employee_email.unwrap_or_else(|| request.requester_email.clone());
        if employee_email != request.requester_email {
            return Err(ServiceError::validation("affiliation must name the requester"));
        }
        let company_name = payload
            .company_name
            .or_else(|| decider.company_name.clone())
            .or_else(|| request.company_name.clone())
            .ok_or_else(|| ServiceError::validation("companyName is required"))?;

        Ok(Some(Affiliation {
            id: Uuid::new_v4(),
            employee_email,
            employee_name: payload.employee_name.or_else(|| request.requester_name.clone()),
            hr_email: payload.hr_email,
            company_name,
            company_logo: payload.company_logo.or_else(|| decider.company_logo.clone()),
            affiliation_date: Utc::now(),
        }))
    }

    /// Deletes the affiliation and takes one employee off the HR account. The
    /// counter is decremented even when no affiliation matched.
    pub async fn remove_affiliation(
        &self,
        caller: &Identity,
        hr_email: &str,
        employee_email: &str,
    ) -> Result<RemovalOutcome, ServiceError> {
        let hr_email = required(Some(hr_email), "hrEmail")?;
        let employee_email = required(Some(employee_email), "employeeEmail")?;
        caller.require_hr_account(hr_email)?;

        let deleted = self.store.delete_affiliation(employee_email, hr_email).await?;
        if deleted == 0 {
            tracing::warn!("No affiliation between {} and {}; decrementing counter anyway", employee_email, hr_email);
        }
        let account_updated = self.store.remove_employee(hr_email).await?;

        tracing::info!("Removed {} from {}", employee_email, hr_email);
        Ok(RemovalOutcome {
            affiliation_deleted: deleted > 0,
            account_updated,
        })
    }

    /// HR callers see requests addressed to them, employees see their own
    pub async fn list_requests(&self, caller: &Identity, mut filter: RequestFilter) -> Result<Vec<Request>, ServiceError> {
        if caller.is_hr() {
            filter.hr_email = Some(caller.email.clone());
        } else {
            filter.requester_email = Some(caller.email.clone());
        }
        Ok(self.store.list_requests(&filter).await?)
    }

    pub async fn list_employees(&self, caller: &Identity, hr_email: &str) -> Result<Vec<Affiliation>, ServiceError> {
        caller.require_hr_account(hr_email)?;
        Ok(self.store.list_affiliations(hr_email).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use crate::database::models::{Account, Asset, AssetFilter, Package, PaymentRecord};
    use crate::database::{
        AccountStore, AffiliationStore, AssetStore, DatabaseError, MemoryStore, PackageStore, PaymentStore,
        RequestStore,
    };
    use crate::types::Role;
    use crate::services::fixtures::{self, EMPLOYEE, HR};

    #[derive(Clone, Copy)]
    enum Fault {
        TransitionFails,
        TransitionLost,
        AffiliationFails,
    }

    /// `MemoryStore` that misbehaves on one chosen step of an approval
    struct FaultyStore {
        inner: MemoryStore,
        fault: Fault,
    }

    fn broken() -> DatabaseError {
        DatabaseError::QueryError("connection reset".to_string())
    }

    #[async_trait]
    impl AccountStore for FaultyStore {
        async fn find_account(&self, email: &str) -> Result<Option<Account>, DatabaseError> {
            self.inner.find_account(email).await
        }
        async fn insert_account(&self, account: Account) -> Result<bool, DatabaseError> {
            self.inner.insert_account(account).await
        }
        async fn try_add_employee(&self, email: &str, policy: QuotaPolicy) -> Result<Option<Account>, DatabaseError> {
            self.inner.try_add_employee(email, policy).await
        }
        async fn remove_employee(&self, email: &str) -> Result<bool, DatabaseError> {
            self.inner.remove_employee(email).await
        }
        async fn apply_plan(&self, email: &str, package_name: &str, employee_limit: i32) -> Result<bool, DatabaseError> {
            self.inner.apply_plan(email, package_name, employee_limit).await
        }
    }

    #[async_trait]
    impl AssetStore for FaultyStore {
        async fn insert_asset(&self, asset: Asset) -> Result<Asset, DatabaseError> {
            self.inner.insert_asset(asset).await
        }
        async fn find_asset(&self, id: Uuid) -> Result<Option<Asset>, DatabaseError> {
            self.inner.find_asset(id).await
        }
        async fn list_assets(&self, filter: &AssetFilter) -> Result<Vec<Asset>, DatabaseError> {
            self.inner.list_assets(filter).await
        }
        async fn take_asset_unit(&self, id: Uuid) -> Result<Option<Asset>, DatabaseError> {
            self.inner.take_asset_unit(id).await
        }
        async fn release_asset_unit(&self, id: Uuid) -> Result<bool, DatabaseError> {
            self.inner.release_asset_unit(id).await
        }
    }

    #[async_trait]
    impl RequestStore for FaultyStore {
        async fn insert_request(&self, request: Request) -> Result<Request, DatabaseError> {
            self.inner.insert_request(request).await
        }
        async fn find_request(&self, id: Uuid) -> Result<Option<Request>, DatabaseError> {
            self.inner.find_request(id).await
        }
        async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, DatabaseError> {
            self.inner.list_requests(filter).await
        }
        async fn transition_request(&self, id: Uuid, transition: RequestTransition) -> Result<Option<Request>, DatabaseError> {
            match self.fault {
                Fault::TransitionFails => Err(broken()),
                Fault::TransitionLost => Ok(None),
                Fault::AffiliationFails => self.inner.transition_request(id, transition).await,
            }
        }
    }

    #[async_trait]
    impl AffiliationStore for FaultyStore {
        async fn insert_affiliation(&self, affiliation: Affiliation) -> Result<bool, DatabaseError> {
            match self.fault {
                Fault::AffiliationFails => Err(broken()),
                _ => self.inner.insert_affiliation(affiliation).await,
            }
        }
        async fn find_affiliation(&self, employee_email: &str, hr_email: &str) -> Result<Option<Affiliation>, DatabaseError> {
            self.inner.find_affiliation(employee_email, hr_email).await
        }
        async fn list_affiliations(&self, hr_email: &str) -> Result<Vec<Affiliation>, DatabaseError> {
            self.inner.list_affiliations(hr_email).await
        }
        async fn delete_affiliation(&self, employee_email: &str, hr_email: &str) -> Result<u64, DatabaseError> {
            self.inner.delete_affiliation(employee_email, hr_email).await
        }
    }

    #[async_trait]
    impl PaymentStore for FaultyStore {
        async fn find_payment(&self, transaction_id: &str) -> Result<Option<PaymentRecord>, DatabaseError> {
            self.inner.find_payment(transaction_id).await
        }
        async fn insert_payment(&self, record: PaymentRecord) -> Result<bool, DatabaseError> {
            self.inner.insert_payment(record).await
        }
        async fn list_payments(&self, hr_email: &str) -> Result<Vec<PaymentRecord>, DatabaseError> {
            self.inner.list_payments(hr_email).await
        }
    }

    #[async_trait]
    impl PackageStore for FaultyStore {
        async fn list_packages(&self) -> Result<Vec<Package>, DatabaseError> {
            self.inner.list_packages().await
        }
        async fn find_package(&self, name: &str) -> Result<Option<Package>, DatabaseError> {
            self.inner.find_package(name).await
        }
        async fn upsert_package(&self, package: Package) -> Result<Package, DatabaseError> {
            self.inner.upsert_package(package).await
        }
    }

    #[async_trait]
    impl Store for FaultyStore {
        async fn ping(&self) -> Result<(), DatabaseError> {
            self.inner.ping().await
        }
    }

    fn faulty(store: &MemoryStore, fault: Fault) -> RequestLifecycle {
        RequestLifecycle::new(Arc::new(FaultyStore { inner: store.clone(), fault }), QuotaPolicy::Permissive)
    }

    fn lifecycle(store: &MemoryStore, policy: QuotaPolicy) -> RequestLifecycle {
        RequestLifecycle::new(fixtures::shared(store), policy)
    }

    fn request_for(asset_id: Uuid) -> NewRequest {
        NewRequest { asset_id: Some(asset_id), hr_email: Some(HR.to_string()), ..Default::default() }
    }

    fn affiliation() -> AffiliationPayload {
        AffiliationPayload { hr_email: HR.to_string(), ..Default::default() }
    }

    async fn employee_count(store: &MemoryStore) -> i32 {
        store.find_account(HR).await.unwrap().unwrap().current_employees
    }

    async fn quantity(store: &MemoryStore, id: Uuid) -> i32 {
        store.find_asset(id).await.unwrap().unwrap().product_quantity
    }

    #[tokio::test]
    async fn hr_cannot_submit_requests() {
        let store = MemoryStore::new();
        let hr = fixtures::hr(&store, 5, 0).await;
        let asset = fixtures::asset(&store, 3).await;

        let err = lifecycle(&store, QuotaPolicy::Permissive)
            .submit_request(&hr, request_for(asset.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Authorization(_)));
    }

    #[tokio::test]
    async fn submit_requires_asset_and_hr() {
        let store = MemoryStore::new();
        fixtures::hr(&store, 5, 0).await;
        let emp = fixtures::employee(&store, EMPLOYEE).await;
        let asset = fixtures::asset(&store, 3).await;
        let lifecycle = lifecycle(&store, QuotaPolicy::Permissive);

        let missing_asset = NewRequest { asset_id: None, hr_email: Some(HR.to_string()), ..Default::default() };
        assert!(matches!(lifecycle.submit_request(&emp, missing_asset).await, Err(ServiceError::Validation(_))));

        let missing_hr = NewRequest { asset_id: Some(asset.id), hr_email: Some("  ".to_string()), ..Default::default() };
        assert!(matches!(lifecycle.submit_request(&emp, missing_hr).await, Err(ServiceError::Validation(_))));

        let unknown = request_for(Uuid::new_v4());
        assert!(matches!(lifecycle.submit_request(&emp, unknown).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn submitted_request_is_pending_without_side_effects() {
        let store = MemoryStore::new();
        fixtures::hr(&store, 5, 0).await;
        let emp = fixtures::employee(&store, EMPLOYEE).await;
        let asset = fixtures::asset(&store, 3).await;

        let request = lifecycle(&store, QuotaPolicy::Permissive)
            .submit_request(&emp, request_for(asset.id))
            .await
            .unwrap();

        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.asset_name, "Laptop");
        assert_eq!(quantity(&store, asset.id).await, 3);
        assert_eq!(employee_count(&store).await, 0);
    }

    #[tokio::test]
    async fn approval_takes_unit_and_counts_employee() {
        let store = MemoryStore::new();
        let hr = fixtures::hr(&store, 5, 0).await;
        let emp = fixtures::employee(&store, EMPLOYEE).await;
        let asset = fixtures::asset(&store, 3).await;
        let lifecycle = lifecycle(&store, QuotaPolicy::Permissive);

        let request = lifecycle.submit_request(&emp, request_for(asset.id)).await.unwrap();
        let outcome = lifecycle
            .decide_request(request.id, Decision::approve().with_affiliation(affiliation()), &hr)
            .await
            .unwrap();

        assert!(outcome.success);
        assert!(outcome.asset_updated && outcome.account_updated && outcome.request_updated);
        assert!(outcome.affiliation_created);
        assert_eq!(outcome.request.status, RequestStatus::Approved);
        assert_eq!(outcome.request.decided_by.as_deref(), Some(HR));
        assert!(outcome.request.decision_date.is_some());
        assert_eq!(quantity(&store, asset.id).await, 2);
        assert_eq!(employee_count(&store).await, 1);

        let affiliation = store.find_affiliation(EMPLOYEE, HR).await.unwrap().unwrap();
        assert_eq!(affiliation.company_name, "Acme");
    }

    #[tokio::test]
    async fn last_unit_goes_to_first_approval_only() {
        let store = MemoryStore::new();
        let hr = fixtures::hr(&store, 10, 0).await;
        let emp = fixtures::employee(&store, EMPLOYEE).await;
        let asset = fixtures::asset(&store, 1).await;
        let lifecycle = lifecycle(&store, QuotaPolicy::Permissive);

        let first = lifecycle.submit_request(&emp, request_for(asset.id)).await.unwrap();
        let second = lifecycle.submit_request(&emp, request_for(asset.id)).await.unwrap();

        assert!(lifecycle.decide_request(first.id, Decision::approve(), &hr).await.unwrap().success);
        assert_eq!(quantity(&store, asset.id).await, 0);

        let outcome = lifecycle.decide_request(second.id, Decision::approve(), &hr).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.not_applied, Some(NotApplied::ResourceExhausted));
        assert!(!outcome.asset_updated && !outcome.account_updated && !outcome.request_updated);
        assert_eq!(quantity(&store, asset.id).await, 0);
        assert_eq!(employee_count(&store).await, 1);

        let stored = store.find_request(second.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn strict_quota_rejects_at_limit_and_returns_unit() {
        let store = MemoryStore::new();
        let hr = fixtures::hr(&store, 2, 2).await;
        let emp = fixtures::employee(&store, EMPLOYEE).await;
        let asset = fixtures::asset(&store, 5).await;
        let lifecycle = lifecycle(&store, QuotaPolicy::Strict);

        let request = lifecycle.submit_request(&emp, request_for(asset.id)).await.unwrap();
        let outcome = lifecycle.decide_request(request.id, Decision::approve(), &hr).await.unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.not_applied, Some(NotApplied::QuotaExceeded));
        assert_eq!(employee_count(&store).await, 2);
        assert_eq!(quantity(&store, asset.id).await, 5);
    }

    #[tokio::test]
    async fn permissive_quota_allows_one_past_limit() {
        let store = MemoryStore::new();
        let hr = fixtures::hr(&store, 2, 2).await;
        let emp = fixtures::employee(&store, EMPLOYEE).await;
        let asset = fixtures::asset(&store, 5).await;
        let lifecycle = lifecycle(&store, QuotaPolicy::Permissive);

        let third = lifecycle.submit_request(&emp, request_for(asset.id)).await.unwrap();
        assert!(lifecycle.decide_request(third.id, Decision::approve(), &hr).await.unwrap().success);
        assert_eq!(employee_count(&store).await, 3);

        let fourth = lifecycle.submit_request(&emp, request_for(asset.id)).await.unwrap();
        let outcome = lifecycle.decide_request(fourth.id, Decision::approve(), &hr).await.unwrap();
        assert_eq!(outcome.not_applied, Some(NotApplied::QuotaExceeded));
        assert_eq!(employee_count(&store).await, 3);
        assert_eq!(quantity(&store, asset.id).await, 4);
    }

    #[tokio::test]
    async fn rejection_touches_only_the_request() {
        let store = MemoryStore::new();
        let hr = fixtures::hr(&store, 5, 1).await;
        let emp = fixtures::employee(&store, EMPLOYEE).await;
        let asset = fixtures::asset(&store, 2).await;
        let lifecycle = lifecycle(&store, QuotaPolicy::Permissive);

        let request = lifecycle.submit_request(&emp, request_for(asset.id)).await.unwrap();
        let outcome = lifecycle.decide_request(request.id, Decision::reject(), &hr).await.unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.request.status, RequestStatus::Rejected);
        assert_eq!(quantity(&store, asset.id).await, 2);
        assert_eq!(employee_count(&store).await, 1);
        assert_eq!(store.affiliation_count().await, 0);
    }

    #[tokio::test]
    async fn decided_request_is_write_once() {
        let store = MemoryStore::new();
        let hr = fixtures::hr(&store, 5, 0).await;
        let emp = fixtures::employee(&store, EMPLOYEE).await;
        let asset = fixtures::asset(&store, 2).await;
        let lifecycle = lifecycle(&store, QuotaPolicy::Permissive);

        let request = lifecycle.submit_request(&emp, request_for(asset.id)).await.unwrap();
        lifecycle.decide_request(request.id, Decision::reject(), &hr).await.unwrap();

        let err = lifecycle.decide_request(request.id, Decision::approve(), &hr).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(quantity(&store, asset.id).await, 2);
    }

    #[tokio::test]
    async fn only_the_addressed_hr_may_decide() {
        let store = MemoryStore::new();
        fixtures::hr(&store, 5, 0).await;
        let emp = fixtures::employee(&store, EMPLOYEE).await;
        let asset = fixtures::asset(&store, 2).await;
        let lifecycle = lifecycle(&store, QuotaPolicy::Permissive);
        let request = lifecycle.submit_request(&emp, request_for(asset.id)).await.unwrap();

        let mut other = Account::new("other@corp.test", "Olive", Role::Hr);
        other.employee_limit = 5;
        store.insert_account(other.clone()).await.unwrap();
        let other = Identity::from(&other);

        for decider in [&emp, &other] {
            let err = lifecycle.decide_request(request.id, Decision::approve(), decider).await.unwrap_err();
            assert!(matches!(err, ServiceError::Authorization(_)));
        }
        assert_eq!(quantity(&store, asset.id).await, 2);
    }

    #[tokio::test]
    async fn affiliation_is_created_once_per_pair() {
        let store = MemoryStore::new();
        let hr = fixtures::hr(&store, 10, 0).await;
        let emp = fixtures::employee(&store, EMPLOYEE).await;
        let asset = fixtures::asset(&store, 5).await;
        let lifecycle = lifecycle(&store, QuotaPolicy::Permissive);

        let first = lifecycle.submit_request(&emp, request_for(asset.id)).await.unwrap();
        let second = lifecycle.submit_request(&emp, request_for(asset.id)).await.unwrap();

        let a = lifecycle
            .decide_request(first.id, Decision::approve().with_affiliation(affiliation()), &hr)
            .await
            .unwrap();
        let b = lifecycle
            .decide_request(second.id, Decision::approve().with_affiliation(affiliation()), &hr)
            .await
            .unwrap();

        assert!(a.affiliation_created);
        assert!(b.success && !b.affiliation_created);
        assert_eq!(store.affiliation_count().await, 1);
    }

    #[tokio::test]
    async fn affiliation_for_another_account_is_refused_before_mutation() {
        let store = MemoryStore::new();
        let hr = fixtures::hr(&store, 10, 0).await;
        let emp = fixtures::employee(&store, EMPLOYEE).await;
        let asset = fixtures::asset(&store, 5).await;
        let lifecycle = lifecycle(&store, QuotaPolicy::Permissive);
        let request = lifecycle.submit_request(&emp, request_for(asset.id)).await.unwrap();

        let foreign = AffiliationPayload { hr_email: "other@corp.test".to_string(), ..Default::default() };
        let err = lifecycle
            .decide_request(request.id, Decision::approve().with_affiliation(foreign), &hr)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Authorization(_)));
        assert_eq!(quantity(&store, asset.id).await, 5);
        assert_eq!(employee_count(&store).await, 0);
    }

    #[tokio::test]
    async fn removal_decrements_even_without_affiliation() {
        let store = MemoryStore::new();
        let hr = fixtures::hr(&store, 10, 2).await;
        let lifecycle = lifecycle(&store, QuotaPolicy::Permissive);

        let outcome = lifecycle.remove_affiliation(&hr, HR, "ghost@acme.test").await.unwrap();
        assert!(!outcome.affiliation_deleted);
        assert!(outcome.account_updated);
        assert_eq!(employee_count(&store).await, 1);
    }

    #[tokio::test]
    async fn removal_deletes_affiliation_and_frees_slot() {
        let store = MemoryStore::new();
        let hr = fixtures::hr(&store, 10, 0).await;
        let emp = fixtures::employee(&store, EMPLOYEE).await;
        let asset = fixtures::asset(&store, 5).await;
        let lifecycle = lifecycle(&store, QuotaPolicy::Permissive);

        let request = lifecycle.submit_request(&emp, request_for(asset.id)).await.unwrap();
        lifecycle
            .decide_request(request.id, Decision::approve().with_affiliation(affiliation()), &hr)
            .await
            .unwrap();
        assert_eq!(employee_count(&store).await, 1);

        let outcome = lifecycle.remove_affiliation(&hr, HR, EMPLOYEE).await.unwrap();
        assert!(outcome.affiliation_deleted);
        assert_eq!(employee_count(&store).await, 0);
        assert!(store.find_affiliation(EMPLOYEE, HR).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn listing_is_scoped_to_caller() {
        let store = MemoryStore::new();
        let hr = fixtures::hr(&store, 10, 0).await;
        let emp = fixtures::employee(&store, EMPLOYEE).await;
        let other = fixtures::employee(&store, "other@acme.test").await;
        let asset = fixtures::asset(&store, 5).await;
        let lifecycle = lifecycle(&store, QuotaPolicy::Permissive);

        lifecycle.submit_request(&emp, request_for(asset.id)).await.unwrap();
        lifecycle.submit_request(&other, request_for(asset.id)).await.unwrap();

        assert_eq!(lifecycle.list_requests(&hr, RequestFilter::default()).await.unwrap().len(), 2);
        let own = lifecycle.list_requests(&emp, RequestFilter::default()).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].requester_email, EMPLOYEE);
    }

    #[tokio::test]
    async fn failed_status_write_returns_unit_and_slot() {
        let store = MemoryStore::new();
        let hr = fixtures::hr(&store, 5, 1).await;
        let emp = fixtures::employee(&store, EMPLOYEE).await;
        let asset = fixtures::asset(&store, 3).await;
        let request = lifecycle(&store, QuotaPolicy::Permissive)
            .submit_request(&emp, request_for(asset.id))
            .await
            .unwrap();

        let err = faulty(&store, Fault::TransitionFails)
            .decide_request(request.id, Decision::approve(), &hr)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Persistence(_)));
        assert_eq!(quantity(&store, asset.id).await, 3);
        assert_eq!(employee_count(&store).await, 1);
        let stored = store.find_request(request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn lost_status_race_is_conflict_with_counts_restored() {
        let store = MemoryStore::new();
        let hr = fixtures::hr(&store, 5, 0).await;
        let emp = fixtures::employee(&store, EMPLOYEE).await;
        let asset = fixtures::asset(&store, 2).await;
        let request = lifecycle(&store, QuotaPolicy::Permissive)
            .submit_request(&emp, request_for(asset.id))
            .await
            .unwrap();

        let err = faulty(&store, Fault::TransitionLost)
            .decide_request(request.id, Decision::approve().with_affiliation(affiliation()), &hr)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(quantity(&store, asset.id).await, 2);
        assert_eq!(employee_count(&store).await, 0);
        assert_eq!(store.affiliation_count().await, 0);
    }

    #[tokio::test]
    async fn affiliation_failure_keeps_the_approval() {
        let store = MemoryStore::new();
        let hr = fixtures::hr(&store, 5, 0).await;
        let emp = fixtures::employee(&store, EMPLOYEE).await;
        let asset = fixtures::asset(&store, 2).await;
        let request = lifecycle(&store, QuotaPolicy::Permissive)
            .submit_request(&emp, request_for(asset.id))
            .await
            .unwrap();

        let outcome = faulty(&store, Fault::AffiliationFails)
            .decide_request(request.id, Decision::approve().with_affiliation(affiliation()), &hr)
            .await
            .unwrap();

        assert!(outcome.success);
        assert!(!outcome.affiliation_created);
        assert_eq!(outcome.message, "Request approved, but the affiliation could not be recorded");
        assert_eq!(outcome.request.status, RequestStatus::Approved);
        assert_eq!(quantity(&store, asset.id).await, 1);
        assert_eq!(employee_count(&store).await, 1);
    }

    #[tokio::test]
    async fn decision_date_and_requester_are_honoured() {
        let store = MemoryStore::new();
        let hr = fixtures::hr(&store, 5, 0).await;
        let emp = fixtures::employee(&store, EMPLOYEE).await;
        let asset = fixtures::asset(&store, 2).await;
        let lifecycle = lifecycle(&store, QuotaPolicy::Permissive);
        let request = lifecycle.submit_request(&emp, request_for(asset.id)).await.unwrap();

        let mut wrong = Decision::reject();
        wrong.requester = Some("someone@acme.test".to_string());
        let err = lifecycle.decide_request(request.id, wrong, &hr).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let date = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        let mut decision = Decision::reject();
        decision.requester = Some(EMPLOYEE.to_string());
        decision.date = Some(date);
        let outcome = lifecycle.decide_request(request.id, decision, &hr).await.unwrap();
        assert_eq!(outcome.request.decision_date, Some(date));
    }

    #[tokio::test]
    async fn requester_email_must_be_the_caller() {
        let store = MemoryStore::new();
        fixtures::hr(&store, 5, 0).await;
        let emp = fixtures::employee(&store, EMPLOYEE).await;
        let asset = fixtures::asset(&store, 2).await;
        let lifecycle = lifecycle(&store, QuotaPolicy::Permissive);

        let mut spoofed = request_for(asset.id);
        spoofed.requester_email = Some("other@acme.test".to_string());
        let err = lifecycle.submit_request(&emp, spoofed).await.unwrap_err();
        assert!(matches!(err, ServiceError::Authorization(_)));

        let mut own = request_for(asset.id);
        own.requester_email = Some(EMPLOYEE.to_string());
        assert_eq!(lifecycle.submit_request(&emp, own).await.unwrap().requester_email, EMPLOYEE);
    }
}

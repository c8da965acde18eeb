// Postgres adapter for the storage port.
//
// Conditional mutations are expressed as single UPDATE/INSERT statements so
// concurrent callers cannot both pass a guard.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{
    Account, Affiliation, Asset, AssetFilter, Package, PaymentRecord, Request, RequestFilter,
    RequestTransition,
};
use crate::database::store::{
    AccountStore, AffiliationStore, AssetStore, PackageStore, PaymentStore, RequestStore, Store,
};
use crate::types::QuotaPolicy;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escape LIKE wildcards in user-supplied search text
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl AccountStore for PgStore {
    async fn find_account(&self, email: &str) -> Result<Option<Account>, DatabaseError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn insert_account(&self, account: Account) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts
                (id, email, name, role, company_name, company_logo, package_name,
                 employee_limit, current_employees, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(account.id)
        .bind(&account.email)
        .bind(&account.name)
        .bind(account.role.as_str())
        .bind(&account.company_name)
        .bind(&account.company_logo)
        .bind(&account.package_name)
        .bind(account.employee_limit)
        .bind(account.current_employees)
        .bind(account.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn try_add_employee(&self, email: &str, policy: QuotaPolicy) -> Result<Option<Account>, DatabaseError> {
        let guard = match policy {
            QuotaPolicy::Permissive => "current_employees <= employee_limit",
            QuotaPolicy::Strict => "current_employees < employee_limit",
        };
        let sql = format!(
            "UPDATE accounts SET current_employees = current_employees + 1 \
             WHERE email = $1 AND {} RETURNING *",
            guard
        );
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn remove_employee(&self, email: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE accounts SET current_employees = GREATEST(current_employees - 1, 0) WHERE email = $1",
        )
        .bind(email)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn apply_plan(&self, email: &str, package_name: &str, employee_limit: i32) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE accounts SET package_name = $2, employee_limit = $3 WHERE email = $1",
        )
        .bind(email)
        .bind(package_name)
        .bind(employee_limit)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl AssetStore for PgStore {
    async fn insert_asset(&self, asset: Asset) -> Result<Asset, DatabaseError> {
        let inserted = sqlx::query_as::<_, Asset>(
            r#"
            INSERT INTO assets (id, hr_email, company_name, name, asset_type, product_quantity, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(asset.id)
        .bind(&asset.hr_email)
        .bind(&asset.company_name)
        .bind(&asset.name)
        .bind(asset.asset_type.as_str())
        .bind(asset.product_quantity)
        .bind(asset.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(inserted)
    }

    async fn find_asset(&self, id: Uuid) -> Result<Option<Asset>, DatabaseError> {
        let asset = sqlx::query_as::<_, Asset>("SELECT * FROM assets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(asset)
    }

    async fn list_assets(&self, filter: &AssetFilter) -> Result<Vec<Asset>, DatabaseError> {
        let assets = sqlx::query_as::<_, Asset>(
            r#"
            SELECT * FROM assets
            WHERE ($1::TEXT IS NULL OR hr_email = $1)
              AND ($2::TEXT IS NULL OR name ILIKE $2)
              AND ($3::BOOLEAN IS NOT TRUE OR product_quantity > 0)
              AND ($4::TEXT IS NULL OR asset_type = $4)
            ORDER BY created_at DESC
            "#,
        )
        .bind(&filter.hr_email)
        .bind(filter.search.as_deref().map(like_pattern))
        .bind(filter.available)
        .bind(filter.asset_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await?;
        Ok(assets)
    }

    async fn take_asset_unit(&self, id: Uuid) -> Result<Option<Asset>, DatabaseError> {
        let asset = sqlx::query_as::<_, Asset>(
            "UPDATE assets SET product_quantity = product_quantity - 1 \
             WHERE id = $1 AND product_quantity > 0 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(asset)
    }

    async fn release_asset_unit(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE assets SET product_quantity = product_quantity + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl RequestStore for PgStore {
    async fn insert_request(&self, request: Request) -> Result<Request, DatabaseError> {
        let inserted = sqlx::query_as::<_, Request>(
            r#"
            INSERT INTO requests
                (id, asset_id, asset_name, requester_email, requester_name, hr_email,
                 company_name, note, status, request_date, decided_by, decision_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(request.id)
        .bind(request.asset_id)
        .bind(&request.asset_name)
        .bind(&request.requester_email)
        .bind(&request.requester_name)
        .bind(&request.hr_email)
        .bind(&request.company_name)
        .bind(&request.note)
        .bind(request.status.as_str())
        .bind(request.request_date)
        .bind(&request.decided_by)
        .bind(request.decision_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(inserted)
    }

    async fn find_request(&self, id: Uuid) -> Result<Option<Request>, DatabaseError> {
        let request = sqlx::query_as::<_, Request>("SELECT * FROM requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(request)
    }

    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, DatabaseError> {
        let requests = sqlx::query_as::<_, Request>(
            r#"
            SELECT * FROM requests
            WHERE ($1::TEXT IS NULL OR hr_email = $1)
              AND ($2::TEXT IS NULL OR requester_email = $2)
              AND ($3::TEXT IS NULL OR status = $3)
              AND ($4::TEXT IS NULL OR asset_name ILIKE $4)
            ORDER BY request_date DESC
            "#,
        )
        .bind(&filter.hr_email)
        .bind(&filter.requester_email)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.search.as_deref().map(like_pattern))
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    async fn transition_request(&self, id: Uuid, transition: RequestTransition) -> Result<Option<Request>, DatabaseError> {
        let request = sqlx::query_as::<_, Request>(
            r#"
            UPDATE requests SET status = $2, decided_by = $3, decision_date = $4
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(transition.status.as_str())
        .bind(&transition.decided_by)
        .bind(transition.decision_date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(request)
    }
}

#[async_trait]
impl AffiliationStore for PgStore {
    async fn insert_affiliation(&self, affiliation: Affiliation) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO affiliations
                (id, employee_email, employee_name, hr_email, company_name, company_logo, affiliation_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (employee_email, hr_email) DO NOTHING
            "#,
        )
        .bind(affiliation.id)
        .bind(&affiliation.employee_email)
        .bind(&affiliation.employee_name)
        .bind(&affiliation.hr_email)
        .bind(&affiliation.company_name)
        .bind(&affiliation.company_logo)
        .bind(affiliation.affiliation_date)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_affiliation(&self, employee_email: &str, hr_email: &str) -> Result<Option<Affiliation>, DatabaseError> {
        let affiliation = sqlx::query_as::<_, Affiliation>(
            "SELECT * FROM affiliations WHERE employee_email = $1 AND hr_email = $2",
        )
        .bind(employee_email)
        .bind(hr_email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(affiliation)
    }

    async fn list_affiliations(&self, hr_email: &str) -> Result<Vec<Affiliation>, DatabaseError> {
        let affiliations = sqlx::query_as::<_, Affiliation>(
            "SELECT * FROM affiliations WHERE hr_email = $1 ORDER BY affiliation_date ASC",
        )
        .bind(hr_email)
        .fetch_all(&self.pool)
        .await?;
        Ok(affiliations)
    }

    async fn delete_affiliation(&self, employee_email: &str, hr_email: &str) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM affiliations WHERE employee_email = $1 AND hr_email = $2")
            .bind(employee_email)
            .bind(hr_email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl PaymentStore for PgStore {
    async fn find_payment(&self, transaction_id: &str) -> Result<Option<PaymentRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, PaymentRecord>("SELECT * FROM payments WHERE transaction_id = $1")
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn insert_payment(&self, record: PaymentRecord) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments
                (id, transaction_id, hr_email, package_name, employee_limit, amount,
                 currency, status, tracking_id, paid_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (transaction_id) DO NOTHING
            "#,
        )
        .bind(record.id)
        .bind(&record.transaction_id)
        .bind(&record.hr_email)
        .bind(&record.package_name)
        .bind(record.employee_limit)
        .bind(record.amount)
        .bind(&record.currency)
        .bind(&record.status)
        .bind(&record.tracking_id)
        .bind(record.paid_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_payments(&self, hr_email: &str) -> Result<Vec<PaymentRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, PaymentRecord>(
            "SELECT * FROM payments WHERE hr_email = $1 ORDER BY paid_at DESC",
        )
        .bind(hr_email)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}

#[async_trait]
impl PackageStore for PgStore {
    async fn list_packages(&self) -> Result<Vec<Package>, DatabaseError> {
        let packages = sqlx::query_as::<_, Package>("SELECT * FROM packages ORDER BY employee_limit ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(packages)
    }

    async fn find_package(&self, name: &str) -> Result<Option<Package>, DatabaseError> {
        let package = sqlx::query_as::<_, Package>("SELECT * FROM packages WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(package)
    }

    async fn upsert_package(&self, package: Package) -> Result<Package, DatabaseError> {
        let stored = sqlx::query_as::<_, Package>(
            r#"
            INSERT INTO packages (id, name, employee_limit, price, features)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name) DO UPDATE
                SET employee_limit = EXCLUDED.employee_limit,
                    price = EXCLUDED.price,
                    features = EXCLUDED.features
            RETURNING *
            "#,
        )
        .bind(package.id)
        .bind(&package.name)
        .bind(package.employee_limit)
        .bind(package.price)
        .bind(&package.features)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}

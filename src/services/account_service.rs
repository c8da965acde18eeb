use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{required, ServiceError};
use crate::database::models::{Account, Package};
use crate::database::Store;
use crate::types::Role;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub email: Option<String>,
    pub name: Option<String>,
    /// Defaults to employee
    pub role: Option<Role>,
    pub company_name: Option<String>,
    pub company_logo: Option<String>,
    /// HR sign-up only: initial plan
    pub package_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub inserted: bool,
    pub account: Account,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates the account unless the email is already registered, in which
    /// case the stored account is returned unchanged.
    pub async fn register(&self, new: NewAccount) -> Result<Registration, ServiceError> {
        let email = required(new.email.as_deref(), "email")?.to_lowercase();
        if !email.contains('@') {
            return Err(ServiceError::validation(format!("invalid email '{}'", email)));
        }
        let name = new.name.as_deref().map(str::trim).filter(|n| !n.is_empty()).unwrap_or(&email).to_string();
        let role = new.role.unwrap_or(Role::Employee);

        let mut account = Account::new(email.clone(), name, role);
        if role == Role::Hr {
            account.company_name = Some(required(new.company_name.as_deref(), "companyName")?.to_string());
            account.company_logo = new.company_logo;
            if let Some(package_name) = new.package_name.as_deref() {
                let package = self.require_package(package_name).await?;
                account.package_name = Some(package.name);
                account.employee_limit = package.employee_limit;
            }
        }

        if !self.store.insert_account(account).await? {
            tracing::debug!("Account {} already registered", email);
            let existing = self.require_account(&email).await?;
            return Ok(Registration { inserted: false, account: existing });
        }

        let account = self.require_account(&email).await?;
        tracing::info!("Registered {} account {}", account.role.as_str(), account.email);
        Ok(Registration { inserted: true, account })
    }

    pub async fn role_of(&self, email: &str) -> Result<Role, ServiceError> {
        Ok(self.require_account(email).await?.role)
    }

    pub async fn list_packages(&self) -> Result<Vec<Package>, ServiceError> {
        Ok(self.store.list_packages().await?)
    }

    async fn require_account(&self, email: &str) -> Result<Account, ServiceError> {
        self.store
            .find_account(email)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("account {}", email)))
    }

    async fn require_package(&self, name: &str) -> Result<Package, ServiceError> {
        self.store
            .find_package(name)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("package {}", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemoryStore, PackageStore};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn service(store: &MemoryStore) -> AccountService {
        AccountService::new(Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn defaults_to_employee_without_quota() {
        let store = MemoryStore::new();
        let reg = service(&store)
            .register(NewAccount { email: Some("Sam@Acme.test".to_string()), ..Default::default() })
            .await
            .unwrap();

        assert!(reg.inserted);
        assert_eq!(reg.account.email, "sam@acme.test");
        assert_eq!(reg.account.role, Role::Employee);
        assert_eq!(reg.account.employee_limit, 0);
        assert_eq!(reg.account.current_employees, 0);
    }

    #[tokio::test]
    async fn second_registration_is_not_inserted() {
        let store = MemoryStore::new();
        let service = service(&store);
        let new = NewAccount {
            email: Some("sam@acme.test".to_string()),
            name: Some("Sam".to_string()),
            ..Default::default()
        };

        assert!(service.register(new.clone()).await.unwrap().inserted);
        let again = service
            .register(NewAccount { name: Some("Other".to_string()), ..new })
            .await
            .unwrap();
        assert!(!again.inserted);
        assert_eq!(again.account.name, "Sam");
    }

    #[tokio::test]
    async fn hr_signup_takes_package_limit() {
        let store = MemoryStore::new();
        store
            .upsert_package(Package {
                id: Uuid::new_v4(),
                name: "Basic".to_string(),
                employee_limit: 5,
                price: Decimal::new(500, 2),
                features: vec![],
            })
            .await
            .unwrap();

        let reg = service(&store)
            .register(NewAccount {
                email: Some("hr@acme.test".to_string()),
                role: Some(Role::Hr),
                company_name: Some("Acme".to_string()),
                package_name: Some("Basic".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(reg.account.employee_limit, 5);
        assert_eq!(reg.account.package_name.as_deref(), Some("Basic"));
        assert_eq!(service(&store).role_of("hr@acme.test").await.unwrap(), Role::Hr);
    }

    #[tokio::test]
    async fn hr_signup_requires_company() {
        let store = MemoryStore::new();
        let err = service(&store)
            .register(NewAccount {
                email: Some("hr@acme.test".to_string()),
                role: Some(Role::Hr),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_role_lookup_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(service(&store).role_of("nobody@acme.test").await, Err(ServiceError::NotFound(_))));
    }
}

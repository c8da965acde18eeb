use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use asset_management_api::config::{self, AppConfig};
use asset_management_api::database::models::Package;
use asset_management_api::database::{MemoryStore, PackageStore};
use asset_management_api::payment::MemoryGateway;
use asset_management_api::types::QuotaPolicy;
use asset_management_api::{app, AppState};

pub const HR: &str = "hr@acme.test";
pub const EMPLOYEE: &str = "emp@acme.test";

/// In-process server on its own port with a fresh store and gateway
pub struct TestServer {
    pub base_url: String,
    pub store: MemoryStore,
    pub gateway: MemoryGateway,
    pub client: Client,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(QuotaPolicy::Permissive).await
    }

    pub async fn spawn_with(policy: QuotaPolicy) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut config: AppConfig = config::config().clone();
        config.workflow.quota_policy = policy;

        let store = MemoryStore::new();
        let gateway = MemoryGateway::new();
        let state = AppState::new(Arc::new(store.clone()), Arc::new(gateway.clone()), &config);
        let router = app(state, &config);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let server = Self { base_url, store, gateway, client: Client::new() };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline { break; }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn token(&self, email: &str) -> Result<String> {
        let body: Value = self
            .client
            .post(self.url("/jwt"))
            .json(&json!({ "email": email }))
            .send()
            .await?
            .json()
            .await?;
        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("token missing from /jwt response")
    }

    /// Registers an HR account with the given limit (via a package) and returns its token
    pub async fn hr(&self, limit: i32) -> Result<String> {
        self.package("Test", limit, 1000).await?;
        let res = self
            .client
            .post(self.url("/users"))
            .json(&json!({
                "email": HR,
                "name": "Harriet",
                "role": "hr",
                "companyName": "Acme",
                "packageName": "Test"
            }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "hr registration failed: {}", res.status());
        self.token(HR).await
    }

    pub async fn employee(&self, email: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/users"))
            .json(&json!({ "email": email, "name": "Eddie" }))
            .send()
            .await?;
        anyhow::ensure!(res.status().is_success(), "employee registration failed: {}", res.status());
        self.token(email).await
    }

    pub async fn package(&self, name: &str, limit: i32, cents: i64) -> Result<()> {
        self.store
            .upsert_package(Package {
                id: Uuid::new_v4(),
                name: name.to_string(),
                employee_limit: limit,
                price: rust_decimal::Decimal::new(cents, 2),
                features: vec![],
            })
            .await?;
        Ok(())
    }

    /// Creates an asset as the HR account and returns its id
    pub async fn asset(&self, hr_token: &str, quantity: i32) -> Result<String> {
        let body: Value = self
            .client
            .post(self.url("/assets"))
            .bearer_auth(hr_token)
            .json(&json!({ "name": "Laptop", "assetType": "returnable", "productQuantity": quantity }))
            .send()
            .await?
            .json()
            .await?;
        body["data"]["id"].as_str().map(str::to_string).context("asset id missing")
    }

    /// Submits a request as the employee and returns its id
    pub async fn request(&self, employee_token: &str, asset_id: &str) -> Result<String> {
        let body: Value = self
            .client
            .post(self.url("/requests"))
            .bearer_auth(employee_token)
            .json(&json!({ "assetId": asset_id, "hrEmail": HR, "note": "for onboarding" }))
            .send()
            .await?
            .json()
            .await?;
        body["data"]["id"].as_str().map(str::to_string).context("request id missing")
    }

    pub async fn decide(&self, hr_token: &str, request_id: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .patch(self.url(&format!("/requests/{}", request_id)))
            .bearer_auth(hr_token)
            .json(&body)
            .send()
            .await?;
        let status = res.status();
        Ok((status, res.json().await?))
    }
}

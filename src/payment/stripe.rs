// Stripe Checkout over the REST API (form-encoded requests, JSON responses).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use super::{CheckoutRequest, CheckoutSession, PaymentError, PaymentGateway};
use crate::config::PaymentConfig;

pub struct StripeGateway {
    client: Client,
    api_base: Url,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct StripeSession {
    id: String,
    url: Option<String>,
    payment_intent: Option<String>,
    payment_status: String,
    amount_total: Option<i64>,
    currency: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl From<StripeSession> for CheckoutSession {
    fn from(s: StripeSession) -> Self {
        Self {
            id: s.id,
            url: s.url,
            payment_intent: s.payment_intent,
            payment_status: s.payment_status,
            amount_total: s.amount_total,
            currency: s.currency,
            metadata: s.metadata,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

impl StripeGateway {
    pub fn new(config: &PaymentConfig, secret_key: impl Into<String>) -> Result<Self, PaymentError> {
        let api_base = Url::parse(&config.stripe_api_base)
            .map_err(|e| PaymentError::InvalidResponse(format!("invalid STRIPE_API_BASE: {}", e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base,
            secret_key: secret_key.into(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, PaymentError> {
        self.api_base
            .join(path)
            .map_err(|e| PaymentError::InvalidResponse(format!("bad endpoint {}: {}", path, e)))
    }

    /// Success URL with Stripe's session id placeholder appended
    fn success_url(base: &str) -> String {
        let separator = if base.contains('?') { '&' } else { '?' };
        format!("{}{}session_id={{CHECKOUT_SESSION_ID}}", base, separator)
    }

    /// Decimal major units to integer minor units
    fn minor_units(amount: Decimal) -> Result<i64, PaymentError> {
        (amount * Decimal::from(100))
            .round()
            .to_i64()
            .ok_or_else(|| PaymentError::InvalidResponse(format!("amount {} out of range", amount)))
    }

    fn checkout_form(request: &CheckoutRequest) -> Result<Vec<(String, String)>, PaymentError> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), Self::success_url(&request.success_url)),
            ("cancel_url".to_string(), request.cancel_url.clone()),
            ("customer_email".to_string(), request.hr_email.clone()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("line_items[0][price_data][currency]".to_string(), request.currency.clone()),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                Self::minor_units(request.amount)?.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                format!("{} plan", request.package_name),
            ),
        ];
        let mut metadata: Vec<_> = request.metadata().into_iter().collect();
        metadata.sort();
        form.extend(metadata.into_iter().map(|(k, v)| (format!("metadata[{}]", k), v)));
        Ok(form)
    }

    async fn parse_session(response: reqwest::Response, session_id: Option<&str>) -> Result<CheckoutSession, PaymentError> {
        let status = response.status();
        if status.is_success() {
            let session: StripeSession = response.json().await?;
            return Ok(session.into());
        }

        if status == StatusCode::NOT_FOUND {
            if let Some(id) = session_id {
                return Err(PaymentError::SessionNotFound(id.to_string()));
            }
        }

        let message = response
            .json::<StripeErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error.message)
            .unwrap_or_else(|| status.to_string());
        Err(PaymentError::Rejected { status: status.as_u16(), message })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, PaymentError> {
        let form = Self::checkout_form(&request)?;
        let url = self.endpoint("v1/checkout/sessions")?;

        tracing::info!("Creating checkout session for {} ({})", request.hr_email, request.package_name);

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        Self::parse_session(response, None).await
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, PaymentError> {
        if session_id.is_empty() || session_id.contains('/') {
            return Err(PaymentError::SessionNotFound(session_id.to_string()));
        }
        let url = self.endpoint(&format!("v1/checkout/sessions/{}", session_id))?;

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        Self::parse_session(response, Some(session_id)).await
    }
}

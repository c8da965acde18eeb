// In-process checkout authority for development runs and tests. Sessions
// start unpaid; `mark_paid` plays the part of the customer completing checkout.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CheckoutRequest, CheckoutSession, PaymentError, PaymentGateway};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

#[derive(Clone, Default)]
pub struct MemoryGateway {
    sessions: Arc<RwLock<HashMap<String, CheckoutSession>>>,
    offline: Arc<AtomicBool>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completes payment for a session and returns its transaction id
    pub async fn mark_paid(&self, session_id: &str) -> Option<String> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(session_id)?;
        session.payment_status = "paid".to_string();
        let intent = session
            .payment_intent
            .get_or_insert_with(|| format!("pi_{}", Uuid::new_v4().simple()))
            .clone();
        Some(intent)
    }

    /// Simulates the provider being unreachable
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), PaymentError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PaymentError::Unavailable("memory gateway is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for MemoryGateway {
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, PaymentError> {
        self.ensure_online()?;

        let id = format!("cs_mem_{}", Uuid::new_v4().simple());
        let amount_total = (request.amount * Decimal::from(100)).round().to_i64();
        let session = CheckoutSession {
            url: Some(format!("{}?session_id={}", request.success_url, id)),
            id: id.clone(),
            payment_intent: None,
            payment_status: "unpaid".to_string(),
            amount_total,
            currency: Some(request.currency.clone()),
            metadata: request.metadata(),
        };

        self.sessions.write().await.insert(id, session.clone());
        Ok(session)
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, PaymentError> {
        self.ensure_online()?;

        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| PaymentError::SessionNotFound(session_id.to_string()))
    }
}

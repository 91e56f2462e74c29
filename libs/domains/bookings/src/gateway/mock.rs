//! Scriptable in-memory gateway for tests and local development

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{
    Checkout, GatewayError, GatewayResult, InitializePayment, MINOR_UNITS, PaymentGateway,
    Verification,
};
use crate::models::PaymentStatus;

#[derive(Default)]
struct State {
    initialized: HashMap<String, InitializePayment>,
    scripted: HashMap<String, Verification>,
    initialize_failure: Option<GatewayError>,
    verify_failure: Option<GatewayError>,
    verify_calls: usize,
}

/// Records checkouts and answers verification from a script.
///
/// Unless scripted otherwise, a reference that was initialized verifies as a
/// full successful payment.
#[derive(Clone, Default)]
pub struct MockPaymentGateway {
    state: Arc<Mutex<State>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_initialize(&self, err: GatewayError) {
        self.state.lock().await.initialize_failure = Some(err);
    }

    pub async fn fail_verify(&self, err: GatewayError) {
        self.state.lock().await.verify_failure = Some(err);
    }

    pub async fn clear_failures(&self) {
        let mut state = self.state.lock().await;
        state.initialize_failure = None;
        state.verify_failure = None;
    }

    /// Answer `verify(reference)` with the given verification.
    pub async fn script(&self, verification: Verification) {
        self.state
            .lock()
            .await
            .scripted
            .insert(verification.reference.clone(), verification);
    }

    /// Script a status for a reference, keeping the initialized amount.
    pub async fn script_status(&self, reference: &str, status: PaymentStatus) {
        let mut state = self.state.lock().await;
        let (amount_minor, currency) = state
            .initialized
            .get(reference)
            .map(|r| (r.amount * MINOR_UNITS, r.currency.clone()))
            .unwrap_or_default();
        state.scripted.insert(
            reference.to_string(),
            Verification {
                reference: reference.to_string(),
                status,
                amount_minor,
                currency,
                transaction_id: Some(format!("tx_{}", reference)),
            },
        );
    }

    pub async fn initialized(&self) -> Vec<InitializePayment> {
        self.state.lock().await.initialized.values().cloned().collect()
    }

    pub async fn verify_calls(&self) -> usize {
        self.state.lock().await.verify_calls
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn initialize(&self, request: InitializePayment) -> GatewayResult<Checkout> {
        let mut state = self.state.lock().await;
        if let Some(err) = state.initialize_failure.clone() {
            return Err(err);
        }

        let checkout = Checkout {
            checkout_url: format!("https://checkout.test/{}", request.reference),
            access_code: Some(format!("ac_{}", request.reference)),
            reference: request.reference.clone(),
        };
        state.initialized.insert(request.reference.clone(), request);
        Ok(checkout)
    }

    async fn verify(&self, reference: &str) -> GatewayResult<Verification> {
        let mut state = self.state.lock().await;
        state.verify_calls += 1;
        if let Some(err) = state.verify_failure.clone() {
            return Err(err);
        }

        if let Some(verification) = state.scripted.get(reference) {
            return Ok(verification.clone());
        }

        state
            .initialized
            .get(reference)
            .map(|request| Verification {
                reference: reference.to_string(),
                status: PaymentStatus::Success,
                amount_minor: request.amount * MINOR_UNITS,
                currency: request.currency.clone(),
                transaction_id: Some(format!("tx_{}", reference)),
            })
            .ok_or_else(|| GatewayError::Rejected("Transaction reference not found".to_string()))
    }
}

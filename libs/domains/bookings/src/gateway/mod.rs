//! Payment gateway abstraction.
//!
//! The gateway initializes a hosted checkout for a reference and later answers
//! authoritatively whether that reference was paid. Callback payloads are only
//! hints; confirmation always goes through [`PaymentGateway::verify`].

pub mod http;
pub mod mock;

pub use http::{GatewayConfig, HttpPaymentGateway};
pub use mock::MockPaymentGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::PaymentStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Transport failure, timeout or provider-side 5xx. Safe to retry.
    #[error("Payment gateway unavailable: {0}")]
    Unavailable(String),

    /// The provider refused the request. Retrying will not help.
    #[error("Payment gateway rejected request: {0}")]
    Rejected(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Checkout request. `amount` is in whole currency units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitializePayment {
    pub reference: String,
    pub email: String,
    pub amount: i64,
    pub currency: String,
    pub callback_url: Option<String>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Checkout {
    pub checkout_url: String,
    pub access_code: Option<String>,
    pub reference: String,
}

/// Amounts cross the wire in minor units (kobo, cents).
pub const MINOR_UNITS: i64 = 100;

/// Authoritative transaction state from the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub reference: String,
    pub status: PaymentStatus,
    /// Amount charged, in minor units
    pub amount_minor: i64,
    pub currency: String,
    pub transaction_id: Option<String>,
}

impl Verification {
    /// Paid in full, in the expected currency. `amount` is in whole units.
    pub fn settles(&self, amount: i64, currency: &str) -> bool {
        self.status == PaymentStatus::Success
            && amount.checked_mul(MINOR_UNITS) == Some(self.amount_minor)
            && self.currency.eq_ignore_ascii_case(currency)
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize(&self, request: InitializePayment) -> GatewayResult<Checkout>;

    async fn verify(&self, reference: &str) -> GatewayResult<Verification>;
}

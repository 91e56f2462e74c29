use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;

use super::{
    Checkout, GatewayError, GatewayResult, InitializePayment, MINOR_UNITS, PaymentGateway,
    Verification,
};
use crate::models::PaymentStatus;

const DEFAULT_BASE_URL: &str = "https://api.paystack.co";

/// Hosted-checkout gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub secret_key: String,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            secret_key: secret_key.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// REST client for a Paystack-compatible transaction API
pub struct HttpPaymentGateway {
    client: Client,
    config: GatewayConfig,
}

impl HttpPaymentGateway {
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    async fn read_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> GatewayResult<T> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify(status, error_text));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("Malformed gateway response: {}", e)))?;

        match (envelope.status, envelope.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(GatewayError::Rejected(envelope.message)),
        }
    }
}

/// 5xx, throttling and credential problems are ours or transient; any other
/// 4xx is the provider refusing this particular request.
fn classify(status: StatusCode, body: String) -> GatewayError {
    let message = format!("Gateway API error ({}): {}", status, body);
    if status.is_server_error()
        || matches!(
            status,
            StatusCode::TOO_MANY_REQUESTS | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        )
    {
        GatewayError::Unavailable(message)
    } else {
        GatewayError::Rejected(message)
    }
}

fn transport(err: reqwest::Error) -> GatewayError {
    GatewayError::Unavailable(format!("Gateway request failed: {}", err))
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Serialize)]
struct InitializeRequest<'a> {
    email: &'a str,
    amount: i64,
    currency: &'a str,
    reference: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_url: Option<&'a str>,
    metadata: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    access_code: Option<String>,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: PaymentStatus,
    reference: String,
    amount: i64,
    currency: String,
    id: Option<i64>,
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn initialize(&self, request: InitializePayment) -> GatewayResult<Checkout> {
        let body = InitializeRequest {
            email: &request.email,
            amount: request.amount * MINOR_UNITS,
            currency: &request.currency,
            reference: &request.reference,
            callback_url: request.callback_url.as_deref(),
            metadata: &request.metadata,
        };

        let response = self
            .client
            .post(format!("{}/transaction/initialize", self.config.base_url))
            .bearer_auth(&self.config.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let data: InitializeData = Self::read_envelope(response).await?;

        tracing::info!(reference = %data.reference, "Initialized checkout");
        Ok(Checkout {
            checkout_url: data.authorization_url,
            access_code: data.access_code,
            reference: data.reference,
        })
    }

    async fn verify(&self, reference: &str) -> GatewayResult<Verification> {
        let response = self
            .client
            .get(format!(
                "{}/transaction/verify/{}",
                self.config.base_url, reference
            ))
            .bearer_auth(&self.config.secret_key)
            .send()
            .await
            .map_err(transport)?;

        let data: VerifyData = Self::read_envelope(response).await?;

        tracing::debug!(reference = %data.reference, status = %data.status, "Verified transaction");
        Ok(Verification {
            reference: data.reference,
            status: data.status,
            amount_minor: data.amount,
            currency: data.currency,
            transaction_id: data.id.map(|id| id.to_string()),
        })
    }
}

use axum_helpers::JwtConfig;
use core_config::{
    AppInfo, ConfigError, FromEnv, app_info, env_optional, env_or_default, env_parse,
    server::ServerConfig,
};
use database::RetryConfig;
use database::postgres::PostgresConfig;
use std::time::Duration;

pub use core_config::Environment;

/// Payment gateway and charge settings
///
/// - `PAYMENT_SECRET_KEY` (required in production)
/// - `PAYMENT_BASE_URL` (default https://api.paystack.co)
/// - `PAYMENT_TIMEOUT_SECS` (default 10)
/// - `PAYMENT_CURRENCY` (default NGN)
/// - `PAYMENT_CALLBACK_URL` (optional)
#[derive(Clone, Debug)]
pub struct PaymentConfig {
    pub secret_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
    pub currency: String,
    pub callback_url: Option<String>,
}

impl FromEnv for PaymentConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let currency = env_or_default("PAYMENT_CURRENCY", "NGN").to_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::ParseError {
                key: "PAYMENT_CURRENCY".to_string(),
                details: format!("'{}' is not an ISO 4217 code", currency),
            });
        }

        Ok(Self {
            secret_key: env_optional("PAYMENT_SECRET_KEY"),
            base_url: env_or_default("PAYMENT_BASE_URL", "https://api.paystack.co"),
            timeout: Duration::from_secs(env_parse("PAYMENT_TIMEOUT_SECS", "10")?),
            currency,
            callback_url: env_optional("PAYMENT_CALLBACK_URL"),
        })
    }
}

/// SendGrid credentials; absent means notifications are skipped.
#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub api_key: String,
    pub from_address: String,
    pub from_name: String,
}

impl EmailConfig {
    /// - `SENDGRID_API_KEY` and `EMAIL_FROM_ADDRESS` (both or neither)
    /// - `EMAIL_FROM_NAME` (default "Event Bookings")
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        match (env_optional("SENDGRID_API_KEY"), env_optional("EMAIL_FROM_ADDRESS")) {
            (Some(api_key), Some(from_address)) => Ok(Some(Self {
                api_key,
                from_address,
                from_name: env_or_default("EMAIL_FROM_NAME", "Event Bookings"),
            })),
            (None, None) => Ok(None),
            (Some(_), None) => Err(ConfigError::MissingEnvVar("EMAIL_FROM_ADDRESS".to_string())),
            (None, Some(_)) => Err(ConfigError::MissingEnvVar("SENDGRID_API_KEY".to_string())),
        }
    }
}

/// Application-specific configuration
/// Composes shared config components from the `config` library
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub database: PostgresConfig,
    pub retry: RetryConfig,
    pub server: ServerConfig,
    pub environment: Environment,
    pub jwt: JwtConfig,
    pub payment: PaymentConfig,
    pub email: Option<EmailConfig>,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let database = PostgresConfig::from_env()?; // Required - will fail if not set
        let retry = RetryConfig::from_env()?;
        let server = ServerConfig::from_env()?; // Uses defaults: HOST=0.0.0.0, PORT=8080
        let jwt = JwtConfig::from_env()?;
        let payment = PaymentConfig::from_env()?;
        let email = EmailConfig::from_env()?;

        if environment.is_production() && payment.secret_key.is_none() {
            return Err(ConfigError::MissingEnvVar("PAYMENT_SECRET_KEY".to_string()).into());
        }

        Ok(Self {
            app: app_info!(),
            database,
            retry,
            server,
            environment,
            jwt,
            payment,
            email,
        })
    }
}

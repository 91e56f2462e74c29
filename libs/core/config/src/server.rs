use crate::{ConfigError, FromEnv, env_or_default, env_parse};
use std::net::Ipv4Addr;
use std::time::Duration;

const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// HTTP server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on a single request, gateway round-trips included
    pub request_timeout: Duration,
    /// Grace period for in-flight requests after a shutdown signal
    pub shutdown_timeout: Duration,
    /// Browser origins allowed by CORS
    pub cors_allowed_origins: Vec<String>,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FromEnv for ServerConfig {
    /// - `HOST` (default 0.0.0.0)
    /// - `PORT` (default 8080)
    /// - `REQUEST_TIMEOUT_SECS` (default 30)
    /// - `SHUTDOWN_TIMEOUT_SECS` (default 30)
    /// - `CORS_ALLOWED_ORIGIN` (comma-separated, default http://localhost:3000)
    fn from_env() -> Result<Self, ConfigError> {
        let host = env_or_default("HOST", &Ipv4Addr::UNSPECIFIED.to_string());
        let port = env_parse("PORT", "8080")?;
        let request_timeout = Duration::from_secs(env_parse("REQUEST_TIMEOUT_SECS", "30")?);
        let shutdown_timeout = Duration::from_secs(env_parse("SHUTDOWN_TIMEOUT_SECS", "30")?);
        let cors_allowed_origins = parse_origins(&env_or_default(
            "CORS_ALLOWED_ORIGIN",
            DEFAULT_CORS_ORIGIN,
        ))?;

        Ok(Self {
            host,
            port,
            request_timeout,
            shutdown_timeout,
            cors_allowed_origins,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::UNSPECIFIED.to_string(),
            port: 8080,
            request_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(30),
            cors_allowed_origins: vec![DEFAULT_CORS_ORIGIN.to_string()],
        }
    }
}

fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if origins.is_empty() {
        return Err(ConfigError::ParseError {
            key: "CORS_ALLOWED_ORIGIN".to_string(),
            details: "at least one origin is required".to_string(),
        });
    }
    Ok(origins)
}

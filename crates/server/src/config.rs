//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DOORSTEP_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `SMS_DEVICE_ID` - Registered device id at the SMS/WhatsApp vendor
//! - `SMS_CLIENT_ID` - Vendor API client id
//! - `SMS_CLIENT_SECRET` - Vendor API client secret
//!
//! ## Optional
//! - `DOORSTEP_HOST` - Bind address (default: 127.0.0.1)
//! - `DOORSTEP_PORT` - Listen port (default: 3000)
//! - `DOORSTEP_CURRENCY` - ISO 4217 currency for orders and events (default: TRY)
//! - `DOORSTEP_COUNTRY` - Default shipping country code (default: TR)
//! - `SHOPIFY_API_VERSION` - Admin API version (default: 2025-04)
//! - `SHOPIFY_TIMEOUT_SECS` - Per-call timeout for order-critical calls (default: 10)
//! - `SHOPIFY_SIDE_EFFECT_TIMEOUT_SECS` - Timeout for non-fatal calls (default: 5)
//! - `SMS_GATEWAY_URL` - Vendor message endpoint
//! - `SMS_SEND_SPEED` - Vendor delivery speed knob (default: 2)
//! - `META_GRAPH_VERSION` - Graph API version for conversion events (default: v18.0)
//! - `META_CAPI_TIMEOUT_SECS` - Timeout for conversion event calls (default: 5)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Application configuration for the gateway.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// ISO 4217 currency code used for orders and conversion events
    pub currency: String,
    /// Default shipping country code when the customer omits one
    pub default_country: String,
    /// Shopify Admin API configuration
    pub shopify: ShopifyConfig,
    /// SMS/WhatsApp vendor configuration
    pub sms: SmsConfig,
    /// Meta conversion API configuration
    pub capi: CapiConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Shopify Admin API configuration.
#[derive(Debug, Clone)]
pub struct ShopifyConfig {
    /// Admin API version segment (e.g. 2025-04)
    pub api_version: String,
    /// Timeout applied to order-critical calls
    pub request_timeout: Duration,
    /// Timeout applied to non-fatal side-effect calls
    pub side_effect_timeout: Duration,
}

/// SMS/WhatsApp vendor gateway configuration.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct SmsConfig {
    /// Vendor message-send endpoint
    pub endpoint: String,
    /// Registered sending device id
    pub device_id: String,
    /// Vendor API client id
    pub client_id: String,
    /// Vendor API client secret
    pub client_secret: SecretString,
    /// Vendor delivery speed knob, passed through verbatim
    pub send_speed: String,
    /// Timeout for the send call
    pub request_timeout: Duration,
}

impl std::fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsConfig")
            .field("endpoint", &self.endpoint)
            .field("device_id", &self.device_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("send_speed", &self.send_speed)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Meta Graph API (conversion events) configuration.
#[derive(Debug, Clone)]
pub struct CapiConfig {
    /// Graph API version segment (e.g. v18.0)
    pub graph_version: String,
    /// Timeout for conversion event calls
    pub request_timeout: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("DOORSTEP_DATABASE_URL")?;
        let host = get_env_or_default("DOORSTEP_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("DOORSTEP_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("DOORSTEP_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("DOORSTEP_PORT".to_string(), e.to_string()))?;

        let currency = get_env_or_default("DOORSTEP_CURRENCY", "TRY");
        let default_country = get_env_or_default("DOORSTEP_COUNTRY", "TR");

        let shopify = ShopifyConfig::from_env()?;
        let sms = SmsConfig::from_env()?;
        let capi = CapiConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            currency,
            default_country,
            shopify,
            sms,
            capi,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ShopifyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_version: get_env_or_default("SHOPIFY_API_VERSION", "2025-04"),
            request_timeout: get_timeout("SHOPIFY_TIMEOUT_SECS", 10)?,
            side_effect_timeout: get_timeout("SHOPIFY_SIDE_EFFECT_TIMEOUT_SECS", 5)?,
        })
    }
}

impl SmsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: get_env_or_default(
                "SMS_GATEWAY_URL",
                "https://api.vatansms.net/api/whatsapp/v1/messages/send",
            ),
            device_id: get_required_env("SMS_DEVICE_ID")?,
            client_id: get_required_env("SMS_CLIENT_ID")?,
            client_secret: get_required_secret("SMS_CLIENT_SECRET")?,
            send_speed: get_env_or_default("SMS_SEND_SPEED", "2"),
            request_timeout: get_timeout("SMS_TIMEOUT_SECS", 10)?,
        })
    }
}

impl CapiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            graph_version: get_env_or_default("META_GRAPH_VERSION", "v18.0"),
            request_timeout: get_timeout("META_CAPI_TIMEOUT_SECS", 5)?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a timeout in whole seconds with a default.
fn get_timeout(key: &str, default_secs: u64) -> Result<Duration, ConfigError> {
    let secs = get_env_or_default(key, &default_secs.to_string())
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_config() -> AppConfig {
        AppConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            currency: "TRY".to_string(),
            default_country: "TR".to_string(),
            shopify: ShopifyConfig {
                api_version: "2025-04".to_string(),
                request_timeout: Duration::from_secs(10),
                side_effect_timeout: Duration::from_secs(5),
            },
            sms: SmsConfig {
                endpoint: "https://sms.example.com/send".to_string(),
                device_id: "device-1".to_string(),
                client_id: "client-1".to_string(),
                client_secret: SecretString::from("sms_secret_value"),
                send_speed: "2".to_string(),
                request_timeout: Duration::from_secs(10),
            },
            capi: CapiConfig {
                graph_version: "v18.0".to_string(),
                request_timeout: Duration::from_secs(5),
            },
            sentry_dsn: None,
        }
    }

    #[test]
    fn test_socket_addr() {
        let config = sample_config();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_sms_config_debug_redacts_secret() {
        let config = sample_config();
        let debug_output = format!("{:?}", config.sms);

        assert!(debug_output.contains("device-1"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sms_secret_value"));
    }
}

//! Verification code delivery over the SMS/WhatsApp vendor gateway.
//!
//! The vendor accepts a templated message for a phone number and reports
//! acceptance with `{"code": 200}` in the response body. There is no retry;
//! a failed send is reported up as a plain `false`.

use async_trait::async_trait;
use doorstep_core::PhoneNumber;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use crate::config::SmsConfig;

/// Errors that can occur while constructing the vendor client.
#[derive(Debug, Error)]
pub enum SmsError {
    /// HTTP client construction or header encoding failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Credential contains characters that cannot appear in a header.
    #[error("invalid credential format: {0}")]
    InvalidCredential(String),
}

/// Delivery of one-time codes to a phone number.
///
/// Returns a plain success flag; the vendor's failure detail is logged at
/// the call site and not propagated.
#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Send the code to the phone. `true` means the vendor accepted it.
    async fn send_code(&self, phone: &PhoneNumber, code: &str) -> bool;
}

/// Vendor gateway response body.
#[derive(Debug, Deserialize)]
struct GatewayResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the SMS/WhatsApp vendor.
#[derive(Clone)]
pub struct SmsGatewayClient {
    client: reqwest::Client,
    endpoint: String,
    device_id: String,
    send_speed: String,
}

impl SmsGatewayClient {
    /// Create a new vendor client with the credentials preloaded as default
    /// headers.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build or a credential is
    /// not header-safe.
    pub fn new(config: &SmsConfig) -> Result<Self, SmsError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "client-id",
            HeaderValue::from_str(&config.client_id)
                .map_err(|e| SmsError::InvalidCredential(e.to_string()))?,
        );
        headers.insert(
            "client-secret",
            HeaderValue::from_str(config.client_secret.expose_secret())
                .map_err(|e| SmsError::InvalidCredential(e.to_string()))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            device_id: config.device_id.clone(),
            send_speed: config.send_speed.clone(),
        })
    }
}

#[async_trait]
impl SmsSender for SmsGatewayClient {
    async fn send_code(&self, phone: &PhoneNumber, code: &str) -> bool {
        let message = format!(
            "Sipariş doğrulama kodunuz: {code}\n\nBu kodu kimseyle paylaşmayın. Kod 5 dakika geçerlidir."
        );
        let to = phone.with_country_prefix();

        let body = serde_json::json!({
            "reg_id": self.device_id,
            "to": to,
            "message": message,
            "send_speed": self.send_speed,
        });

        let response = match self.client.post(&self.endpoint).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "SMS gateway unreachable");
                return false;
            }
        };

        let status = response.status();
        let parsed = response.json::<GatewayResponse>().await;

        match parsed {
            Ok(GatewayResponse { code: Some(200), .. }) => {
                tracing::info!(to = %to, "Verification message accepted by vendor");
                true
            }
            Ok(GatewayResponse { code, message }) => {
                tracing::warn!(
                    http_status = status.as_u16(),
                    vendor_code = ?code,
                    vendor_message = ?message,
                    "SMS gateway rejected the message"
                );
                false
            }
            Err(e) => {
                tracing::warn!(http_status = status.as_u16(), error = %e, "SMS gateway response unreadable");
                false
            }
        }
    }
}

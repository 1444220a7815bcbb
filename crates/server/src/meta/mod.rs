//! Meta Conversions API client.
//!
//! Sends server-side Purchase events to the Graph API for each tracking
//! pixel registered on a shop. Personally identifying fields are normalized
//! (trimmed, lower-cased) and SHA-256 hashed before transmission; absent
//! fields go out as empty collections, which the platform treats as
//! "not provided".

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::instrument;

use crate::config::CapiConfig;
use crate::models::MetaPixel;

/// Graph API host.
const GRAPH_BASE_URL: &str = "https://graph.facebook.com";

/// Errors that can occur when sending conversion events.
#[derive(Debug, Error)]
pub enum CapiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Graph API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The pixel has no usable access token.
    #[error("pixel {0} has no access token")]
    NoAccessToken(String),
}

/// A purchase conversion assembled by the orchestrator.
#[derive(Debug, Clone)]
pub struct PurchaseEvent {
    /// Page the event is attributed to, normally the shop root.
    pub event_source_url: String,
    pub currency: String,
    /// Major-unit decimal string.
    pub value: String,
    pub order_id: i64,
    pub contents: Vec<PurchaseContent>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// One purchased item inside the event.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseContent {
    pub id: i64,
    pub quantity: i64,
    /// Major-unit decimal string.
    pub item_price: String,
}

/// The conversion-event operation the orchestrator needs, per pixel.
///
/// Each pixel is attempted independently; a trait so tests can count calls
/// and simulate failures.
#[async_trait]
pub trait ConversionGateway: Send + Sync {
    /// Send a Purchase event to one pixel.
    async fn send_purchase_event(
        &self,
        pixel: &MetaPixel,
        event: &PurchaseEvent,
    ) -> Result<(), CapiError>;
}

/// Graph API conversion client.
#[derive(Clone)]
pub struct CapiClient {
    client: reqwest::Client,
    graph_version: String,
}

impl CapiClient {
    /// Create a new conversion client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &CapiConfig) -> Result<Self, CapiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            graph_version: config.graph_version.clone(),
        })
    }
}

#[async_trait]
impl ConversionGateway for CapiClient {
    #[instrument(skip(self, pixel, event), fields(pixel_id = %pixel.pixel_id, order_id = event.order_id))]
    async fn send_purchase_event(
        &self,
        pixel: &MetaPixel,
        event: &PurchaseEvent,
    ) -> Result<(), CapiError> {
        let access_token = pixel
            .access_token
            .as_deref()
            .ok_or_else(|| CapiError::NoAccessToken(pixel.pixel_id.clone()))?;

        let url = format!(
            "{GRAPH_BASE_URL}/{}/{}/events?access_token={access_token}",
            self.graph_version, pixel.pixel_id
        );

        let content_ids: Vec<i64> = event.contents.iter().map(|c| c.id).collect();
        let body = serde_json::json!({
            "data": [{
                "event_name": "Purchase",
                "event_time": Utc::now().timestamp(),
                "action_source": "website",
                "event_source_url": event.event_source_url,
                "user_data": {
                    "em": hashed_field(event.email.as_deref()),
                    "ph": hashed_field(event.phone.as_deref()),
                    "fn": hashed_field(event.first_name.as_deref()),
                    "ln": hashed_field(event.last_name.as_deref()),
                    "ct": hashed_field(event.city.as_deref()),
                    "country": hashed_field(event.country.as_deref()),
                    "client_ip_address": event.client_ip,
                    "client_user_agent": event.user_agent,
                },
                "custom_data": {
                    "currency": event.currency,
                    "value": event.value,
                    "order_id": event.order_id,
                    "content_ids": content_ids,
                    "content_type": "product",
                    "contents": event.contents,
                    "num_items": event.contents.len(),
                },
            }],
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CapiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(pixel_id = %pixel.pixel_id, "Purchase event sent");
        Ok(())
    }
}

/// Normalize and hash one identifying value.
fn normalized_hash(value: &str) -> String {
    let normalized = value.trim().to_lowercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// Hash an optional field into the list form the platform expects: one
/// element when present, empty when absent or blank.
fn hashed_field(value: Option<&str>) -> Vec<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or_else(Vec::new, |v| vec![normalized_hash(v)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_hash_is_case_and_whitespace_insensitive() {
        assert_eq!(
            normalized_hash("  Test@Example.COM "),
            normalized_hash("test@example.com")
        );
    }

    #[test]
    fn test_normalized_hash_is_hex_digest() {
        let digest = normalized_hash("5551234567");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hashed_field_absent_is_empty() {
        assert!(hashed_field(None).is_empty());
        assert!(hashed_field(Some("")).is_empty());
        assert!(hashed_field(Some("   ")).is_empty());
        assert_eq!(hashed_field(Some("Istanbul")).len(), 1);
    }
}

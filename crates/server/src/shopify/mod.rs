//! Shopify Admin REST API client.
//!
//! Wraps the handful of Admin endpoints the gateway needs: customer
//! search/create, order create, marketing events, engagements, and order
//! metafields. Every call is a single attempt with a bounded timeout; the
//! caller decides whether a failure is fatal (order creation) or swallowed
//! (everything else).

use async_trait::async_trait;
use doorstep_core::PhoneNumber;
use thiserror::Error;
use tracing::instrument;

use crate::config::ShopifyConfig;

pub mod types;

use types::{
    CreatedOrder, CustomerEnvelope, CustomerPayload, CustomerSearchEnvelope, EngagementPayload,
    MarketingEventEnvelope, MarketingEventPayload, MetafieldPayload, OrderEnvelope, OrderPayload,
};

/// Errors that can occur when calling the Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed (connect, timeout, decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response; `message` is the raw body for
    /// verbatim passthrough.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

impl ShopifyError {
    /// The upstream HTTP status, where one exists.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Api { status, .. } => Some(*status),
        }
    }
}

/// Per-call shop credential: domain plus Admin API access token.
#[derive(Debug, Clone, Copy)]
pub struct ShopCredentials<'a> {
    pub domain: &'a str,
    pub access_token: &'a str,
}

/// The commerce platform operations the orchestrator needs.
///
/// A trait so tests can substitute counting stubs without touching the
/// network.
#[async_trait]
pub trait CommerceGateway: Send + Sync {
    /// Find an existing customer id by phone number.
    async fn search_customer_by_phone(
        &self,
        creds: &ShopCredentials<'_>,
        phone: &PhoneNumber,
    ) -> Result<Option<i64>, ShopifyError>;

    /// Create a customer, returning its id.
    async fn create_customer(
        &self,
        creds: &ShopCredentials<'_>,
        customer: &CustomerPayload,
    ) -> Result<i64, ShopifyError>;

    /// Create an order. This is the one fatal call in the submission flow.
    async fn create_order(
        &self,
        creds: &ShopCredentials<'_>,
        order: &OrderPayload,
    ) -> Result<CreatedOrder, ShopifyError>;

    /// Register a marketing event, returning its id.
    async fn create_marketing_event(
        &self,
        creds: &ShopCredentials<'_>,
        event: &MarketingEventPayload,
    ) -> Result<i64, ShopifyError>;

    /// Attach an engagement row to a marketing event.
    async fn create_engagement(
        &self,
        creds: &ShopCredentials<'_>,
        marketing_event_id: i64,
        engagement: &EngagementPayload,
    ) -> Result<(), ShopifyError>;

    /// Attach a metafield to an order.
    async fn create_order_metafield(
        &self,
        creds: &ShopCredentials<'_>,
        order_id: i64,
        metafield: &MetafieldPayload,
    ) -> Result<(), ShopifyError>;
}

/// Admin REST API client.
#[derive(Clone)]
pub struct AdminRestClient {
    client: reqwest::Client,
    api_version: String,
    side_effect_timeout: std::time::Duration,
}

impl AdminRestClient {
    /// Create a new Admin API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ShopifyConfig) -> Result<Self, ShopifyError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            api_version: config.api_version.clone(),
            side_effect_timeout: config.side_effect_timeout,
        })
    }

    fn endpoint(&self, creds: &ShopCredentials<'_>, path: &str) -> String {
        format!(
            "https://{}/admin/api/{}/{path}",
            creds.domain, self.api_version
        )
    }

    /// Check the response status and decode the body, surfacing the raw
    /// error body for non-success statuses.
    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ShopifyError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ShopifyError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl CommerceGateway for AdminRestClient {
    #[instrument(skip(self, creds), fields(shop = %creds.domain))]
    async fn search_customer_by_phone(
        &self,
        creds: &ShopCredentials<'_>,
        phone: &PhoneNumber,
    ) -> Result<Option<i64>, ShopifyError> {
        let url = format!(
            "{}?query=phone:{}",
            self.endpoint(creds, "customers/search.json"),
            urlencoding::encode(phone.as_str())
        );

        let response = self
            .client
            .get(&url)
            .header("X-Shopify-Access-Token", creds.access_token)
            .send()
            .await?;

        let data: CustomerSearchEnvelope = Self::read_json(response).await?;
        Ok(data.customers.first().map(|c| c.id))
    }

    #[instrument(skip(self, creds, customer), fields(shop = %creds.domain))]
    async fn create_customer(
        &self,
        creds: &ShopCredentials<'_>,
        customer: &CustomerPayload,
    ) -> Result<i64, ShopifyError> {
        let url = self.endpoint(creds, "customers.json");

        let response = self
            .client
            .post(&url)
            .header("X-Shopify-Access-Token", creds.access_token)
            .json(&serde_json::json!({ "customer": customer }))
            .send()
            .await?;

        let data: CustomerEnvelope = Self::read_json(response).await?;
        Ok(data.customer.id)
    }

    #[instrument(skip(self, creds, order), fields(shop = %creds.domain))]
    async fn create_order(
        &self,
        creds: &ShopCredentials<'_>,
        order: &OrderPayload,
    ) -> Result<CreatedOrder, ShopifyError> {
        let url = self.endpoint(creds, "orders.json");

        let response = self
            .client
            .post(&url)
            .header("X-Shopify-Access-Token", creds.access_token)
            .json(&serde_json::json!({ "order": order }))
            .send()
            .await?;

        let data: OrderEnvelope = Self::read_json(response).await?;
        tracing::info!(order_id = data.order.id, "Order created on platform");
        Ok(data.order)
    }

    #[instrument(skip(self, creds, event), fields(shop = %creds.domain))]
    async fn create_marketing_event(
        &self,
        creds: &ShopCredentials<'_>,
        event: &MarketingEventPayload,
    ) -> Result<i64, ShopifyError> {
        let url = self.endpoint(creds, "marketing_events.json");

        let response = self
            .client
            .post(&url)
            .header("X-Shopify-Access-Token", creds.access_token)
            .json(&serde_json::json!({ "marketing_event": event }))
            .timeout(self.side_effect_timeout)
            .send()
            .await?;

        let data: MarketingEventEnvelope = Self::read_json(response).await?;
        Ok(data.marketing_event.id)
    }

    #[instrument(skip(self, creds, engagement), fields(shop = %creds.domain))]
    async fn create_engagement(
        &self,
        creds: &ShopCredentials<'_>,
        marketing_event_id: i64,
        engagement: &EngagementPayload,
    ) -> Result<(), ShopifyError> {
        let url = self.endpoint(
            creds,
            &format!("marketing_events/{marketing_event_id}/engagements.json"),
        );

        let response = self
            .client
            .post(&url)
            .header("X-Shopify-Access-Token", creds.access_token)
            .json(&serde_json::json!({ "engagements": [engagement] }))
            .timeout(self.side_effect_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ShopifyError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    #[instrument(skip(self, creds, metafield), fields(shop = %creds.domain, key = %metafield.key))]
    async fn create_order_metafield(
        &self,
        creds: &ShopCredentials<'_>,
        order_id: i64,
        metafield: &MetafieldPayload,
    ) -> Result<(), ShopifyError> {
        let url = self.endpoint(creds, &format!("orders/{order_id}/metafields.json"));

        let response = self
            .client
            .post(&url)
            .header("X-Shopify-Access-Token", creds.access_token)
            .json(&serde_json::json!({ "metafield": metafield }))
            .timeout(self.side_effect_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ShopifyError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ShopifyError::Api {
            status: 422,
            message: "Unprocessable".to_owned(),
        };
        assert_eq!(err.to_string(), "API error: 422 - Unprocessable");
        assert_eq!(err.status(), Some(422));
    }
}

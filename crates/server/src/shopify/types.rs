//! Request and response payloads for the Admin REST API.
//!
//! Field names mirror the platform's JSON exactly, so everything here is
//! plain serde structs; amounts are already-formatted major-unit strings.

use serde::{Deserialize, Serialize};

// Marketing-event constants the platform mandates. Budget and tactic are
// required by the API; the values are passed through verbatim.
pub const MARKETING_EVENT_TYPE: &str = "ad";
pub const MARKETING_CHANNEL: &str = "social";
pub const MARKETING_EVENT_BUDGET: &str = "2.00";
pub const MARKETING_EVENT_BUDGET_TYPE: &str = "daily";
pub const MARKETING_EVENT_TACTIC: &str = "post";
pub const MARKETING_UTM_SOURCE: &str = "whatsapp";
pub const MARKETING_UTM_MEDIUM: &str = "cod_app";
pub const ENGAGEMENT_UTC_OFFSET: &str = "+03:00";

/// Label attached to orders and metafields so conversions are attributable
/// to this app in platform reporting.
pub const CONVERSION_SOURCE: &str = "Doorstep COD";

/// Metafield namespace for the tracking key/value set.
pub const TRACKING_NAMESPACE: &str = "cod_tracking";

/// A line item on an order.
#[derive(Debug, Clone, Serialize)]
pub struct LineItemPayload {
    pub variant_id: i64,
    pub quantity: i64,
    /// Per-line total in major units, e.g. `"20.00"` for two units at
    /// `10.00`.
    pub price: String,
}

/// Shipping/billing address. The gateway fills both from the single
/// customer-supplied address.
#[derive(Debug, Clone, Serialize)]
pub struct AddressPayload {
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    pub city: String,
    pub province: String,
    pub country: String,
    pub zip: String,
    pub phone: String,
}

/// Customer reference on an order: an existing platform customer by id, or
/// inline fields when resolution failed.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CustomerRef {
    Existing { id: i64 },
    Inline {
        first_name: String,
        last_name: String,
        email: String,
    },
}

/// A payment transaction attached at order creation.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionPayload {
    pub kind: String,
    pub status: String,
    /// Major-unit decimal string.
    pub amount: String,
    pub gateway: String,
}

/// The order document POSTed to the platform.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPayload {
    pub line_items: Vec<LineItemPayload>,
    pub customer: CustomerRef,
    pub shipping_address: AddressPayload,
    pub billing_address: AddressPayload,
    pub note: String,
    pub tags: String,
    pub source_name: String,
    pub source_identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub financial_status: String,
    /// Always `null` for COD orders awaiting fulfillment.
    pub fulfillment_status: Option<String>,
    pub transactions: Vec<TransactionPayload>,
    pub inventory_behaviour: String,
    pub send_receipt: bool,
    pub send_fulfillment_receipt: bool,
}

/// New customer document.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerPayload {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub verified_email: bool,
    pub tags: String,
}

/// Marketing event registered per conversion.
#[derive(Debug, Clone, Serialize)]
pub struct MarketingEventPayload {
    pub remote_id: String,
    pub event_type: String,
    pub marketing_channel: String,
    pub paid: bool,
    pub started_at: String,
    pub referring_domain: String,
    pub budget: String,
    pub currency: String,
    pub budget_type: String,
    pub utm_campaign: String,
    pub utm_source: String,
    pub utm_medium: String,
    pub description: String,
    pub manage_url: String,
    pub preview_url: String,
    pub tactic: String,
}

/// Same-day engagement row attached to a marketing event.
#[derive(Debug, Clone, Serialize)]
pub struct EngagementPayload {
    /// `YYYY-MM-DD`.
    pub occurred_on: String,
    pub impressions_count: i64,
    pub views_count: i64,
    pub clicks_count: i64,
    pub shares_count: i64,
    pub favorites_count: i64,
    pub comments_count: i64,
    pub ad_spend: i64,
    pub is_cumulative: bool,
    pub utc_offset: String,
}

/// Order metafield document.
#[derive(Debug, Clone, Serialize)]
pub struct MetafieldPayload {
    pub namespace: String,
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub value_type: String,
}

impl MetafieldPayload {
    /// A single-line text metafield under the tracking namespace.
    #[must_use]
    pub fn tracking(key: &str, value: impl Into<String>) -> Self {
        Self {
            namespace: TRACKING_NAMESPACE.to_owned(),
            key: key.to_owned(),
            value: value.into(),
            value_type: "single_line_text_field".to_owned(),
        }
    }
}

/// The order as the platform returns it after creation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedOrder {
    pub id: i64,
    #[serde(default)]
    pub order_number: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub order_status_url: Option<String>,
    #[serde(default)]
    pub total_price: Option<String>,
}

// Response envelopes.

#[derive(Debug, Deserialize)]
pub(super) struct OrderEnvelope {
    pub order: CreatedOrder,
}

#[derive(Debug, Deserialize)]
pub(super) struct CustomerEnvelope {
    pub customer: CustomerSummary,
}

#[derive(Debug, Deserialize)]
pub(super) struct CustomerSearchEnvelope {
    #[serde(default)]
    pub customers: Vec<CustomerSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerSummary {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct MarketingEventEnvelope {
    pub marketing_event: MarketingEventSummary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketingEventSummary {
    pub id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_ref_serialization() {
        let existing = serde_json::to_value(CustomerRef::Existing { id: 42 }).expect("serialize");
        assert_eq!(existing, serde_json::json!({"id": 42}));

        let inline = serde_json::to_value(CustomerRef::Inline {
            first_name: "Ayşe".to_owned(),
            last_name: "Yılmaz".to_owned(),
            email: "ayse@example.com".to_owned(),
        })
        .expect("serialize");
        assert_eq!(
            inline,
            serde_json::json!({
                "first_name": "Ayşe",
                "last_name": "Yılmaz",
                "email": "ayse@example.com"
            })
        );
    }

    #[test]
    fn test_metafield_tracking_shape() {
        let field = MetafieldPayload::tracking("checkout_token", "cod_123_abc");
        let value = serde_json::to_value(&field).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "namespace": "cod_tracking",
                "key": "checkout_token",
                "value": "cod_123_abc",
                "type": "single_line_text_field"
            })
        );
    }

    #[test]
    fn test_created_order_tolerates_missing_fields() {
        let order: CreatedOrder =
            serde_json::from_value(serde_json::json!({"id": 123})).expect("deserialize");
        assert_eq!(order.id, 123);
        assert!(order.order_status_url.is_none());
        assert!(order.order_number.is_none());
    }
}

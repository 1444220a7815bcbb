//! Order submission orchestration.
//!
//! The submission pipeline: validate the request, resolve the shop
//! credential, resolve or create the platform customer, create the order
//! (the only fatal external call), then run the non-fatal side effects —
//! marketing event + engagement, tracking metafields, per-pixel conversion
//! events, local persistence — and compute the redirect target.
//!
//! Every side effect goes through [`run_side_effect`] so the
//! catch-log-continue contract lives in exactly one place.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use doorstep_core::{CodPaymentType, ExternalOrderId, MinorUnits, OrderStatus, PhoneNumber};
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::db::{OrderStore, RepositoryError, ShopDirectory};
use crate::meta::{ConversionGateway, PurchaseContent, PurchaseEvent};
use crate::models::{Shop, SubmittedOrder};
use crate::shopify::types::{
    AddressPayload, CONVERSION_SOURCE, CreatedOrder, CustomerPayload, CustomerRef,
    ENGAGEMENT_UTC_OFFSET, EngagementPayload, LineItemPayload, MARKETING_CHANNEL,
    MARKETING_EVENT_BUDGET, MARKETING_EVENT_BUDGET_TYPE, MARKETING_EVENT_TACTIC,
    MARKETING_EVENT_TYPE, MARKETING_UTM_MEDIUM, MARKETING_UTM_SOURCE, MarketingEventPayload,
    MetafieldPayload, OrderPayload, TransactionPayload,
};
use crate::shopify::{CommerceGateway, ShopCredentials, ShopifyError};

/// A COD order as submitted by the checkout popup.
///
/// Every field is optional on the wire; the orchestrator validates instead
/// of the deserializer so missing fields produce a 400 with a useful
/// message rather than a deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PendingOrder {
    pub shop: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
    pub customer_city: Option<String>,
    pub customer_country: Option<String>,
    pub customer_zip: Option<String>,
    pub cart_items: Vec<CartItem>,
    /// Declared total in minor units.
    pub total_amount: Option<i64>,
    /// Client-supplied idempotency token correlating cart and order.
    pub cart_token: Option<String>,
    pub cod_payment_type: Option<String>,
    pub landing_page: Option<String>,
    pub referring_site: Option<String>,
    pub user_agent: Option<String>,
}

/// One cart line as the storefront sends it.
///
/// Older theme scripts send the variant under `id`, newer ones under
/// `variant_id`; either is accepted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CartItem {
    pub variant_id: Option<i64>,
    pub id: Option<i64>,
    pub quantity: i64,
    /// Unit price in minor units.
    pub price: i64,
}

/// Errors that abort a submission.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Client input failed validation; no external call was made.
    #[error("{0}")]
    Validation(String),

    /// The shop is unknown, deactivated, or missing its credential.
    #[error("shop is not authorized")]
    ShopNotAuthorized,

    /// The platform rejected the order; status and body pass through
    /// verbatim.
    #[error("order creation failed: {details}")]
    OrderCreation { status: u16, details: String },

    /// Storage failure before the order reached the platform.
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

impl SubmitError {
    fn order_creation(err: ShopifyError) -> Self {
        match err {
            ShopifyError::Api { status, message } => Self::OrderCreation {
                status,
                details: message,
            },
            ShopifyError::Http(e) => Self::OrderCreation {
                status: e.status().map_or(502, |s| s.as_u16()),
                details: e.to_string(),
            },
        }
    }
}

/// Successful submission result.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub order_id: ExternalOrderId,
    pub order_number: Option<i64>,
    pub order_name: Option<String>,
    /// Where to send the customer; never empty.
    pub redirect_url: String,
}

/// The request after validation, with defaults applied.
struct ValidatedOrder {
    shop_domain: String,
    customer_name: String,
    first_name: String,
    last_name: String,
    phone: PhoneNumber,
    email: Option<String>,
    address: String,
    city: String,
    country: String,
    zip: Option<String>,
    items: Vec<ValidatedItem>,
    total: MinorUnits,
    checkout_token: String,
    payment_type: CodPaymentType,
    landing_page: Option<String>,
    referring_site: Option<String>,
    user_agent: Option<String>,
    client_ip: Option<String>,
}

struct ValidatedItem {
    variant_id: i64,
    quantity: i64,
    price: MinorUnits,
}

/// Coordinates the end-to-end COD order submission.
#[derive(Clone)]
pub struct OrderOrchestrator {
    shops: Arc<dyn ShopDirectory>,
    store: Arc<dyn OrderStore>,
    commerce: Arc<dyn CommerceGateway>,
    conversions: Arc<dyn ConversionGateway>,
    currency: String,
    default_country: String,
}

impl OrderOrchestrator {
    /// Wire the orchestrator to its collaborators.
    #[must_use]
    pub fn new(
        shops: Arc<dyn ShopDirectory>,
        store: Arc<dyn OrderStore>,
        commerce: Arc<dyn CommerceGateway>,
        conversions: Arc<dyn ConversionGateway>,
        currency: String,
        default_country: String,
    ) -> Self {
        Self {
            shops,
            store,
            commerce,
            conversions,
            currency,
            default_country,
        }
    }

    /// Submit a COD order.
    ///
    /// Once the platform order exists (step 4), the result is a success no
    /// matter what the side effects or local persistence do.
    ///
    /// # Errors
    ///
    /// `Validation` and `ShopNotAuthorized` before any platform call;
    /// `OrderCreation` with the platform's own status and body when the
    /// order itself is rejected.
    pub async fn submit(
        &self,
        request: PendingOrder,
        client_ip: Option<String>,
    ) -> Result<SubmitOutcome, SubmitError> {
        let order = self.validate(request, client_ip)?;

        let Some(shop) = self.shops.find_by_domain(&order.shop_domain).await? else {
            return Err(SubmitError::ShopNotAuthorized);
        };
        let Some(access_token) = shop.usable_token() else {
            return Err(SubmitError::ShopNotAuthorized);
        };
        let creds = ShopCredentials {
            domain: &shop.domain,
            access_token,
        };

        let customer_id = self.resolve_customer(&creds, &order).await;

        let payload = self.compose_order(&order, customer_id);
        let created = self
            .commerce
            .create_order(&creds, &payload)
            .await
            .map_err(SubmitError::order_creation)?;

        tracing::info!(
            order_id = created.id,
            order_number = ?created.order_number,
            shop = %shop.domain,
            "COD order created"
        );

        // Non-fatal side effects, in a fixed order.
        self.record_marketing_event(&creds, &shop, &order, created.id)
            .await;
        self.write_tracking_metafields(&creds, &order, created.id)
            .await;
        self.send_conversion_events(&shop, &order, &created).await;
        self.persist_local_copy(&shop, &order, created.id).await;

        let redirect_url =
            resolve_redirect_url(created.order_status_url.as_deref(), Some(created.id), &shop.domain);

        Ok(SubmitOutcome {
            order_id: ExternalOrderId::new(created.id),
            order_number: created.order_number,
            order_name: created.name.clone(),
            redirect_url,
        })
    }

    /// Step 1: required fields and defaults. No external calls happen
    /// before this passes.
    fn validate(
        &self,
        request: PendingOrder,
        client_ip: Option<String>,
    ) -> Result<ValidatedOrder, SubmitError> {
        let shop_domain = required(request.shop, "shop")?;
        let customer_name = required(request.customer_name, "customerName")?;
        let raw_phone = required(request.customer_phone, "customerPhone")?;
        let address = required(request.customer_address, "customerAddress")?;

        let payment_type = request
            .cod_payment_type
            .as_deref()
            .unwrap_or_default()
            .parse::<CodPaymentType>()
            .map_err(|_| {
                SubmitError::Validation(
                    "codPaymentType must be \"cash\" or \"card\"".to_owned(),
                )
            })?;

        let phone = PhoneNumber::parse(&raw_phone)
            .map_err(|e| SubmitError::Validation(format!("customerPhone: {e}")))?;

        let mut items = Vec::with_capacity(request.cart_items.len());
        for item in &request.cart_items {
            let Some(variant_id) = item.variant_id.or(item.id) else {
                return Err(SubmitError::Validation(
                    "cart item missing variant id".to_owned(),
                ));
            };
            items.push(ValidatedItem {
                variant_id,
                quantity: item.quantity,
                price: MinorUnits::new(item.price),
            });
        }

        let computed_total = items.iter().fold(MinorUnits::ZERO, |acc, item| {
            acc.saturating_add(item.price.saturating_mul(item.quantity))
        });
        let total = request.total_amount.map_or(computed_total, MinorUnits::new);

        let checkout_token = request
            .cart_token
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(synthesize_checkout_token);

        let (first_name, last_name) = split_name(&customer_name);

        Ok(ValidatedOrder {
            shop_domain,
            customer_name,
            first_name,
            last_name,
            phone,
            email: request.customer_email.filter(|e| !e.trim().is_empty()),
            address,
            city: request.customer_city.unwrap_or_default(),
            country: request
                .customer_country
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| self.default_country.clone()),
            zip: request.customer_zip.filter(|z| !z.trim().is_empty()),
            items,
            total,
            checkout_token,
            payment_type,
            landing_page: request.landing_page.filter(|l| !l.trim().is_empty()),
            referring_site: request.referring_site.filter(|r| !r.trim().is_empty()),
            user_agent: request.user_agent,
            client_ip,
        })
    }

    /// Step 3: match an existing customer by phone, otherwise try to create
    /// one. Both failures fall through to inline customer fields.
    async fn resolve_customer(
        &self,
        creds: &ShopCredentials<'_>,
        order: &ValidatedOrder,
    ) -> Option<i64> {
        match self
            .commerce
            .search_customer_by_phone(creds, &order.phone)
            .await
        {
            Ok(Some(id)) => {
                tracing::info!(customer_id = id, "Existing customer matched by phone");
                return Some(id);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Customer search failed; continuing"),
        }

        let payload = CustomerPayload {
            first_name: order.first_name.clone(),
            last_name: order.last_name.clone(),
            email: order.email.clone().unwrap_or_else(placeholder_email),
            phone: order.phone.with_country_prefix(),
            verified_email: false,
            tags: String::new(),
        };

        match self.commerce.create_customer(creds, &payload).await {
            Ok(id) => {
                tracing::info!(customer_id = id, "Customer created");
                Some(id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Customer creation failed; using inline customer fields");
                None
            }
        }
    }

    /// Step 4: the full order document.
    fn compose_order(&self, order: &ValidatedOrder, customer_id: Option<i64>) -> OrderPayload {
        let address = AddressPayload {
            first_name: order.first_name.clone(),
            last_name: order.last_name.clone(),
            address1: order.address.clone(),
            city: order.city.clone(),
            province: order.city.clone(),
            country: order.country.clone(),
            zip: order.zip.clone().unwrap_or_default(),
            phone: order.phone.as_str().to_owned(),
        };

        // The platform payload carries per-line totals in major units; the
        // declared order total is the sum of these.
        let line_items = order
            .items
            .iter()
            .map(|item| LineItemPayload {
                variant_id: item.variant_id,
                quantity: item.quantity,
                price: item.price.saturating_mul(item.quantity).to_major_string(),
            })
            .collect();

        let customer = customer_id.map_or_else(
            || CustomerRef::Inline {
                first_name: order.first_name.clone(),
                last_name: order.last_name.clone(),
                email: order.email.clone().unwrap_or_else(placeholder_email),
            },
            |id| CustomerRef::Existing { id },
        );

        let note = format!(
            "Pay on Delivery (COD) - Phone Verified Order\n\
             Payment Method: {label}\n\
             Checkout Token: {token}\n\
             Landing Page: {landing}\n\
             Referring Site: {referrer}\n\
             Browser IP: {ip}\n\
             User Agent: {agent}",
            label = order.payment_type.label(),
            token = order.checkout_token,
            landing = order.landing_page.as_deref().unwrap_or("N/A"),
            referrer = order.referring_site.as_deref().unwrap_or("Direct"),
            ip = order.client_ip.as_deref().unwrap_or("N/A"),
            agent = order.user_agent.as_deref().unwrap_or("N/A"),
        );

        OrderPayload {
            line_items,
            customer,
            shipping_address: address.clone(),
            billing_address: address,
            note,
            tags: format!("COD, WhatsApp-Verified, {}", order.payment_type.tag()),
            source_name: CONVERSION_SOURCE.to_owned(),
            source_identifier: order.checkout_token.clone(),
            source_url: order.landing_page.clone(),
            financial_status: "pending".to_owned(),
            fulfillment_status: None,
            transactions: vec![TransactionPayload {
                kind: "sale".to_owned(),
                status: "pending".to_owned(),
                amount: order.total.to_major_string(),
                gateway: "Cash on Delivery".to_owned(),
            }],
            inventory_behaviour: "decrement_ignoring_policy".to_owned(),
            send_receipt: false,
            send_fulfillment_receipt: false,
        }
    }

    /// Side effect (a): marketing event plus a same-day engagement so the
    /// conversion shows up in the platform's attribution reporting.
    async fn record_marketing_event(
        &self,
        creds: &ShopCredentials<'_>,
        shop: &Shop,
        order: &ValidatedOrder,
        order_id: i64,
    ) {
        let referring_domain = order
            .referring_site
            .as_deref()
            .and_then(|site| Url::parse(site).ok())
            .and_then(|url| url.host_str().map(str::to_owned))
            .unwrap_or_else(|| shop.domain.clone());

        let event = MarketingEventPayload {
            remote_id: format!("cod_{order_id}_{}", Utc::now().timestamp_millis()),
            event_type: MARKETING_EVENT_TYPE.to_owned(),
            marketing_channel: MARKETING_CHANNEL.to_owned(),
            paid: false,
            started_at: Utc::now().to_rfc3339(),
            referring_domain,
            budget: MARKETING_EVENT_BUDGET.to_owned(),
            currency: self.currency.clone(),
            budget_type: MARKETING_EVENT_BUDGET_TYPE.to_owned(),
            utm_campaign: format!("cod_whatsapp_{order_id}"),
            utm_source: MARKETING_UTM_SOURCE.to_owned(),
            utm_medium: MARKETING_UTM_MEDIUM.to_owned(),
            description: "COD WhatsApp Verified Order".to_owned(),
            manage_url: format!("https://{}/admin/orders/{order_id}", shop.domain),
            preview_url: order
                .landing_page
                .clone()
                .unwrap_or_else(|| format!("https://{}", shop.domain)),
            tactic: MARKETING_EVENT_TACTIC.to_owned(),
        };

        let Some(event_id) = run_side_effect(
            "marketing_event",
            self.commerce.create_marketing_event(creds, &event),
        )
        .await
        else {
            return;
        };

        let engagement = EngagementPayload {
            occurred_on: Utc::now().format("%Y-%m-%d").to_string(),
            impressions_count: 1,
            views_count: 1,
            clicks_count: 1,
            shares_count: 0,
            favorites_count: 0,
            comments_count: 0,
            ad_spend: 0,
            is_cumulative: false,
            utc_offset: ENGAGEMENT_UTC_OFFSET.to_owned(),
        };
        run_side_effect(
            "marketing_engagement",
            self.commerce.create_engagement(creds, event_id, &engagement),
        )
        .await;
    }

    /// Side effect (b): the fixed tracking key/value set, one metafield per
    /// call, each isolated.
    async fn write_tracking_metafields(
        &self,
        creds: &ShopCredentials<'_>,
        order: &ValidatedOrder,
        order_id: i64,
    ) {
        let fields = [
            MetafieldPayload::tracking("checkout_token", order.checkout_token.clone()),
            MetafieldPayload::tracking(
                "landing_page",
                order.landing_page.clone().unwrap_or_else(|| "Direct".to_owned()),
            ),
            MetafieldPayload::tracking(
                "referring_site",
                order
                    .referring_site
                    .clone()
                    .unwrap_or_else(|| "Direct".to_owned()),
            ),
            MetafieldPayload::tracking(
                "browser_ip",
                order.client_ip.clone().unwrap_or_else(|| "Unknown".to_owned()),
            ),
            MetafieldPayload::tracking("conversion_source", CONVERSION_SOURCE),
        ];

        for field in fields {
            run_side_effect(
                "order_metafield",
                self.commerce.create_order_metafield(creds, order_id, &field),
            )
            .await;
        }
    }

    /// Side effect (c): one purchase event per active pixel, each isolated.
    async fn send_conversion_events(
        &self,
        shop: &Shop,
        order: &ValidatedOrder,
        created: &CreatedOrder,
    ) {
        let pixels = match self.shops.active_pixels(shop.id).await {
            Ok(pixels) => pixels,
            Err(e) => {
                tracing::warn!(error = %e, "Pixel lookup failed; skipping conversion events");
                return;
            }
        };
        if pixels.is_empty() {
            tracing::debug!(shop = %shop.domain, "No active pixels registered");
            return;
        }

        let event = PurchaseEvent {
            event_source_url: format!("https://{}", shop.domain),
            currency: self.currency.clone(),
            value: created
                .total_price
                .clone()
                .unwrap_or_else(|| order.total.to_major_string()),
            order_id: created.id,
            contents: order
                .items
                .iter()
                .map(|item| PurchaseContent {
                    id: item.variant_id,
                    quantity: item.quantity,
                    item_price: item.price.to_major_string(),
                })
                .collect(),
            email: order.email.clone(),
            phone: Some(order.phone.as_str().to_owned()),
            first_name: Some(order.first_name.clone()),
            last_name: (!order.last_name.is_empty()).then(|| order.last_name.clone()),
            city: (!order.city.is_empty()).then(|| order.city.clone()),
            country: Some(order.country.clone()),
            client_ip: order.client_ip.clone(),
            user_agent: order.user_agent.clone(),
        };

        for pixel in pixels {
            run_side_effect(
                "conversion_event",
                self.conversions.send_purchase_event(&pixel, &event),
            )
            .await;
        }
    }

    /// Step 6: local denormalized copy. The platform record is already
    /// authoritative, so failure here is logged only.
    async fn persist_local_copy(&self, shop: &Shop, order: &ValidatedOrder, order_id: i64) {
        let copy = SubmittedOrder {
            shop_id: shop.id,
            external_order_id: ExternalOrderId::new(order_id),
            customer_name: order.customer_name.clone(),
            customer_phone: order.phone.clone(),
            customer_email: order.email.clone(),
            customer_address: order.address.clone(),
            customer_city: order.city.clone(),
            customer_country: order.country.clone(),
            customer_zip: order.zip.clone(),
            payment_method: order.payment_type,
            status: OrderStatus::Pending,
            total_amount: order.total,
        };
        run_side_effect("persist_order", self.store.insert(&copy)).await;
    }
}

/// Await one non-fatal side effect. Failures are logged and swallowed so
/// they can never alter the submission result.
async fn run_side_effect<T, E, F>(name: &str, fut: F) -> Option<T>
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(side_effect = name, error = %e, "Side effect failed; continuing");
            None
        }
    }
}

/// Reject absent or blank required fields.
fn required(value: Option<String>, field: &str) -> Result<String, SubmitError> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SubmitError::Validation(format!("missing required field: {field}")))
}

/// Best-effort name split: first token is the first name, the rest joined
/// is the last name (possibly empty). Downstream reporting depends on this
/// exact behavior.
fn split_name(full: &str) -> (String, String) {
    let mut parts = full.split_whitespace();
    let first = parts.next().unwrap_or(full).to_owned();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

/// Placeholder email for customers who gave none.
fn placeholder_email() -> String {
    format!("cod-{}@doorstep.local", Utc::now().timestamp_millis())
}

/// Server-side checkout token when the client supplied none.
fn synthesize_checkout_token() -> String {
    let suffix: String = rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(7)
        .map(char::from)
        .collect();
    format!(
        "cod_{}_{}",
        Utc::now().timestamp_millis(),
        suffix.to_lowercase()
    )
}

/// The three-tier redirect fallback: platform order-status URL, synthesized
/// order path, shop root. Always yields a non-empty URL.
fn resolve_redirect_url(
    order_status_url: Option<&str>,
    order_id: Option<i64>,
    shop_domain: &str,
) -> String {
    if let Some(url) = order_status_url
        && !url.is_empty()
    {
        return url.to_owned();
    }
    if let Some(id) = order_id {
        return format!("https://{shop_domain}/account/orders/{id}");
    }
    format!("https://{shop_domain}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_name_two_tokens() {
        let (first, last) = split_name("Ayşe Yılmaz");
        assert_eq!(first, "Ayşe");
        assert_eq!(last, "Yılmaz");
    }

    #[test]
    fn test_split_name_many_tokens() {
        let (first, last) = split_name("Mehmet Ali Kaya");
        assert_eq!(first, "Mehmet");
        assert_eq!(last, "Ali Kaya");
    }

    #[test]
    fn test_split_name_single_token_has_empty_last_name() {
        let (first, last) = split_name("Ayşe");
        assert_eq!(first, "Ayşe");
        assert_eq!(last, "");
    }

    #[test]
    fn test_redirect_prefers_platform_url() {
        let url = resolve_redirect_url(
            Some("https://checkout.example.com/orders/abc/status"),
            Some(42),
            "shop.myshopify.com",
        );
        assert_eq!(url, "https://checkout.example.com/orders/abc/status");
    }

    #[test]
    fn test_redirect_synthesizes_order_path() {
        let url = resolve_redirect_url(None, Some(42), "shop.myshopify.com");
        assert_eq!(url, "https://shop.myshopify.com/account/orders/42");

        // An empty platform URL counts as absent.
        let url = resolve_redirect_url(Some(""), Some(42), "shop.myshopify.com");
        assert_eq!(url, "https://shop.myshopify.com/account/orders/42");
    }

    #[test]
    fn test_redirect_falls_back_to_shop_root() {
        let url = resolve_redirect_url(None, None, "shop.myshopify.com");
        assert_eq!(url, "https://shop.myshopify.com");
    }

    #[test]
    fn test_synthesized_checkout_token_shape() {
        let token = synthesize_checkout_token();
        assert!(token.starts_with("cod_"));
        assert_eq!(token.split('_').count(), 3);
    }

    #[test]
    fn test_required_rejects_blank() {
        assert!(required(Some("  ".to_owned()), "shop").is_err());
        assert!(required(None, "shop").is_err());
        assert_eq!(
            required(Some(" x ".to_owned()), "shop").expect("valid"),
            "x"
        );
    }
}

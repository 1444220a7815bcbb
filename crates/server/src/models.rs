//! Domain models persisted by the gateway.

use chrono::{DateTime, Utc};
use doorstep_core::{
    CodPaymentType, ExternalOrderId, MinorUnits, OrderStatus, PhoneNumber, PixelRowId, ShopId,
    VerificationId,
};

/// A store that installed the app.
///
/// `access_token` is absent until the merchant completes authorization;
/// shops are deactivated, never deleted.
#[derive(Debug, Clone)]
pub struct Shop {
    pub id: ShopId,
    pub domain: String,
    pub access_token: Option<String>,
    pub is_active: bool,
    pub cod_enabled: bool,
    pub whatsapp_enabled: bool,
}

impl Shop {
    /// The credential to use for Admin API calls, if the shop is usable.
    ///
    /// A deactivated shop or one that never finished authorization has no
    /// usable credential.
    #[must_use]
    pub fn usable_token(&self) -> Option<&str> {
        if !self.is_active {
            return None;
        }
        self.access_token.as_deref()
    }
}

/// A Meta tracking pixel registered for a shop.
#[derive(Debug, Clone)]
pub struct MetaPixel {
    pub id: PixelRowId,
    pub shop_id: ShopId,
    pub pixel_id: String,
    pub access_token: Option<String>,
    pub is_active: bool,
}

/// A one-time code issued for a phone number.
///
/// At most one unverified record is meaningful per phone at a time; issuing
/// a new code supersedes any prior unverified record.
#[derive(Debug, Clone)]
pub struct VerificationRecord {
    pub id: VerificationId,
    pub phone_number: PhoneNumber,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub verified: bool,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}

impl VerificationRecord {
    /// Whether the code's validity window has passed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Local denormalized copy of an order placed on the commerce platform.
///
/// The platform record is authoritative; this copy exists for merchant-side
/// reporting and never blocks the order response.
#[derive(Debug, Clone)]
pub struct SubmittedOrder {
    pub shop_id: ShopId,
    pub external_order_id: ExternalOrderId,
    pub customer_name: String,
    pub customer_phone: PhoneNumber,
    pub customer_email: Option<String>,
    pub customer_address: String,
    pub customer_city: String,
    pub customer_country: String,
    pub customer_zip: Option<String>,
    pub payment_method: CodPaymentType,
    pub status: OrderStatus,
    pub total_amount: MinorUnits,
}

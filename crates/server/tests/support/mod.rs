//! Shared test doubles for the service-level tests: counting commerce and
//! conversion stubs plus model builders.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use doorstep_core::{PhoneNumber, PixelRowId, ShopId};
use doorstep_server::meta::{CapiError, ConversionGateway, PurchaseEvent};
use doorstep_server::models::{MetaPixel, Shop};
use doorstep_server::services::{CartItem, PendingOrder};
use doorstep_server::shopify::types::{
    CreatedOrder, CustomerPayload, EngagementPayload, MarketingEventPayload, MetafieldPayload,
    OrderPayload,
};
use doorstep_server::shopify::{CommerceGateway, ShopCredentials, ShopifyError};

/// Commerce stub that counts every call and fails on command.
pub struct StubCommerce {
    pub calls: AtomicUsize,
    pub fail_order: bool,
    pub fail_side_effects: bool,
    pub fail_customer_calls: bool,
    pub existing_customer: Option<i64>,
    pub order_status_url: Option<String>,
    pub last_order: Mutex<Option<OrderPayload>>,
}

impl Default for StubCommerce {
    fn default() -> Self {
        Self::new()
    }
}

impl StubCommerce {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_order: false,
            fail_side_effects: false,
            fail_customer_calls: false,
            existing_customer: None,
            order_status_url: None,
            last_order: Mutex::new(None),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_order(&self) -> Option<OrderPayload> {
        self.last_order.lock().expect("lock poisoned").clone()
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn side_effect_error(&self) -> ShopifyError {
        ShopifyError::Api {
            status: 500,
            message: "simulated side effect failure".to_owned(),
        }
    }
}

pub const STUB_ORDER_ID: i64 = 880_001;

#[async_trait]
impl CommerceGateway for StubCommerce {
    async fn search_customer_by_phone(
        &self,
        _creds: &ShopCredentials<'_>,
        _phone: &PhoneNumber,
    ) -> Result<Option<i64>, ShopifyError> {
        self.count();
        if self.fail_customer_calls {
            return Err(self.side_effect_error());
        }
        Ok(self.existing_customer)
    }

    async fn create_customer(
        &self,
        _creds: &ShopCredentials<'_>,
        _customer: &CustomerPayload,
    ) -> Result<i64, ShopifyError> {
        self.count();
        if self.fail_customer_calls {
            return Err(self.side_effect_error());
        }
        Ok(777)
    }

    async fn create_order(
        &self,
        _creds: &ShopCredentials<'_>,
        order: &OrderPayload,
    ) -> Result<CreatedOrder, ShopifyError> {
        self.count();
        if self.fail_order {
            return Err(ShopifyError::Api {
                status: 422,
                message: "{\"errors\":{\"line_items\":\"invalid\"}}".to_owned(),
            });
        }
        *self.last_order.lock().expect("lock poisoned") = Some(order.clone());
        Ok(CreatedOrder {
            id: STUB_ORDER_ID,
            order_number: Some(1001),
            name: Some("#1001".to_owned()),
            order_status_url: self.order_status_url.clone(),
            total_price: None,
        })
    }

    async fn create_marketing_event(
        &self,
        _creds: &ShopCredentials<'_>,
        _event: &MarketingEventPayload,
    ) -> Result<i64, ShopifyError> {
        self.count();
        if self.fail_side_effects {
            return Err(self.side_effect_error());
        }
        Ok(55)
    }

    async fn create_engagement(
        &self,
        _creds: &ShopCredentials<'_>,
        _marketing_event_id: i64,
        _engagement: &EngagementPayload,
    ) -> Result<(), ShopifyError> {
        self.count();
        if self.fail_side_effects {
            return Err(self.side_effect_error());
        }
        Ok(())
    }

    async fn create_order_metafield(
        &self,
        _creds: &ShopCredentials<'_>,
        _order_id: i64,
        _metafield: &MetafieldPayload,
    ) -> Result<(), ShopifyError> {
        self.count();
        if self.fail_side_effects {
            return Err(self.side_effect_error());
        }
        Ok(())
    }
}

/// Conversion stub that records attempted pixels and can fail one of them.
#[derive(Default)]
pub struct StubConversion {
    pub attempted: Mutex<Vec<String>>,
    pub fail_pixel: Option<String>,
}

impl StubConversion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempted_pixels(&self) -> Vec<String> {
        self.attempted.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl ConversionGateway for StubConversion {
    async fn send_purchase_event(
        &self,
        pixel: &MetaPixel,
        _event: &PurchaseEvent,
    ) -> Result<(), CapiError> {
        self.attempted
            .lock()
            .expect("lock poisoned")
            .push(pixel.pixel_id.clone());
        if self.fail_pixel.as_deref() == Some(pixel.pixel_id.as_str()) {
            return Err(CapiError::Api {
                status: 400,
                message: "simulated pixel failure".to_owned(),
            });
        }
        Ok(())
    }
}

/// An authorized, active shop.
pub fn authorized_shop() -> Shop {
    Shop {
        id: ShopId::new(1),
        domain: "teststore.myshopify.com".to_owned(),
        access_token: Some("shpat_test_token".to_owned()),
        is_active: true,
        cod_enabled: true,
        whatsapp_enabled: true,
    }
}

/// A shop that never finished authorization.
pub fn unauthorized_shop() -> Shop {
    Shop {
        access_token: None,
        ..authorized_shop()
    }
}

pub fn pixel(id: i32, pixel_id: &str) -> MetaPixel {
    MetaPixel {
        id: PixelRowId::new(id),
        shop_id: ShopId::new(1),
        pixel_id: pixel_id.to_owned(),
        access_token: Some("capi_token".to_owned()),
        is_active: true,
    }
}

/// A complete, valid COD order request.
pub fn valid_order() -> PendingOrder {
    PendingOrder {
        shop: Some("teststore.myshopify.com".to_owned()),
        customer_name: Some("Ayşe Yılmaz".to_owned()),
        customer_phone: Some("5551234567".to_owned()),
        customer_email: Some("ayse@example.com".to_owned()),
        customer_address: Some("Atatürk Cad. No:1".to_owned()),
        customer_city: Some("İstanbul".to_owned()),
        customer_country: Some("TR".to_owned()),
        customer_zip: Some("34000".to_owned()),
        cart_items: vec![
            CartItem {
                variant_id: Some(1),
                id: None,
                quantity: 2,
                price: 1000,
            },
            CartItem {
                variant_id: Some(2),
                id: None,
                quantity: 1,
                price: 500,
            },
        ],
        total_amount: Some(2500),
        cart_token: Some("cart_abc123".to_owned()),
        cod_payment_type: Some("cash".to_owned()),
        landing_page: Some("https://teststore.myshopify.com/products/widget".to_owned()),
        referring_site: Some("https://instagram.com/teststore".to_owned()),
        user_agent: Some("Mozilla/5.0".to_owned()),
    }
}

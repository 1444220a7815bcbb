//! In-memory repository fakes.
//!
//! These back the service tests (and local experimentation) without a
//! database. Behavior mirrors the Postgres implementations: latest-unverified
//! selection, supersede-on-insert, deactivate-not-delete.

use std::sync::Mutex;
use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use doorstep_core::{ExternalOrderId, PhoneNumber, ShopId, VerificationId};

use super::{OrderStore, RepositoryError, ShopDirectory, VerificationStore};
use crate::models::{MetaPixel, Shop, SubmittedOrder, VerificationRecord};

/// In-memory [`ShopDirectory`].
#[derive(Default)]
pub struct MemoryShopDirectory {
    shops: Mutex<Vec<Shop>>,
    pixels: Mutex<Vec<MetaPixel>>,
}

impl MemoryShopDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shop.
    pub fn add_shop(&self, shop: Shop) {
        self.shops
            .lock()
            .expect("shop directory lock poisoned")
            .push(shop);
    }

    /// Register a pixel.
    pub fn add_pixel(&self, pixel: MetaPixel) {
        self.pixels
            .lock()
            .expect("pixel lock poisoned")
            .push(pixel);
    }
}

#[async_trait]
impl ShopDirectory for MemoryShopDirectory {
    async fn find_by_domain(&self, domain: &str) -> Result<Option<Shop>, RepositoryError> {
        let shops = self.shops.lock().expect("shop directory lock poisoned");
        Ok(shops.iter().find(|s| s.domain == domain).cloned())
    }

    async fn active_pixels(&self, shop_id: ShopId) -> Result<Vec<MetaPixel>, RepositoryError> {
        let pixels = self.pixels.lock().expect("pixel lock poisoned");
        Ok(pixels
            .iter()
            .filter(|p| p.shop_id == shop_id && p.is_active)
            .cloned()
            .collect())
    }

    async fn deactivate(&self, domain: &str) -> Result<(), RepositoryError> {
        let mut shops = self.shops.lock().expect("shop directory lock poisoned");
        for shop in shops.iter_mut().filter(|s| s.domain == domain) {
            shop.is_active = false;
        }
        Ok(())
    }
}

/// In-memory [`VerificationStore`].
#[derive(Default)]
pub struct MemoryVerificationStore {
    records: Mutex<Vec<VerificationRecord>>,
    next_id: AtomicI32,
}

impl MemoryVerificationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held (verified or not).
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().expect("verification lock poisoned").len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The latest record for a phone regardless of verification state.
    #[must_use]
    pub fn latest(&self, phone: &PhoneNumber) -> Option<VerificationRecord> {
        let records = self.records.lock().expect("verification lock poisoned");
        records
            .iter()
            .filter(|r| &r.phone_number == phone)
            .max_by_key(|r| (r.created_at, r.id.as_i32()))
            .cloned()
    }
}

#[async_trait]
impl VerificationStore for MemoryVerificationStore {
    async fn latest_unverified(
        &self,
        phone: &PhoneNumber,
    ) -> Result<Option<VerificationRecord>, RepositoryError> {
        let records = self.records.lock().expect("verification lock poisoned");
        Ok(records
            .iter()
            .filter(|r| &r.phone_number == phone && !r.verified)
            .max_by_key(|r| (r.created_at, r.id.as_i32()))
            .cloned())
    }

    async fn delete_unverified(&self, phone: &PhoneNumber) -> Result<(), RepositoryError> {
        let mut records = self.records.lock().expect("verification lock poisoned");
        records.retain(|r| &r.phone_number != phone || r.verified);
        Ok(())
    }

    async fn insert(
        &self,
        phone: &PhoneNumber,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<VerificationRecord, RepositoryError> {
        let id = VerificationId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let record = VerificationRecord {
            id,
            phone_number: phone.clone(),
            code: code.to_owned(),
            expires_at,
            verified: false,
            attempts: 0,
            created_at: Utc::now(),
        };
        self.records
            .lock()
            .expect("verification lock poisoned")
            .push(record.clone());
        Ok(record)
    }

    async fn increment_attempts(&self, id: VerificationId) -> Result<i32, RepositoryError> {
        let mut records = self.records.lock().expect("verification lock poisoned");
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepositoryError::NotFound)?;
        record.attempts += 1;
        Ok(record.attempts)
    }

    async fn mark_verified(&self, id: VerificationId) -> Result<(), RepositoryError> {
        let mut records = self.records.lock().expect("verification lock poisoned");
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepositoryError::NotFound)?;
        record.verified = true;
        Ok(())
    }

    async fn delete(&self, id: VerificationId) -> Result<(), RepositoryError> {
        let mut records = self.records.lock().expect("verification lock poisoned");
        records.retain(|r| r.id != id);
        Ok(())
    }
}

/// In-memory [`OrderStore`].
#[derive(Default)]
pub struct MemoryOrderStore {
    orders: Mutex<Vec<SubmittedOrder>>,
}

impl MemoryOrderStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of orders persisted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.lock().expect("order lock poisoned").len()
    }

    /// Whether the store holds no orders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: &SubmittedOrder) -> Result<(), RepositoryError> {
        let mut orders = self.orders.lock().expect("order lock poisoned");
        if orders
            .iter()
            .any(|o| o.external_order_id == order.external_order_id)
        {
            return Err(RepositoryError::Conflict(
                "external order id already recorded".to_owned(),
            ));
        }
        orders.push(order.clone());
        Ok(())
    }

    async fn find_by_external_id(
        &self,
        id: ExternalOrderId,
    ) -> Result<Option<SubmittedOrder>, RepositoryError> {
        let orders = self.orders.lock().expect("order lock poisoned");
        Ok(orders.iter().find(|o| o.external_order_id == id).cloned())
    }
}

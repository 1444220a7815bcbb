//! Database operations and repository abstractions.
//!
//! # Database
//!
//! Stores local data only (the commerce platform is the source of truth for
//! the orders themselves):
//!
//! ## Tables
//!
//! - `shops` - Installed shops with their Admin API credential and flags
//! - `meta_pixels` - Tracking pixels registered per shop
//! - `verifications` - One-time codes keyed by phone number
//! - `orders` - Denormalized copies of submitted orders
//!
//! # Repositories
//!
//! Access goes through the [`ShopDirectory`], [`VerificationStore`], and
//! [`OrderStore`] traits so the services never see a concrete database
//! handle; production wires in the Postgres implementations, tests wire in
//! [`memory`] fakes.
//!
//! # Migrations
//!
//! Migrations are embedded from `crates/server/migrations/` and run on
//! startup via [`run_migrations`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use doorstep_core::{ExternalOrderId, PhoneNumber, ShopId, VerificationId};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::models::{MetaPixel, Shop, SubmittedOrder, VerificationRecord};

pub mod memory;
pub mod orders;
pub mod shops;
pub mod verifications;

pub use memory::{MemoryOrderStore, MemoryShopDirectory, MemoryVerificationStore};
pub use orders::PgOrderStore;
pub use shops::PgShopDirectory;
pub use verifications::PgVerificationStore;

/// Embedded migrations from `crates/server/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Error type for repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate external order id).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Run embedded migrations against the pool.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Lookup of installed shops and their tracking pixels.
#[async_trait]
pub trait ShopDirectory: Send + Sync {
    /// Find a shop by its domain.
    async fn find_by_domain(&self, domain: &str) -> Result<Option<Shop>, RepositoryError>;

    /// List the active tracking pixels registered for a shop.
    async fn active_pixels(&self, shop_id: ShopId) -> Result<Vec<MetaPixel>, RepositoryError>;

    /// Mark a shop inactive (shops are never hard-deleted).
    async fn deactivate(&self, domain: &str) -> Result<(), RepositoryError>;
}

/// Persistence for one-time verification codes.
#[async_trait]
pub trait VerificationStore: Send + Sync {
    /// The most recently created unverified record for a phone, if any.
    async fn latest_unverified(
        &self,
        phone: &PhoneNumber,
    ) -> Result<Option<VerificationRecord>, RepositoryError>;

    /// Delete every unverified record for a phone (a new code supersedes
    /// all prior ones).
    async fn delete_unverified(&self, phone: &PhoneNumber) -> Result<(), RepositoryError>;

    /// Insert a fresh record with zero attempts.
    async fn insert(
        &self,
        phone: &PhoneNumber,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<VerificationRecord, RepositoryError>;

    /// Increment the attempt counter, returning the new count.
    async fn increment_attempts(&self, id: VerificationId) -> Result<i32, RepositoryError>;

    /// Mark a record verified.
    async fn mark_verified(&self, id: VerificationId) -> Result<(), RepositoryError>;

    /// Delete a record (expired or exhausted).
    async fn delete(&self, id: VerificationId) -> Result<(), RepositoryError>;
}

/// Persistence for local order copies.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a local copy of a submitted order.
    async fn insert(&self, order: &SubmittedOrder) -> Result<(), RepositoryError>;

    /// Look up a local copy by the platform's order id.
    async fn find_by_external_id(
        &self,
        id: ExternalOrderId,
    ) -> Result<Option<SubmittedOrder>, RepositoryError>;
}

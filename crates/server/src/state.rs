//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::db::{PgOrderStore, PgShopDirectory, PgVerificationStore, ShopDirectory};
use crate::meta::{CapiClient, CapiError};
use crate::services::{OrderOrchestrator, SmsError, SmsGatewayClient, VerificationService};
use crate::shopify::{AdminRestClient, ShopifyError};

/// Error wiring up the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateInitError {
    #[error("shopify client: {0}")]
    Shopify(#[from] ShopifyError),
    #[error("conversion client: {0}")]
    Capi(#[from] CapiError),
    #[error("sms client: {0}")]
    Sms(#[from] SmsError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// services, the shop directory, and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    shops: Arc<dyn ShopDirectory>,
    verification: VerificationService,
    orchestrator: OrderOrchestrator,
}

impl AppState {
    /// Create a new application state with Postgres-backed stores and live
    /// gateway clients.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the HTTP clients fail to build.
    pub fn new(config: AppConfig, pool: PgPool) -> Result<Self, StateInitError> {
        let shops: Arc<dyn ShopDirectory> = Arc::new(PgShopDirectory::new(pool.clone()));
        let verifications = Arc::new(PgVerificationStore::new(pool.clone()));
        let orders = Arc::new(PgOrderStore::new(pool.clone()));

        let sms = Arc::new(SmsGatewayClient::new(&config.sms)?);
        let commerce = Arc::new(AdminRestClient::new(&config.shopify)?);
        let conversions = Arc::new(CapiClient::new(&config.capi)?);

        let verification = VerificationService::new(verifications, sms);
        let orchestrator = OrderOrchestrator::new(
            Arc::clone(&shops),
            orders,
            commerce,
            conversions,
            config.currency.clone(),
            config.default_country.clone(),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                shops,
                verification,
                orchestrator,
            }),
        })
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the shop directory.
    #[must_use]
    pub fn shops(&self) -> &Arc<dyn ShopDirectory> {
        &self.inner.shops
    }

    /// Get a reference to the verification service.
    #[must_use]
    pub fn verification(&self) -> &VerificationService {
        &self.inner.verification
    }

    /// Get a reference to the order orchestrator.
    #[must_use]
    pub fn orders(&self) -> &OrderOrchestrator {
        &self.inner.orchestrator
    }
}

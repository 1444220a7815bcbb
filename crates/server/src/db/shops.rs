//! Shop directory backed by `PostgreSQL`.

use async_trait::async_trait;
use doorstep_core::{PixelRowId, ShopId};
use sqlx::PgPool;

use super::{RepositoryError, ShopDirectory};
use crate::models::{MetaPixel, Shop};

/// Postgres-backed [`ShopDirectory`].
#[derive(Clone)]
pub struct PgShopDirectory {
    pool: PgPool,
}

impl PgShopDirectory {
    /// Create a new shop directory over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ShopRow {
    id: ShopId,
    domain: String,
    access_token: Option<String>,
    is_active: bool,
    cod_enabled: bool,
    whatsapp_enabled: bool,
}

impl From<ShopRow> for Shop {
    fn from(row: ShopRow) -> Self {
        Self {
            id: row.id,
            domain: row.domain,
            access_token: row.access_token,
            is_active: row.is_active,
            cod_enabled: row.cod_enabled,
            whatsapp_enabled: row.whatsapp_enabled,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PixelRow {
    id: PixelRowId,
    shop_id: ShopId,
    pixel_id: String,
    access_token: Option<String>,
    is_active: bool,
}

impl From<PixelRow> for MetaPixel {
    fn from(row: PixelRow) -> Self {
        Self {
            id: row.id,
            shop_id: row.shop_id,
            pixel_id: row.pixel_id,
            access_token: row.access_token,
            is_active: row.is_active,
        }
    }
}

#[async_trait]
impl ShopDirectory for PgShopDirectory {
    async fn find_by_domain(&self, domain: &str) -> Result<Option<Shop>, RepositoryError> {
        let row = sqlx::query_as::<_, ShopRow>(
            r"
            SELECT id, domain, access_token, is_active, cod_enabled, whatsapp_enabled
            FROM shops
            WHERE domain = $1
            ",
        )
        .bind(domain)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Shop::from))
    }

    async fn active_pixels(&self, shop_id: ShopId) -> Result<Vec<MetaPixel>, RepositoryError> {
        let rows = sqlx::query_as::<_, PixelRow>(
            r"
            SELECT id, shop_id, pixel_id, access_token, is_active
            FROM meta_pixels
            WHERE shop_id = $1 AND is_active
            ORDER BY id
            ",
        )
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MetaPixel::from).collect())
    }

    async fn deactivate(&self, domain: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE shops
            SET is_active = FALSE, updated_at = NOW()
            WHERE domain = $1
            ",
        )
        .bind(domain)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

//! Local order-copy store backed by `PostgreSQL`.

use async_trait::async_trait;
use doorstep_core::{CodPaymentType, ExternalOrderId, MinorUnits, OrderStatus, PhoneNumber, ShopId};
use sqlx::PgPool;

use super::{OrderStore, RepositoryError};
use crate::models::SubmittedOrder;

/// Postgres-backed [`OrderStore`].
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a new order store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    shop_id: ShopId,
    external_order_id: i64,
    customer_name: String,
    customer_phone: PhoneNumber,
    customer_email: Option<String>,
    customer_address: String,
    customer_city: String,
    customer_country: String,
    customer_zip: Option<String>,
    payment_method: String,
    status: String,
    total_amount: i64,
}

impl TryFrom<OrderRow> for SubmittedOrder {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let payment_method: CodPaymentType = row.payment_method.parse().map_err(|e: String| {
            RepositoryError::DataCorruption(format!("invalid payment method in database: {e}"))
        })?;
        let status: OrderStatus = row.status.parse().map_err(|e: String| {
            RepositoryError::DataCorruption(format!("invalid order status in database: {e}"))
        })?;

        Ok(Self {
            shop_id: row.shop_id,
            external_order_id: ExternalOrderId::new(row.external_order_id),
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            customer_email: row.customer_email,
            customer_address: row.customer_address,
            customer_city: row.customer_city,
            customer_country: row.customer_country,
            customer_zip: row.customer_zip,
            payment_method,
            status,
            total_amount: MinorUnits::new(row.total_amount),
        })
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: &SubmittedOrder) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO orders (
                shop_id, external_order_id, customer_name, customer_phone,
                customer_email, customer_address, customer_city, customer_country,
                customer_zip, payment_method, status, total_amount
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ",
        )
        .bind(order.shop_id)
        .bind(order.external_order_id.as_i64())
        .bind(&order.customer_name)
        .bind(order.customer_phone.as_str())
        .bind(&order.customer_email)
        .bind(&order.customer_address)
        .bind(&order.customer_city)
        .bind(&order.customer_country)
        .bind(&order.customer_zip)
        .bind(order.payment_method.to_string())
        .bind(order.status.to_string())
        .bind(order.total_amount.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("external order id already recorded".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(())
    }

    async fn find_by_external_id(
        &self,
        id: ExternalOrderId,
    ) -> Result<Option<SubmittedOrder>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT shop_id, external_order_id, customer_name, customer_phone,
                   customer_email, customer_address, customer_city, customer_country,
                   customer_zip, payment_method, status, total_amount
            FROM orders
            WHERE external_order_id = $1
            ",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(SubmittedOrder::try_from).transpose()
    }
}

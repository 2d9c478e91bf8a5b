//! Order repository backed by `PostgreSQL`.
//!
//! Customer details and lines are stored as JSONB exactly as they were
//! frozen at checkout.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;
use uuid::Uuid;

use oja_core::{
    CountryCode, CurrencyCode, Customer, Order, OrderId, OrderLine, OrderStatus, OrderSubmission,
    PaymentMethod,
};

use super::{OrderRepository, RepositoryError};

const ORDER_COLUMNS: &str = "id, customer, lines, total, currency, payment_method, status, \
     pricing_country, idempotency_key, created_at, updated_at";

/// Raw `orders` row before the text columns are parsed.
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    customer: Json<Customer>,
    lines: Json<Vec<OrderLine>>,
    total: Decimal,
    currency: String,
    payment_method: PaymentMethod,
    status: OrderStatus,
    pricing_country: Option<String>,
    idempotency_key: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let currency: CurrencyCode = row.currency.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("order {}: {e}", row.id))
        })?;
        let pricing_country = row
            .pricing_country
            .as_deref()
            .map(CountryCode::parse)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("order {}: {e}", row.id)))?;

        Ok(Self {
            id: row.id,
            customer: row.customer.0,
            lines: row.lines.0,
            total: row.total,
            currency,
            payment_method: row.payment_method,
            status: row.status,
            pricing_country,
            idempotency_key: row.idempotency_key,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Order persistence against the `orders` table.
#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by_key(&self, key: Uuid) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE idempotency_key = $1");
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    #[instrument(skip(self, submission), fields(idempotency_key = %submission.idempotency_key))]
    async fn create(&self, submission: OrderSubmission) -> Result<Order, RepositoryError> {
        let key = submission.idempotency_key;
        let sql = format!(
            r"
            INSERT INTO orders
                (customer, lines, total, currency, payment_method, pricing_country, idempotency_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (idempotency_key) DO NOTHING
            RETURNING {ORDER_COLUMNS}
            "
        );

        let inserted = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(Json(&submission.customer))
            .bind(Json(&submission.lines))
            .bind(submission.total)
            .bind(submission.currency.code())
            .bind(submission.payment_method)
            .bind(submission.pricing_country.as_ref().map(CountryCode::as_str))
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match inserted {
            Some(row) => Order::try_from(row),
            None => {
                tracing::info!("Idempotency key reused, returning existing order");
                self.find_by_key(key).await?.ok_or_else(|| {
                    RepositoryError::Conflict("idempotency key in use by a removed order".to_owned())
                })
            }
        }
    }

    async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, OrderRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Order::try_from)
            .collect()
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Order, RepositoryError> {
        let sql = format!(
            "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        Order::try_from(row)
    }

    async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

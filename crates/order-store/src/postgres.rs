use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{LineItemId, OrderId, ProductId, StoreId, UserId};
use domain::{LineItem, Money, Order, OrderStatus};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{OrderStoreError, Result, store::OrderStore};

const ORDER_COLUMNS: &str = "id, user_id, store_id, delivery_person_id, status, total_cents, \
     idempotency_key, created_at, updated_at, deleted_at";

const IDEMPOTENCY_CONSTRAINT: &str = "orders_user_idempotency_key";

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: &PgRow, items: Vec<LineItem>) -> Result<Order> {
        let order_id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
        let status_raw: String = row.try_get("status")?;
        let status = status_raw
            .parse::<OrderStatus>()
            .map_err(|e| OrderStoreError::Corrupt {
                order_id,
                reason: e.to_string(),
            })?;

        Ok(Order {
            id: order_id,
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            store_id: StoreId::from_uuid(row.try_get::<Uuid, _>("store_id")?),
            delivery_person_id: row
                .try_get::<Option<Uuid>, _>("delivery_person_id")?
                .map(UserId::from_uuid),
            status,
            total: Money::from_cents(row.try_get("total_cents")?),
            items,
            idempotency_key: row.try_get("idempotency_key")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
            deleted_at: row.try_get::<Option<DateTime<Utc>>, _>("deleted_at")?,
        })
    }

    fn row_to_line_item(row: &PgRow) -> Result<(Uuid, LineItem)> {
        let order_id: Uuid = row.try_get("order_id")?;
        let quantity: i32 = row.try_get("quantity")?;
        let quantity = u32::try_from(quantity).map_err(|_| OrderStoreError::Corrupt {
            order_id: OrderId::from_uuid(order_id),
            reason: format!("negative line item quantity {quantity}"),
        })?;

        Ok((
            order_id,
            LineItem {
                id: LineItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
                product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
                quantity,
                unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            },
        ))
    }

    /// Loads line items for a set of orders, keyed by order ID, in cart order.
    async fn load_items(&self, order_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<LineItem>>> {
        let mut items: HashMap<Uuid, Vec<LineItem>> = HashMap::new();
        if order_ids.is_empty() {
            return Ok(items);
        }

        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position ASC
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        for row in &rows {
            let (order_id, item) = Self::row_to_line_item(row)?;
            items.entry(order_id).or_default().push(item);
        }
        Ok(items)
    }

    /// Attaches line items to a batch of order rows, preserving row order.
    async fn hydrate(&self, rows: Vec<PgRow>) -> Result<Vec<Order>> {
        let ids: Vec<Uuid> = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<_, _>>()?;
        let mut items = self.load_items(&ids).await?;

        rows.iter()
            .zip(ids)
            .map(|(row, id)| Self::row_to_order(row, items.remove(&id).unwrap_or_default()))
            .collect()
    }

    async fn insert_items(tx: &mut Transaction<'_, Postgres>, order: &Order) -> Result<()> {
        for (position, item) in order.items.iter().enumerate() {
            let quantity = i32::try_from(item.quantity).map_err(|_| OrderStoreError::Corrupt {
                order_id: order.id,
                reason: format!("line item quantity {} out of range", item.quantity),
            })?;
            let position = i32::try_from(position).map_err(|_| OrderStoreError::Corrupt {
                order_id: order.id,
                reason: "too many line items".to_string(),
            })?;

            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, position, product_id, quantity, unit_price_cents, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(order.id.as_uuid())
            .bind(position)
            .bind(item.product_id.as_uuid())
            .bind(quantity)
            .bind(item.unit_price.cents())
            .bind(order.created_at)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn list_where(
        &self,
        column: &'static str,
        id: Uuid,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Order>, u64)> {
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM orders WHERE {column} = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE {column} = $1 AND deleted_at IS NULL \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        ))
        .bind(id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let orders = self.hydrate(rows).await?;
        Ok((orders, u64::try_from(total).unwrap_or_default()))
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id, items = order.items.len()))]
    async fn create(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, store_id, delivery_person_id, status, total_cents,
                                idempotency_key, created_at, updated_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.store_id.as_uuid())
        .bind(order.delivery_person_id.map(|id| id.as_uuid()))
        .bind(order.status.as_str())
        .bind(order.total.cents())
        .bind(order.idempotency_key.as_deref())
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.deleted_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some(IDEMPOTENCY_CONSTRAINT)
            {
                return OrderStoreError::DuplicateIdempotencyKey {
                    user_id: order.user_id,
                    key: order.idempotency_key.clone().unwrap_or_default(),
                };
            }
            OrderStoreError::Database(e)
        })?;

        Self::insert_items(&mut tx, order).await?;

        tx.commit().await?;
        tracing::debug!("order persisted");
        Ok(())
    }

    async fn get_by_id(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_by_idempotency_key(&self, user_id: UserId, key: &str) -> Result<Option<Order>> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE user_id = $1 AND idempotency_key = $2 AND deleted_at IS NULL"
        ))
        .bind(user_id.as_uuid())
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_by_user(
        &self,
        user_id: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Order>, u64)> {
        self.list_where("user_id", user_id.as_uuid(), limit, offset)
            .await
    }

    async fn list_by_store(
        &self,
        store_id: StoreId,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Order>, u64)> {
        self.list_where("store_id", store_id.as_uuid(), limit, offset)
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(OrderStoreError::NotFound(order_id));
        }

        self.get_by_id(order_id)
            .await?
            .ok_or(OrderStoreError::NotFound(order_id))
    }

    #[tracing::instrument(skip(self))]
    async fn soft_delete(&self, order_id: OrderId) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(order_id.as_uuid())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(OrderStoreError::NotFound(order_id));
        }
        Ok(())
    }
}

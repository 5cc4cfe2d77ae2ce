//! PostgreSQL catalog and inventory ledger.

use async_trait::async_trait;
use common::{ProductId, StoreId, UserId};
use domain::{Money, ProductSnapshot, StoreSnapshot};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::catalog::{Catalog, CatalogError};
use super::inventory::InventoryLedger;

/// PostgreSQL-backed catalog reading the `stores` and `products` tables.
///
/// Reservations are a single conditional `UPDATE`, so the check and the
/// decrement happen atomically inside the database.
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    /// Creates a new PostgreSQL catalog.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a store row.
    pub async fn insert_store(&self, store: &StoreSnapshot) -> Result<(), CatalogError> {
        sqlx::query("INSERT INTO stores (id, owner_id, is_active) VALUES ($1, $2, $3)")
            .bind(store.id.as_uuid())
            .bind(store.owner_id.as_uuid())
            .bind(store.is_active)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Inserts a product row.
    pub async fn insert_product(&self, product: &ProductSnapshot) -> Result<(), CatalogError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, store_id, price_cents, stock, is_active)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.store_id.as_uuid())
        .bind(product.price.cents())
        .bind(stock_to_db(product.stock))
        .bind(product.is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Changes the catalog price of a product.
    pub async fn set_price(&self, product_id: ProductId, price: Money) -> Result<(), CatalogError> {
        sqlx::query("UPDATE products SET price_cents = $2, updated_at = NOW() WHERE id = $1")
            .bind(product_id.as_uuid())
            .bind(price.cents())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Returns the current stock of a product.
    pub async fn stock_of(&self, product_id: ProductId) -> Result<Option<u32>, CatalogError> {
        let stock: Option<i32> =
            sqlx::query_scalar("SELECT stock FROM products WHERE id = $1 AND deleted_at IS NULL")
                .bind(product_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        Ok(stock.map(stock_from_db))
    }

    fn row_to_store(row: &PgRow) -> Result<StoreSnapshot, CatalogError> {
        Ok(StoreSnapshot {
            id: StoreId::from_uuid(row.try_get::<Uuid, _>("id")?),
            owner_id: UserId::from_uuid(row.try_get::<Uuid, _>("owner_id")?),
            is_active: row.try_get("is_active")?,
        })
    }

    fn row_to_product(row: &PgRow) -> Result<ProductSnapshot, CatalogError> {
        Ok(ProductSnapshot {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            store_id: StoreId::from_uuid(row.try_get::<Uuid, _>("store_id")?),
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: stock_from_db(row.try_get("stock")?),
            is_active: row.try_get("is_active")?,
        })
    }
}

// The stock column is constrained non-negative.
fn stock_from_db(stock: i32) -> u32 {
    u32::try_from(stock).unwrap_or(0)
}

fn stock_to_db(stock: u32) -> i32 {
    i32::try_from(stock).unwrap_or(i32::MAX)
}

#[async_trait]
impl Catalog for PostgresCatalog {
    async fn get_store(&self, store_id: StoreId) -> Result<Option<StoreSnapshot>, CatalogError> {
        let row = sqlx::query(
            "SELECT id, owner_id, is_active FROM stores WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(store_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_store).transpose()
    }

    async fn get_product(
        &self,
        product_id: ProductId,
    ) -> Result<Option<ProductSnapshot>, CatalogError> {
        let row = sqlx::query(
            r#"
            SELECT id, store_id, price_cents, stock, is_active
            FROM products
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_product).transpose()
    }
}

#[async_trait]
impl InventoryLedger for PostgresCatalog {
    #[tracing::instrument(skip(self))]
    async fn reserve(&self, product_id: ProductId, quantity: u32) -> Result<(), CatalogError> {
        // Quantities beyond the column range can never be satisfied.
        if let Ok(requested) = i32::try_from(quantity) {
            let result = sqlx::query(
                r#"
                UPDATE products
                SET stock = stock - $2, updated_at = NOW()
                WHERE id = $1 AND deleted_at IS NULL AND stock >= $2
                "#,
            )
            .bind(product_id.as_uuid())
            .bind(requested)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 1 {
                return Ok(());
            }
        }

        // Nothing matched: either the product is gone or the stock is short.
        match self.stock_of(product_id).await? {
            None => Err(CatalogError::ProductNotFound(product_id)),
            Some(available) => Err(CatalogError::InsufficientStock {
                product_id,
                requested: quantity,
                available,
            }),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn release(&self, product_id: ProductId, quantity: u32) -> Result<(), CatalogError> {
        let result = sqlx::query(
            "UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(product_id.as_uuid())
        .bind(stock_to_db(quantity))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::ProductNotFound(product_id));
        }
        Ok(())
    }
}

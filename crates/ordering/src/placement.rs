//! Order placement with compensating stock reservations.

use std::time::Instant;

use common::{ProductId, StoreId};
use domain::{CartItem, LineItem, Order, PlaceOrder};
use order_store::{OrderStore, OrderStoreError};

use crate::error::{OrderError, Result};
use crate::services::{Catalog, InventoryLedger};

/// Reservations made by one placement attempt, in the order they were made.
#[derive(Debug, Default)]
pub struct ReservationLog {
    entries: Vec<(ProductId, u32)>,
}

impl ReservationLog {
    /// Records a successful reservation.
    pub fn record(&mut self, product_id: ProductId, quantity: u32) {
        self.entries.push((product_id, quantity));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the reservations newest first, the order they must be undone in.
    pub fn undo_order(&self) -> impl Iterator<Item = (ProductId, u32)> + '_ {
        self.entries.iter().rev().copied()
    }
}

/// How a placement attempt resolved.
#[derive(Debug)]
enum Placement {
    Created(Order),
    Replayed(Order),
}

/// Turns a cart into a persisted order.
///
/// Every cart line is validated and priced against the catalog before any
/// stock is touched, so an invalid cart never holds inventory. Lines are then
/// reserved through the ledger one by one; if a reservation or the final
/// persist fails, every reservation made so far is released newest first
/// before the error is returned.
pub struct PlacementCoordinator<S, C, L>
where
    S: OrderStore,
    C: Catalog,
    L: InventoryLedger,
{
    store: S,
    catalog: C,
    ledger: L,
}

impl<S, C, L> PlacementCoordinator<S, C, L>
where
    S: OrderStore,
    C: Catalog,
    L: InventoryLedger,
{
    /// Creates a new placement coordinator.
    pub fn new(store: S, catalog: C, ledger: L) -> Self {
        Self {
            store,
            catalog,
            ledger,
        }
    }

    /// Places an order for `cmd.buyer_id` against `cmd.store_id`.
    ///
    /// A command carrying an idempotency key the buyer already used returns
    /// the existing order with no stock effect.
    #[tracing::instrument(
        skip(self, cmd),
        fields(buyer_id = %cmd.buyer_id, store_id = %cmd.store_id, items = cmd.items.len())
    )]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<Order> {
        let start = Instant::now();
        let result = self.try_place(cmd).await;
        metrics::histogram!("order_placement_duration_seconds")
            .record(start.elapsed().as_secs_f64());

        match result {
            Ok(Placement::Created(order)) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(
                    order_id = %order.id,
                    total = %order.total,
                    "order placed"
                );
                Ok(order)
            }
            Ok(Placement::Replayed(order)) => {
                tracing::info!(order_id = %order.id, "idempotent placement replayed");
                Ok(order)
            }
            Err(e) => {
                metrics::counter!("order_placement_failures_total", "kind" => e.kind().as_str())
                    .increment(1);
                tracing::warn!(error = %e, "order placement failed");
                Err(e)
            }
        }
    }

    async fn try_place(&self, cmd: PlaceOrder) -> Result<Placement> {
        if cmd.items.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        if let Some(key) = cmd.idempotency_key.as_deref()
            && key.len() > PlaceOrder::MAX_IDEMPOTENCY_KEY_LEN
        {
            return Err(OrderError::IdempotencyKeyTooLong {
                length: key.len(),
                max: PlaceOrder::MAX_IDEMPOTENCY_KEY_LEN,
            });
        }

        if let Some(key) = cmd.idempotency_key.as_deref()
            && let Some(existing) = self.store.find_by_idempotency_key(cmd.buyer_id, key).await?
        {
            return Ok(Placement::Replayed(existing));
        }

        let store = self
            .catalog
            .get_store(cmd.store_id)
            .await?
            .ok_or(OrderError::StoreNotFound(cmd.store_id))?;
        if !store.is_active {
            return Err(OrderError::StoreInactive(store.id));
        }

        let mut line_items = Vec::with_capacity(cmd.items.len());
        for item in &cmd.items {
            line_items.push(self.validate_line(cmd.store_id, item).await?);
        }

        let mut log = ReservationLog::default();
        for line in &line_items {
            if let Err(e) = self.ledger.reserve(line.product_id, line.quantity).await {
                return Err(self.compensate(&log, e.into()).await);
            }
            log.record(line.product_id, line.quantity);
            metrics::counter!("inventory_reservations_total").increment(1);
        }

        let order = match Order::place(cmd.buyer_id, cmd.store_id, line_items, cmd.idempotency_key)
        {
            Ok(order) => order,
            Err(e) => return Err(self.compensate(&log, e.into()).await),
        };

        match self.store.create(&order).await {
            Ok(()) => Ok(Placement::Created(order)),
            Err(OrderStoreError::DuplicateIdempotencyKey { user_id, key }) => {
                // A concurrent retry with the same key committed first.
                let cause = OrderError::Conflict(format!("idempotency key '{key}' already used"));
                let cause = self.compensate(&log, cause).await;
                if matches!(cause, OrderError::CompensationFailed { .. }) {
                    return Err(cause);
                }
                match self.store.find_by_idempotency_key(user_id, &key).await? {
                    Some(winner) => Ok(Placement::Replayed(winner)),
                    None => Err(cause),
                }
            }
            Err(e) => Err(self.compensate(&log, e.into()).await),
        }
    }

    /// Validates one cart line and prices it at the current catalog price.
    async fn validate_line(&self, store_id: StoreId, item: &CartItem) -> Result<LineItem> {
        let product = self
            .catalog
            .get_product(item.product_id)
            .await?
            .ok_or(OrderError::ProductNotFound(item.product_id))?;

        if !product.is_active {
            return Err(OrderError::ProductInactive(product.id));
        }
        if product.store_id != store_id {
            return Err(OrderError::ProductStoreMismatch {
                product_id: product.id,
                store_id,
            });
        }

        let quantity = u32::try_from(item.quantity)
            .ok()
            .filter(|q| *q >= 1)
            .ok_or(OrderError::InvalidQuantity {
                product_id: product.id,
                quantity: item.quantity,
            })?;

        if product.price.is_negative() {
            return Err(OrderError::InvalidPrice {
                product_id: product.id,
                price_cents: product.price.cents(),
            });
        }

        Ok(LineItem::new(product.id, quantity, product.price))
    }

    /// Releases every reservation in `log`, newest first.
    ///
    /// Returns `cause` when all releases succeed. Releases keep going after a
    /// failure so that as little stock as possible leaks; the leaked pairs
    /// are reported in `CompensationFailed`.
    async fn compensate(&self, log: &ReservationLog, cause: OrderError) -> OrderError {
        if log.is_empty() {
            return cause;
        }

        let mut leaked = Vec::new();
        let mut first_failure = None;
        for (product_id, quantity) in log.undo_order() {
            match self.ledger.release(product_id, quantity).await {
                Ok(()) => {
                    metrics::counter!("inventory_releases_total").increment(1);
                }
                Err(e) => {
                    leaked.push((product_id, quantity));
                    first_failure.get_or_insert(e.to_string());
                }
            }
        }

        match first_failure {
            None => {
                tracing::debug!(released = log.len(), "placement compensated");
                cause
            }
            Some(reason) => {
                metrics::counter!("inventory_compensation_failures_total").increment(1);
                tracing::error!(
                    cause = %cause,
                    reason = %reason,
                    leaked = ?leaked,
                    "failed to release reserved stock"
                );
                OrderError::CompensationFailed {
                    cause: cause.to_string(),
                    reason,
                    leaked,
                }
            }
        }
    }
}

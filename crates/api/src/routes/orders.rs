//! Order placement, lookup, listing, status and deletion endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use common::{LineItemId, OrderId, ProductId, StoreId, UserId};
use domain::{CartItem, LineItem, Order, OrderStatus, PlaceOrder, UpdateOrderStatus};
use order_store::OrderStore;
use ordering::{Catalog, InventoryLedger, OrderingService};
use serde::{Deserialize, Serialize};

use crate::auth::AuthPrincipal;
use crate::error::ApiError;

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Shared application state accessible from all handlers.
pub struct AppState<S, C, L>
where
    S: OrderStore + Clone,
    C: Catalog + Clone,
    L: InventoryLedger,
{
    pub service: OrderingService<S, C, L>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub store_id: StoreId,
    pub items: Vec<CartItemRequest>,
    pub idempotency_key: Option<String>,
}

#[derive(Deserialize)]
pub struct CartItemRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub store_id: Option<StoreId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub user_id: UserId,
    pub store_id: StoreId,
    pub delivery_person_id: Option<UserId>,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub total: String,
    pub items: Vec<LineItemResponse>,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct LineItemResponse {
    pub id: LineItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub subtotal_cents: Option<i64>,
}

#[derive(Serialize)]
pub struct ListOrdersResponse {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
}

impl From<&LineItem> for LineItemResponse {
    fn from(item: &LineItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price_cents: item.unit_price.cents(),
            subtotal_cents: item.subtotal().map(|m| m.cents()),
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            store_id: order.store_id,
            delivery_person_id: order.delivery_person_id,
            status: order.status,
            total_cents: order.total.cents(),
            total: order.total.to_string(),
            items: order.items.iter().map(LineItemResponse::from).collect(),
            idempotency_key: order.idempotency_key,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

// -- Handlers --

/// POST /orders: place an order from a cart.
#[tracing::instrument(skip_all, fields(user_id = %principal.user_id))]
pub async fn create<S, C, L>(
    State(state): State<Arc<AppState<S, C, L>>>,
    AuthPrincipal(principal): AuthPrincipal,
    headers: HeaderMap,
    payload: Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError>
where
    S: OrderStore + Clone + 'static,
    C: Catalog + Clone + 'static,
    L: InventoryLedger + 'static,
{
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let items = req
        .items
        .into_iter()
        .map(|item| CartItem::new(item.product_id, item.quantity))
        .collect();
    let mut cmd = PlaceOrder::new(principal.user_id, req.store_id, items);

    let header_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    if let Some(key) = req.idempotency_key.or(header_key) {
        cmd = cmd.with_idempotency_key(key);
    }

    let order = state.service.place_order(cmd).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders/{id}: load an order the caller may see.
#[tracing::instrument(skip(state, principal))]
pub async fn get<S, C, L>(
    State(state): State<Arc<AppState<S, C, L>>>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: OrderStore + Clone + 'static,
    C: Catalog + Clone + 'static,
    L: InventoryLedger + 'static,
{
    let order_id = parse_order_id(&id)?;
    let order = state.service.get_order(order_id, &principal).await?;
    Ok(Json(order.into()))
}

/// GET /orders: list orders in the caller's scope.
#[tracing::instrument(skip_all, fields(user_id = %principal.user_id))]
pub async fn list<S, C, L>(
    State(state): State<Arc<AppState<S, C, L>>>,
    AuthPrincipal(principal): AuthPrincipal,
    query: Result<Query<ListOrdersQuery>, QueryRejection>,
) -> Result<Json<ListOrdersResponse>, ApiError>
where
    S: OrderStore + Clone + 'static,
    C: Catalog + Clone + 'static,
    L: InventoryLedger + 'static,
{
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let page = state
        .service
        .list_orders(&principal, query.store_id, query.limit, query.offset)
        .await?
        .map(OrderResponse::from);

    Ok(Json(ListOrdersResponse {
        orders: page.items,
        total: page.total,
        limit: page.limit,
        offset: page.offset,
    }))
}

/// PATCH /orders/{id}/status: move an order to a new status.
#[tracing::instrument(skip(state, principal, payload))]
pub async fn update_status<S, C, L>(
    State(state): State<Arc<AppState<S, C, L>>>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: OrderStore + Clone + 'static,
    C: Catalog + Clone + 'static,
    L: InventoryLedger + 'static,
{
    let order_id = parse_order_id(&id)?;
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let cmd = UpdateOrderStatus::parse(order_id, req.status.trim())?;

    let order = state.service.update_order_status(cmd, &principal).await?;
    Ok(Json(order.into()))
}

/// DELETE /orders/{id}: soft-delete an order.
#[tracing::instrument(skip(state, principal))]
pub async fn delete<S, C, L>(
    State(state): State<Arc<AppState<S, C, L>>>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
    S: OrderStore + Clone + 'static,
    C: Catalog + Clone + 'static,
    L: InventoryLedger + 'static,
{
    let order_id = parse_order_id(&id)?;
    state.service.delete_order(order_id, &principal).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid order ID: {e}")))
}

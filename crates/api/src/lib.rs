//! HTTP API for the ordering system.
//!
//! Exposes order placement, lookup, listing, status changes and soft
//! deletion, with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch};
use domain::TransitionPolicy;
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryOrderStore, OrderStore, PostgresOrderStore};
use ordering::{Catalog, InMemoryCatalog, InventoryLedger, OrderingService, PostgresCatalog};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Application state backed by in-memory stores.
pub type InMemoryState = AppState<InMemoryOrderStore, InMemoryCatalog, InMemoryCatalog>;

/// Application state backed by PostgreSQL.
pub type PostgresState = AppState<PostgresOrderStore, PostgresCatalog, PostgresCatalog>;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, C, L>(
    state: Arc<AppState<S, C, L>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    S: OrderStore + Clone + 'static,
    C: Catalog + Clone + 'static,
    L: InventoryLedger + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/orders",
            get(routes::orders::list::<S, C, L>).post(routes::orders::create::<S, C, L>),
        )
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S, C, L>).delete(routes::orders::delete::<S, C, L>),
        )
        .route(
            "/orders/{id}/status",
            patch(routes::orders::update_status::<S, C, L>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over in-memory stores.
///
/// The returned catalog is the same instance the service reads and
/// reserves from, so callers can seed stores and products through it.
pub fn create_in_memory_state(policy: TransitionPolicy) -> (Arc<InMemoryState>, InMemoryCatalog) {
    let catalog = InMemoryCatalog::new();
    let service = OrderingService::new(InMemoryOrderStore::new(), catalog.clone(), catalog.clone())
        .with_transition_policy(policy);

    (Arc::new(AppState { service }), catalog)
}

/// Creates application state over a PostgreSQL pool, running migrations first.
pub async fn create_postgres_state(
    pool: PgPool,
    policy: TransitionPolicy,
) -> Result<Arc<PostgresState>, order_store::OrderStoreError> {
    let store = PostgresOrderStore::new(pool.clone());
    store.run_migrations().await?;

    let catalog = PostgresCatalog::new(pool);
    let service =
        OrderingService::new(store, catalog.clone(), catalog).with_transition_policy(policy);

    Ok(Arc::new(AppState { service }))
}

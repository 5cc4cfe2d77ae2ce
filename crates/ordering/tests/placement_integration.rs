//! Integration tests for order placement, access control and status changes
//! against the in-memory store and catalog.

use std::sync::Arc;

use common::{OrderId, StoreId, UserId};
use domain::{
    Money, OrderStatus, PlaceOrder, Principal, ProductSnapshot, Role, StoreSnapshot,
    TransitionPolicy, UpdateOrderStatus,
};
use futures_util::future::join_all;
use order_store::InMemoryOrderStore;
use ordering::{ErrorKind, InMemoryCatalog, OrderError, OrderingService};

type TestService = OrderingService<InMemoryOrderStore, InMemoryCatalog, InMemoryCatalog>;

struct TestHarness {
    service: Arc<TestService>,
    store: InMemoryOrderStore,
    catalog: InMemoryCatalog,
    owner: UserId,
    shop: StoreSnapshot,
}

impl TestHarness {
    async fn new() -> Self {
        Self::with_policy(TransitionPolicy::Permissive).await
    }

    async fn with_policy(policy: TransitionPolicy) -> Self {
        let store = InMemoryOrderStore::new();
        let catalog = InMemoryCatalog::new();
        let owner = UserId::new();
        let shop = catalog.add_store(owner).await;

        let service = OrderingService::new(store.clone(), catalog.clone(), catalog.clone())
            .with_transition_policy(policy);

        Self {
            service: Arc::new(service),
            store,
            catalog,
            owner,
            shop,
        }
    }

    async fn product(&self, price_cents: i64, stock: u32) -> ProductSnapshot {
        self.catalog
            .add_product(self.shop.id, Money::from_cents(price_cents), stock)
            .await
    }

    fn cart(&self, buyer: UserId) -> PlaceOrder {
        PlaceOrder::new(buyer, self.shop.id, vec![])
    }

    fn owner_principal(&self) -> Principal {
        Principal::new(self.owner, Role::Store)
    }
}

fn client(user_id: UserId) -> Principal {
    Principal::new(user_id, Role::Client)
}

#[tokio::test]
async fn test_place_order_scenario() {
    let h = TestHarness::new().await;
    let p = h.product(1000, 5).await;
    let buyer = UserId::new();

    let order = h
        .service
        .place_order(h.cart(buyer).item(p.id, 3))
        .await
        .unwrap();

    assert_eq!(order.total, Money::from_cents(3000));
    assert_eq!(order.total.to_string(), "30.00");
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.user_id, buyer);
    assert_eq!(h.catalog.stock_of(p.id).await, Some(2));

    let second = h
        .service
        .place_order(h.cart(UserId::new()).item(p.id, 3))
        .await
        .unwrap_err();
    assert!(matches!(
        second,
        OrderError::InsufficientStock {
            requested: 3,
            available: 2,
            ..
        }
    ));
    assert_eq!(h.catalog.stock_of(p.id).await, Some(2));
    assert_eq!(h.store.order_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_placements_never_oversell() {
    let h = TestHarness::new().await;
    let p = h.product(500, 10).await;

    let handles: Vec<_> = (0..30)
        .map(|_| {
            let service = Arc::clone(&h.service);
            let cmd = h.cart(UserId::new()).item(p.id, 1);
            tokio::spawn(async move { service.place_order(cmd).await })
        })
        .collect();

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let placed = results.iter().filter(|r| r.is_ok()).count();
    let short = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.kind() == ErrorKind::InsufficientStock))
        .count();

    assert_eq!(placed, 10);
    assert_eq!(short, 20);
    assert_eq!(h.catalog.stock_of(p.id).await, Some(0));
    assert_eq!(h.store.order_count().await, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_multi_item_carts_stay_consistent() {
    let h = TestHarness::new().await;
    let a = h.product(100, 6).await;
    let b = h.product(200, 6).await;

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let service = Arc::clone(&h.service);
            // Alternate line order so carts contend in both directions.
            let cmd = if i % 2 == 0 {
                h.cart(UserId::new()).item(a.id, 2).item(b.id, 1)
            } else {
                h.cart(UserId::new()).item(b.id, 2).item(a.id, 1)
            };
            tokio::spawn(async move { service.place_order(cmd).await })
        })
        .collect();

    let orders: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .filter_map(|joined| joined.unwrap().ok())
        .collect();

    let reserved = |product: common::ProductId| -> u32 {
        orders
            .iter()
            .flat_map(|o| &o.items)
            .filter(|item| item.product_id == product)
            .map(|item| item.quantity)
            .sum()
    };

    assert!(!orders.is_empty());
    assert_eq!(h.catalog.stock_of(a.id).await, Some(6 - reserved(a.id)));
    assert_eq!(h.catalog.stock_of(b.id).await, Some(6 - reserved(b.id)));
}

#[tokio::test]
async fn test_failed_third_item_leaves_stock_untouched() {
    let h = TestHarness::new().await;
    let first = h.product(100, 10).await;
    let second = h.product(200, 10).await;
    let third = h.product(300, 1).await;

    let err = h
        .service
        .place_order(
            h.cart(UserId::new())
                .item(first.id, 2)
                .item(second.id, 3)
                .item(third.id, 2),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    assert_eq!(h.catalog.stock_of(first.id).await, Some(10));
    assert_eq!(h.catalog.stock_of(second.id).await, Some(10));
    assert_eq!(h.catalog.stock_of(third.id).await, Some(1));
    assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test]
async fn test_validation_errors() {
    let h = TestHarness::new().await;
    let p = h.product(100, 10).await;
    let buyer = UserId::new();

    let err = h.service.place_order(h.cart(buyer)).await.unwrap_err();
    assert!(matches!(err, OrderError::EmptyCart));

    let err = h
        .service
        .place_order(h.cart(buyer).item(common::ProductId::new(), 1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    h.catalog.set_product_active(p.id, false).await;
    let err = h
        .service
        .place_order(h.cart(buyer).item(p.id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::ProductInactive(_)));
    assert_eq!(err.kind(), ErrorKind::Inactive);

    let err = h
        .service
        .place_order(PlaceOrder::new(buyer, StoreId::new(), vec![]).item(p.id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::StoreNotFound(_)));
}

#[tokio::test]
async fn test_forced_reservation_conflict() {
    let h = TestHarness::new().await;
    let first = h.product(100, 10).await;
    let second = h.product(100, 10).await;

    h.catalog.fail_next_reserves(1).await;
    let err = h
        .service
        .place_order(h.cart(UserId::new()).item(first.id, 1).item(second.id, 1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(h.catalog.stock_of(first.id).await, Some(10));

    // The hook is spent; the retry goes through.
    h.service
        .place_order(h.cart(UserId::new()).item(first.id, 1).item(second.id, 1))
        .await
        .unwrap();
    assert_eq!(h.catalog.stock_of(first.id).await, Some(9));
}

#[tokio::test]
async fn test_leaked_stock_is_a_fatal_error() {
    let h = TestHarness::new().await;
    let first = h.product(100, 10).await;
    let second = h.product(100, 0).await;
    h.catalog.set_fail_on_release(true).await;

    let err = h
        .service
        .place_order(h.cart(UserId::new()).item(first.id, 4).item(second.id, 1))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(matches!(
        err,
        OrderError::CompensationFailed { ref leaked, .. } if leaked == &vec![(first.id, 4)]
    ));
    assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test]
async fn test_price_snapshot_survives_catalog_change() {
    let h = TestHarness::new().await;
    let a = h.product(1250, 10).await;
    let b = h.product(399, 10).await;
    let buyer = UserId::new();

    let order = h
        .service
        .place_order(h.cart(buyer).item(a.id, 2).item(b.id, 3))
        .await
        .unwrap();
    assert_eq!(order.total, Money::from_cents(2 * 1250 + 3 * 399));

    h.catalog.set_price(a.id, Money::from_cents(9999)).await;

    let reloaded = h.service.get_order(order.id, &client(buyer)).await.unwrap();
    assert_eq!(reloaded.total, order.total);
    assert_eq!(reloaded.items[0].unit_price, Money::from_cents(1250));
    assert_eq!(reloaded.computed_total().unwrap(), reloaded.total);
}

#[tokio::test]
async fn test_get_order_is_idempotent() {
    let h = TestHarness::new().await;
    let p = h.product(100, 10).await;
    let buyer = UserId::new();
    let order = h
        .service
        .place_order(h.cart(buyer).item(p.id, 1))
        .await
        .unwrap();

    let first = h.service.get_order(order.id, &client(buyer)).await.unwrap();
    let second = h.service.get_order(order.id, &client(buyer)).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first, order);
}

#[tokio::test]
async fn test_unrelated_client_is_denied() {
    let h = TestHarness::new().await;
    let p = h.product(100, 10).await;
    let order = h
        .service
        .place_order(h.cart(UserId::new()).item(p.id, 1))
        .await
        .unwrap();
    let stranger = client(UserId::new());

    let err = h.service.get_order(order.id, &stranger).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    let err = h
        .service
        .update_order_status(
            UpdateOrderStatus::new(order.id, OrderStatus::Confirmed),
            &stranger,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    let unchanged = h
        .service
        .get_order(order.id, &h.owner_principal())
        .await
        .unwrap();
    assert_eq!(unchanged.status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_status_update_scenario() {
    let h = TestHarness::new().await;
    let p = h.product(100, 10).await;
    let buyer = UserId::new();
    let order = h
        .service
        .place_order(h.cart(buyer).item(p.id, 1))
        .await
        .unwrap();

    let cmd = UpdateOrderStatus::parse(order.id, "confirmed").unwrap();

    let err = h
        .service
        .update_order_status(cmd, &client(buyer))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::PermissionDenied { .. }));

    let updated = h
        .service
        .update_order_status(cmd, &h.owner_principal())
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Confirmed);

    let admin = Principal::new(UserId::new(), Role::SuperUser);
    let updated = h
        .service
        .update_order_status(
            UpdateOrderStatus::new(order.id, OrderStatus::Cancelled),
            &admin,
        )
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn test_strict_policy_through_service() {
    let h = TestHarness::with_policy(TransitionPolicy::Strict).await;
    assert_eq!(h.service.transition_policy(), TransitionPolicy::Strict);
    let p = h.product(100, 10).await;
    let order = h
        .service
        .place_order(h.cart(UserId::new()).item(p.id, 1))
        .await
        .unwrap();

    let err = h
        .service
        .update_order_status(
            UpdateOrderStatus::new(order.id, OrderStatus::Completed),
            &h.owner_principal(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidTransition { .. }));

    for status in [
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Completed,
    ] {
        let updated = h
            .service
            .update_order_status(
                UpdateOrderStatus::new(order.id, status),
                &h.owner_principal(),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, status);
    }
}

#[tokio::test]
async fn test_idempotent_placement_decrements_once() {
    let h = TestHarness::new().await;
    let p = h.product(100, 10).await;
    let buyer = UserId::new();

    let first = h
        .service
        .place_order(h.cart(buyer).item(p.id, 3).with_idempotency_key("checkout-1"))
        .await
        .unwrap();
    let retry = h
        .service
        .place_order(h.cart(buyer).item(p.id, 3).with_idempotency_key("checkout-1"))
        .await
        .unwrap();

    assert_eq!(first.id, retry.id);
    assert_eq!(h.catalog.stock_of(p.id).await, Some(7));
    assert_eq!(h.store.order_count().await, 1);

    // The key is scoped to the buyer.
    let other = h
        .service
        .place_order(
            h.cart(UserId::new())
                .item(p.id, 1)
                .with_idempotency_key("checkout-1"),
        )
        .await
        .unwrap();
    assert_ne!(other.id, first.id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_retries_share_one_order() {
    let h = TestHarness::new().await;
    let p = h.product(100, 10).await;
    let buyer = UserId::new();

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let service = Arc::clone(&h.service);
            let cmd = h.cart(buyer).item(p.id, 2).with_idempotency_key("double-click");
            tokio::spawn(async move { service.place_order(cmd).await })
        })
        .collect();

    let ids: Vec<OrderId> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap().id)
        .collect();

    assert!(ids.iter().all(|id| *id == ids[0]));
    assert_eq!(h.catalog.stock_of(p.id).await, Some(8));
    assert_eq!(h.store.order_count().await, 1);
}

#[tokio::test]
async fn test_list_orders_scopes_and_pagination() {
    let h = TestHarness::new().await;
    let p = h.product(100, 200).await;
    let buyer = UserId::new();

    for _ in 0..12 {
        h.service
            .place_order(h.cart(buyer).item(p.id, 1))
            .await
            .unwrap();
    }
    h.service
        .place_order(h.cart(UserId::new()).item(p.id, 1))
        .await
        .unwrap();

    let page = h
        .service
        .list_orders(&client(buyer), None, None, None)
        .await
        .unwrap();
    assert_eq!(page.total, 12);
    assert_eq!(page.items.len(), 10);
    assert_eq!((page.limit, page.offset), (10, 0));

    let page = h
        .service
        .list_orders(&client(buyer), None, Some(1000), Some(-4))
        .await
        .unwrap();
    assert_eq!(page.limit, 100);
    assert_eq!(page.offset, 0);
    assert_eq!(page.items.len(), 12);

    let page = h
        .service
        .list_orders(&client(buyer), None, Some(5), Some(10))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);

    // A client's store filter is ignored.
    let page = h
        .service
        .list_orders(&client(buyer), Some(h.shop.id), Some(100), None)
        .await
        .unwrap();
    assert_eq!(page.total, 12);

    // The store owner sees every order placed against the store.
    let page = h
        .service
        .list_orders(&h.owner_principal(), Some(h.shop.id), Some(100), None)
        .await
        .unwrap();
    assert_eq!(page.total, 13);

    // Without a filter the owner sees only orders they placed.
    let page = h
        .service
        .list_orders(&h.owner_principal(), None, None, None)
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn test_soft_delete() {
    let h = TestHarness::new().await;
    let p = h.product(100, 10).await;
    let buyer = UserId::new();
    let order = h
        .service
        .place_order(h.cart(buyer).item(p.id, 1))
        .await
        .unwrap();

    let err = h
        .service
        .delete_order(order.id, &client(buyer))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    h.service
        .delete_order(order.id, &h.owner_principal())
        .await
        .unwrap();

    let err = h
        .service
        .get_order(order.id, &client(buyer))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::OrderNotFound(_)));

    let page = h
        .service
        .list_orders(&client(buyer), None, None, None)
        .await
        .unwrap();
    assert_eq!(page.total, 0);
    assert_eq!(h.store.order_count().await, 1);

    let err = h
        .service
        .delete_order(order.id, &h.owner_principal())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

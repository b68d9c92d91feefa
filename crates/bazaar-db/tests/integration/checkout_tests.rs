use bazaar_core::cart::CheckoutRequest;
use bazaar_core::models::{CartStatus, CouponPatch, DiscountType, NewCoupon, OrderPatch, OrderStatus};
use bazaar_core::services::CartService;
use bazaar_core::{AppError, CartStore, CrudService, CrudStore, OrderLines, OrderTransitions};
use bazaar_db::{CartRepository, CouponRepository, Database, ProductRepository};
use rust_decimal::Decimal;

use crate::integration::common::{seed_product, seed_user, setup_test_db};

type Carts = CartService<CartRepository, ProductRepository, CouponRepository>;

fn cart_service(db: &Database) -> Carts {
    CartService::new(db.carts(), db.products(), db.coupons())
}

fn ten_percent(code: &str, max_uses: Option<i32>) -> NewCoupon {
    NewCoupon {
        code: code.to_string(),
        discount_type: DiscountType::Percentage,
        discount_value: Decimal::new(10, 0),
        min_order_amount: None,
        max_uses,
        starts_at: None,
        expires_at: None,
        active: true,
    }
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn adding_twice_merges_into_one_line() {
    let (db, _container) = setup_test_db().await;
    let user = seed_user(&db, "ada@example.com").await;
    let mug = seed_product(&db, "MUG", 1250).await;
    let carts = cart_service(&db);

    carts.add_item(user.id, mug.id, 1).await.unwrap();
    let view = carts.add_item(user.id, mug.id, 2).await.unwrap();

    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].quantity, 3);
    assert_eq!(view.subtotal, Decimal::new(3750, 2));
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn create_cart_returns_the_existing_open_cart() {
    let (db, _container) = setup_test_db().await;
    let user = seed_user(&db, "ada@example.com").await;

    let first = db.carts().create_cart(user.id).await.unwrap();
    let second = db.carts().create_cart(user.id).await.unwrap();
    assert_eq!(first.id, second.id);
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn checkout_writes_order_payment_and_consumes_coupon() {
    let (db, _container) = setup_test_db().await;
    let user = seed_user(&db, "ada@example.com").await;
    let mug = seed_product(&db, "MUG", 1000).await;
    let tee = seed_product(&db, "TEE", 2500).await;
    let coupon = db.coupons().insert(&ten_percent("TEN", Some(5))).await.unwrap();
    let carts = cart_service(&db);

    carts.add_item(user.id, mug.id, 2).await.unwrap();
    carts.add_item(user.id, tee.id, 1).await.unwrap();
    carts.apply_coupon(user.id, "TEN").await.unwrap();

    let placed = carts
        .checkout(user.id, CheckoutRequest::default())
        .await
        .unwrap();

    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert_eq!(placed.order.subtotal, Decimal::new(4500, 2));
    assert_eq!(placed.order.discount, Decimal::new(450, 2));
    assert_eq!(placed.order.total, Decimal::new(4050, 2));
    assert_eq!(placed.details.len(), 2);

    let lines = db.order_details().details_for_order(placed.order.id).await.unwrap();
    let mug_line = lines.iter().find(|d| d.product_id == mug.id).unwrap();
    assert_eq!(mug_line.line_total, Decimal::new(2000, 2));

    let payment_id = placed.order.payment_id.expect("payment recorded");
    let payment = db.payments().get(payment_id).await.unwrap().unwrap();
    assert_eq!(payment.amount, Decimal::new(4050, 2));

    let coupon = db.coupons().get(coupon.id).await.unwrap().unwrap();
    assert_eq!(coupon.used_count, 1);

    assert!(db.carts().open_cart(user.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn ordered_cart_cannot_be_placed_again() {
    let (db, _container) = setup_test_db().await;
    let user = seed_user(&db, "ada@example.com").await;
    let mug = seed_product(&db, "MUG", 1000).await;
    let carts = cart_service(&db);

    carts.add_item(user.id, mug.id, 1).await.unwrap();
    let cart = db.carts().open_cart(user.id).await.unwrap().unwrap();
    carts
        .checkout(user.id, CheckoutRequest::default())
        .await
        .unwrap();

    let reloaded = db.carts().get(cart.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, CartStatus::Ordered);
    assert_eq!(db.carts().cart_items(cart.id).await.unwrap().len(), 1);

    let err = carts
        .checkout(user.id, CheckoutRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn foreign_address_is_rejected_and_nothing_is_written() {
    let (db, _container) = setup_test_db().await;
    let ada = seed_user(&db, "ada@example.com").await;
    let bob = seed_user(&db, "bob@example.com").await;
    let mug = seed_product(&db, "MUG", 1000).await;
    let bobs_address = db
        .addresses()
        .insert(&bazaar_core::models::NewAddress {
            user_id: bob.id,
            line1: "1 Rue B".into(),
            line2: None,
            city: "Lyon".into(),
            region: None,
            postal_code: "69001".into(),
            country: "FR".into(),
            is_default: true,
        })
        .await
        .unwrap();
    let carts = cart_service(&db);
    carts.add_item(ada.id, mug.id, 1).await.unwrap();

    let err = carts
        .checkout(
            ada.id,
            CheckoutRequest {
                address_id: Some(bobs_address.id),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    assert!(db.carts().open_cart(ada.id).await.unwrap().is_some());
    let orders = db.orders().list(Default::default()).await.unwrap();
    assert_eq!(orders.total, 0);
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn percentage_coupon_cannot_be_patched_above_100() {
    let (db, _container) = setup_test_db().await;
    let coupons = CrudService::new(db.coupons());
    let coupon = coupons.create(ten_percent("TENOFF", None)).await.unwrap();

    let raise = CouponPatch {
        discount_value: Some(Decimal::new(250, 0)),
        ..Default::default()
    };
    let err = coupons.update(coupon.id, raise.clone()).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    // The table constraint holds even when the service checks are skipped.
    let err = db.coupons().update(coupon.id, &raise).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    let stored = db.coupons().get(coupon.id).await.unwrap().unwrap();
    assert_eq!(stored.discount_value, Decimal::new(10, 0));
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn cancelling_only_applies_to_pending_orders() {
    let (db, _container) = setup_test_db().await;
    let user = seed_user(&db, "ada@example.com").await;
    let mug = seed_product(&db, "MUG", 1000).await;
    let carts = cart_service(&db);

    carts.add_item(user.id, mug.id, 1).await.unwrap();
    let placed = carts
        .checkout(user.id, CheckoutRequest::default())
        .await
        .unwrap();
    let order_id = placed.order.id;

    let paid = OrderPatch {
        status: Some(OrderStatus::Paid),
        ..Default::default()
    };
    db.orders().update(order_id, &paid).await.unwrap();

    let cancelled = db
        .orders()
        .transition(order_id, OrderStatus::Pending, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert!(cancelled.is_none());
    let order = db.orders().get(order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Paid);

    let shipped = db
        .orders()
        .transition(order_id, OrderStatus::Paid, OrderStatus::Shipped)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);
}

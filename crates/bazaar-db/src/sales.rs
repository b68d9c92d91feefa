use bazaar_core::models::{
    Coupon, CouponPatch, NewCoupon, NewOrder, NewOrderDetail, NewPayment, Order, OrderDetail,
    OrderDetailPatch, OrderPatch, OrderStatus, Payment, PaymentPatch,
};
use bazaar_core::{
    AppError, CouponCodes, CrudStore, OrderLines, OrderTransitions, Page, PageRequest, UserScoped,
};

use crate::support::{self, map_db_error, repository};

// ---------------------------------------------------------------------------
// Coupon
// ---------------------------------------------------------------------------

repository!(CouponRepository => "coupons");

impl CrudStore for CouponRepository {
    type Entity = Coupon;
    type Create = NewCoupon;
    type Update = CouponPatch;

    const RESOURCE: &'static str = "coupon";

    async fn list(&self, page: PageRequest) -> Result<Page<Coupon>, AppError> {
        support::fetch_page(&self.pool, Self::TABLE, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<Coupon>, AppError> {
        support::fetch_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn insert(&self, input: &NewCoupon) -> Result<Coupon, AppError> {
        sqlx::query_as::<_, Coupon>(
            r#"
            INSERT INTO coupons
                (code, discount_type, discount_value, min_order_amount, max_uses,
                 starts_at, expires_at, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&input.code)
        .bind(input.discount_type.as_str())
        .bind(input.discount_value)
        .bind(input.min_order_amount)
        .bind(input.max_uses)
        .bind(input.starts_at)
        .bind(input.expires_at)
        .bind(input.active)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update(&self, id: i64, patch: &CouponPatch) -> Result<Option<Coupon>, AppError> {
        sqlx::query_as::<_, Coupon>(
            r#"
            UPDATE coupons
            SET code = COALESCE($2, code),
                discount_type = COALESCE($3, discount_type),
                discount_value = COALESCE($4, discount_value),
                min_order_amount = COALESCE($5, min_order_amount),
                max_uses = COALESCE($6, max_uses),
                starts_at = COALESCE($7, starts_at),
                expires_at = COALESCE($8, expires_at),
                active = COALESCE($9, active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.code)
        .bind(patch.discount_type.map(|t| t.as_str()))
        .bind(patch.discount_value)
        .bind(patch.min_order_amount)
        .bind(patch.max_uses)
        .bind(patch.starts_at)
        .bind(patch.expires_at)
        .bind(patch.active)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    fn validate_merged(&self, current: &Coupon, patch: &CouponPatch) -> Result<(), AppError> {
        patch.validate_against(current)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        support::delete_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn find_conflict(&self, input: &NewCoupon) -> Result<Option<String>, AppError> {
        Ok(self
            .find_by_code(&input.code)
            .await?
            .map(|_| format!("coupon code {} already exists", input.code)))
    }
}

impl CouponCodes for CouponRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, AppError> {
        sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }
}

// ---------------------------------------------------------------------------
// Payment
// ---------------------------------------------------------------------------

repository!(PaymentRepository => "payments");

impl CrudStore for PaymentRepository {
    type Entity = Payment;
    type Create = NewPayment;
    type Update = PaymentPatch;

    const RESOURCE: &'static str = "payment";

    async fn list(&self, page: PageRequest) -> Result<Page<Payment>, AppError> {
        support::fetch_page(&self.pool, Self::TABLE, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<Payment>, AppError> {
        support::fetch_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn insert(&self, input: &NewPayment) -> Result<Payment, AppError> {
        sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (method, status, amount, reference, paid_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&input.method)
        .bind(input.status.as_str())
        .bind(input.amount)
        .bind(&input.reference)
        .bind(input.paid_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update(&self, id: i64, patch: &PaymentPatch) -> Result<Option<Payment>, AppError> {
        sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = COALESCE($2, status),
                reference = COALESCE($3, reference),
                paid_at = COALESCE($4, paid_at),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(&patch.reference)
        .bind(patch.paid_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        support::delete_by_id(&self.pool, Self::TABLE, id).await
    }
}

// ---------------------------------------------------------------------------
// Order / OrderDetail
// ---------------------------------------------------------------------------

repository!(OrderRepository => "orders");

impl CrudStore for OrderRepository {
    type Entity = Order;
    type Create = NewOrder;
    type Update = OrderPatch;

    const RESOURCE: &'static str = "order";

    async fn list(&self, page: PageRequest) -> Result<Page<Order>, AppError> {
        support::fetch_page(&self.pool, Self::TABLE, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<Order>, AppError> {
        support::fetch_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn insert(&self, input: &NewOrder) -> Result<Order, AppError> {
        sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders
                (user_id, coupon_id, payment_id, address_id, status,
                 subtotal, discount, total, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(input.user_id)
        .bind(input.coupon_id)
        .bind(input.payment_id)
        .bind(input.address_id)
        .bind(input.status.as_str())
        .bind(input.subtotal)
        .bind(input.discount)
        .bind(input.total)
        .bind(&input.note)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update(&self, id: i64, patch: &OrderPatch) -> Result<Option<Order>, AppError> {
        sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET status = COALESCE($2, status),
                payment_id = COALESCE($3, payment_id),
                address_id = COALESCE($4, address_id),
                note = COALESCE($5, note),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.payment_id)
        .bind(patch.address_id)
        .bind(&patch.note)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        support::delete_by_id(&self.pool, Self::TABLE, id).await
    }
}

impl UserScoped for OrderRepository {
    async fn list_for_user(&self, user_id: i64, page: PageRequest) -> Result<Page<Order>, AppError> {
        support::fetch_page_by(&self.pool, Self::TABLE, "user_id", user_id, page).await
    }
}

impl OrderTransitions for OrderRepository {
    async fn transition(
        &self,
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, AppError> {
        sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }
}

repository!(
    /// Order lines. `line_total` is always derived from price and quantity.
    OrderDetailRepository => "order_details"
);

impl CrudStore for OrderDetailRepository {
    type Entity = OrderDetail;
    type Create = NewOrderDetail;
    type Update = OrderDetailPatch;

    const RESOURCE: &'static str = "order detail";

    async fn list(&self, page: PageRequest) -> Result<Page<OrderDetail>, AppError> {
        support::fetch_page(&self.pool, Self::TABLE, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<OrderDetail>, AppError> {
        support::fetch_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn insert(&self, input: &NewOrderDetail) -> Result<OrderDetail, AppError> {
        sqlx::query_as::<_, OrderDetail>(
            r#"
            INSERT INTO order_details (order_id, product_id, quantity, unit_price, line_total)
            VALUES ($1, $2, $3, $4, $4 * $3)
            RETURNING *
            "#,
        )
        .bind(input.order_id)
        .bind(input.product_id)
        .bind(input.quantity)
        .bind(input.unit_price)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update(
        &self,
        id: i64,
        patch: &OrderDetailPatch,
    ) -> Result<Option<OrderDetail>, AppError> {
        sqlx::query_as::<_, OrderDetail>(
            r#"
            UPDATE order_details
            SET quantity = COALESCE($2, quantity),
                unit_price = COALESCE($3, unit_price),
                line_total = COALESCE($3, unit_price) * COALESCE($2, quantity),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.quantity)
        .bind(patch.unit_price)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        support::delete_by_id(&self.pool, Self::TABLE, id).await
    }
}

impl OrderLines for OrderDetailRepository {
    async fn details_for_order(&self, order_id: i64) -> Result<Vec<OrderDetail>, AppError> {
        sqlx::query_as::<_, OrderDetail>(
            "SELECT * FROM order_details WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }
}

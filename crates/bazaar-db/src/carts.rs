use bazaar_core::cart::{LineChange, OrderDraft};
use bazaar_core::models::{
    Cart, CartItem, CartItemPatch, CartPatch, NewCart, NewCartItem, Order, OrderDetail,
};
use bazaar_core::{AppError, CartStore, CrudStore, Page, PageRequest};

use crate::support::{self, map_db_error, repository};

repository!(
    /// Carts, both as a plain admin resource and as the backing store for
    /// the shopping cart workflow.
    CartRepository => "carts"
);

impl CrudStore for CartRepository {
    type Entity = Cart;
    type Create = NewCart;
    type Update = CartPatch;

    const RESOURCE: &'static str = "cart";

    async fn list(&self, page: PageRequest) -> Result<Page<Cart>, AppError> {
        support::fetch_page(&self.pool, Self::TABLE, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<Cart>, AppError> {
        support::fetch_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn insert(&self, input: &NewCart) -> Result<Cart, AppError> {
        sqlx::query_as::<_, Cart>(
            "INSERT INTO carts (user_id, status, coupon_id) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(input.user_id)
        .bind(input.status.as_str())
        .bind(input.coupon_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update(&self, id: i64, patch: &CartPatch) -> Result<Option<Cart>, AppError> {
        sqlx::query_as::<_, Cart>(
            r#"
            UPDATE carts
            SET status = COALESCE($2, status),
                coupon_id = COALESCE($3, coupon_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.coupon_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        support::delete_by_id(&self.pool, Self::TABLE, id).await
    }
}

impl CartStore for CartRepository {
    async fn open_cart(&self, user_id: i64) -> Result<Option<Cart>, AppError> {
        sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1 AND status = 'open'")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn create_cart(&self, user_id: i64) -> Result<Cart, AppError> {
        // At most one open cart per user (partial unique index).
        let created = sqlx::query_as::<_, Cart>(
            r#"
            INSERT INTO carts (user_id, status)
            VALUES ($1, 'open')
            ON CONFLICT (user_id) WHERE status = 'open' DO NOTHING
            RETURNING *
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        match created {
            Some(cart) => {
                tracing::debug!(user_id, cart_id = cart.id, "cart opened");
                Ok(cart)
            }
            None => self.open_cart(user_id).await?.ok_or_else(|| {
                AppError::DatabaseError(format!("open cart for user {user_id} vanished"))
            }),
        }
    }

    async fn cart_items(&self, cart_id: i64) -> Result<Vec<CartItem>, AppError> {
        sqlx::query_as::<_, CartItem>("SELECT * FROM cart_items WHERE cart_id = $1 ORDER BY id")
            .bind(cart_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn save_line(&self, cart_id: i64, change: &LineChange) -> Result<CartItem, AppError> {
        let item = sqlx::query_as::<_, CartItem>(
            r#"
            INSERT INTO cart_items (cart_id, product_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (cart_id, product_id) DO UPDATE
            SET quantity = EXCLUDED.quantity,
                unit_price = EXCLUDED.unit_price,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(cart_id)
        .bind(change.product_id)
        .bind(change.quantity)
        .bind(change.unit_price)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        sqlx::query("UPDATE carts SET updated_at = NOW() WHERE id = $1")
            .bind(cart_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(item)
    }

    async fn remove_line(&self, cart_id: i64, product_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
            .bind(cart_id)
            .bind(product_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_coupon(&self, cart_id: i64, coupon_id: Option<i64>) -> Result<Cart, AppError> {
        sqlx::query_as::<_, Cart>(
            r#"
            UPDATE carts
            SET coupon_id = $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(cart_id)
        .bind(coupon_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| AppError::not_found("cart", cart_id))
    }

    async fn place_order(
        &self,
        cart_id: i64,
        draft: &OrderDraft,
    ) -> Result<(Order, Vec<OrderDetail>), AppError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        if let Some(address_id) = draft.address_id {
            let owned: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM addresses WHERE id = $1 AND user_id = $2)",
            )
            .bind(address_id)
            .bind(draft.user_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?;
            if !owned {
                return Err(AppError::invalid(
                    "address_id",
                    "does not belong to the current user",
                ));
            }
        }

        // A cart is ordered at most once.
        let closed: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE carts
            SET status = 'ordered',
                updated_at = NOW()
            WHERE id = $1 AND status = 'open'
            RETURNING id
            "#,
        )
        .bind(cart_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?;
        if closed.is_none() {
            return Err(AppError::Conflict(format!("cart {cart_id} is no longer open")));
        }

        if let Some(coupon_id) = draft.coupon_id {
            let consumed = sqlx::query(
                r#"
                UPDATE coupons
                SET used_count = used_count + 1,
                    updated_at = NOW()
                WHERE id = $1 AND (max_uses IS NULL OR used_count < max_uses)
                "#,
            )
            .bind(coupon_id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
            if consumed.rows_affected() == 0 {
                return Err(AppError::invalid("coupon", "has reached its usage limit"));
            }
        }

        let payment_id: i64 = sqlx::query_scalar(
            "INSERT INTO payments (method, status, amount) VALUES ($1, 'pending', $2) RETURNING id",
        )
        .bind(&draft.payment_method)
        .bind(draft.total)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders
                (user_id, coupon_id, payment_id, address_id, status,
                 subtotal, discount, total, note)
            VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(draft.user_id)
        .bind(draft.coupon_id)
        .bind(payment_id)
        .bind(draft.address_id)
        .bind(draft.subtotal)
        .bind(draft.discount)
        .bind(draft.total)
        .bind(&draft.note)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let mut details = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let detail = sqlx::query_as::<_, OrderDetail>(
                r#"
                INSERT INTO order_details (order_id, product_id, quantity, unit_price, line_total)
                VALUES ($1, $2, $3, $4, $4 * $3)
                RETURNING *
                "#,
            )
            .bind(order.id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?;
            details.push(detail);
        }

        tx.commit().await.map_err(map_db_error)?;

        tracing::debug!(
            cart_id,
            order_id = order.id,
            lines = details.len(),
            "order placed"
        );
        Ok((order, details))
    }
}

repository!(CartItemRepository => "cart_items");

impl CrudStore for CartItemRepository {
    type Entity = CartItem;
    type Create = NewCartItem;
    type Update = CartItemPatch;

    const RESOURCE: &'static str = "cart item";

    async fn list(&self, page: PageRequest) -> Result<Page<CartItem>, AppError> {
        support::fetch_page(&self.pool, Self::TABLE, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<CartItem>, AppError> {
        support::fetch_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn insert(&self, input: &NewCartItem) -> Result<CartItem, AppError> {
        sqlx::query_as::<_, CartItem>(
            r#"
            INSERT INTO cart_items (cart_id, product_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(input.cart_id)
        .bind(input.product_id)
        .bind(input.quantity)
        .bind(input.unit_price)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update(&self, id: i64, patch: &CartItemPatch) -> Result<Option<CartItem>, AppError> {
        sqlx::query_as::<_, CartItem>(
            r#"
            UPDATE cart_items
            SET quantity = COALESCE($2, quantity),
                unit_price = COALESCE($3, unit_price),
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

    async fn find_conflict(&self, input: &NewCartItem) -> Result<Option<String>, AppError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM cart_items WHERE cart_id = $1 AND product_id = $2)",
        )
        .bind(input.cart_id)
        .bind(input.product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(taken.then(|| {
            format!(
                "cart {} already has a line for product {}",
                input.cart_id, input.product_id
            )
        }))
    }
}

use chrono::Utc;
use rust_decimal::Decimal;

use crate::cart::{self, CartView, CheckoutRequest, LineChange, OrderDraft, OrderView};
use crate::error::AppError;
use crate::models::{Cart, Coupon, Product};
use crate::traits::{CartStore, CouponCodes, CrudStore};
use crate::validation;

/// One open cart per user: add, change, remove, coupons and checkout.
#[derive(Clone)]
pub struct CartService<C, P, K> {
    carts: C,
    products: P,
    coupons: K,
}

impl<C, P, K> CartService<C, P, K>
where
    C: CartStore,
    P: CrudStore<Entity = Product>,
    K: CrudStore<Entity = Coupon> + CouponCodes,
{
    pub fn new(carts: C, products: P, coupons: K) -> Self {
        Self {
            carts,
            products,
            coupons,
        }
    }

    pub async fn view(&self, user_id: i64) -> Result<CartView, AppError> {
        match self.carts.open_cart(user_id).await? {
            Some(cart) => self.view_of(cart).await,
            None => Ok(CartView::empty()),
        }
    }

    /// Add `quantity` units of a product, creating the cart on first use.
    pub async fn add_item(
        &self,
        user_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> Result<CartView, AppError> {
        validation::positive("quantity", i64::from(quantity))?;
        let product = self.available_product(product_id).await?;

        let cart = match self.carts.open_cart(user_id).await? {
            Some(cart) => cart,
            None => self.carts.create_cart(user_id).await?,
        };
        let items = self.carts.cart_items(cart.id).await?;
        let existing = items.iter().find(|i| i.product_id == product_id);

        let change = cart::merge_line(existing, &product, quantity)?;
        self.carts.save_line(cart.id, &change).await?;
        tracing::debug!(cart_id = cart.id, product_id, quantity = change.quantity, "cart line saved");

        self.view_of(cart).await
    }

    /// Overwrite a line's quantity. Zero removes the line.
    pub async fn set_quantity(
        &self,
        user_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> Result<CartView, AppError> {
        if quantity < 0 {
            return Err(AppError::invalid("quantity", "must not be negative"));
        }
        if quantity == 0 {
            return self.remove_item(user_id, product_id).await;
        }

        let cart = self.require_cart(user_id).await?;
        let items = self.carts.cart_items(cart.id).await?;
        let line = items
            .iter()
            .find(|i| i.product_id == product_id)
            .ok_or_else(|| missing_line(product_id))?;

        let unit_price = match self.products.get(product_id).await? {
            Some(product) => product.price,
            None => line.unit_price,
        };
        let change = LineChange {
            product_id,
            quantity,
            unit_price,
        };
        self.carts.save_line(cart.id, &change).await?;

        self.view_of(cart).await
    }

    pub async fn remove_item(&self, user_id: i64, product_id: i64) -> Result<CartView, AppError> {
        let cart = self.require_cart(user_id).await?;
        if !self.carts.remove_line(cart.id, product_id).await? {
            return Err(missing_line(product_id));
        }
        self.view_of(cart).await
    }

    pub async fn apply_coupon(&self, user_id: i64, code: &str) -> Result<CartView, AppError> {
        validation::text("code", code, 50)?;
        let cart = self
            .carts
            .open_cart(user_id)
            .await?
            .ok_or_else(|| AppError::ValidationError("cart is empty".to_string()))?;
        let coupon = self
            .coupons
            .find_by_code(code.trim())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("coupon {} not found", code.trim())))?;

        let items = self.carts.cart_items(cart.id).await?;
        let subtotal = cart::summarize(&items, None, Utc::now()).subtotal;
        coupon.check_applicable(subtotal, Utc::now())?;

        let cart = self.carts.set_coupon(cart.id, Some(coupon.id)).await?;
        tracing::info!(cart_id = cart.id, coupon = %coupon.code, "coupon applied");
        self.view_of(cart).await
    }

    pub async fn clear_coupon(&self, user_id: i64) -> Result<CartView, AppError> {
        let cart = self.require_cart(user_id).await?;
        let cart = self.carts.set_coupon(cart.id, None).await?;
        self.view_of(cart).await
    }

    /// Turn the open cart into a pending order.
    ///
    /// Prices are re-read from the catalog and the coupon is re-checked; the
    /// store then writes payment, order, details, coupon usage and the cart
    /// status in one transaction.
    pub async fn checkout(
        &self,
        user_id: i64,
        request: CheckoutRequest,
    ) -> Result<OrderView, AppError> {
        validation::text("payment_method", &request.payment_method, 50)?;
        validation::opt_text("note", request.note.as_deref(), 1000)?;

        let empty = || AppError::ValidationError("cart is empty".to_string());
        let cart = self.carts.open_cart(user_id).await?.ok_or_else(empty)?;
        let items = self.carts.cart_items(cart.id).await?;
        if items.is_empty() {
            return Err(empty());
        }

        let mut lines = Vec::with_capacity(items.len());
        for item in &items {
            let product = match self.available_product(item.product_id).await {
                Ok(product) => product,
                Err(AppError::NotFound(_) | AppError::ValidationError(_)) => {
                    return Err(AppError::ValidationError(format!(
                        "product {} is no longer available",
                        item.product_id
                    )));
                }
                Err(e) => return Err(e),
            };
            lines.push(LineChange {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: product.price,
            });
        }

        let subtotal: Decimal = lines
            .iter()
            .map(|l| l.unit_price * Decimal::from(l.quantity))
            .sum();
        let discount = match cart.coupon_id {
            Some(coupon_id) => {
                let coupon = self.coupons.get(coupon_id).await?.ok_or_else(|| {
                    AppError::ValidationError(format!("coupon {coupon_id} no longer exists"))
                })?;
                coupon.check_applicable(subtotal, Utc::now())?;
                coupon.discount_for(subtotal)
            }
            None => Decimal::ZERO,
        };

        let draft = OrderDraft {
            user_id,
            coupon_id: cart.coupon_id,
            address_id: request.address_id,
            note: request.note,
            payment_method: request.payment_method,
            subtotal,
            discount,
            total: subtotal - discount,
            lines,
        };
        let (order, details) = self.carts.place_order(cart.id, &draft).await?;

        tracing::info!(
            user_id,
            cart_id = cart.id,
            order_id = order.id,
            total = %order.total,
            "checkout completed"
        );
        Ok(OrderView { order, details })
    }

    async fn view_of(&self, cart: Cart) -> Result<CartView, AppError> {
        let items = self.carts.cart_items(cart.id).await?;
        let coupon = match cart.coupon_id {
            Some(id) => self.coupons.get(id).await?,
            None => None,
        };
        let totals = cart::summarize(&items, coupon.as_ref(), Utc::now());
        Ok(CartView::new(cart, items, totals))
    }

    async fn require_cart(&self, user_id: i64) -> Result<Cart, AppError> {
        self.carts
            .open_cart(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("no open cart".to_string()))
    }

    async fn available_product(&self, product_id: i64) -> Result<Product, AppError> {
        let product = self
            .products
            .get(product_id)
            .await?
            .ok_or_else(|| AppError::not_found("product", product_id))?;
        if !product.active {
            return Err(AppError::ValidationError(format!(
                "product {product_id} is not available"
            )));
        }
        Ok(product)
    }
}

fn missing_line(product_id: i64) -> AppError {
    AppError::NotFound(format!("product {product_id} is not in the cart"))
}

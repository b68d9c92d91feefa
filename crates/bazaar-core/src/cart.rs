//! Cart arithmetic: line merging, totals and the order draft handed to the
//! store at checkout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{Cart, CartItem, Coupon, Order, OrderDetail, Product};

/// The desired state of one cart line after a change.
#[derive(Debug, Clone, PartialEq)]
pub struct LineChange {
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Merge `quantity` more units of `product` into the existing line, if any.
///
/// The summed quantity replaces the old one and the price snapshot is
/// refreshed from the product.
pub fn merge_line(
    existing: Option<&CartItem>,
    product: &Product,
    quantity: i32,
) -> Result<LineChange, AppError> {
    if quantity <= 0 {
        return Err(AppError::invalid("quantity", "must be greater than zero"));
    }
    let quantity = match existing {
        Some(line) => line
            .quantity
            .checked_add(quantity)
            .ok_or_else(|| AppError::invalid("quantity", "is too large"))?,
        None => quantity,
    };
    Ok(LineChange {
        product_id: product.id,
        quantity,
        unit_price: product.price,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Totals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub item_count: i64,
}

/// Sum the lines and apply `coupon` if it is still redeemable at `now`.
/// A coupon that no longer applies contributes no discount.
pub fn summarize(items: &[CartItem], coupon: Option<&Coupon>, now: DateTime<Utc>) -> Totals {
    let subtotal: Decimal = items.iter().map(CartItem::line_total).sum();
    let item_count = items.iter().map(|i| i64::from(i.quantity)).sum();

    let discount = coupon
        .filter(|c| c.check_applicable(subtotal, now).is_ok())
        .map_or(Decimal::ZERO, |c| c.discount_for(subtotal));

    Totals {
        subtotal,
        discount,
        total: subtotal - discount,
        item_count,
    }
}

/// The user's cart with computed totals. `cart` is `None` until the first
/// item is added.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct CartView {
    pub cart: Option<Cart>,
    pub items: Vec<CartItem>,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub discount: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
    pub item_count: i64,
}

impl CartView {
    pub fn empty() -> Self {
        Self {
            cart: None,
            items: Vec::new(),
            subtotal: Decimal::ZERO,
            discount: Decimal::ZERO,
            total: Decimal::ZERO,
            item_count: 0,
        }
    }

    pub fn new(cart: Cart, items: Vec<CartItem>, totals: Totals) -> Self {
        Self {
            cart: Some(cart),
            items,
            subtotal: totals.subtotal,
            discount: totals.discount,
            total: totals.total,
            item_count: totals.item_count,
        }
    }
}

/// Checkout options chosen by the customer.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct CheckoutRequest {
    pub address_id: Option<i64>,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
    pub note: Option<String>,
}

fn default_payment_method() -> String {
    "card".to_string()
}

impl Default for CheckoutRequest {
    fn default() -> Self {
        Self {
            address_id: None,
            payment_method: default_payment_method(),
            note: None,
        }
    }
}

/// Everything the store needs to persist an order in one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub user_id: i64,
    pub coupon_id: Option<i64>,
    pub address_id: Option<i64>,
    pub note: Option<String>,
    pub payment_method: String,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub lines: Vec<LineChange>,
}

/// An order together with its lines.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct OrderView {
    pub order: Order,
    pub details: Vec<OrderDetail>,
}

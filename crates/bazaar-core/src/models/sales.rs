use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::validation::{self, Validate};

/// Lower-case string enums stored as TEXT columns.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(AppError::ValidationError(format!(
                        "unknown {}: {s}",
                        stringify!($name)
                    ))),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = AppError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Coupon
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// `discount_value` percent of the subtotal.
    Percentage,
    /// `discount_value` off the subtotal, never below zero.
    Fixed,
}

text_enum!(DiscountType {
    Percentage => "percentage",
    Fixed => "fixed",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Coupon {
    pub id: i64,
    /// Public code typed by the customer, unique.
    pub code: String,
    #[cfg_attr(feature = "sqlx", sqlx(try_from = "String"))]
    pub discount_type: DiscountType,
    #[schema(value_type = String)]
    pub discount_value: Decimal,
    #[schema(value_type = Option<String>)]
    pub min_order_amount: Option<Decimal>,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// Check that the coupon can be redeemed against `subtotal` at `now`.
    pub fn check_applicable(&self, subtotal: Decimal, now: DateTime<Utc>) -> Result<(), AppError> {
        let reject = |reason: &str| {
            Err(AppError::ValidationError(format!(
                "coupon {} {reason}",
                self.code
            )))
        };

        if !self.active {
            return reject("is not active");
        }
        if self.starts_at.is_some_and(|start| now < start) {
            return reject("is not valid yet");
        }
        if self.expires_at.is_some_and(|end| now >= end) {
            return reject("has expired");
        }
        if self.max_uses.is_some_and(|max| self.used_count >= max) {
            return reject("has been fully redeemed");
        }
        if let Some(min) = self.min_order_amount
            && subtotal < min
        {
            return reject(&format!("requires a minimum order of {min}"));
        }
        Ok(())
    }

    /// Discount granted on `subtotal`, rounded to cents and capped at the subtotal.
    pub fn discount_for(&self, subtotal: Decimal) -> Decimal {
        let raw = match self.discount_type {
            DiscountType::Percentage => subtotal * self.discount_value / Decimal::ONE_HUNDRED,
            DiscountType::Fixed => self.discount_value,
        };
        raw.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .min(subtotal)
            .max(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewCoupon {
    pub code: String,
    pub discount_type: DiscountType,
    #[schema(value_type = String)]
    pub discount_value: Decimal,
    #[schema(value_type = Option<String>)]
    pub min_order_amount: Option<Decimal>,
    pub max_uses: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "super::default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct CouponPatch {
    pub code: Option<String>,
    pub discount_type: Option<DiscountType>,
    #[schema(value_type = Option<String>)]
    pub discount_value: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub min_order_amount: Option<Decimal>,
    pub max_uses: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: Option<bool>,
}

fn discount(kind: DiscountType, value: Decimal) -> Result<(), AppError> {
    if value <= Decimal::ZERO {
        return Err(AppError::invalid("discount_value", "must be greater than zero"));
    }
    if kind == DiscountType::Percentage && value > Decimal::ONE_HUNDRED {
        return Err(AppError::invalid(
            "discount_value",
            "a percentage cannot exceed 100",
        ));
    }
    Ok(())
}

impl Validate for NewCoupon {
    fn validate(&self) -> Result<(), AppError> {
        validation::text("code", &self.code, 50)?;
        discount(self.discount_type, self.discount_value)?;
        if let Some(min) = self.min_order_amount {
            validation::non_negative("min_order_amount", min)?;
        }
        if let Some(max) = self.max_uses {
            validation::positive("max_uses", i64::from(max))?;
        }
        if let (Some(start), Some(end)) = (self.starts_at, self.expires_at)
            && end <= start
        {
            return Err(AppError::invalid("expires_at", "must be after starts_at"));
        }
        Ok(())
    }
}

impl Validate for CouponPatch {
    fn validate(&self) -> Result<(), AppError> {
        validation::opt_text("code", self.code.as_deref(), 50)?;
        if let Some(value) = self.discount_value {
            discount(self.discount_type.unwrap_or(DiscountType::Fixed), value)?;
        }
        if let Some(min) = self.min_order_amount {
            validation::non_negative("min_order_amount", min)?;
        }
        if let Some(max) = self.max_uses {
            validation::positive("max_uses", i64::from(max))?;
        }
        Ok(())
    }
}

impl CouponPatch {
    /// Discount rules checked on the row as it will look after the patch,
    /// since a patch may change only the type or only the value.
    pub fn validate_against(&self, current: &Coupon) -> Result<(), AppError> {
        discount(
            self.discount_type.unwrap_or(current.discount_type),
            self.discount_value.unwrap_or(current.discount_value),
        )?;
        let starts_at = self.starts_at.or(current.starts_at);
        let expires_at = self.expires_at.or(current.expires_at);
        if let (Some(start), Some(end)) = (starts_at, expires_at)
            && end <= start
        {
            return Err(AppError::invalid("expires_at", "must be after starts_at"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Payment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

text_enum!(PaymentStatus {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
    Refunded => "refunded",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: i64,
    /// Free-form method name, e.g. "card" or "bank_transfer".
    pub method: String,
    #[cfg_attr(feature = "sqlx", sqlx(try_from = "String"))]
    pub status: PaymentStatus,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewPayment {
    pub method: String,
    #[serde(default)]
    pub status: PaymentStatus,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct PaymentPatch {
    pub status: Option<PaymentStatus>,
    pub reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Validate for NewPayment {
    fn validate(&self) -> Result<(), AppError> {
        validation::text("method", &self.method, 50)?;
        validation::non_negative("amount", self.amount)?;
        validation::opt_text("reference", self.reference.as_deref(), 200)
    }
}

impl Validate for PaymentPatch {
    fn validate(&self) -> Result<(), AppError> {
        validation::opt_text("reference", self.reference.as_deref(), 200)
    }
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CartStatus {
    /// Being filled; at most one per user.
    #[default]
    Open,
    /// Converted into an order.
    Ordered,
    Abandoned,
}

text_enum!(CartStatus {
    Open => "open",
    Ordered => "ordered",
    Abandoned => "abandoned",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Cart {
    pub id: i64,
    pub user_id: i64,
    #[cfg_attr(feature = "sqlx", sqlx(try_from = "String"))]
    pub status: CartStatus,
    pub coupon_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewCart {
    pub user_id: i64,
    #[serde(default)]
    pub status: CartStatus,
    pub coupon_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct CartPatch {
    pub status: Option<CartStatus>,
    pub coupon_id: Option<i64>,
}

impl Validate for NewCart {
    fn validate(&self) -> Result<(), AppError> {
        validation::positive("user_id", self.user_id)
    }
}

impl Validate for CartPatch {
    fn validate(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// One product line in a cart. `unit_price` is the price snapshot taken
/// when the line was last changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CartItem {
    pub id: i64,
    pub cart_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewCartItem {
    pub cart_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct CartItemPatch {
    pub quantity: Option<i32>,
    #[schema(value_type = Option<String>)]
    pub unit_price: Option<Decimal>,
}

impl Validate for NewCartItem {
    fn validate(&self) -> Result<(), AppError> {
        validation::positive("cart_id", self.cart_id)?;
        validation::positive("product_id", self.product_id)?;
        validation::positive("quantity", i64::from(self.quantity))?;
        validation::non_negative("unit_price", self.unit_price)
    }
}

impl Validate for CartItemPatch {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(q) = self.quantity {
            validation::positive("quantity", i64::from(q))?;
        }
        if let Some(price) = self.unit_price {
            validation::non_negative("unit_price", price)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

text_enum!(OrderStatus {
    Pending => "pending",
    Paid => "paid",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl OrderStatus {
    /// Customers may only cancel orders that have not been paid yet.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub coupon_id: Option<i64>,
    pub payment_id: Option<i64>,
    pub address_id: Option<i64>,
    #[cfg_attr(feature = "sqlx", sqlx(try_from = "String"))]
    pub status: OrderStatus,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub discount: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewOrder {
    pub user_id: i64,
    pub coupon_id: Option<i64>,
    pub payment_id: Option<i64>,
    pub address_id: Option<i64>,
    #[serde(default)]
    pub status: OrderStatus,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[serde(default)]
    #[schema(value_type = String)]
    pub discount: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub payment_id: Option<i64>,
    pub address_id: Option<i64>,
    pub note: Option<String>,
}

impl Validate for NewOrder {
    fn validate(&self) -> Result<(), AppError> {
        validation::positive("user_id", self.user_id)?;
        validation::non_negative("subtotal", self.subtotal)?;
        validation::non_negative("discount", self.discount)?;
        if self.discount > self.subtotal {
            return Err(AppError::invalid("discount", "cannot exceed the subtotal"));
        }
        if self.total != self.subtotal - self.discount {
            return Err(AppError::invalid("total", "must equal subtotal minus discount"));
        }
        validation::opt_text("note", self.note.as_deref(), 1000)
    }
}

impl Validate for OrderPatch {
    fn validate(&self) -> Result<(), AppError> {
        validation::opt_text("note", self.note.as_deref(), 1000)
    }
}

/// One product line of an order, priced at checkout time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderDetail {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    #[schema(value_type = String)]
    pub line_total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewOrderDetail {
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct OrderDetailPatch {
    pub quantity: Option<i32>,
    #[schema(value_type = Option<String>)]
    pub unit_price: Option<Decimal>,
}

impl Validate for NewOrderDetail {
    fn validate(&self) -> Result<(), AppError> {
        validation::positive("order_id", self.order_id)?;
        validation::positive("product_id", self.product_id)?;
        validation::positive("quantity", i64::from(self.quantity))?;
        validation::non_negative("unit_price", self.unit_price)
    }
}

impl Validate for OrderDetailPatch {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(q) = self.quantity {
            validation::positive("quantity", i64::from(q))?;
        }
        if let Some(price) = self.unit_price {
            validation::non_negative("unit_price", price)?;
        }
        Ok(())
    }
}

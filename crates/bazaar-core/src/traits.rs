use std::future::Future;

use crate::cart::{LineChange, OrderDraft};
use crate::error::AppError;
use crate::models::{Cart, CartItem, Coupon, NewUserRecord, Order, OrderDetail, OrderStatus, User};
use crate::page::{Page, PageRequest};
use crate::validation::Validate;

/// Anything persisted with an auto-increment identity key.
pub trait HasId {
    fn id(&self) -> i64;
}

/// Uniform persistence seam, implemented once per entity.
///
/// `Create` is the validated input DTO, `Update` a partial DTO where absent
/// fields are left untouched.
pub trait CrudStore: Send + Sync + Clone + 'static {
    type Entity: HasId + Clone + Send + Sync + 'static;
    type Create: Validate + Send + Sync + 'static;
    type Update: Validate + Send + Sync + 'static;

    /// Resource name used in messages and logs, e.g. `"product"`.
    const RESOURCE: &'static str;

    fn list(
        &self,
        page: PageRequest,
    ) -> impl Future<Output = Result<Page<Self::Entity>, AppError>> + Send;

    fn get(&self, id: i64) -> impl Future<Output = Result<Option<Self::Entity>, AppError>> + Send;

    fn insert(
        &self,
        input: &Self::Create,
    ) -> impl Future<Output = Result<Self::Entity, AppError>> + Send;

    /// Apply a partial update. Returns `None` when `id` does not exist.
    fn update(
        &self,
        id: i64,
        patch: &Self::Update,
    ) -> impl Future<Output = Result<Option<Self::Entity>, AppError>> + Send;

    /// Returns `false` when `id` does not exist.
    fn delete(&self, id: i64) -> impl Future<Output = Result<bool, AppError>> + Send;

    fn search(
        &self,
        query: &str,
        page: PageRequest,
    ) -> impl Future<Output = Result<Page<Self::Entity>, AppError>> + Send {
        let _ = (query, page);
        async {
            Err(AppError::Unsupported(format!(
                "search is not available for {}",
                Self::RESOURCE
            )))
        }
    }

    /// Existence query run before insert. Returns a conflict message when a
    /// uniqueness rule would be violated.
    fn find_conflict(
        &self,
        input: &Self::Create,
    ) -> impl Future<Output = Result<Option<String>, AppError>> + Send {
        let _ = input;
        async { Ok(None) }
    }

    /// Checks that need both the target id and the patch.
    fn validate_update(id: i64, patch: &Self::Update) -> Result<(), AppError> {
        let _ = (id, patch);
        Ok(())
    }

    /// Checks that need the stored row, for rules spanning patched and
    /// untouched fields.
    fn validate_merged(&self, current: &Self::Entity, patch: &Self::Update) -> Result<(), AppError> {
        let _ = (current, patch);
        Ok(())
    }
}

/// Records owned by a user (addresses, wishlist entries, orders).
pub trait UserScoped: CrudStore {
    fn list_for_user(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> impl Future<Output = Result<Page<Self::Entity>, AppError>> + Send;
}

/// Coupon lookup by its public code.
pub trait CouponCodes: Send + Sync + Clone {
    fn find_by_code(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Option<Coupon>, AppError>> + Send;
}

/// Order line lookup for assembling order views.
pub trait OrderLines: Send + Sync + Clone {
    fn details_for_order(
        &self,
        order_id: i64,
    ) -> impl Future<Output = Result<Vec<OrderDetail>, AppError>> + Send;
}

/// Status changes that only apply while an order is still in the expected status.
pub trait OrderTransitions: Send + Sync + Clone {
    /// Moves the order from `from` to `to`. `None` when the order is missing
    /// or has already left `from`.
    fn transition(
        &self,
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> impl Future<Output = Result<Option<Order>, AppError>> + Send;
}

/// Persistence for the per-user shopping cart aggregate.
pub trait CartStore: Send + Sync + Clone {
    /// The user's open cart, if any.
    fn open_cart(&self, user_id: i64) -> impl Future<Output = Result<Option<Cart>, AppError>> + Send;

    fn create_cart(&self, user_id: i64) -> impl Future<Output = Result<Cart, AppError>> + Send;

    fn cart_items(&self, cart_id: i64)
    -> impl Future<Output = Result<Vec<CartItem>, AppError>> + Send;

    /// Insert or overwrite the line for `change.product_id`.
    fn save_line(
        &self,
        cart_id: i64,
        change: &LineChange,
    ) -> impl Future<Output = Result<CartItem, AppError>> + Send;

    fn remove_line(
        &self,
        cart_id: i64,
        product_id: i64,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    fn set_coupon(
        &self,
        cart_id: i64,
        coupon_id: Option<i64>,
    ) -> impl Future<Output = Result<Cart, AppError>> + Send;

    /// Atomically create payment, order and details, consume the coupon and
    /// close the cart.
    fn place_order(
        &self,
        cart_id: i64,
        draft: &OrderDraft,
    ) -> impl Future<Output = Result<(Order, Vec<OrderDetail>), AppError>> + Send;
}

/// Account lookups used by authentication.
pub trait UserDirectory: Send + Sync + Clone {
    fn find_user(&self, id: i64) -> impl Future<Output = Result<Option<User>, AppError>> + Send;

    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<User>, AppError>> + Send;

    fn role_names(&self, user_id: i64)
    -> impl Future<Output = Result<Vec<String>, AppError>> + Send;

    /// Create the user and grant `role` in one transaction.
    fn create_with_role(
        &self,
        user: &NewUserRecord,
        role: &str,
    ) -> impl Future<Output = Result<User, AppError>> + Send;
}

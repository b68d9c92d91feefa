//! Test utilities: in-memory implementations of the core store traits.
//!
//! All stores use `Arc<Mutex<_>>` state so clones share data, which lets a
//! test hand one clone to a service and inspect another.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::cart::{LineChange, OrderDraft};
use crate::error::AppError;
use crate::models::{
    Cart, CartItem, CartStatus, NewOrder, NewOrderDetail, NewUserRecord, Order, OrderDetail,
    OrderStatus, User, UserRecordPatch,
};
use crate::page::{Page, PageRequest};
use crate::traits::{CartStore, CrudStore, HasId, UserDirectory};
use crate::validation::Validate;

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

type BuildFn<E, C> = Arc<dyn Fn(i64, &C) -> E + Send + Sync>;
type PatchFn<E, U> = Arc<dyn Fn(&mut E, &U) + Send + Sync>;
type ConflictFn<E, C> = Arc<dyn Fn(&[E], &C) -> Option<String> + Send + Sync>;
type MatchFn<E> = Arc<dyn Fn(&E, &str) -> bool + Send + Sync>;
type MergedFn<E, U> = Arc<dyn Fn(&E, &U) -> Result<(), AppError> + Send + Sync>;

/// Generic `CrudStore` over a `Vec`, configured with closures that build an
/// entity from its DTO and apply a patch.
pub struct MemoryStore<E, C, U> {
    rows: Arc<Mutex<Vec<E>>>,
    next_id: Arc<AtomicI64>,
    build: BuildFn<E, C>,
    patch: PatchFn<E, U>,
    conflict: Option<ConflictFn<E, C>>,
    matches: Option<MatchFn<E>>,
    merged: Option<MergedFn<E, U>>,
}

impl<E, C, U> Clone for MemoryStore<E, C, U> {
    fn clone(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
            next_id: Arc::clone(&self.next_id),
            build: Arc::clone(&self.build),
            patch: Arc::clone(&self.patch),
            conflict: self.conflict.clone(),
            matches: self.matches.clone(),
            merged: self.merged.clone(),
        }
    }
}

impl<E: HasId + Clone, C, U> MemoryStore<E, C, U> {
    pub fn new(
        build: impl Fn(i64, &C) -> E + Send + Sync + 'static,
        patch: impl Fn(&mut E, &U) + Send + Sync + 'static,
    ) -> Self {
        Self {
            rows: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicI64::new(1)),
            build: Arc::new(build),
            patch: Arc::new(patch),
            conflict: None,
            matches: None,
            merged: None,
        }
    }

    /// Uniqueness check run by `find_conflict`.
    pub fn with_conflict(
        mut self,
        conflict: impl Fn(&[E], &C) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.conflict = Some(Arc::new(conflict));
        self
    }

    /// Enables `search` with the given predicate.
    pub fn with_search(mut self, matches: impl Fn(&E, &str) -> bool + Send + Sync + 'static) -> Self {
        self.matches = Some(Arc::new(matches));
        self
    }

    /// Check run by `validate_merged` against the stored row.
    pub fn with_merged_check(
        mut self,
        check: impl Fn(&E, &U) -> Result<(), AppError> + Send + Sync + 'static,
    ) -> Self {
        self.merged = Some(Arc::new(check));
        self
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rows(&self) -> Vec<E> {
        self.rows.lock().unwrap().clone()
    }

    /// Mutate a row in place, bypassing validation.
    pub fn modify(&self, id: i64, f: impl FnOnce(&mut E)) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.id() == id) {
            f(row);
        }
    }

    fn insert_built(&self, input: &C) -> E {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let entity = (self.build)(id, input);
        self.rows.lock().unwrap().push(entity.clone());
        entity
    }
}

impl<E, C, U> CrudStore for MemoryStore<E, C, U>
where
    E: HasId + Clone + Send + Sync + 'static,
    C: Validate + Send + Sync + 'static,
    U: Validate + Send + Sync + 'static,
{
    type Entity = E;
    type Create = C;
    type Update = U;

    const RESOURCE: &'static str = "record";

    async fn list(&self, page: PageRequest) -> Result<Page<E>, AppError> {
        Ok(Page::from_vec(self.rows(), page))
    }

    async fn get(&self, id: i64) -> Result<Option<E>, AppError> {
        Ok(self.rows.lock().unwrap().iter().find(|r| r.id() == id).cloned())
    }

    async fn insert(&self, input: &C) -> Result<E, AppError> {
        Ok(self.insert_built(input))
    }

    async fn update(&self, id: i64, patch: &U) -> Result<Option<E>, AppError> {
        let mut rows = self.rows.lock().unwrap();
        Ok(rows.iter_mut().find(|r| r.id() == id).map(|row| {
            (self.patch)(row, patch);
            row.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.id() != id);
        Ok(rows.len() < before)
    }

    async fn search(&self, query: &str, page: PageRequest) -> Result<Page<E>, AppError> {
        let Some(matches) = &self.matches else {
            return Err(AppError::Unsupported(format!(
                "search is not available for {}",
                Self::RESOURCE
            )));
        };
        let query = query.to_lowercase();
        let found = self
            .rows()
            .into_iter()
            .filter(|r| matches(r, &query))
            .collect();
        Ok(Page::from_vec(found, page))
    }

    async fn find_conflict(&self, input: &C) -> Result<Option<String>, AppError> {
        Ok(self
            .conflict
            .as_ref()
            .and_then(|conflict| conflict(&self.rows.lock().unwrap(), input)))
    }

    fn validate_merged(&self, current: &E, patch: &U) -> Result<(), AppError> {
        self.merged.as_ref().map_or(Ok(()), |check| check(current, patch))
    }
}

/// Ready-made stores for the entities the service tests exercise.
pub mod memory {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::MemoryStore;
    use crate::error::AppError;
    use crate::models::{
        Coupon, CouponPatch, NewCoupon, NewOrder, NewOrderDetail, NewProduct, NewTag, Order,
        OrderDetail, OrderDetailPatch, OrderPatch, OrderStatus, Product, ProductPatch, Tag,
        TagPatch,
    };
    use crate::page::{Page, PageRequest};
    use crate::traits::{CouponCodes, OrderLines, OrderTransitions, UserScoped};

    pub type Tags = MemoryStore<Tag, NewTag, TagPatch>;
    pub type Products = MemoryStore<Product, NewProduct, ProductPatch>;
    pub type Coupons = MemoryStore<Coupon, NewCoupon, CouponPatch>;
    pub type Orders = MemoryStore<Order, NewOrder, OrderPatch>;
    pub type OrderDetails = MemoryStore<OrderDetail, NewOrderDetail, OrderDetailPatch>;

    pub fn tags() -> Tags {
        MemoryStore::new(
            |id, input: &NewTag| Tag {
                id,
                name: input.name.clone(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            |tag, patch: &TagPatch| {
                if let Some(name) = &patch.name {
                    tag.name = name.clone();
                }
                tag.updated_at = Utc::now();
            },
        )
        .with_conflict(|rows, input| {
            rows.iter()
                .any(|t| t.name == input.name)
                .then(|| format!("tag {} already exists", input.name))
        })
    }

    pub fn products() -> Products {
        MemoryStore::new(
            |id, input: &NewProduct| Product {
                id,
                name: input.name.clone(),
                sku: input.sku.clone(),
                description: input.description.clone(),
                price: input.price,
                category_id: input.category_id,
                label_id: input.label_id,
                active: input.active,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            |product, patch: &ProductPatch| {
                if let Some(name) = &patch.name {
                    product.name = name.clone();
                }
                if let Some(sku) = &patch.sku {
                    product.sku = sku.clone();
                }
                if let Some(price) = patch.price {
                    product.price = price;
                }
                if let Some(active) = patch.active {
                    product.active = active;
                }
                product.updated_at = Utc::now();
            },
        )
        .with_conflict(|rows, input| {
            rows.iter()
                .any(|p| p.sku == input.sku)
                .then(|| format!("product sku {} already exists", input.sku))
        })
        .with_search(|p, q| {
            p.name.to_lowercase().contains(q) || p.sku.to_lowercase().contains(q)
        })
    }

    pub fn coupons() -> Coupons {
        MemoryStore::new(
            |id, input: &NewCoupon| Coupon {
                id,
                code: input.code.clone(),
                discount_type: input.discount_type,
                discount_value: input.discount_value,
                min_order_amount: input.min_order_amount,
                max_uses: input.max_uses,
                used_count: 0,
                starts_at: input.starts_at,
                expires_at: input.expires_at,
                active: input.active,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            |coupon, patch: &CouponPatch| {
                if let Some(kind) = patch.discount_type {
                    coupon.discount_type = kind;
                }
                if let Some(value) = patch.discount_value {
                    coupon.discount_value = value;
                }
                if let Some(max) = patch.max_uses {
                    coupon.max_uses = Some(max);
                }
                if let Some(active) = patch.active {
                    coupon.active = active;
                }
                if let Some(expires_at) = patch.expires_at {
                    coupon.expires_at = Some(expires_at);
                }
                coupon.updated_at = Utc::now();
            },
        )
        .with_conflict(|rows, input| {
            rows.iter()
                .any(|c| c.code == input.code)
                .then(|| format!("coupon {} already exists", input.code))
        })
        .with_merged_check(|coupon: &Coupon, patch: &CouponPatch| patch.validate_against(coupon))
    }

    impl CouponCodes for Coupons {
        async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, AppError> {
            Ok(self.rows().into_iter().find(|c| c.code == code))
        }
    }

    pub fn orders() -> Orders {
        MemoryStore::new(
            |id, input: &NewOrder| Order {
                id,
                user_id: input.user_id,
                coupon_id: input.coupon_id,
                payment_id: input.payment_id,
                address_id: input.address_id,
                status: input.status,
                subtotal: input.subtotal,
                discount: input.discount,
                total: input.total,
                note: input.note.clone(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            |order, patch: &OrderPatch| {
                if let Some(status) = patch.status {
                    order.status = status;
                }
                if let Some(note) = &patch.note {
                    order.note = Some(note.clone());
                }
                order.updated_at = Utc::now();
            },
        )
    }

    impl UserScoped for Orders {
        async fn list_for_user(
            &self,
            user_id: i64,
            page: PageRequest,
        ) -> Result<Page<Order>, AppError> {
            let own = self
                .rows()
                .into_iter()
                .filter(|o| o.user_id == user_id)
                .collect();
            Ok(Page::from_vec(own, page))
        }
    }

    pub fn order_details() -> OrderDetails {
        MemoryStore::new(
            |id, input: &NewOrderDetail| OrderDetail {
                id,
                order_id: input.order_id,
                product_id: input.product_id,
                quantity: input.quantity,
                unit_price: input.unit_price,
                line_total: input.unit_price * Decimal::from(input.quantity),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            |detail, patch: &OrderDetailPatch| {
                if let Some(quantity) = patch.quantity {
                    detail.quantity = quantity;
                }
                if let Some(price) = patch.unit_price {
                    detail.unit_price = price;
                }
                detail.line_total = detail.unit_price * Decimal::from(detail.quantity);
            },
        )
    }

    impl OrderTransitions for Orders {
        async fn transition(
            &self,
            order_id: i64,
            from: OrderStatus,
            to: OrderStatus,
        ) -> Result<Option<Order>, AppError> {
            let mut rows = self.rows.lock().unwrap();
            Ok(rows
                .iter_mut()
                .find(|o| o.id == order_id && o.status == from)
                .map(|o| {
                    o.status = to;
                    o.updated_at = Utc::now();
                    o.clone()
                }))
        }
    }

    impl OrderLines for OrderDetails {
        async fn details_for_order(&self, order_id: i64) -> Result<Vec<OrderDetail>, AppError> {
            Ok(self
                .rows()
                .into_iter()
                .filter(|d| d.order_id == order_id)
                .collect())
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryCartStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CartState {
    next_id: i64,
    carts: Vec<Cart>,
    items: Vec<CartItem>,
}

impl CartState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Cart aggregate backed by memory. Checkout writes into the shared order,
/// detail and coupon stores.
#[derive(Clone)]
pub struct MemoryCartStore {
    state: Arc<Mutex<CartState>>,
    coupons: memory::Coupons,
    pub orders: memory::Orders,
    pub details: memory::OrderDetails,
}

impl MemoryCartStore {
    pub fn new(coupons: memory::Coupons) -> Self {
        Self {
            state: Arc::new(Mutex::new(CartState::default())),
            coupons,
            orders: memory::orders(),
            details: memory::order_details(),
        }
    }

    /// Status of the user's most recent cart.
    pub fn cart_status(&self, user_id: i64) -> Option<CartStatus> {
        let state = self.state.lock().unwrap();
        state
            .carts
            .iter()
            .filter(|c| c.user_id == user_id)
            .max_by_key(|c| c.id)
            .map(|c| c.status)
    }
}

impl CartStore for MemoryCartStore {
    async fn open_cart(&self, user_id: i64) -> Result<Option<Cart>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .carts
            .iter()
            .find(|c| c.user_id == user_id && c.status == CartStatus::Open)
            .cloned())
    }

    async fn create_cart(&self, user_id: i64) -> Result<Cart, AppError> {
        let mut state = self.state.lock().unwrap();
        if state
            .carts
            .iter()
            .any(|c| c.user_id == user_id && c.status == CartStatus::Open)
        {
            return Err(AppError::Conflict(format!(
                "user {user_id} already has an open cart"
            )));
        }
        let cart = Cart {
            id: state.next_id(),
            user_id,
            status: CartStatus::Open,
            coupon_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        state.carts.push(cart.clone());
        Ok(cart)
    }

    async fn cart_items(&self, cart_id: i64) -> Result<Vec<CartItem>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .items
            .iter()
            .filter(|i| i.cart_id == cart_id)
            .cloned()
            .collect())
    }

    async fn save_line(&self, cart_id: i64, change: &LineChange) -> Result<CartItem, AppError> {
        let mut state = self.state.lock().unwrap();
        if let Some(item) = state
            .items
            .iter_mut()
            .find(|i| i.cart_id == cart_id && i.product_id == change.product_id)
        {
            item.quantity = change.quantity;
            item.unit_price = change.unit_price;
            item.updated_at = Utc::now();
            return Ok(item.clone());
        }

        let item = CartItem {
            id: state.next_id(),
            cart_id,
            product_id: change.product_id,
            quantity: change.quantity,
            unit_price: change.unit_price,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        state.items.push(item.clone());
        Ok(item)
    }

    async fn remove_line(&self, cart_id: i64, product_id: i64) -> Result<bool, AppError> {
        let mut state = self.state.lock().unwrap();
        let before = state.items.len();
        state
            .items
            .retain(|i| !(i.cart_id == cart_id && i.product_id == product_id));
        Ok(state.items.len() < before)
    }

    async fn set_coupon(&self, cart_id: i64, coupon_id: Option<i64>) -> Result<Cart, AppError> {
        let mut state = self.state.lock().unwrap();
        let cart = state
            .carts
            .iter_mut()
            .find(|c| c.id == cart_id)
            .ok_or_else(|| AppError::not_found("cart", cart_id))?;
        cart.coupon_id = coupon_id;
        cart.updated_at = Utc::now();
        Ok(cart.clone())
    }

    async fn place_order(
        &self,
        cart_id: i64,
        draft: &OrderDraft,
    ) -> Result<(Order, Vec<OrderDetail>), AppError> {
        let new_order = NewOrder {
            user_id: draft.user_id,
            coupon_id: draft.coupon_id,
            payment_id: None,
            address_id: draft.address_id,
            status: OrderStatus::Pending,
            subtotal: draft.subtotal,
            discount: draft.discount,
            total: draft.total,
            note: draft.note.clone(),
        };
        let order = self.orders.insert(&new_order).await?;

        let mut details = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let new_detail = NewOrderDetail {
                order_id: order.id,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
            };
            details.push(self.details.insert(&new_detail).await?);
        }

        if let Some(coupon_id) = draft.coupon_id {
            self.coupons.modify(coupon_id, |c| c.used_count += 1);
        }

        let mut state = self.state.lock().unwrap();
        if let Some(cart) = state.carts.iter_mut().find(|c| c.id == cart_id) {
            cart.status = CartStatus::Ordered;
        }

        Ok((order, details))
    }
}

// ---------------------------------------------------------------------------
// MemoryUsers
// ---------------------------------------------------------------------------

/// Raw user records plus role grants, implementing both the user
/// `CrudStore` and `UserDirectory`.
#[derive(Clone)]
pub struct MemoryUsers {
    users: MemoryStore<User, NewUserRecord, UserRecordPatch>,
    roles: Arc<Mutex<HashMap<i64, Vec<String>>>>,
}

impl Default for MemoryUsers {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryUsers {
    pub fn new() -> Self {
        let users = MemoryStore::new(
            |id, input: &NewUserRecord| User {
                id,
                email: input.email.clone(),
                password_hash: input.password_hash.clone(),
                full_name: input.full_name.clone(),
                phone: input.phone.clone(),
                active: input.active,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            |user, patch: &UserRecordPatch| {
                if let Some(email) = &patch.email {
                    user.email = email.clone();
                }
                if let Some(hash) = &patch.password_hash {
                    user.password_hash = hash.clone();
                }
                if let Some(name) = &patch.full_name {
                    user.full_name = name.clone();
                }
                if let Some(phone) = &patch.phone {
                    user.phone = Some(phone.clone());
                }
                if let Some(active) = patch.active {
                    user.active = active;
                }
                user.updated_at = Utc::now();
            },
        )
        .with_search(|u, q| {
            u.email.to_lowercase().contains(q) || u.full_name.to_lowercase().contains(q)
        });

        Self {
            users,
            roles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn grant(&self, user_id: i64, role: &str) {
        self.roles
            .lock()
            .unwrap()
            .entry(user_id)
            .or_default()
            .push(role.to_string());
    }

    pub fn role_names_of(&self, user_id: i64) -> Vec<String> {
        self.roles
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_active(&self, user_id: i64, active: bool) {
        self.users.modify(user_id, |u| u.active = active);
    }
}

impl CrudStore for MemoryUsers {
    type Entity = User;
    type Create = NewUserRecord;
    type Update = UserRecordPatch;

    const RESOURCE: &'static str = "user";

    async fn list(&self, page: PageRequest) -> Result<Page<User>, AppError> {
        self.users.list(page).await
    }

    async fn get(&self, id: i64) -> Result<Option<User>, AppError> {
        self.users.get(id).await
    }

    async fn insert(&self, input: &NewUserRecord) -> Result<User, AppError> {
        self.users.insert(input).await
    }

    async fn update(&self, id: i64, patch: &UserRecordPatch) -> Result<Option<User>, AppError> {
        self.users.update(id, patch).await
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        self.roles.lock().unwrap().remove(&id);
        self.users.delete(id).await
    }

    async fn search(&self, query: &str, page: PageRequest) -> Result<Page<User>, AppError> {
        self.users.search(query, page).await
    }
}

impl UserDirectory for MemoryUsers {
    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        self.users.get(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.rows().into_iter().find(|u| u.email == email))
    }

    async fn role_names(&self, user_id: i64) -> Result<Vec<String>, AppError> {
        Ok(self.role_names_of(user_id))
    }

    async fn create_with_role(&self, user: &NewUserRecord, role: &str) -> Result<User, AppError> {
        let created = self.users.insert(user).await?;
        self.grant(created.id, role);
        Ok(created)
    }
}

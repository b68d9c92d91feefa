use std::path::PathBuf;

use bazaar_core::services::{CartService, OrderService};
use bazaar_core::{AuthService, JwtKeys};
use bazaar_db::{
    CartRepository, CouponRepository, Database, OrderDetailRepository, OrderRepository,
    ProductRepository, UserRepository,
};

pub type Carts = CartService<CartRepository, ProductRepository, CouponRepository>;
pub type Orders = OrderService<OrderRepository, OrderDetailRepository>;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub db: Database,
    pub auth: AuthService<UserRepository>,
    /// Root directory for uploaded files, served at `/uploads`.
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(db: Database, keys: JwtKeys, upload_dir: impl Into<PathBuf>) -> Self {
        let auth = AuthService::new(db.users(), keys);
        Self {
            db,
            auth,
            upload_dir: upload_dir.into(),
        }
    }

    pub fn carts(&self) -> Carts {
        CartService::new(self.db.carts(), self.db.products(), self.db.coupons())
    }

    pub fn orders(&self) -> Orders {
        OrderService::new(self.db.orders(), self.db.order_details())
    }
}

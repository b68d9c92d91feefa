use bazaar_core::AppError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::accounts::{
    AddressRepository, ReviewRepository, RoleRepository, UserActionRepository, UserRepository,
    UserRoleRepository, WishlistRepository,
};
use crate::carts::{CartItemRepository, CartRepository};
use crate::catalog::{
    CategoryRepository, InventoryRepository, LabelRepository, ProductImageRepository,
    ProductRepository, ProductUnitRepository, UnitRepository,
};
use crate::config::DatabaseConfig;
use crate::content::{ArticleRepository, ArticleTagRepository, TagRepository};
use crate::sales::{CouponRepository, OrderDetailRepository, OrderRepository, PaymentRepository};

/// Central database facade. Owns the connection pool, runs migrations,
/// and vends repository instances.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

macro_rules! accessors {
    ($($method:ident => $repo:ident),+ $(,)?) => {
        $(
            pub fn $method(&self) -> $repo {
                $repo::new(self.pool.clone())
            }
        )+
    };
}

impl Database {
    /// Connect to PostgreSQL with the given configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {e}")))?;

        tracing::info!(max_connections = config.max_connections, "database pool ready");
        Ok(Self { pool })
    }

    /// Create a `Database` from an existing pool (useful for testing).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run all pending migrations.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Round-trip a trivial query.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Health check failed: {e}")))?;
        Ok(())
    }

    accessors! {
        categories => CategoryRepository,
        labels => LabelRepository,
        units => UnitRepository,
        products => ProductRepository,
        product_images => ProductImageRepository,
        product_units => ProductUnitRepository,
        inventories => InventoryRepository,
        users => UserRepository,
        roles => RoleRepository,
        user_roles => UserRoleRepository,
        addresses => AddressRepository,
        wishlists => WishlistRepository,
        reviews => ReviewRepository,
        user_actions => UserActionRepository,
        articles => ArticleRepository,
        tags => TagRepository,
        article_tags => ArticleTagRepository,
        coupons => CouponRepository,
        payments => PaymentRepository,
        carts => CartRepository,
        cart_items => CartItemRepository,
        orders => OrderRepository,
        order_details => OrderDetailRepository,
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub mod accounts;
pub mod carts;
pub mod catalog;
pub mod config;
pub mod content;
pub mod database;
pub mod sales;
mod support;

pub use accounts::{
    AddressRepository, ReviewRepository, RoleRepository, UserActionRepository, UserRepository,
    UserRoleRepository, WishlistRepository,
};
pub use carts::{CartItemRepository, CartRepository};
pub use catalog::{
    CategoryRepository, InventoryRepository, LabelRepository, ProductImageRepository,
    ProductRepository, ProductUnitRepository, UnitRepository,
};
pub use config::DatabaseConfig;
pub use content::{ArticleRepository, ArticleTagRepository, TagRepository};
pub use database::Database;
pub use sales::{CouponRepository, OrderDetailRepository, OrderRepository, PaymentRepository};

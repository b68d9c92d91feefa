//! Persisted entities and their input DTOs.
//!
//! Each entity `X` comes with a `NewX` create payload and an `XPatch`
//! partial update payload whose `None` fields are left untouched.

mod accounts;
mod catalog;
mod content;
mod sales;

pub use accounts::{
    Address, AddressPatch, NewAddress, NewReview, NewRole, NewUser, NewUserAction,
    NewUserRecord, NewUserRole, NewUserWishlist, Review, ReviewPatch, Role, RolePatch, User,
    UserAction, UserActionPatch, UserPatch, UserRecordPatch, UserRole, UserRolePatch,
    UserWishlist, UserWishlistPatch,
};
pub use catalog::{
    Category, CategoryNode, CategoryPatch, Inventory, InventoryPatch, Label, LabelPatch,
    NewCategory, NewInventory, NewLabel, NewProduct, NewProductImage, NewProductUnit, NewUnit,
    Product, ProductImage, ProductImagePatch, ProductPatch, ProductUnit, ProductUnitPatch, Unit,
    UnitPatch, build_category_tree,
};
pub use content::{
    Article, ArticlePatch, ArticleTag, ArticleTagPatch, NewArticle, NewArticleTag, NewTag, Tag,
    TagPatch,
};
pub use sales::{
    Cart, CartItem, CartItemPatch, CartPatch, CartStatus, Coupon, CouponPatch, DiscountType,
    NewCart, NewCartItem, NewCoupon, NewOrder, NewOrderDetail, NewPayment, Order, OrderDetail,
    OrderDetailPatch, OrderPatch, OrderStatus, Payment, PaymentPatch, PaymentStatus,
};

/// Name of the role granted to self-registered accounts.
pub const ROLE_USER: &str = "USER";
/// Name of the role allowed to use the administrative CRUD routes.
pub const ROLE_ADMIN: &str = "ADMIN";

macro_rules! impl_has_id {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl crate::traits::HasId for $ty {
                fn id(&self) -> i64 {
                    self.id
                }
            }
        )+
    };
}

impl_has_id!(
    Category,
    Label,
    Unit,
    Product,
    ProductImage,
    ProductUnit,
    Inventory,
    User,
    Role,
    UserRole,
    Address,
    UserWishlist,
    Review,
    UserAction,
    Article,
    Tag,
    ArticleTag,
    Coupon,
    Payment,
    Cart,
    CartItem,
    Order,
    OrderDetail,
);

fn default_true() -> bool {
    true
}

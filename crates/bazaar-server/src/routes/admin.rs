//! Administrative CRUD for every resource, restricted to the `ADMIN` role.

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::post;
use tower_http::limit::RequestBodyLimitLayer;

use bazaar_core::services::UserAccounts;
use bazaar_db::Database;

use super::crud::crud_routes;
use super::uploads::{self, MAX_UPLOAD_BYTES};
use crate::auth::require_admin;
use crate::state::AppState;

pub fn routes(db: &Database) -> Router<Arc<AppState>> {
    let uploads = Router::new()
        .route("/products/{id}/images", post(uploads::upload_product_images))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES));

    Router::new()
        .nest("/categories", crud_routes(db.categories()))
        .nest("/labels", crud_routes(db.labels()))
        .nest("/units", crud_routes(db.units()))
        .nest("/products", crud_routes(db.products()))
        .nest("/product-images", crud_routes(db.product_images()))
        .nest("/product-units", crud_routes(db.product_units()))
        .nest("/inventories", crud_routes(db.inventories()))
        .nest("/users", crud_routes(UserAccounts::new(db.users())))
        .nest("/roles", crud_routes(db.roles()))
        .nest("/user-roles", crud_routes(db.user_roles()))
        .nest("/addresses", crud_routes(db.addresses()))
        .nest("/wishlists", crud_routes(db.wishlists()))
        .nest("/reviews", crud_routes(db.reviews()))
        .nest("/user-actions", crud_routes(db.user_actions()))
        .nest("/articles", crud_routes(db.articles()))
        .nest("/tags", crud_routes(db.tags()))
        .nest("/article-tags", crud_routes(db.article_tags()))
        .nest("/coupons", crud_routes(db.coupons()))
        .nest("/payments", crud_routes(db.payments()))
        .nest("/carts", crud_routes(db.carts()))
        .nest("/cart-items", crud_routes(db.cart_items()))
        .nest("/orders", crud_routes(db.orders()))
        .nest("/order-details", crud_routes(db.order_details()))
        .merge(uploads)
        .route_layer(middleware::from_fn(require_admin))
}

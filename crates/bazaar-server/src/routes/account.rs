//! Routes acting on the authenticated user's own data.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::Router;
use axum::routing::{delete, get, post, put};

use bazaar_core::cart::{CartView, CheckoutRequest, OrderView};
use bazaar_core::models::{
    Address, NewAddress, NewReview, NewUserWishlist, Order, Review, UserWishlist,
};
use bazaar_core::{
    AppError, CrudService, CrudStore, CurrentUser, Page, PageRequest, UserDirectory, UserScoped,
};

use crate::dto::{
    AddItemRequest, ApiResponse, ApplyCouponRequest, SetQuantityRequest, UserModel,
    WishlistRequest,
};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

type Reply<T> = Result<axum::Json<ApiResponse<T>>, ApiError>;
type Created<T> = Result<(StatusCode, axum::Json<ApiResponse<T>>), ApiError>;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me", get(me))
        .route("/cart", get(view_cart))
        .route("/cart/items", post(add_item))
        .route(
            "/cart/items/{product_id}",
            put(set_quantity).delete(remove_item),
        )
        .route("/cart/coupon", post(apply_coupon).delete(clear_coupon))
        .route("/cart/checkout", post(checkout))
        .route("/me/orders", get(list_orders))
        .route("/me/orders/{id}", get(get_order))
        .route("/me/orders/{id}/cancel", post(cancel_order))
        .route("/me/addresses", get(list_addresses).post(add_address))
        .route("/me/addresses/{id}", delete(delete_address))
        .route("/me/wishlist", get(list_wishlist).post(add_to_wishlist))
        .route("/me/wishlist/{product_id}", delete(remove_from_wishlist))
        .route("/me/reviews", post(add_review))
}

#[utoipa::path(
    get,
    path = "/api/v1/private/me",
    responses(
        (status = 200, description = "The authenticated user", body = UserModel),
        (status = 401, description = "Unauthorized", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "account"
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Reply<UserModel> {
    let user = state
        .db
        .users()
        .find_user(current.id)
        .await?
        .ok_or_else(|| AppError::not_found("user", current.id))?;
    Ok(ApiResponse::ok(UserModel::new(user, current.roles)))
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/private/cart",
    responses((status = 200, description = "Current cart with totals", body = CartView)),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn view_cart(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Reply<CartView> {
    Ok(ApiResponse::ok(state.carts().view(current.id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/private/cart/items",
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Item merged into the cart", body = CartView),
        (status = 400, description = "Invalid quantity or unavailable product", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(body): ApiJson<AddItemRequest>,
) -> Reply<CartView> {
    let view = state
        .carts()
        .add_item(current.id, body.product_id, body.quantity)
        .await?;
    Ok(ApiResponse::with_message("item added", view))
}

#[utoipa::path(
    put,
    path = "/api/v1/private/cart/items/{product_id}",
    params(("product_id" = i64, Path, description = "Product ID")),
    request_body = SetQuantityRequest,
    responses(
        (status = 200, description = "Quantity set; zero removes the line", body = CartView),
        (status = 404, description = "No such line", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn set_quantity(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    ApiPath(product_id): ApiPath<i64>,
    ApiJson(body): ApiJson<SetQuantityRequest>,
) -> Reply<CartView> {
    let view = state
        .carts()
        .set_quantity(current.id, product_id, body.quantity)
        .await?;
    Ok(ApiResponse::ok(view))
}

#[utoipa::path(
    delete,
    path = "/api/v1/private/cart/items/{product_id}",
    params(("product_id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Line removed", body = CartView),
        (status = 404, description = "No such line", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    ApiPath(product_id): ApiPath<i64>,
) -> Reply<CartView> {
    let view = state.carts().remove_item(current.id, product_id).await?;
    Ok(ApiResponse::with_message("item removed", view))
}

#[utoipa::path(
    post,
    path = "/api/v1/private/cart/coupon",
    request_body = ApplyCouponRequest,
    responses(
        (status = 200, description = "Coupon applied", body = CartView),
        (status = 400, description = "Coupon not applicable", body = crate::dto::ErrorResponse),
        (status = 404, description = "Unknown code", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn apply_coupon(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(body): ApiJson<ApplyCouponRequest>,
) -> Reply<CartView> {
    let view = state.carts().apply_coupon(current.id, &body.code).await?;
    Ok(ApiResponse::with_message("coupon applied", view))
}

#[utoipa::path(
    delete,
    path = "/api/v1/private/cart/coupon",
    responses((status = 200, description = "Coupon removed", body = CartView)),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn clear_coupon(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Reply<CartView> {
    Ok(ApiResponse::ok(state.carts().clear_coupon(current.id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/private/cart/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order placed", body = OrderView),
        (status = 400, description = "Empty cart, unavailable product or invalid coupon", body = crate::dto::ErrorResponse),
        (status = 409, description = "Cart was checked out concurrently", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    body: Bytes,
) -> Created<OrderView> {
    // An empty body means "all defaults".
    let request = if body.is_empty() {
        CheckoutRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(AppError::from)?
    };
    let order = state.carts().checkout(current.id, request).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("order placed", order),
    ))
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/private/me/orders",
    params(PageRequest),
    responses((status = 200, description = "Page of the user's orders")),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> Reply<Page<Order>> {
    Ok(ApiResponse::ok(state.orders().list_own(current.id, page).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/private/me/orders/{id}",
    params(("id" = i64, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with its lines", body = OrderView),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i64>,
) -> Reply<OrderView> {
    Ok(ApiResponse::ok(state.orders().get_own(current.id, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/private/me/orders/{id}/cancel",
    params(("id" = i64, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order cancelled", body = OrderView),
        (status = 400, description = "Order is past pending", body = crate::dto::ErrorResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i64>,
) -> Reply<OrderView> {
    let order = state.orders().cancel_own(current.id, id).await?;
    Ok(ApiResponse::with_message("order cancelled", order))
}

// ---------------------------------------------------------------------------
// Addresses, wishlist, reviews
// ---------------------------------------------------------------------------

async fn list_addresses(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> Reply<Page<Address>> {
    let addresses = state.db.addresses().list_for_user(current.id, page).await?;
    Ok(ApiResponse::ok(addresses))
}

async fn add_address(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(mut body): ApiJson<NewAddress>,
) -> Created<Address> {
    body.user_id = current.id;
    let address = CrudService::new(state.db.addresses()).create(body).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("address created", address),
    ))
}

/// Someone else's address is reported as missing.
async fn delete_address(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i64>,
) -> Reply<bool> {
    let addresses = state.db.addresses();
    let owned = addresses
        .get(id)
        .await?
        .is_some_and(|a| a.user_id == current.id);
    if !owned {
        return Err(AppError::not_found("address", id).into());
    }
    let deleted = CrudService::new(addresses).delete(id).await?;
    Ok(ApiResponse::with_message("address deleted", deleted))
}

async fn list_wishlist(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> Reply<Page<UserWishlist>> {
    let entries = state.db.wishlists().list_for_user(current.id, page).await?;
    Ok(ApiResponse::ok(entries))
}

async fn add_to_wishlist(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(body): ApiJson<WishlistRequest>,
) -> Created<UserWishlist> {
    let entry = CrudService::new(state.db.wishlists())
        .create(NewUserWishlist {
            user_id: current.id,
            product_id: body.product_id,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("added to wishlist", entry),
    ))
}

async fn remove_from_wishlist(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    ApiPath(product_id): ApiPath<i64>,
) -> Reply<bool> {
    if !state.db.wishlists().remove(current.id, product_id).await? {
        return Err(AppError::NotFound(format!(
            "product {product_id} is not on the wishlist"
        ))
        .into());
    }
    Ok(ApiResponse::with_message("removed from wishlist", true))
}

async fn add_review(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(mut body): ApiJson<NewReview>,
) -> Created<Review> {
    body.user_id = current.id;
    let review = CrudService::new(state.db.reviews()).create(body).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("review created", review),
    ))
}

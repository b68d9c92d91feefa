use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};

use bazaar_core::models::{
    Article, Category, CategoryNode, Label, NewUser, Product, Review, Tag, Unit, ROLE_USER,
    build_category_tree,
};
use bazaar_core::{AppError, CrudService, CrudStore, Page, PageRequest};

use crate::dto::{ApiResponse, LoginRequest, LoginResponse, SearchQuery, UserModel};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

type Reply<T> = Result<axum::Json<ApiResponse<T>>, ApiError>;

/// Routes reachable without a token.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/products", get(list_products))
        .route("/products/search", get(search_products))
        .route("/products/{id}", get(get_product))
        .route("/products/{id}/reviews", get(product_reviews))
        .route("/categories", get(list_categories))
        .route("/categories/tree", get(category_tree))
        .route("/categories/{id}", get(get_category))
        .route("/labels", get(list_labels))
        .route("/units", get(list_units))
        .route("/tags", get(list_tags))
        .route("/articles", get(list_articles))
        .route("/articles/{id}", get(get_article))
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/public/auth/register",
    request_body = NewUser,
    responses(
        (status = 201, description = "Account created", body = UserModel),
        (status = 400, description = "Invalid input", body = crate::dto::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::dto::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewUser>,
) -> Result<(StatusCode, axum::Json<ApiResponse<UserModel>>), ApiError> {
    let user = state.auth.register(body).await?;
    let model = UserModel::new(user, vec![ROLE_USER.to_string()]);
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("user registered", model),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/public/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::dto::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Reply<LoginResponse> {
    let session = state.auth.login(&body.email, &body.password).await?;
    Ok(ApiResponse::with_message(
        "login successful",
        LoginResponse::from(session),
    ))
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

async fn list_products(
    State(state): State<Arc<AppState>>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> Reply<Page<Product>> {
    let products = CrudService::new(state.db.products()).list(page).await?;
    Ok(ApiResponse::ok(products))
}

async fn search_products(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Reply<Page<Product>> {
    let products = CrudService::new(state.db.products())
        .search(&query.q, query.page_request())
        .await?;
    Ok(ApiResponse::ok(products))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Reply<Product> {
    Ok(ApiResponse::ok(CrudService::new(state.db.products()).get(id).await?))
}

async fn product_reviews(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> Reply<Page<Review>> {
    if state.db.products().get(id).await?.is_none() {
        return Err(AppError::not_found("product", id).into());
    }
    let reviews = state.db.reviews().list_for_product(id, page).await?;
    Ok(ApiResponse::ok(reviews))
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> Reply<Page<Category>> {
    let categories = CrudService::new(state.db.categories()).list(page).await?;
    Ok(ApiResponse::ok(categories))
}

async fn category_tree(State(state): State<Arc<AppState>>) -> Reply<Vec<CategoryNode>> {
    let categories = state.db.categories().all().await?;
    Ok(ApiResponse::ok(build_category_tree(categories)))
}

async fn get_category(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Reply<Category> {
    Ok(ApiResponse::ok(CrudService::new(state.db.categories()).get(id).await?))
}

async fn list_labels(
    State(state): State<Arc<AppState>>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> Reply<Page<Label>> {
    Ok(ApiResponse::ok(CrudService::new(state.db.labels()).list(page).await?))
}

async fn list_units(
    State(state): State<Arc<AppState>>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> Reply<Page<Unit>> {
    Ok(ApiResponse::ok(CrudService::new(state.db.units()).list(page).await?))
}

async fn list_tags(
    State(state): State<Arc<AppState>>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> Reply<Page<Tag>> {
    Ok(ApiResponse::ok(CrudService::new(state.db.tags()).list(page).await?))
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

async fn list_articles(
    State(state): State<Arc<AppState>>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> Reply<Page<Article>> {
    Ok(ApiResponse::ok(state.db.articles().published(page).await?))
}

/// Drafts are reported as missing.
async fn get_article(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Reply<Article> {
    let article = state
        .db
        .articles()
        .get(id)
        .await?
        .filter(|a| a.published)
        .ok_or_else(|| AppError::not_found("article", id))?;
    Ok(ApiResponse::ok(article))
}

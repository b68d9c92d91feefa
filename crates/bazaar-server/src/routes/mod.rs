//! HTTP routing: public catalog and auth, authenticated account routes, and
//! the admin CRUD surface.

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::require_auth;
use crate::openapi::ApiDoc;
use crate::state::AppState;

pub mod account;
pub mod admin;
pub mod crud;
pub mod public;
pub mod system;
pub mod uploads;

pub fn router(state: Arc<AppState>) -> Router {
    let private = account::routes()
        .merge(admin::routes(&state.db))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(system::health))
        .nest("/api/v1/public", public::routes())
        .nest("/api/v1/private", private)
        .nest_service("/uploads", ServeDir::new(&state.upload_dir))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use bazaar_core::models::ROLE_ADMIN;
use bazaar_core::{AppError, CurrentUser};

use crate::error::ApiError;
use crate::state::AppState;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Middleware that resolves `Authorization: Bearer <jwt>` to a
/// [`CurrentUser`] and stores it in the request extensions.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .map(str::to_owned)
        .ok_or_else(|| {
            AppError::Unauthorized("Missing Authorization header. Expected: Bearer <token>".into())
        })?;

    let user = state.auth.authenticate(&token).await.inspect_err(|e| {
        if matches!(e, AppError::Unauthorized(_)) {
            tracing::warn!(error = %e, "bearer token rejected");
        }
    })?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Middleware that only lets administrators through. Must run after
/// [`require_auth`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    check_role(request.extensions().get::<CurrentUser>(), ROLE_ADMIN)?;
    Ok(next.run(request).await)
}

fn check_role(user: Option<&CurrentUser>, role: &str) -> Result<(), AppError> {
    let user = user.ok_or_else(|| AppError::Unauthorized("authentication required".into()))?;
    if !user.has_role(role) {
        tracing::warn!(user_id = user.id, role, "role check failed");
        return Err(AppError::Forbidden(format!("{role} role required")));
    }
    Ok(())
}

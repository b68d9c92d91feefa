use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use uuid::Uuid;

use bazaar_core::models::{NewProductImage, ProductImage};
use bazaar_core::{AppError, CrudStore, Validate};

use crate::dto::ApiResponse;
use crate::error::ApiError;
use crate::extract::ApiPath;
use crate::state::AppState;

/// Largest accepted multipart body.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Sub-directory of the upload root holding product images.
const PRODUCT_IMAGE_DIR: &str = "products";

/// File extension for an accepted image content type.
fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/private/products/{id}/images",
    params(("id" = i64, Path, description = "Product ID")),
    request_body(content = crate::dto::ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Images stored", body = [ProductImage]),
        (status = 400, description = "Missing or non-image file", body = crate::dto::ErrorResponse),
        (status = 404, description = "Unknown product", body = crate::dto::ErrorResponse),
        (status = 413, description = "Body exceeds 5 MiB"),
    ),
    security(("bearer" = [])),
    tag = "catalog"
)]
pub async fn upload_product_images(
    State(state): State<Arc<AppState>>,
    ApiPath(product_id): ApiPath<i64>,
    mut multipart: Multipart,
) -> Result<(StatusCode, axum::Json<ApiResponse<Vec<ProductImage>>>), ApiError> {
    if state.db.products().get(product_id).await?.is_none() {
        return Err(AppError::not_found("product", product_id).into());
    }

    // Every part is read and checked before anything touches disk or the database.
    let mut pending = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let extension = field
            .content_type()
            .and_then(image_extension)
            .ok_or_else(|| AppError::invalid("file", "must be a png, jpeg, gif or webp image"))?;
        let alt_text = field.file_name().map(str::to_owned);

        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Err(AppError::invalid("file", "is empty").into());
        }
        pending.push((format!("{}.{extension}", Uuid::new_v4()), alt_text, bytes));
    }

    if pending.is_empty() {
        return Err(AppError::invalid("file", "at least one file part is required").into());
    }

    let first = state.db.product_images().next_position(product_id).await?;
    let rows: Vec<NewProductImage> = pending
        .iter()
        .zip(first..)
        .map(|((file_name, alt_text, _), position)| NewProductImage {
            product_id,
            url: format!("/uploads/{PRODUCT_IMAGE_DIR}/{file_name}"),
            alt_text: alt_text.clone(),
            position,
        })
        .collect();
    rows.validate()?;

    let dir = state.upload_dir.join(PRODUCT_IMAGE_DIR);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::Generic(format!("cannot create {}: {e}", dir.display())))?;

    let mut written = Vec::with_capacity(pending.len());
    let stored: Result<Vec<ProductImage>, AppError> = async {
        for (file_name, _, bytes) in &pending {
            let path = dir.join(file_name);
            tokio::fs::write(&path, bytes)
                .await
                .map_err(|e| AppError::Generic(format!("cannot store {file_name}: {e}")))?;
            written.push(path);
        }
        state.db.product_images().insert_all(&rows).await
    }
    .await;

    let saved = match stored {
        Ok(saved) => saved,
        Err(e) => {
            remove_files(&written).await;
            return Err(e.into());
        }
    };

    for (image, (_, _, bytes)) in saved.iter().zip(&pending) {
        tracing::info!(product_id, image_id = image.id, size = bytes.len(), "product image stored");
    }

    let message = format!("{} image(s) uploaded", saved.len());
    Ok((StatusCode::CREATED, ApiResponse::with_message(message, saved)))
}

/// Best-effort removal of files stored by a failed upload.
async fn remove_files(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove orphaned upload");
        }
    }
}

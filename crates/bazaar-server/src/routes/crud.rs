//! The generic administrative CRUD routes, mounted once per resource.

use std::collections::BTreeMap;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use serde::Serialize;
use serde::de::DeserializeOwned;

use bazaar_core::{CrudService, CrudStore, Page, PageRequest};

use crate::dto::{ApiResponse, BatchDeleteRequest, BatchDeleteResponse, SearchQuery};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};

/// A store whose entities and payloads can cross the HTTP boundary.
pub trait Resource:
    CrudStore<Entity: Serialize, Create: DeserializeOwned, Update: DeserializeOwned>
{
}

impl<S> Resource for S where
    S: CrudStore<Entity: Serialize, Create: DeserializeOwned, Update: DeserializeOwned>
{
}

type Reply<T> = Result<axum::Json<ApiResponse<T>>, ApiError>;

/// List, search, get, create, update and delete (single and batch) for one
/// resource.
pub fn crud_routes<S, T>(store: S) -> Router<T>
where
    S: Resource,
    T: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(list::<S>).post(create::<S>))
        .route("/search", get(search::<S>))
        .route("/batch", post(create_batch::<S>).put(update_batch::<S>))
        .route("/batch-delete", post(delete_batch::<S>))
        .route(
            "/{id}",
            get(get_one::<S>).put(update::<S>).delete(delete_one::<S>),
        )
        .with_state(CrudService::new(store))
}

async fn list<S: Resource>(
    State(service): State<CrudService<S>>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> Reply<Page<S::Entity>> {
    Ok(ApiResponse::ok(service.list(page).await?))
}

async fn search<S: Resource>(
    State(service): State<CrudService<S>>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Reply<Page<S::Entity>> {
    let page = query.page_request();
    Ok(ApiResponse::ok(service.search(&query.q, page).await?))
}

async fn get_one<S: Resource>(
    State(service): State<CrudService<S>>,
    ApiPath(id): ApiPath<i64>,
) -> Reply<S::Entity> {
    Ok(ApiResponse::ok(service.get(id).await?))
}

async fn create<S: Resource>(
    State(service): State<CrudService<S>>,
    ApiJson(input): ApiJson<S::Create>,
) -> Result<(StatusCode, axum::Json<ApiResponse<S::Entity>>), ApiError> {
    let created = service.create(input).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(format!("{} created", S::RESOURCE), created),
    ))
}

async fn create_batch<S: Resource>(
    State(service): State<CrudService<S>>,
    ApiJson(inputs): ApiJson<Vec<S::Create>>,
) -> Result<(StatusCode, axum::Json<ApiResponse<Vec<S::Entity>>>), ApiError> {
    let created = service.create_batch(inputs).await?;
    let message = format!("{} {} records created", created.len(), S::RESOURCE);
    Ok((StatusCode::CREATED, ApiResponse::with_message(message, created)))
}

async fn update<S: Resource>(
    State(service): State<CrudService<S>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<S::Update>,
) -> Reply<S::Entity> {
    let updated = service.update(id, patch).await?;
    Ok(ApiResponse::with_message(format!("{} updated", S::RESOURCE), updated))
}

async fn update_batch<S: Resource>(
    State(service): State<CrudService<S>>,
    ApiJson(patches): ApiJson<BTreeMap<i64, S::Update>>,
) -> Reply<Vec<S::Entity>> {
    Ok(ApiResponse::ok(service.update_batch(patches).await?))
}

async fn delete_one<S: Resource>(
    State(service): State<CrudService<S>>,
    ApiPath(id): ApiPath<i64>,
) -> Reply<bool> {
    let deleted = service.delete(id).await?;
    Ok(ApiResponse::with_message(format!("{} deleted", S::RESOURCE), deleted))
}

async fn delete_batch<S: Resource>(
    State(service): State<CrudService<S>>,
    ApiJson(request): ApiJson<BatchDeleteRequest>,
) -> Reply<BatchDeleteResponse> {
    let deleted = service.delete_batch(&request.ids).await?;
    Ok(ApiResponse::ok(BatchDeleteResponse { deleted }))
}

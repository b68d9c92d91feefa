//! Query helpers shared by the repositories. Table and column names passed
//! here are always compile-time constants, never user input.

use bazaar_core::{AppError, Page, PageRequest};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};

/// Map a sqlx error to the application error kinds. Unique violations
/// become conflicts, foreign-key and check violations become validation
/// errors.
pub(crate) fn map_db_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        let constraint = db.constraint().unwrap_or("unknown").to_string();
        match db.code().as_deref() {
            Some("23505") => {
                return AppError::Conflict(format!("duplicate value violates {constraint}"));
            }
            Some("23503") => {
                return AppError::ValidationError(format!(
                    "referenced record is missing or still in use ({constraint})"
                ));
            }
            Some("23514") => {
                return AppError::ValidationError(format!("check {constraint} failed"));
            }
            _ => {}
        }
    }
    AppError::DatabaseError(err.to_string())
}

pub(crate) async fn fetch_page<T>(
    pool: &PgPool,
    table: &str,
    page: PageRequest,
) -> Result<Page<T>, AppError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let page = page.normalized();
    let items = sqlx::query_as::<_, T>(&format!(
        "SELECT * FROM {table} ORDER BY id LIMIT $1 OFFSET $2"
    ))
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(map_db_error)?;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .map_err(map_db_error)?;

    Ok(Page::new(items, page, total))
}

/// Page of rows whose `column` equals `value`, e.g. a user's addresses.
pub(crate) async fn fetch_page_by<T>(
    pool: &PgPool,
    table: &str,
    column: &str,
    value: i64,
    page: PageRequest,
) -> Result<Page<T>, AppError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let page = page.normalized();
    let items = sqlx::query_as::<_, T>(&format!(
        "SELECT * FROM {table} WHERE {column} = $1 ORDER BY id LIMIT $2 OFFSET $3"
    ))
    .bind(value)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(map_db_error)?;

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {table} WHERE {column} = $1"
    ))
    .bind(value)
    .fetch_one(pool)
    .await
    .map_err(map_db_error)?;

    Ok(Page::new(items, page, total))
}

/// Case-insensitive substring search over `columns`.
pub(crate) async fn search_page<T>(
    pool: &PgPool,
    table: &str,
    columns: &[&str],
    query: &str,
    page: PageRequest,
) -> Result<Page<T>, AppError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let page = page.normalized();
    let filter = columns
        .iter()
        .map(|c| format!("{c} ILIKE $1"))
        .collect::<Vec<_>>()
        .join(" OR ");
    let pattern = format!("%{}%", escape_like(query));

    let items = sqlx::query_as::<_, T>(&format!(
        "SELECT * FROM {table} WHERE {filter} ORDER BY id LIMIT $2 OFFSET $3"
    ))
    .bind(&pattern)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(map_db_error)?;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE {filter}"))
        .bind(&pattern)
        .fetch_one(pool)
        .await
        .map_err(map_db_error)?;

    Ok(Page::new(items, page, total))
}

pub(crate) async fn fetch_by_id<T>(pool: &PgPool, table: &str, id: i64) -> Result<Option<T>, AppError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    sqlx::query_as::<_, T>(&format!("SELECT * FROM {table} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)
}

pub(crate) async fn delete_by_id(pool: &PgPool, table: &str, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
        .bind(id)
        .execute(pool)
        .await
        .map_err(map_db_error)?;
    Ok(result.rows_affected() > 0)
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Declares a pool-backed repository for one table.
macro_rules! repository {
    ($(#[$meta:meta])* $name:ident => $table:literal) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name {
            pool: sqlx::PgPool,
        }

        impl $name {
            #[allow(dead_code)]
            const TABLE: &'static str = $table;

            pub fn new(pool: sqlx::PgPool) -> Self {
                Self { pool }
            }
        }
    };
}

pub(crate) use repository;

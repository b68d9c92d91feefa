use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::validation::{self, Validate};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered account. The password hash never leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account creation payload, carrying the plain-text password.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct UserPatch {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub active: Option<bool>,
}

/// What is actually stored: the password already hashed.
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UserRecordPatch {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub active: Option<bool>,
}

pub const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

fn password(value: &str) -> Result<(), AppError> {
    let len = value.chars().count();
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&len) {
        return Err(AppError::invalid(
            "password",
            &format!("must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH} characters"),
        ));
    }
    Ok(())
}

impl Validate for NewUser {
    fn validate(&self) -> Result<(), AppError> {
        validation::email("email", &self.email)?;
        password(&self.password)?;
        validation::text("full_name", &self.full_name, 200)?;
        validation::opt_text("phone", self.phone.as_deref(), 32)
    }
}

impl Validate for UserPatch {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(email) = &self.email {
            validation::email("email", email)?;
        }
        if let Some(pw) = &self.password {
            password(pw)?;
        }
        validation::opt_text("full_name", self.full_name.as_deref(), 200)?;
        validation::opt_text("phone", self.phone.as_deref(), 32)
    }
}

impl Validate for NewUserRecord {
    fn validate(&self) -> Result<(), AppError> {
        validation::email("email", &self.email)?;
        validation::text("password_hash", &self.password_hash, 512)?;
        validation::text("full_name", &self.full_name, 200)
    }
}

impl Validate for UserRecordPatch {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(email) = &self.email {
            validation::email("email", email)?;
        }
        validation::opt_text("full_name", self.full_name.as_deref(), 200)
    }
}

// ---------------------------------------------------------------------------
// Role / UserRole
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewRole {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct RolePatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

fn role_name(value: &str) -> Result<(), AppError> {
    validation::text("name", value, 50)?;
    if !value
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(AppError::invalid(
            "name",
            "must use upper-case letters, digits and underscores",
        ));
    }
    Ok(())
}

impl Validate for NewRole {
    fn validate(&self) -> Result<(), AppError> {
        role_name(&self.name)?;
        validation::opt_text("description", self.description.as_deref(), 200)
    }
}

impl Validate for RolePatch {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            role_name(name)?;
        }
        validation::opt_text("description", self.description.as_deref(), 200)
    }
}

/// Join record granting a role to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UserRole {
    pub id: i64,
    pub user_id: i64,
    pub role_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewUserRole {
    pub user_id: i64,
    pub role_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct UserRolePatch {
    pub role_id: Option<i64>,
}

impl Validate for NewUserRole {
    fn validate(&self) -> Result<(), AppError> {
        validation::positive("user_id", self.user_id)?;
        validation::positive("role_id", self.role_id)
    }
}

impl Validate for UserRolePatch {
    fn validate(&self) -> Result<(), AppError> {
        match self.role_id {
            Some(id) => validation::positive("role_id", id),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Address {
    pub id: i64,
    pub user_id: i64,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 code.
    pub country: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `user_id` may be omitted on the self-service routes, which fill it in
/// from the bearer token.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewAddress {
    #[serde(default)]
    pub user_id: i64,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct AddressPatch {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub is_default: Option<bool>,
}

fn country(value: &str) -> Result<(), AppError> {
    if value.len() != 2 || !value.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(AppError::invalid("country", "must be a two-letter code"));
    }
    Ok(())
}

impl Validate for NewAddress {
    fn validate(&self) -> Result<(), AppError> {
        validation::positive("user_id", self.user_id)?;
        validation::text("line1", &self.line1, 200)?;
        validation::opt_text("line2", self.line2.as_deref(), 200)?;
        validation::text("city", &self.city, 100)?;
        validation::opt_text("region", self.region.as_deref(), 100)?;
        validation::text("postal_code", &self.postal_code, 20)?;
        country(&self.country)
    }
}

impl Validate for AddressPatch {
    fn validate(&self) -> Result<(), AppError> {
        validation::opt_text("line1", self.line1.as_deref(), 200)?;
        validation::opt_text("line2", self.line2.as_deref(), 200)?;
        validation::opt_text("city", self.city.as_deref(), 100)?;
        validation::opt_text("region", self.region.as_deref(), 100)?;
        validation::opt_text("postal_code", self.postal_code.as_deref(), 20)?;
        match &self.country {
            Some(c) => country(c),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// UserWishlist
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UserWishlist {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewUserWishlist {
    #[serde(default)]
    pub user_id: i64,
    pub product_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct UserWishlistPatch {
    pub product_id: Option<i64>,
}

impl Validate for NewUserWishlist {
    fn validate(&self) -> Result<(), AppError> {
        validation::positive("user_id", self.user_id)?;
        validation::positive("product_id", self.product_id)
    }
}

impl Validate for UserWishlistPatch {
    fn validate(&self) -> Result<(), AppError> {
        match self.product_id {
            Some(id) => validation::positive("product_id", id),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    /// 1 to 5 stars.
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewReview {
    #[serde(default)]
    pub user_id: i64,
    pub product_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct ReviewPatch {
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

impl Validate for NewReview {
    fn validate(&self) -> Result<(), AppError> {
        validation::positive("user_id", self.user_id)?;
        validation::positive("product_id", self.product_id)?;
        validation::in_range("rating", i64::from(self.rating), 1, 5)?;
        validation::opt_text("comment", self.comment.as_deref(), 5000)
    }
}

impl Validate for ReviewPatch {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(rating) = self.rating {
            validation::in_range("rating", i64::from(rating), 1, 5)?;
        }
        validation::opt_text("comment", self.comment.as_deref(), 5000)
    }
}

// ---------------------------------------------------------------------------
// UserAction
// ---------------------------------------------------------------------------

/// A named action recorded against a user (e.g. "accepted_terms").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UserAction {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewUserAction {
    pub user_id: i64,
    pub name: String,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct UserActionPatch {
    pub name: Option<String>,
    pub detail: Option<String>,
}

impl Validate for NewUserAction {
    fn validate(&self) -> Result<(), AppError> {
        validation::positive("user_id", self.user_id)?;
        validation::text("name", &self.name, 100)?;
        validation::opt_text("detail", self.detail.as_deref(), 2000)
    }
}

impl Validate for UserActionPatch {
    fn validate(&self) -> Result<(), AppError> {
        validation::opt_text("name", self.name.as_deref(), 100)?;
        validation::opt_text("detail", self.detail.as_deref(), 2000)
    }
}

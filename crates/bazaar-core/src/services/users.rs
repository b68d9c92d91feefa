use crate::auth::hash_password;
use crate::error::AppError;
use crate::models::{NewUser, NewUserRecord, ROLE_USER, User, UserPatch, UserRecordPatch};
use crate::page::{Page, PageRequest};
use crate::traits::{CrudStore, UserDirectory};

/// Account store that takes plain-text passwords and persists only their
/// Argon2 hashes. Wraps the raw user repository so the generic CRUD routes
/// can manage users like any other resource.
#[derive(Clone)]
pub struct UserAccounts<S> {
    inner: S,
}

impl<S> UserAccounts<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S> CrudStore for UserAccounts<S>
where
    S: CrudStore<Entity = User, Create = NewUserRecord, Update = UserRecordPatch> + UserDirectory,
{
    type Entity = User;
    type Create = NewUser;
    type Update = UserPatch;

    const RESOURCE: &'static str = "user";

    async fn list(&self, page: PageRequest) -> Result<Page<User>, AppError> {
        self.inner.list(page).await
    }

    async fn get(&self, id: i64) -> Result<Option<User>, AppError> {
        self.inner.get(id).await
    }

    /// New accounts always hold the `USER` role.
    async fn insert(&self, input: &NewUser) -> Result<User, AppError> {
        let record = NewUserRecord {
            email: input.email.clone(),
            password_hash: hash_password(&input.password)?,
            full_name: input.full_name.clone(),
            phone: input.phone.clone(),
            active: true,
        };
        self.inner.create_with_role(&record, ROLE_USER).await
    }

    async fn update(&self, id: i64, patch: &UserPatch) -> Result<Option<User>, AppError> {
        let password_hash = patch.password.as_deref().map(hash_password).transpose()?;
        let record = UserRecordPatch {
            email: patch.email.clone(),
            password_hash,
            full_name: patch.full_name.clone(),
            phone: patch.phone.clone(),
            active: patch.active,
        };
        self.inner.update(id, &record).await
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        self.inner.delete(id).await
    }

    async fn search(&self, query: &str, page: PageRequest) -> Result<Page<User>, AppError> {
        self.inner.search(query, page).await
    }

    async fn find_conflict(&self, input: &NewUser) -> Result<Option<String>, AppError> {
        Ok(self
            .inner
            .find_by_email(&input.email)
            .await?
            .map(|_| format!("email {} is already registered", input.email)))
    }
}

use std::collections::BTreeMap;

use crate::error::AppError;
use crate::page::{Page, PageRequest};
use crate::traits::{CrudStore, HasId};
use crate::validation::Validate;

/// The uniform service every entity goes through: list, get, create,
/// update, delete (single and batch) and search.
#[derive(Clone)]
pub struct CrudService<S: CrudStore> {
    store: S,
}

impl<S: CrudStore> CrudService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn list(&self, page: PageRequest) -> Result<Page<S::Entity>, AppError> {
        self.store.list(page.normalized()).await
    }

    /// Search by free text. A blank query lists everything.
    pub async fn search(&self, query: &str, page: PageRequest) -> Result<Page<S::Entity>, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return self.list(page).await;
        }
        self.store.search(query, page.normalized()).await
    }

    pub async fn get(&self, id: i64) -> Result<S::Entity, AppError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found(S::RESOURCE, id))
    }

    pub async fn create(&self, input: S::Create) -> Result<S::Entity, AppError> {
        input.validate()?;
        self.insert_unique(&input).await
    }

    /// Validates the whole batch up front, then inserts in order. The first
    /// conflict aborts the remainder.
    pub async fn create_batch(&self, inputs: Vec<S::Create>) -> Result<Vec<S::Entity>, AppError> {
        inputs.validate()?;

        let mut created = Vec::with_capacity(inputs.len());
        for input in &inputs {
            created.push(self.insert_unique(input).await?);
        }
        Ok(created)
    }

    pub async fn update(&self, id: i64, patch: S::Update) -> Result<S::Entity, AppError> {
        patch.validate()?;
        S::validate_update(id, &patch)?;

        let current = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found(S::RESOURCE, id))?;
        self.store.validate_merged(&current, &patch)?;

        let updated = self
            .store
            .update(id, &patch)
            .await?
            .ok_or_else(|| AppError::not_found(S::RESOURCE, id))?;

        tracing::info!(resource = S::RESOURCE, id, "updated");
        Ok(updated)
    }

    /// Apply each patch to its id. Ids that do not exist are skipped.
    pub async fn update_batch(
        &self,
        patches: BTreeMap<i64, S::Update>,
    ) -> Result<Vec<S::Entity>, AppError> {
        for (id, patch) in &patches {
            patch.validate()?;
            S::validate_update(*id, patch)?;
            if let Some(current) = self.store.get(*id).await? {
                self.store.validate_merged(&current, patch)?;
            }
        }

        let mut updated = Vec::with_capacity(patches.len());
        for (id, patch) in &patches {
            match self.store.update(*id, patch).await? {
                Some(entity) => updated.push(entity),
                None => tracing::debug!(resource = S::RESOURCE, id, "batch update skipped missing id"),
            }
        }

        tracing::info!(
            resource = S::RESOURCE,
            requested = patches.len(),
            updated = updated.len(),
            "batch updated"
        );
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        if !self.store.delete(id).await? {
            return Err(AppError::not_found(S::RESOURCE, id));
        }
        tracing::info!(resource = S::RESOURCE, id, "deleted");
        Ok(true)
    }

    /// Delete every listed id; returns how many rows were removed.
    pub async fn delete_batch(&self, ids: &[i64]) -> Result<u64, AppError> {
        let mut deleted = 0;
        for id in ids {
            if self.store.delete(*id).await? {
                deleted += 1;
            }
        }
        tracing::info!(resource = S::RESOURCE, deleted, "batch deleted");
        Ok(deleted)
    }

    async fn insert_unique(&self, input: &S::Create) -> Result<S::Entity, AppError> {
        if let Some(conflict) = self.store.find_conflict(input).await? {
            return Err(AppError::Conflict(conflict));
        }
        let entity = self.store.insert(input).await?;
        tracing::info!(resource = S::RESOURCE, id = entity.id(), "created");
        Ok(entity)
    }
}

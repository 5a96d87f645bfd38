use sqlx::SqlitePool;

use crate::{db::LocalDb, error::StorageError, repositories::LocalStorageRepository};

pub const TOKEN_KEY: &str = "auth_token";

/// Persists the bearer token between runs.
#[derive(Clone)]
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    pub fn new(db: &LocalDb) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    pub async fn load_token(&self) -> Result<Option<String>, StorageError> {
        Ok(LocalStorageRepository::get(&self.pool, TOKEN_KEY)
            .await?
            .filter(|t| !t.is_empty()))
    }

    pub async fn save_token(&self, token: &str) -> Result<(), StorageError> {
        LocalStorageRepository::put(&self.pool, TOKEN_KEY, token).await?;
        Ok(())
    }

    pub async fn clear_token(&self) -> Result<bool, StorageError> {
        Ok(LocalStorageRepository::remove(&self.pool, TOKEN_KEY).await?)
    }
}

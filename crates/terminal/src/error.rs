use common::models::SettingError;
use gateway::ApiError;
use storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Setting(#[from] SettingError),
}

impl AppError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::Api(ApiError::Unauthorized))
    }

    /// The next periodic refresh may well succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Api(e) if e.is_transient())
    }
}

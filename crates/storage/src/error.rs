use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Local database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Could not serialize record: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Could not prepare database directory: {0}")]
    Io(#[from] std::io::Error),
}

pub mod db;
pub mod error;
pub mod repositories;
pub mod session_store;
pub mod settings_store;

pub use db::LocalDb;
pub use error::StorageError;
pub use session_store::SessionStore;
pub use settings_store::SettingsStore;

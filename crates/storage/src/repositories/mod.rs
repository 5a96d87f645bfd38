pub mod local_storage_repo;

pub use local_storage_repo::LocalStorageRepository;

pub mod sqlite;

use crate::error::StorageError;
use crate::models::{Property, RawPayload};
use async_trait::async_trait;

pub use sqlite::SqliteStore;

/// Persistence for listings and their raw payloads
#[async_trait]
pub trait Storage: Send + Sync {
    /// Whether a listing with this id has been stored before
    async fn exists(&self, id: &str) -> Result<bool, StorageError>;

    /// Load a stored listing, `StorageError::NotFound` if absent
    async fn get(&self, id: &str) -> Result<Property, StorageError>;

    /// Insert or update a listing together with its raw payload.
    ///
    /// Both writes commit together or not at all. Updates never touch
    /// `distance_meters`.
    async fn upsert(&self, property: &Property, raw: &RawPayload) -> Result<(), StorageError>;
}

#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::MatchEntity;
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

pub use memory::MemoryMatchStore;

/// Abstraction over the persistence layer holding active and finished matches.
pub trait MatchStore: Send + Sync {
    /// Insert or replace the snapshot of a match.
    fn save_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// Remove a match, returning whether it existed.
    fn delete_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// List stored matches, optionally only the finished ones.
    fn list_matches(&self, finished_only: bool)
    -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

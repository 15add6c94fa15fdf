use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{match_store::MatchStore, models::MatchEntity, storage::StorageResult};

/// Process-local store, used when no database is configured.
///
/// Always healthy; contents are lost on restart.
#[derive(Clone, Default)]
pub struct MemoryMatchStore {
    matches: Arc<DashMap<Uuid, MatchEntity>>,
}

impl MemoryMatchStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MatchStore for MemoryMatchStore {
    fn save_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .matches
                .entry(entity.id)
                .and_modify(|existing| {
                    if entity.version >= existing.version {
                        *existing = entity.clone();
                    }
                })
                .or_insert_with(|| entity.clone());
            Ok(())
        })
    }

    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.matches.get(&id).map(|entry| entry.value().clone())) })
    }

    fn delete_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.matches.remove(&id).is_some()) })
    }

    fn list_matches(
        &self,
        finished_only: bool,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .matches
                .iter()
                .filter(|entry| !finished_only || entry.is_finished())
                .map(|entry| entry.value().clone())
                .collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::match_record::{
        Rules,
        tests::{at, new_match},
    };

    #[tokio::test]
    async fn stale_versions_do_not_overwrite_newer_snapshots() {
        let store = MemoryMatchStore::new();
        let mut m = new_match(Rules::default());
        let first = MatchEntity::from(&m);
        m.start(at(1_000)).unwrap();
        let second = MatchEntity::from(&m);

        store.save_match(second.clone()).await.unwrap();
        store.save_match(first).await.unwrap();

        let stored = store.find_match(m.id).await.unwrap().unwrap();
        assert_eq!(stored, second);
    }

    #[tokio::test]
    async fn list_can_restrict_to_finished_matches() {
        let store = MemoryMatchStore::new();
        let active = new_match(Rules::default());
        let mut finished = new_match(Rules::default());
        finished.finish(at(500)).unwrap();

        store.save_match(MatchEntity::from(&active)).await.unwrap();
        store.save_match(MatchEntity::from(&finished)).await.unwrap();

        assert_eq!(store.list_matches(false).await.unwrap().len(), 2);
        let only_finished = store.list_matches(true).await.unwrap();
        assert_eq!(only_finished.len(), 1);
        assert_eq!(only_finished[0].id, finished.id);
    }

    #[tokio::test]
    async fn delete_reports_whether_the_match_existed() {
        let store = MemoryMatchStore::new();
        let m = new_match(Rules::default());
        store.save_match(MatchEntity::from(&m)).await.unwrap();

        assert!(store.delete_match(m.id).await.unwrap());
        assert!(!store.delete_match(m.id).await.unwrap());
        assert!(store.find_match(m.id).await.unwrap().is_none());
    }
}

use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Collection, Database, IndexModel, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
    models::{MongoMatchDocument, doc_id},
};
use crate::dao::{match_store::MatchStore, models::MatchEntity, storage::StorageResult};

const MATCH_COLLECTION_NAME: &str = "matches";

/// Match store backed by the `matches` collection.
#[derive(Clone)]
pub struct MongoMatchStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    database: RwLock<Database>,
    config: MongoConfig,
}

impl MongoMatchStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let database = config.open().await?;
        let store = Self {
            inner: Arc::new(MongoInner {
                database: RwLock::new(database),
                config,
            }),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ping(&self) -> MongoResult<()> {
        let database = self.inner.database.read().await.clone();
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    /// Swap in a freshly opened client.
    async fn reconnect(&self) -> MongoResult<()> {
        let database = self.inner.config.open().await?;
        *self.inner.database.write().await = database;
        Ok(())
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.collection().await;
        let index = IndexModel::builder()
            .keys(doc! { "status": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name(Some("match_status_created_idx".to_owned()))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: MATCH_COLLECTION_NAME,
                index: "status,created_at",
                source,
            })?;

        Ok(())
    }

    async fn collection(&self) -> Collection<MongoMatchDocument> {
        self.inner
            .database
            .read()
            .await
            .collection::<MongoMatchDocument>(MATCH_COLLECTION_NAME)
    }

    async fn save_match(&self, entity: MatchEntity) -> MongoResult<()> {
        let id = entity.id;
        let version = i64::try_from(entity.version).unwrap_or(i64::MAX);
        let document: MongoMatchDocument = entity.into();
        let collection = self.collection().await;

        // Only replace a stored snapshot that is not newer than this one.
        let mut filter = doc_id(id);
        filter.insert("version", doc! { "$lte": version });
        let result = collection
            .replace_one(filter, &document)
            .await
            .map_err(|source| MongoDaoError::SaveMatch { id, source })?;
        if result.matched_count > 0 {
            return Ok(());
        }

        let exists = collection
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::SaveMatch { id, source })?
            .is_some();
        if exists {
            warn!(match_id = %id, version, "skipping stale match snapshot");
            return Ok(());
        }

        collection
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::SaveMatch { id, source })?;
        Ok(())
    }

    async fn find_match(&self, id: Uuid) -> MongoResult<Option<MatchEntity>> {
        let collection = self.collection().await;
        let document = collection
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadMatch { id, source })?;

        document.map(MatchEntity::try_from).transpose()
    }

    async fn delete_match(&self, id: Uuid) -> MongoResult<bool> {
        let collection = self.collection().await;
        let result = collection
            .delete_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::DeleteMatch { id, source })?;
        Ok(result.deleted_count > 0)
    }

    async fn list_matches(&self, finished_only: bool) -> MongoResult<Vec<MatchEntity>> {
        let collection = self.collection().await;
        let filter = if finished_only {
            doc! { "status": "finished" }
        } else {
            doc! {}
        };

        let documents: Vec<MongoMatchDocument> = collection
            .find(filter)
            .await
            .map_err(|source| MongoDaoError::ListMatches { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListMatches { source })?;

        documents.into_iter().map(MatchEntity::try_from).collect()
    }
}

impl MatchStore for MongoMatchStore {
    fn save_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_match(entity).await.map_err(Into::into) })
    }

    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_match(id).await.map_err(Into::into) })
    }

    fn delete_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_match(id).await.map_err(Into::into) })
    }

    fn list_matches(
        &self,
        finished_only: bool,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_matches(finished_only).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.reconnect().await.map_err(Into::into) })
    }
}

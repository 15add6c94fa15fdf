use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::from_value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dao::{match_store::MatchStore, models::MatchEntity, storage::StorageResult};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, CouchMatchDocument, END_SUFFIX, MATCH_PREFIX, RevisionProbe,
        match_doc_id,
    },
};

const ALL_DOCS: &str = "_all_docs";

/// Match store backed by a CouchDB database reached over HTTP.
#[derive(Clone)]
pub struct CouchMatchStore {
    client: Client,
    database_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchMatchStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            database_url: Arc::from(format!(
                "{}/{}",
                config.base_url.trim_end_matches('/'),
                config.database
            )),
            database: Arc::from(config.database),
            auth: config
                .credentials
                .map(|(user, pass)| (Arc::<str>::from(user), Arc::<str>::from(pass))),
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn request(&self, method: Method, path: Option<&str>) -> RequestBuilder {
        let url = match path {
            Some(path) => format!("{}/{path}", self.database_url),
            None => self.database_url.to_string(),
        };
        let builder = self.client.request(method, url);
        match &self.auth {
            Some((user, pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, action: &'static str) -> CouchResult<Response> {
        builder
            .send()
            .await
            .map_err(|source| CouchDaoError::Request { action, source })
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let unreachable = |source| CouchDaoError::Unreachable {
            database: self.database.to_string(),
            source,
        };

        let probe = self
            .request(Method::GET, None)
            .send()
            .await
            .map_err(unreachable)?;
        if probe.status() != StatusCode::NOT_FOUND {
            return expect_success(probe.status(), "database check");
        }

        let created = self
            .request(Method::PUT, None)
            .send()
            .await
            .map_err(unreachable)?;
        // 412: created concurrently by another instance.
        if created.status() == StatusCode::PRECONDITION_FAILED {
            return Ok(());
        }
        expect_success(created.status(), "database creation")?;
        debug!(database = %self.database, "created CouchDB match database");
        Ok(())
    }

    async fn fetch<T>(&self, id: Uuid, action: &'static str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let doc_id = match_doc_id(id);
        let response = self
            .send(self.request(Method::GET, Some(&doc_id)), action)
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        expect_success(response.status(), action)?;
        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|source| CouchDaoError::DecodeBody { action, source })
    }

    async fn load_match(&self, id: Uuid) -> CouchResult<Option<MatchEntity>> {
        self.fetch::<CouchMatchDocument>(id, "load match")
            .await?
            .map(CouchMatchDocument::into_entity)
            .transpose()
    }

    async fn store_match(&self, entity: MatchEntity) -> CouchResult<()> {
        const ACTION: &str = "save match";
        let existing = self.fetch::<RevisionProbe>(entity.id, ACTION).await?;
        if let Some(probe) = &existing
            && probe.version > entity.version
        {
            warn!(match_id = %entity.id, version = entity.version, "skipping stale match snapshot");
            return Ok(());
        }

        let document = CouchMatchDocument::from_entity(entity, existing.map(|probe| probe.rev));
        let response = self
            .send(
                self.request(Method::PUT, Some(&document.id)).json(&document),
                ACTION,
            )
            .await?;
        expect_success(response.status(), ACTION)
    }

    async fn remove_match(&self, id: Uuid) -> CouchResult<bool> {
        const ACTION: &str = "delete match";
        let Some(probe) = self.fetch::<RevisionProbe>(id, ACTION).await? else {
            return Ok(false);
        };

        let doc_id = match_doc_id(id);
        let response = self
            .send(
                self.request(Method::DELETE, Some(&doc_id))
                    .query(&[("rev", probe.rev)]),
                ACTION,
            )
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        expect_success(response.status(), ACTION)?;
        Ok(true)
    }

    async fn all_matches(&self) -> CouchResult<Vec<MatchEntity>> {
        const ACTION: &str = "list matches";
        let query = [
            ("include_docs", "true".to_string()),
            ("startkey", format!("\"{MATCH_PREFIX}\"")),
            ("endkey", format!("\"{MATCH_PREFIX}{END_SUFFIX}\"")),
        ];

        let response = self
            .send(self.request(Method::GET, Some(ALL_DOCS)).query(&query), ACTION)
            .await?;
        expect_success(response.status(), ACTION)?;

        let payload = response
            .json::<AllDocsResponse>()
            .await
            .map_err(|source| CouchDaoError::DecodeBody {
                action: ACTION,
                source,
            })?;

        payload
            .rows
            .into_iter()
            .filter_map(|row| row.doc)
            .map(|doc| {
                from_value::<CouchMatchDocument>(doc)
                    .map_err(|source| CouchDaoError::MalformedMatch { source })?
                    .into_entity()
            })
            .collect()
    }
}

fn expect_success(status: StatusCode, action: &'static str) -> CouchResult<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(CouchDaoError::UnexpectedStatus { action, status })
    }
}

impl MatchStore for CouchMatchStore {
    fn save_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.store_match(entity).await.map_err(Into::into) })
    }

    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.load_match(id).await.map_err(Into::into) })
    }

    fn delete_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.remove_match(id).await.map_err(Into::into) })
    }

    fn list_matches(
        &self,
        finished_only: bool,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut entities = store.all_matches().await?;
            if finished_only {
                entities.retain(MatchEntity::is_finished);
            }
            Ok(entities)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            const ACTION: &str = "health check";
            let response = store
                .send(store.request(Method::GET, None), ACTION)
                .await?;
            Ok(expect_success(response.status(), ACTION)?)
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}

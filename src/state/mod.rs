pub mod lifecycle;
pub mod match_record;
pub mod scoring;
mod sse;
pub mod transitions;

use std::{sync::Arc, time::SystemTime};

use dashmap::{DashMap, DashSet};
use tokio::sync::{Mutex, RwLock, mpsc, watch};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{match_store::MatchStore, models::MatchEntity},
    error::ServiceError,
    state::{
        lifecycle::{MatchError, Outcome},
        match_record::{Match, MatchStatus},
    },
};

pub use self::sse::SseHub;

/// Shared handle on the application state.
pub type SharedState = Arc<AppState>;
/// One active match behind its own lock.
pub type MatchHandle = Arc<Mutex<Match>>;

/// Work queued for the persistence writer.
#[derive(Debug, Clone)]
pub enum PersistCommand {
    /// Upsert this snapshot (stale versions are dropped by the writer).
    Save(MatchEntity),
    /// Remove the match from storage.
    Delete(Uuid),
}

impl PersistCommand {
    /// Match the command applies to.
    pub fn match_id(&self) -> Uuid {
        match self {
            PersistCommand::Save(entity) => entity.id,
            PersistCommand::Delete(id) => *id,
        }
    }
}

/// Central application state: active matches, store handle and event fan-out.
pub struct AppState {
    config: AppConfig,
    match_store: RwLock<Option<Arc<dyn MatchStore>>>,
    sse: SseHub,
    matches: DashMap<Uuid, MatchHandle>,
    pending_deletes: DashSet<Uuid>,
    degraded: watch::Sender<bool>,
    persist_tx: mpsc::UnboundedSender<PersistCommand>,
    persist_rx: Mutex<Option<mpsc::UnboundedReceiver<PersistCommand>>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let (persist_tx, persist_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            sse: SseHub::new(config.event_capacity()),
            config,
            match_store: RwLock::new(None),
            matches: DashMap::new(),
            pending_deletes: DashSet::new(),
            degraded: degraded_tx,
            persist_tx,
            persist_rx: Mutex::new(Some(persist_rx)),
        })
    }

    /// Loaded application configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current match store, if one is installed.
    pub async fn match_store(&self) -> Option<Arc<dyn MatchStore>> {
        let guard = self.match_store.read().await;
        guard.as_ref().cloned()
    }

    /// Install a new match store implementation and leave degraded mode.
    pub async fn install_match_store(&self, store: Arc<dyn MatchStore>) {
        {
            let mut guard = self.match_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current match store and enter degraded mode.
    pub async fn clear_match_store(&self) {
        {
            let mut guard = self.match_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Broadcast hub carrying every match event.
    pub fn sse(&self) -> &SseHub {
        &self.sse
    }

    /// Update and broadcast the degraded flag when the value changes.
    fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Register a freshly created match in the active table.
    pub fn insert_match(&self, record: Match) -> MatchHandle {
        let id = record.id;
        let handle = Arc::new(Mutex::new(record));
        self.matches.insert(id, handle.clone());
        handle
    }

    /// Handle on an active match.
    pub fn match_handle(&self, id: Uuid) -> Option<MatchHandle> {
        self.matches.get(&id).map(|entry| entry.value().clone())
    }

    /// Number of matches held in memory.
    pub fn active_count(&self) -> usize {
        self.matches.len()
    }

    /// Latest committed state of every match held in memory.
    pub async fn active_matches(&self) -> Vec<Match> {
        let handles: Vec<MatchHandle> = self
            .matches
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut records = Vec::with_capacity(handles.len());
        for handle in handles {
            records.push(handle.lock().await.clone());
        }
        records
    }

    /// Drop a match from the active table.
    pub fn remove_match(&self, id: Uuid) -> Option<MatchHandle> {
        self.matches.remove(&id).map(|(_, handle)| handle)
    }

    /// Evict a finished match once storage holds a snapshot at least as new as `version`.
    pub async fn evict_finished(&self, id: Uuid, version: u64) -> bool {
        let Some(handle) = self.match_handle(id) else {
            return false;
        };
        let record = handle.lock().await;
        if record.status != MatchStatus::Finished || record.version > version {
            return false;
        }
        self.matches
            .remove_if(&id, |_, current| Arc::ptr_eq(current, &handle))
            .is_some()
    }

    /// Remember a deletion until the writer has removed the match from storage.
    pub fn mark_deleted(&self, id: Uuid) {
        self.pending_deletes.insert(id);
    }

    /// Forget a deletion once storage no longer holds the match.
    pub fn confirm_deleted(&self, id: Uuid) {
        self.pending_deletes.remove(&id);
    }

    /// Whether a deletion of `id` is still waiting to reach storage.
    pub fn is_pending_delete(&self, id: Uuid) -> bool {
        self.pending_deletes.contains(&id)
    }

    /// Load unfinished matches read from storage, keeping any newer in-memory copy.
    ///
    /// Matches whose deletion has not been flushed yet are skipped.
    pub fn hydrate(&self, entities: Vec<MatchEntity>) -> usize {
        let mut loaded = 0;
        for entity in entities
            .into_iter()
            .filter(|entity| !entity.is_finished() && !self.is_pending_delete(entity.id))
        {
            self.matches.entry(entity.id).or_insert_with(|| {
                loaded += 1;
                Arc::new(Mutex::new(Match::from(entity)))
            });
        }
        loaded
    }

    /// Queue work for the persistence writer without blocking.
    pub fn enqueue_persist(&self, command: PersistCommand) {
        let id = command.match_id();
        if self.persist_tx.send(command).is_err() {
            warn!(match_id = %id, "persistence queue closed; snapshot dropped");
        }
    }

    /// Hand the persistence queue to its single consumer.
    pub async fn take_persistence_receiver(
        &self,
    ) -> Option<mpsc::UnboundedReceiver<PersistCommand>> {
        self.persist_rx.lock().await.take()
    }

    /// Apply `op` to one active match under its lock.
    ///
    /// The operation runs on a working copy that replaces the committed record
    /// only when it succeeds with a visible change. `on_commit` runs while the
    /// lock is still held so that queued snapshots and broadcast events keep
    /// the mutation order.
    pub async fn mutate_match<F, C>(
        &self,
        id: Uuid,
        op: F,
        on_commit: C,
    ) -> Result<(Match, Outcome), ServiceError>
    where
        F: FnOnce(&mut Match, SystemTime) -> Result<Outcome, MatchError>,
        C: FnOnce(&Match, Outcome, SystemTime),
    {
        let handle = self
            .match_handle(id)
            .ok_or_else(|| ServiceError::NotFound(format!("match `{id}` not found or already finished")))?;

        let mut guard = handle.lock().await;
        // Deleted or evicted while this call waited for the lock.
        let still_listed = self
            .matches
            .get(&id)
            .is_some_and(|entry| Arc::ptr_eq(entry.value(), &handle));
        if !still_listed {
            return Err(ServiceError::NotFound(format!("match `{id}` not found or already finished")));
        }

        let now = SystemTime::now();
        let mut working = guard.clone();
        let outcome = op(&mut working, now)?;

        if outcome.is_visible() {
            *guard = working;
            on_commit(&guard, outcome, now);
        } else {
            debug!(match_id = %id, "mutation left the match unchanged");
        }

        Ok((guard.clone(), outcome))
    }
}

use std::time::Duration;

use indexmap::IndexMap;
use tokio::{sync::mpsc, time::sleep};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::match_store::MatchStore,
    state::{PersistCommand, SharedState},
};

const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Drain the persistence queue into the installed store.
///
/// Commands for the same match are coalesced so only the newest snapshot is
/// written. While no store is installed the pending work is kept and retried.
pub async fn run(state: SharedState) {
    let Some(mut receiver) = state.take_persistence_receiver().await else {
        warn!("persistence writer already running");
        return;
    };

    let mut pending: IndexMap<Uuid, PersistCommand> = IndexMap::new();
    let mut open = true;

    while open || !pending.is_empty() {
        if pending.is_empty() {
            match receiver.recv().await {
                Some(command) => coalesce(&mut pending, command),
                None => break,
            }
        }
        open = drain_ready(&mut receiver, &mut pending);

        let Some(store) = state.match_store().await else {
            debug!(pending = pending.len(), "no storage installed; holding snapshots");
            sleep(RETRY_DELAY).await;
            continue;
        };

        if !flush(&state, store.as_ref(), &mut pending).await {
            sleep(RETRY_DELAY).await;
        }
    }

    info!("persistence writer stopped");
}

/// Pull every command already waiting in the channel. Returns `false` once the channel is closed.
fn drain_ready(
    receiver: &mut mpsc::UnboundedReceiver<PersistCommand>,
    pending: &mut IndexMap<Uuid, PersistCommand>,
) -> bool {
    loop {
        match receiver.try_recv() {
            Ok(command) => coalesce(pending, command),
            Err(mpsc::error::TryRecvError::Empty) => return true,
            Err(mpsc::error::TryRecvError::Disconnected) => return false,
        }
    }
}

/// Merge `command` into the pending set, keeping the newest snapshot per match.
fn coalesce(pending: &mut IndexMap<Uuid, PersistCommand>, command: PersistCommand) {
    let id = command.match_id();
    match (pending.get(&id), &command) {
        (Some(PersistCommand::Delete(_)), PersistCommand::Save(_)) => {}
        (Some(PersistCommand::Save(queued)), PersistCommand::Save(incoming))
            if queued.version > incoming.version => {}
        _ => {
            pending.insert(id, command);
        }
    }
}

/// Write pending commands in arrival order, stopping at the first storage failure.
async fn flush(
    state: &SharedState,
    store: &dyn MatchStore,
    pending: &mut IndexMap<Uuid, PersistCommand>,
) -> bool {
    while let Some((&id, command)) = pending.first() {
        let command = command.clone();
        let result = match &command {
            PersistCommand::Save(entity) => store.save_match(entity.clone()).await,
            PersistCommand::Delete(match_id) => store.delete_match(*match_id).await.map(|_| ()),
        };

        if let Err(err) = result {
            warn!(match_id = %id, error = %err, pending = pending.len(), "failed to persist match");
            return false;
        }
        pending.shift_remove(&id);

        match command {
            PersistCommand::Delete(_) => state.confirm_deleted(id),
            PersistCommand::Save(entity)
                if entity.is_finished() && state.evict_finished(id, entity.version).await =>
            {
                debug!(match_id = %id, "finished match moved to history");
            }
            PersistCommand::Save(_) => {}
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{match_store::MemoryMatchStore, models::MatchEntity},
        state::{
            AppState,
            match_record::{
                Rules,
                tests::{at, new_match},
            },
        },
    };

    #[test]
    fn coalesce_keeps_newest_snapshot_and_deletes() {
        let mut record = new_match(Rules::default());
        let id = record.id;
        let first = MatchEntity::from(&record);
        record.start(at(1_000)).unwrap();
        let second = MatchEntity::from(&record);

        let mut pending = IndexMap::new();
        coalesce(&mut pending, PersistCommand::Save(second.clone()));
        coalesce(&mut pending, PersistCommand::Save(first));
        assert!(matches!(&pending[&id], PersistCommand::Save(e) if e.version == second.version));

        coalesce(&mut pending, PersistCommand::Delete(id));
        coalesce(&mut pending, PersistCommand::Save(second));
        assert!(matches!(pending[&id], PersistCommand::Delete(_)));
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn finished_matches_leave_memory_once_saved() {
        let state = AppState::new(AppConfig::default());
        let store = MemoryMatchStore::new();
        state.install_match_store(Arc::new(store.clone())).await;

        let mut record = new_match(Rules::default());
        let id = record.id;
        state.insert_match(record.clone());
        record.finish(at(5_000)).unwrap();
        *state.match_handle(id).unwrap().lock().await = record.clone();
        state.enqueue_persist(PersistCommand::Save(MatchEntity::from(&record)));

        let worker = tokio::spawn(run(state.clone()));
        tokio::time::timeout(Duration::from_secs(5), async {
            while state.match_handle(id).is_some() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        worker.abort();

        let saved = store.find_match(id).await.unwrap().unwrap();
        assert!(saved.is_finished());
    }

    #[tokio::test]
    async fn snapshots_wait_for_a_store() {
        let state = AppState::new(AppConfig::default());
        let record = new_match(Rules::default());
        let id = record.id;
        state.enqueue_persist(PersistCommand::Save(MatchEntity::from(&record)));

        let worker = tokio::spawn(run(state.clone()));
        sleep(Duration::from_millis(50)).await;

        let store = MemoryMatchStore::new();
        state.install_match_store(Arc::new(store.clone())).await;
        tokio::time::timeout(Duration::from_secs(5), async {
            while store.find_match(id).await.unwrap().is_none() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        worker.abort();
    }
}

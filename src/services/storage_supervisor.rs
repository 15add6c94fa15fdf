use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{match_store::MatchStore, storage::StorageError},
    services::sse_events::broadcast_system_status,
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Reconnect to the storage backend and keep the shared state in degraded mode when it is unavailable.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn MatchStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                attach(&state, store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                delay = INITIAL_DELAY;

                loop {
                    match store.health_check().await {
                        Ok(()) => {
                            if state.is_degraded() {
                                info!("storage healthy again; leaving degraded mode");
                                attach(&state, store.clone()).await;
                            }
                            sleep(HEALTH_POLL_INTERVAL).await;
                        }
                        Err(err) => {
                            warn!(error = %err, "storage health check failed");
                            if reconnect(&state, store.as_ref()).await {
                                attach(&state, store.clone()).await;
                                sleep(HEALTH_POLL_INTERVAL).await;
                                continue;
                            }
                            warn!("exhausted storage reconnect attempts; staying in degraded mode");
                            break;
                        }
                    }
                }

                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

/// Try to revive the current connection, entering degraded mode after the first failure.
async fn reconnect(state: &SharedState, store: &dyn MatchStore) -> bool {
    let mut reconnect_delay = INITIAL_DELAY;

    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnection succeeded after health check failure");
                return true;
            }
            Err(reconnect_err) => {
                if attempt == 0 {
                    warn!(
                        attempt, error = %reconnect_err,
                        "storage reconnect first attempt failed; entering degraded mode"
                    );
                    detach(state).await;
                } else {
                    warn!(attempt, error = %reconnect_err, "storage reconnect attempt failed");
                }
                sleep(reconnect_delay).await;
                reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
            }
        }
    }

    false
}

/// Install `store` and load the unfinished matches it holds into memory.
pub async fn attach(state: &SharedState, store: Arc<dyn MatchStore>) {
    match store.list_matches(false).await {
        Ok(entities) => {
            let loaded = state.hydrate(entities);
            if loaded > 0 {
                info!(loaded, "restored unfinished matches from storage");
            }
        }
        Err(err) => warn!(error = %err, "failed to restore unfinished matches"),
    }

    let was_degraded = state.is_degraded();
    state.install_match_store(store).await;
    if was_degraded {
        broadcast_system_status(state, false);
    }
}

async fn detach(state: &SharedState) {
    let was_degraded = state.is_degraded();
    state.clear_match_store().await;
    if !was_degraded {
        broadcast_system_status(state, true);
    }
}

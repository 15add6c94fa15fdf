use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report degraded mode and the active match count while logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.match_store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        None => warn!("storage unavailable (degraded mode)"),
    }

    HealthResponse::new(state.is_degraded(), state.active_count())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{config::AppConfig, dao::match_store::MemoryMatchStore, state::AppState};

    #[tokio::test]
    async fn reports_degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        assert_eq!(health_status(&state).await.status, "degraded");

        state
            .install_match_store(Arc::new(MemoryMatchStore::new()))
            .await;
        let health = health_status(&state).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.active_matches, 0);
    }
}

use std::time::SystemTime;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        matches::MatchSnapshot,
        sse::{MatchDeletedEvent, ServerEvent, SystemStatus},
    },
    state::{SharedState, match_record::Match},
};

/// Full snapshot after every visible mutation.
pub const EVENT_MATCH_STATE: &str = "match.state";
/// Sent once when a match reaches its terminal status.
pub const EVENT_MATCH_FINISHED: &str = "match.finished";
/// Sent when a match is removed.
pub const EVENT_MATCH_DELETED: &str = "match.deleted";
/// Degraded mode changes.
pub const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Broadcast the full state of a match after a visible mutation.
pub fn broadcast_match_state(state: &SharedState, record: &Match, now: SystemTime) {
    let snapshot = MatchSnapshot::capture(record, now);
    send_match_event(state, EVENT_MATCH_STATE, record.id, &snapshot);
}

/// Broadcast that a match reached its terminal status.
pub fn broadcast_match_finished(state: &SharedState, record: &Match, now: SystemTime) {
    info!(
        match_id = %record.id,
        sets_a = record.sets_won_a,
        sets_b = record.sets_won_b,
        "match finished"
    );
    let snapshot = MatchSnapshot::capture(record, now);
    send_match_event(state, EVENT_MATCH_FINISHED, record.id, &snapshot);
}

/// Broadcast that a match has been removed.
pub fn broadcast_match_deleted(state: &SharedState, id: Uuid) {
    send_match_event(state, EVENT_MATCH_DELETED, id, &MatchDeletedEvent { id });
}

/// Broadcast a degraded-mode change to every subscriber.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    match ServerEvent::json(EVENT_SYSTEM_STATUS, None, &SystemStatus { degraded }) {
        Ok(event) => state.sse().broadcast(event),
        Err(err) => warn!(error = %err, "failed to serialize system status payload"),
    }
}

fn send_match_event(state: &SharedState, event: &str, id: Uuid, payload: &impl Serialize) {
    match ServerEvent::json(event, Some(id), payload) {
        Ok(event) => state.sse().broadcast(event),
        Err(err) => warn!(event, match_id = %id, error = %err, "failed to serialize match event"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        state::{
            AppState,
            match_record::{
                Rules,
                tests::{at, new_match},
            },
        },
    };

    #[tokio::test]
    async fn match_events_are_tagged_with_the_match_id() {
        let state = AppState::new(AppConfig::default());
        let mut receiver = state.sse().subscribe();
        let record = new_match(Rules::default());

        broadcast_match_state(&state, &record, at(0));
        broadcast_match_deleted(&state, record.id);

        let first = receiver.recv().await.unwrap();
        assert_eq!(first.event.as_deref(), Some(EVENT_MATCH_STATE));
        assert_eq!(first.match_id, Some(record.id));
        let snapshot: MatchSnapshot = serde_json::from_str(&first.data).unwrap();
        assert_eq!(snapshot.id, record.id);

        let second = receiver.recv().await.unwrap();
        assert_eq!(second.event.as_deref(), Some(EVENT_MATCH_DELETED));
    }
}

use std::time::SystemTime;

use uuid::Uuid;

use crate::{
    dao::models::MatchEntity,
    error::ServiceError,
    services::sse_events::{broadcast_match_finished, broadcast_match_state},
    state::{
        PersistCommand, SharedState,
        lifecycle::{MatchError, Outcome},
        match_record::Match,
    },
};

/// Apply a match mutation, then queue its snapshot for storage and broadcast it.
///
/// Both side effects happen before the match lock is released, so storage and
/// subscribers observe mutations of one match in the order they were applied.
pub async fn mutate_with_broadcast<F>(
    state: &SharedState,
    id: Uuid,
    op: F,
) -> Result<(Match, Outcome), ServiceError>
where
    F: FnOnce(&mut Match, SystemTime) -> Result<Outcome, MatchError>,
{
    state
        .mutate_match(id, op, |record, outcome, now| {
            state.enqueue_persist(PersistCommand::Save(MatchEntity::from(record)));
            broadcast_match_state(state, record, now);
            if outcome == Outcome::Completed {
                broadcast_match_finished(state, record, now);
            }
        })
        .await
}

use std::{collections::HashMap, time::SystemTime};

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::{match_store::MatchStore, models::MatchEntity},
    dto::{
        matches::{
            CreateMatchRequest, CreateMatchResponse, DEFAULT_MATCH_NAME, DEFAULT_TEAM_NAMES,
            EditMatchRequest, ListStatus, MatchListQuery, MatchListResponse, MatchSnapshot,
            MatchSort,
        },
        meta::StagesResponse,
    },
    error::ServiceError,
    services::sse_events::{broadcast_match_deleted, broadcast_match_state},
    state::{
        PersistCommand, SharedState,
        lifecycle::{MatchEvent, MetaUpdate, Outcome},
        match_record::{Match, MatchSetup, Side},
        transitions::mutate_with_broadcast,
    },
};

/// Open a new scheduled match.
pub async fn create_match(
    state: &SharedState,
    request: CreateMatchRequest,
) -> Result<CreateMatchResponse, ServiceError> {
    let CreateMatchRequest {
        name,
        team_a,
        team_b,
        rules,
        first_server,
        stage,
        court,
    } = request;

    let stage = match non_blank(stage) {
        Some(stage) => ensure_known_stage(state, stage)?,
        None => state.config().default_stage().to_string(),
    };

    let setup = MatchSetup {
        name: non_blank(name).unwrap_or_else(|| DEFAULT_MATCH_NAME.into()),
        team_a: non_blank(team_a).unwrap_or_else(|| DEFAULT_TEAM_NAMES[0].into()),
        team_b: non_blank(team_b).unwrap_or_else(|| DEFAULT_TEAM_NAMES[1].into()),
        rules: rules.unwrap_or_default().into_rules(),
        first_server: first_server.unwrap_or(Side::A),
        stage,
        court: court.map(|court| court.trim().to_string()).unwrap_or_default(),
    };

    let now = SystemTime::now();
    let record = Match::new(setup, now);
    let id = record.id;
    info!(
        match_id = %id,
        name = %record.name,
        stage = %record.stage,
        best_of_sets = record.rules.best_of_sets,
        "match created"
    );

    let handle = state.insert_match(record);
    let guard = handle.lock().await;
    state.enqueue_persist(PersistCommand::Save(MatchEntity::from(&*guard)));
    broadcast_match_state(state, &guard, now);

    Ok(CreateMatchResponse { id })
}

/// Current state of an active or finished match.
pub async fn get_match(state: &SharedState, id: Uuid) -> Result<MatchSnapshot, ServiceError> {
    if let Some(handle) = state.match_handle(id) {
        let record = handle.lock().await.clone();
        return Ok(MatchSnapshot::capture(&record, SystemTime::now()));
    }

    let store = state.match_store().await.ok_or(ServiceError::Degraded)?;
    match store.find_match(id).await? {
        Some(entity) => Ok(MatchSnapshot::capture(
            &Match::from(entity),
            SystemTime::now(),
        )),
        None => Err(ServiceError::NotFound(format!("match `{id}` not found"))),
    }
}

/// List matches grouped by collection, filtered and sorted.
pub async fn list_matches(
    state: &SharedState,
    query: MatchListQuery,
) -> Result<MatchListResponse, ServiceError> {
    let MatchListQuery {
        status,
        stage,
        q,
        sort,
    } = query;
    let status = status.unwrap_or_default();
    let sort = sort
        .and_then(|sort| sort.parse::<MatchSort>().ok())
        .unwrap_or_default();
    let stage = stage.filter(|stage| state.config().is_known_stage(stage));
    let needle = q
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());

    let (mut active, mut finished): (Vec<Match>, Vec<Match>) = state
        .active_matches()
        .await
        .into_iter()
        .partition(|record| record.status.is_active());

    if status != ListStatus::Active {
        let store = state.match_store().await.ok_or(ServiceError::Degraded)?;
        let mut by_id: HashMap<Uuid, Match> = finished
            .into_iter()
            .map(|record| (record.id, record))
            .collect();
        for entity in store.list_matches(true).await? {
            let newer = by_id
                .get(&entity.id)
                .is_none_or(|known| known.version < entity.version);
            if newer {
                by_id.insert(entity.id, Match::from(entity));
            }
        }
        finished = by_id.into_values().collect();
    }

    let keep = |record: &Match| {
        stage.as_deref().is_none_or(|stage| record.stage == stage)
            && needle.as_deref().is_none_or(|needle| matches_text(record, needle))
    };
    let now = SystemTime::now();
    let render = |records: &mut Vec<Match>| {
        records.retain(|record| keep(record));
        records.sort_by(|a, b| sort.compare(a, b));
        records
            .iter()
            .map(|record| MatchSnapshot::capture(record, now))
            .collect::<Vec<_>>()
    };

    Ok(match status {
        ListStatus::Active => MatchListResponse {
            active: Some(render(&mut active)),
            finished: None,
        },
        ListStatus::Finished => MatchListResponse {
            active: None,
            finished: Some(render(&mut finished)),
        },
        ListStatus::All => MatchListResponse {
            active: Some(render(&mut active)),
            finished: Some(render(&mut finished)),
        },
    })
}

/// Rename the match or its sides, or move it to another stage or court.
pub async fn edit_match(
    state: &SharedState,
    id: Uuid,
    request: EditMatchRequest,
) -> Result<MatchSnapshot, ServiceError> {
    let mut update = MetaUpdate::from(request);
    update.stage = match non_blank(update.stage.take()) {
        Some(stage) => Some(ensure_known_stage(state, stage)?),
        None => None,
    };

    let (record, _) =
        mutate_with_broadcast(state, id, |record, now| record.edit_meta(update, now)).await?;
    Ok(MatchSnapshot::capture(&record, SystemTime::now()))
}

/// Start the clock of a match.
pub async fn start_match(state: &SharedState, id: Uuid) -> Result<MatchSnapshot, ServiceError> {
    apply_event(state, id, MatchEvent::Start).await
}

/// Pause a running match.
pub async fn pause_match(state: &SharedState, id: Uuid) -> Result<MatchSnapshot, ServiceError> {
    apply_event(state, id, MatchEvent::Pause).await
}

/// Resume a paused match.
pub async fn resume_match(state: &SharedState, id: Uuid) -> Result<MatchSnapshot, ServiceError> {
    apply_event(state, id, MatchEvent::Resume).await
}

/// Close a match regardless of the score.
pub async fn finish_match(state: &SharedState, id: Uuid) -> Result<MatchSnapshot, ServiceError> {
    apply_event(state, id, MatchEvent::Finish).await
}

/// Award the next point to the side labelled `side` (`A` or `B`).
pub async fn award_point(
    state: &SharedState,
    id: Uuid,
    side: &str,
) -> Result<MatchSnapshot, ServiceError> {
    let side: Side = side.parse()?;
    let (record, outcome) =
        mutate_with_broadcast(state, id, |record, now| record.award_point(side, now)).await?;
    if outcome == Outcome::Completed {
        info!(match_id = %id, winner = %side, "final point played");
    }
    Ok(MatchSnapshot::capture(&record, SystemTime::now()))
}

/// Zero the points of the game in progress.
pub async fn reset_current_game(
    state: &SharedState,
    id: Uuid,
) -> Result<MatchSnapshot, ServiceError> {
    let (record, _) =
        mutate_with_broadcast(state, id, |record, now| record.reset_current_game(now)).await?;
    Ok(MatchSnapshot::capture(&record, SystemTime::now()))
}

/// Hand the serve to the other side.
pub async fn toggle_server(state: &SharedState, id: Uuid) -> Result<MatchSnapshot, ServiceError> {
    let (record, _) =
        mutate_with_broadcast(state, id, |record, now| record.toggle_server(now)).await?;
    Ok(MatchSnapshot::capture(&record, SystemTime::now()))
}

/// Remove a match that is not being played.
pub async fn delete_match(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    if let Some(handle) = state.match_handle(id) {
        let guard = handle.lock().await;
        if guard.running {
            return Err(ServiceError::InvalidState(format!(
                "match `{id}` is running; pause or finish it before deleting"
            )));
        }
        state.remove_match(id);
        state.mark_deleted(id);
        state.enqueue_persist(PersistCommand::Delete(id));
        broadcast_match_deleted(state, id);
        drop(guard);
        info!(match_id = %id, "active match deleted");
        return Ok(());
    }

    let store = state.match_store().await.ok_or(ServiceError::Degraded)?;
    if store.find_match(id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("match `{id}` not found")));
    }
    state.mark_deleted(id);
    state.enqueue_persist(PersistCommand::Delete(id));
    broadcast_match_deleted(state, id);
    info!(match_id = %id, "finished match deleted");
    Ok(())
}

/// Configured stages, in display order.
pub fn stages(state: &SharedState) -> StagesResponse {
    StagesResponse {
        stages: state.config().stages().map(String::from).collect(),
        default_stage: state.config().default_stage().to_string(),
    }
}

async fn apply_event(
    state: &SharedState,
    id: Uuid,
    event: MatchEvent,
) -> Result<MatchSnapshot, ServiceError> {
    let (record, outcome) =
        mutate_with_broadcast(state, id, |record, now| record.apply(event, now)).await?;
    if outcome.is_visible() {
        info!(match_id = %id, ?event, status = ?record.status, "match lifecycle updated");
    }
    Ok(MatchSnapshot::capture(&record, SystemTime::now()))
}

fn ensure_known_stage(state: &SharedState, stage: String) -> Result<String, ServiceError> {
    if state.config().is_known_stage(&stage) {
        Ok(stage)
    } else {
        Err(ServiceError::InvalidInput(format!("unknown stage `{stage}`")))
    }
}

fn matches_text(record: &Match, needle: &str) -> bool {
    let pool = format!(
        "{} {} {}",
        record.name,
        record.team(Side::A).name,
        record.team(Side::B).name
    );
    pool.to_lowercase().contains(needle)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

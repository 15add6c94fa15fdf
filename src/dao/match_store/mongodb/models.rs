use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::MongoDaoError;
use crate::{
    dao::models::{GameScoreEntity, MatchEntity, RulesEntity, SetEntity},
    state::match_record::{MatchStatus, Side},
};

/// Shape of a document in the `matches` collection.
///
/// Identifiers are stored as hyphenated strings and counters as `i64` so the
/// collection stays readable from the shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMatchDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    stage: String,
    #[serde(default)]
    court: String,
    status: MatchStatus,
    rules: RulesEntity,
    team_a: String,
    team_b: String,
    server: Side,
    sets: Vec<SetEntity>,
    sets_won_a: u8,
    sets_won_b: u8,
    current_game: GameScoreEntity,
    started_at: Option<DateTime>,
    paused_at: Option<DateTime>,
    accumulated_ms: i64,
    running: bool,
    created_at: DateTime,
    updated_at: DateTime,
    ended_at: Option<DateTime>,
    version: i64,
}

impl From<MatchEntity> for MongoMatchDocument {
    fn from(value: MatchEntity) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            stage: value.stage,
            court: value.court,
            status: value.status,
            rules: value.rules,
            team_a: value.team_a,
            team_b: value.team_b,
            server: value.server,
            sets: value.sets,
            sets_won_a: value.sets_won_a,
            sets_won_b: value.sets_won_b,
            current_game: value.current_game,
            started_at: value.started_at.map(DateTime::from_system_time),
            paused_at: value.paused_at.map(DateTime::from_system_time),
            accumulated_ms: i64::try_from(value.accumulated_ms).unwrap_or(i64::MAX),
            running: value.running,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
            ended_at: value.ended_at.map(DateTime::from_system_time),
            version: i64::try_from(value.version).unwrap_or(i64::MAX),
        }
    }
}

impl TryFrom<MongoMatchDocument> for MatchEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoMatchDocument) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&value.id).map_err(|_| MongoDaoError::InvalidId {
            id: value.id.clone(),
        })?;

        Ok(Self {
            id,
            name: value.name,
            stage: value.stage,
            court: value.court,
            status: value.status,
            rules: value.rules,
            team_a: value.team_a,
            team_b: value.team_b,
            server: value.server,
            sets: value.sets,
            sets_won_a: value.sets_won_a,
            sets_won_b: value.sets_won_b,
            current_game: value.current_game,
            started_at: value.started_at.map(DateTime::to_system_time),
            paused_at: value.paused_at.map(DateTime::to_system_time),
            accumulated_ms: u64::try_from(value.accumulated_ms).unwrap_or_default(),
            running: value.running,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
            ended_at: value.ended_at.map(DateTime::to_system_time),
            version: u64::try_from(value.version).unwrap_or_default(),
        })
    }
}

/// `_id` filter selecting one match.
pub fn doc_id(id: Uuid) -> Document {
    doc! { "_id": id.to_string() }
}

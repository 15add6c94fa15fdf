use std::{cmp::Ordering, str::FromStr, time::SystemTime};

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{
        format_system_time,
        validation::{validate_best_of_sets, validate_label, validate_tie_break_points},
    },
    state::{
        lifecycle::MetaUpdate,
        match_record::{Match, MatchStatus, Rules, SetScore, Side, TieBreakAt},
    },
};

/// Name given to a match created without one.
pub const DEFAULT_MATCH_NAME: &str = "Match";
/// Names given to unnamed sides.
pub const DEFAULT_TEAM_NAMES: [&str; 2] = ["Team A", "Team B"];

/// Rule overrides supplied at creation; missing fields take the defaults.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RulesInput {
    /// Odd number of sets between 1 and 7 (default 3).
    #[serde(default)]
    pub best_of_sets: Option<u8>,
    /// `"6-6"` (default), `"5-5"` or `"none"`.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "6-6")]
    pub tie_break_at: Option<TieBreakAt>,
    /// Tie-break target between 1 and 99 (default 7).
    #[serde(default)]
    pub tie_break_points: Option<u16>,
    /// Golden point at 40-40 (default false).
    #[serde(default)]
    pub no_advantage: Option<bool>,
}

impl RulesInput {
    /// Fill the gaps with [`Rules::default`].
    pub fn into_rules(self) -> Rules {
        let defaults = Rules::default();
        Rules {
            best_of_sets: self.best_of_sets.unwrap_or(defaults.best_of_sets),
            tie_break_at: self.tie_break_at.unwrap_or(defaults.tie_break_at),
            tie_break_points: self.tie_break_points.unwrap_or(defaults.tie_break_points),
            no_advantage: self.no_advantage.unwrap_or(defaults.no_advantage),
        }
    }
}

impl Validate for RulesInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(best_of_sets) = self.best_of_sets
            && let Err(e) = validate_best_of_sets(best_of_sets)
        {
            errors.add("best_of_sets", e);
        }

        if let Some(points) = self.tie_break_points
            && let Err(e) = validate_tie_break_points(points)
        {
            errors.add("tie_break_points", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Payload used to open a new match.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateMatchRequest {
    /// Display name (default `Match`).
    #[serde(default)]
    pub name: Option<String>,
    /// Name of side A (default `Team A`).
    #[serde(default)]
    pub team_a: Option<String>,
    /// Name of side B (default `Team B`).
    #[serde(default)]
    pub team_b: Option<String>,
    /// Rule overrides.
    #[serde(default)]
    pub rules: Option<RulesInput>,
    /// Side serving the first game (default `A`).
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "A")]
    pub first_server: Option<Side>,
    /// One of the configured stages (default: the first one).
    #[serde(default)]
    pub stage: Option<String>,
    /// Court label.
    #[serde(default)]
    pub court: Option<String>,
}

impl Validate for CreateMatchRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        for (field, value) in [
            ("name", &self.name),
            ("team_a", &self.team_a),
            ("team_b", &self.team_b),
            ("stage", &self.stage),
            ("court", &self.court),
        ] {
            if let Some(value) = value
                && let Err(e) = validate_label(value)
            {
                errors.add(field, e);
            }
        }

        if let Some(ref rules) = self.rules {
            errors.merge_self("rules", rules.validate());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Partial metadata update; absent or blank names are left unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct EditMatchRequest {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New name for side A.
    #[serde(default)]
    pub team_a: Option<String>,
    /// New name for side B.
    #[serde(default)]
    pub team_b: Option<String>,
    /// New stage, one of the configured stages.
    #[serde(default)]
    pub stage: Option<String>,
    /// Trimmed; an empty string clears the court.
    #[serde(default)]
    pub court: Option<String>,
}

impl Validate for EditMatchRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (field, value) in [
            ("name", &self.name),
            ("team_a", &self.team_a),
            ("team_b", &self.team_b),
            ("stage", &self.stage),
            ("court", &self.court),
        ] {
            if let Some(value) = value
                && let Err(e) = validate_label(value)
            {
                errors.add(field, e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl From<EditMatchRequest> for MetaUpdate {
    fn from(value: EditMatchRequest) -> Self {
        Self {
            name: value.name,
            team_a: value.team_a,
            team_b: value.team_b,
            stage: value.stage,
            court: value.court,
        }
    }
}

/// Identifier of a freshly created match.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateMatchResponse {
    /// Identifier to use in every later call.
    pub id: Uuid,
}

/// Scoring rules as exposed to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RulesDto {
    /// Maximum number of sets.
    pub best_of_sets: u8,
    /// `"6-6"`, `"5-5"` or `"none"`.
    #[schema(value_type = String, example = "6-6")]
    pub tie_break_at: TieBreakAt,
    /// Points needed to win a tie-break.
    pub tie_break_points: u16,
    /// Golden point at 40-40.
    pub no_advantage: bool,
}

impl From<Rules> for RulesDto {
    fn from(value: Rules) -> Self {
        Self {
            best_of_sets: value.best_of_sets,
            tie_break_at: value.tie_break_at,
            tie_break_points: value.tie_break_points,
            no_advantage: value.no_advantage,
        }
    }
}

/// One set of the score line.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetDto {
    /// Games won by side A.
    pub games_a: u16,
    /// Games won by side B.
    pub games_b: u16,
    /// Whether the set is in a tie-break.
    pub tie_break_active: bool,
    /// Tie-break points of side A.
    pub tie_break_points_a: u16,
    /// Tie-break points of side B.
    pub tie_break_points_b: u16,
}

impl From<&SetScore> for SetDto {
    fn from(value: &SetScore) -> Self {
        Self {
            games_a: value.games_a,
            games_b: value.games_b,
            tie_break_active: value.tie_break.active,
            tie_break_points_a: value.tie_break.points_a,
            tie_break_points_b: value.tie_break.points_b,
        }
    }
}

/// Points of the game in progress, raw and as called on court.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GameDto {
    /// Raw points of side A.
    pub points_a: u8,
    /// Raw points of side B.
    pub points_b: u8,
    /// Side holding the advantage, if any.
    #[schema(value_type = Option<String>)]
    pub advantage: Option<Side>,
    /// Scoreboard label for side A (`0`, `15`, `30`, `40`, `AD` or tie-break points).
    pub call_a: String,
    /// Scoreboard label for side B.
    pub call_b: String,
}

/// Full state of a match as sent to operators and displays.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MatchSnapshot {
    /// Match identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Competition stage.
    pub stage: String,
    /// Court label, possibly empty.
    pub court: String,
    /// `scheduled`, `running`, `paused` or `finished`.
    #[schema(value_type = String, example = "running")]
    pub status: MatchStatus,
    /// Scoring rules.
    pub rules: RulesDto,
    /// Names of side A and side B.
    pub teams: Vec<String>,
    /// Side serving the current game.
    #[schema(value_type = String, example = "A")]
    pub server: Side,
    /// `0` when side A serves, `1` for side B.
    pub server_index: u8,
    /// Score line; the last entry is the set in progress.
    pub sets: Vec<SetDto>,
    /// Sets won by side A.
    pub sets_won_a: u8,
    /// Sets won by side B.
    pub sets_won_b: u8,
    /// Game in progress.
    pub current_game: GameDto,
    /// Whether the clock is running.
    pub running: bool,
    /// Playing time of every closed running interval.
    pub accumulated_ms: u64,
    /// Playing time when the snapshot was taken, pauses excluded.
    pub elapsed_ms: u64,
    /// Start of the open running interval (RFC 3339).
    pub started_at: Option<String>,
    /// Last pause (RFC 3339).
    pub paused_at: Option<String>,
    /// End of the match (RFC 3339).
    pub ended_at: Option<String>,
    /// Creation time (RFC 3339).
    pub created_at: String,
    /// Last effective mutation (RFC 3339).
    pub updated_at: String,
    /// Incremented on every effective mutation.
    pub version: u64,
}

impl MatchSnapshot {
    /// Capture `record` as seen at `now`.
    pub fn capture(record: &Match, now: SystemTime) -> Self {
        let call = record.point_call();
        Self {
            id: record.id,
            name: record.name.clone(),
            stage: record.stage.clone(),
            court: record.court.clone(),
            status: record.status,
            rules: record.rules.into(),
            teams: record.teams.iter().map(|team| team.name.clone()).collect(),
            server: record.server,
            server_index: record.server.index(),
            sets: record.sets.iter().map(SetDto::from).collect(),
            sets_won_a: record.sets_won_a,
            sets_won_b: record.sets_won_b,
            current_game: GameDto {
                points_a: record.current_game.points_a,
                points_b: record.current_game.points_b,
                advantage: record.current_game.advantage,
                call_a: call.a,
                call_b: call.b,
            },
            running: record.running,
            accumulated_ms: record.accumulated_ms,
            elapsed_ms: record.elapsed_ms(now),
            started_at: record.started_at.map(format_system_time),
            paused_at: record.paused_at.map(format_system_time),
            ended_at: record.ended_at.map(format_system_time),
            created_at: format_system_time(record.created_at),
            updated_at: format_system_time(record.updated_at),
            version: record.version,
        }
    }
}

/// Which collection(s) a listing covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ListStatus {
    /// Matches held in memory.
    #[default]
    Active,
    /// Finished matches read from storage.
    Finished,
    /// Both groups.
    All,
}

/// Query string of `GET /api/matches`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MatchListQuery {
    /// `active` (default), `finished` or `all`.
    #[param(value_type = Option<String>)]
    pub status: Option<ListStatus>,
    /// Exact stage; ignored when it is not a configured stage.
    pub stage: Option<String>,
    /// Case-insensitive text searched in the match and team names.
    pub q: Option<String>,
    /// `createdAt`, `updatedAt`, `endedAt` or `name`; prefix `-` to sort descending.
    pub sort: Option<String>,
}

/// Sortable fields of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    /// Creation time.
    CreatedAt,
    /// Last mutation.
    UpdatedAt,
    /// End of the match.
    EndedAt,
    /// Match name.
    Name,
}

/// Parsed `sort` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSort {
    /// Key to sort on.
    pub field: SortField,
    /// Reverse order.
    pub descending: bool,
}

impl Default for MatchSort {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            descending: true,
        }
    }
}

impl FromStr for MatchSort {
    type Err = std::convert::Infallible;

    /// Unknown fields fall back to `createdAt`, keeping the requested direction.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (descending, field) = match value.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, value),
        };
        let field = match field {
            "updatedAt" => SortField::UpdatedAt,
            "endedAt" => SortField::EndedAt,
            "name" => SortField::Name,
            _ => SortField::CreatedAt,
        };
        Ok(Self { field, descending })
    }
}

impl MatchSort {
    /// Compare two records according to the sort key and direction.
    pub fn compare(&self, a: &Match, b: &Match) -> Ordering {
        let ordering = match self.field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::EndedAt => a.ended_at.cmp(&b.ended_at),
            SortField::Name => a.name.cmp(&b.name),
        };
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

/// Listing grouped by collection; only the requested groups are present.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct MatchListResponse {
    /// Active matches, when requested.
    pub active: Option<Vec<MatchSnapshot>>,
    /// Finished matches, when requested.
    pub finished: Option<Vec<MatchSnapshot>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::match_record::tests::{at, new_match};

    #[test]
    fn rules_input_fills_missing_fields_with_defaults() {
        let input: RulesInput = serde_json::from_str(r#"{ "best_of_sets": 5 }"#).unwrap();
        let rules = input.into_rules();
        assert_eq!(rules.best_of_sets, 5);
        assert_eq!(rules.tie_break_at, TieBreakAt::SixAll);
        assert_eq!(rules.tie_break_points, 7);
        assert!(!rules.no_advantage);
    }

    #[test]
    fn create_request_rejects_invalid_rule_values() {
        let request: CreateMatchRequest = serde_json::from_str(
            r#"{ "team_a": "Ruiz/Paz", "rules": { "best_of_sets": 4, "tie_break_points": 0 } }"#,
        )
        .unwrap();
        let errors = request.validate().unwrap_err();
        let rules_errors = errors.errors().get("rules");
        assert!(rules_errors.is_some());
    }

    #[test]
    fn create_request_without_fields_is_valid() {
        let request: CreateMatchRequest = serde_json::from_str("{}").unwrap();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn unknown_tie_break_trigger_is_rejected_by_serde() {
        let parsed = serde_json::from_str::<CreateMatchRequest>(
            r#"{ "rules": { "tie_break_at": "4-4" } }"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn sort_parameter_parsing() {
        assert_eq!("-createdAt".parse::<MatchSort>().unwrap(), MatchSort::default());
        assert_eq!(
            "name".parse::<MatchSort>().unwrap(),
            MatchSort {
                field: SortField::Name,
                descending: false
            }
        );
        assert_eq!(
            "-bogus".parse::<MatchSort>().unwrap(),
            MatchSort {
                field: SortField::CreatedAt,
                descending: true
            }
        );
    }

    #[test]
    fn snapshot_reports_elapsed_and_point_call() {
        let mut m = new_match(Rules::default());
        m.start(at(0)).unwrap();
        m.award_point(Side::A, at(1_000)).unwrap();
        m.award_point(Side::A, at(2_000)).unwrap();
        m.award_point(Side::B, at(3_000)).unwrap();

        let snapshot = MatchSnapshot::capture(&m, at(10_000));
        assert_eq!(snapshot.elapsed_ms, 10_000);
        assert_eq!(snapshot.server_index, 0);
        assert_eq!(snapshot.current_game.call_a, "30");
        assert_eq!(snapshot.current_game.call_b, "15");
        assert!(snapshot.ended_at.is_none());

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["status"], "running");
        assert!(value.get("ended_at").is_none());
        assert!(value["current_game"].get("advantage").is_none());
    }
}

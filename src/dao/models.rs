use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::state::match_record::{
    GameScore, Match, MatchStatus, Rules, SetScore, Side, Team, TieBreak, TieBreakAt,
};

/// Scoring rules as persisted alongside the match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RulesEntity {
    /// Maximum number of sets.
    pub best_of_sets: u8,
    /// Game score that triggers a tie-break.
    pub tie_break_at: TieBreakAt,
    /// Points needed to win a tie-break.
    pub tie_break_points: u16,
    /// Golden point at 40-40.
    pub no_advantage: bool,
}

/// Games (and tie-break points) of one set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SetEntity {
    /// Games won by side A.
    pub games_a: u16,
    /// Games won by side B.
    pub games_b: u16,
    /// Whether the set is being decided by a tie-break.
    #[serde(default)]
    pub tie_break_active: bool,
    /// Tie-break points of side A.
    #[serde(default)]
    pub tie_break_points_a: u16,
    /// Tie-break points of side B.
    #[serde(default)]
    pub tie_break_points_b: u16,
}

/// Points of the game in progress.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GameScoreEntity {
    /// Points won by side A.
    pub points_a: u8,
    /// Points won by side B.
    pub points_b: u8,
    /// Side holding the advantage after deuce.
    pub advantage: Option<Side>,
}

/// Persisted snapshot of one match, active or finished.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntity {
    /// Primary key of the match.
    pub id: Uuid,
    /// Display name of the match.
    pub name: String,
    /// Tournament stage label.
    pub stage: String,
    /// Court the match is played on (may be empty).
    pub court: String,
    /// Lifecycle status.
    pub status: MatchStatus,
    /// Scoring rules fixed at creation.
    pub rules: RulesEntity,
    /// Name of side A.
    pub team_a: String,
    /// Name of side B.
    pub team_b: String,
    /// Side serving the current game.
    pub server: Side,
    /// Played sets, the last one being in progress.
    pub sets: Vec<SetEntity>,
    /// Sets won by side A.
    pub sets_won_a: u8,
    /// Sets won by side B.
    pub sets_won_b: u8,
    /// Game in progress.
    pub current_game: GameScoreEntity,
    /// Start of the open running interval, if any.
    pub started_at: Option<SystemTime>,
    /// Last time the clock was paused.
    pub paused_at: Option<SystemTime>,
    /// Playing time folded from closed running intervals.
    pub accumulated_ms: u64,
    /// Whether the clock was running when the snapshot was taken.
    pub running: bool,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last mutation timestamp.
    pub updated_at: SystemTime,
    /// End of the match, once finished.
    pub ended_at: Option<SystemTime>,
    /// Monotonic mutation counter, used to drop stale writes.
    pub version: u64,
}

impl MatchEntity {
    /// Whether the match reached its terminal status.
    pub fn is_finished(&self) -> bool {
        self.status == MatchStatus::Finished
    }
}

impl From<Rules> for RulesEntity {
    fn from(value: Rules) -> Self {
        Self {
            best_of_sets: value.best_of_sets,
            tie_break_at: value.tie_break_at,
            tie_break_points: value.tie_break_points,
            no_advantage: value.no_advantage,
        }
    }
}

impl From<RulesEntity> for Rules {
    fn from(value: RulesEntity) -> Self {
        Self {
            best_of_sets: value.best_of_sets,
            tie_break_at: value.tie_break_at,
            tie_break_points: value.tie_break_points,
            no_advantage: value.no_advantage,
        }
    }
}

impl From<SetScore> for SetEntity {
    fn from(value: SetScore) -> Self {
        Self {
            games_a: value.games_a,
            games_b: value.games_b,
            tie_break_active: value.tie_break.active,
            tie_break_points_a: value.tie_break.points_a,
            tie_break_points_b: value.tie_break.points_b,
        }
    }
}

impl From<SetEntity> for SetScore {
    fn from(value: SetEntity) -> Self {
        Self {
            games_a: value.games_a,
            games_b: value.games_b,
            tie_break: TieBreak {
                active: value.tie_break_active,
                points_a: value.tie_break_points_a,
                points_b: value.tie_break_points_b,
            },
        }
    }
}

impl From<&Match> for MatchEntity {
    fn from(value: &Match) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
            stage: value.stage.clone(),
            court: value.court.clone(),
            status: value.status,
            rules: value.rules.into(),
            team_a: value.team(Side::A).name.clone(),
            team_b: value.team(Side::B).name.clone(),
            server: value.server,
            sets: value.sets.iter().copied().map(SetEntity::from).collect(),
            sets_won_a: value.sets_won_a,
            sets_won_b: value.sets_won_b,
            current_game: GameScoreEntity {
                points_a: value.current_game.points_a,
                points_b: value.current_game.points_b,
                advantage: value.current_game.advantage,
            },
            started_at: value.started_at,
            paused_at: value.paused_at,
            accumulated_ms: value.accumulated_ms,
            running: value.running,
            created_at: value.created_at,
            updated_at: value.updated_at,
            ended_at: value.ended_at,
            version: value.version,
        }
    }
}

impl From<MatchEntity> for Match {
    fn from(value: MatchEntity) -> Self {
        let mut sets: Vec<SetScore> = value.sets.into_iter().map(SetScore::from).collect();
        if sets.is_empty() {
            sets.push(SetScore::default());
        }

        Self {
            id: value.id,
            name: value.name,
            stage: value.stage,
            court: value.court,
            status: value.status,
            rules: value.rules.into(),
            teams: [
                Team {
                    name: value.team_a,
                },
                Team {
                    name: value.team_b,
                },
            ],
            server: value.server,
            sets,
            sets_won_a: value.sets_won_a,
            sets_won_b: value.sets_won_b,
            current_game: GameScore {
                points_a: value.current_game.points_a,
                points_b: value.current_game.points_b,
                advantage: value.current_game.advantage,
            },
            started_at: value.started_at,
            paused_at: value.paused_at,
            accumulated_ms: value.accumulated_ms,
            running: value.running,
            created_at: value.created_at,
            updated_at: value.updated_at,
            ended_at: value.ended_at,
            version: value.version,
        }
    }
}

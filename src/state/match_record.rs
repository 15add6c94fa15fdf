use std::{
    fmt,
    str::FromStr,
    time::{Duration, SystemTime},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// One of the two sides of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Side {
    /// First listed side (`serverIndex` 0).
    A,
    /// Second listed side (`serverIndex` 1).
    B,
}

impl Side {
    /// The other side.
    pub fn opponent(self) -> Self {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    /// Zero-based index used by display clients (`0` for A, `1` for B).
    pub fn index(self) -> u8 {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => f.write_str("A"),
            Side::B => f.write_str("B"),
        }
    }
}

/// Raised when a side label is neither `A` nor `B`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid side `{0}`: expected `A` or `B`")]
pub struct SideParseError(pub String);

impl FromStr for Side {
    type Err = SideParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "A" => Ok(Side::A),
            "B" => Ok(Side::B),
            other => Err(SideParseError(other.to_string())),
        }
    }
}

/// Game score at which a set is decided by a tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum TieBreakAt {
    /// Standard sets: tie-break at 6-6, recorded as 7-6.
    #[default]
    #[serde(rename = "6-6")]
    SixAll,
    /// Short sets: tie-break at 5-5, recorded as 6-5.
    #[serde(rename = "5-5")]
    FiveAll,
    /// Advantage sets, played until a two-game lead.
    #[serde(rename = "none")]
    Never,
}

impl TieBreakAt {
    /// Games each side must hold for the tie-break to start.
    pub fn trigger_games(self) -> Option<u16> {
        match self {
            TieBreakAt::SixAll => Some(6),
            TieBreakAt::FiveAll => Some(5),
            TieBreakAt::Never => None,
        }
    }

    /// Frozen `(winner, loser)` game score recorded for a set decided by tie-break.
    pub fn tie_break_set_score(self) -> (u16, u16) {
        match self {
            TieBreakAt::FiveAll => (6, 5),
            TieBreakAt::SixAll | TieBreakAt::Never => (7, 6),
        }
    }
}

/// Scoring rules fixed when the match is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rules {
    /// Maximum number of sets; a side needs a majority to win.
    pub best_of_sets: u8,
    /// Game score that triggers a tie-break.
    pub tie_break_at: TieBreakAt,
    /// Points needed to win a tie-break (with a two point margin).
    pub tie_break_points: u16,
    /// Golden point at 40-40 instead of deuce/advantage.
    pub no_advantage: bool,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            best_of_sets: 3,
            tie_break_at: TieBreakAt::SixAll,
            tie_break_points: 7,
            no_advantage: false,
        }
    }
}

impl Rules {
    /// Sets a side must win to take the match.
    pub fn sets_to_win(&self) -> u8 {
        self.best_of_sets.div_ceil(2)
    }
}

/// Lifecycle status of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Created, clock never started.
    Scheduled,
    /// Clock running.
    Running,
    /// Clock stopped, match can be resumed.
    Paused,
    /// Terminal; the record is read-only.
    Finished,
}

impl MatchStatus {
    /// Whether the match still belongs to the active collection.
    pub fn is_active(self) -> bool {
        !matches!(self, MatchStatus::Finished)
    }
}

/// Tie-break counters of a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TieBreak {
    /// Whether the set is currently being decided by this tie-break.
    pub active: bool,
    /// Tie-break points won by side A.
    pub points_a: u16,
    /// Tie-break points won by side B.
    pub points_b: u16,
}

/// Games of one set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetScore {
    /// Games won by side A.
    pub games_a: u16,
    /// Games won by side B.
    pub games_b: u16,
    /// Tie-break counters, kept after the set closes.
    pub tie_break: TieBreak,
}

impl SetScore {
    pub(crate) fn games_mut(&mut self, side: Side) -> &mut u16 {
        match side {
            Side::A => &mut self.games_a,
            Side::B => &mut self.games_b,
        }
    }
}

/// Points of the game in progress (outside tie-breaks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GameScore {
    /// Points won by side A, capped at 3 once deuce is reached.
    pub points_a: u8,
    /// Points won by side B, capped at 3 once deuce is reached.
    pub points_b: u8,
    /// Side holding the advantage after deuce.
    pub advantage: Option<Side>,
}

impl GameScore {
    pub(crate) fn points_mut(&mut self, side: Side) -> &mut u8 {
        match side {
            Side::A => &mut self.points_a,
            Side::B => &mut self.points_b,
        }
    }
}

/// Display name of one side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    /// Name shown on the scoreboard.
    pub name: String,
}

/// Everything needed to open a new match.
#[derive(Debug, Clone)]
pub struct MatchSetup {
    /// Display name of the match.
    pub name: String,
    /// Name of side A.
    pub team_a: String,
    /// Name of side B.
    pub team_b: String,
    /// Scoring rules, immutable afterwards.
    pub rules: Rules,
    /// Side serving the first game.
    pub first_server: Side,
    /// Competition stage, one of the configured stages.
    pub stage: String,
    /// Court label, possibly empty.
    pub court: String,
}

/// Authoritative record of one match.
///
/// Mutated only through the lifecycle and scoring operations, which keep the
/// counters, the status and the timing fields consistent with each other.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// Unique identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Competition stage.
    pub stage: String,
    /// Court label, possibly empty.
    pub court: String,
    /// Lifecycle status.
    pub status: MatchStatus,
    /// Scoring rules chosen at creation.
    pub rules: Rules,
    /// Side A then side B.
    pub teams: [Team; 2],
    /// Side serving the current game.
    pub server: Side,
    /// Played sets; the last entry is the set in progress.
    pub sets: Vec<SetScore>,
    /// Sets won by side A.
    pub sets_won_a: u8,
    /// Sets won by side B.
    pub sets_won_b: u8,
    /// Game in progress.
    pub current_game: GameScore,
    /// Start of the open running interval.
    pub started_at: Option<SystemTime>,
    /// When the clock was last paused.
    pub paused_at: Option<SystemTime>,
    /// Playing time folded from every closed running interval.
    pub accumulated_ms: u64,
    /// Whether the clock is running.
    pub running: bool,
    /// Creation instant.
    pub created_at: SystemTime,
    /// Last effective mutation.
    pub updated_at: SystemTime,
    /// When the match finished.
    pub ended_at: Option<SystemTime>,
    /// Incremented on every effective mutation.
    pub version: u64,
}

impl Match {
    /// Open a scheduled match with one empty set and a stopped clock.
    pub fn new(setup: MatchSetup, now: SystemTime) -> Self {
        let MatchSetup {
            name,
            team_a,
            team_b,
            rules,
            first_server,
            stage,
            court,
        } = setup;

        Self {
            id: Uuid::new_v4(),
            name,
            stage,
            court,
            status: MatchStatus::Scheduled,
            rules,
            teams: [Team { name: team_a }, Team { name: team_b }],
            server: first_server,
            sets: vec![SetScore::default()],
            sets_won_a: 0,
            sets_won_b: 0,
            current_game: GameScore::default(),
            started_at: None,
            paused_at: None,
            accumulated_ms: 0,
            running: false,
            created_at: now,
            updated_at: now,
            ended_at: None,
            version: 0,
        }
    }

    /// Total playing time at `now`, excluding every paused interval.
    pub fn elapsed_ms(&self, now: SystemTime) -> u64 {
        let open = match (self.running, self.started_at) {
            (true, Some(started_at)) => millis_between(started_at, now),
            _ => 0,
        };
        self.accumulated_ms.saturating_add(open)
    }

    /// The set in progress (or the last one played on a finished match).
    pub fn current_set(&self) -> Option<&SetScore> {
        self.sets.last()
    }

    pub(crate) fn current_set_mut(&mut self) -> &mut SetScore {
        if self.sets.is_empty() {
            self.sets.push(SetScore::default());
        }
        let last = self.sets.len() - 1;
        &mut self.sets[last]
    }

    /// Whether the set in progress is being decided by a tie-break.
    pub fn tie_break_active(&self) -> bool {
        self.current_set()
            .is_some_and(|set| set.tie_break.active)
    }

    /// Team name of the given side.
    pub fn team(&self, side: Side) -> &Team {
        &self.teams[usize::from(side.index())]
    }

    pub(crate) fn sets_won_mut(&mut self, side: Side) -> &mut u8 {
        match side {
            Side::A => &mut self.sets_won_a,
            Side::B => &mut self.sets_won_b,
        }
    }

    /// Stamp an effective mutation.
    pub(crate) fn touch(&mut self, now: SystemTime) {
        self.updated_at = now;
        self.version += 1;
    }
}

/// Whole milliseconds from `from` to `to`, zero if the clock went backwards.
pub(crate) fn millis_between(from: SystemTime, to: SystemTime) -> u64 {
    let span = to.duration_since(from).unwrap_or(Duration::ZERO);
    u64::try_from(span.as_millis()).unwrap_or(u64::MAX)
}

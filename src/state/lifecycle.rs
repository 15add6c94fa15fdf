use std::time::SystemTime;

use thiserror::Error;
use uuid::Uuid;

use crate::state::match_record::{GameScore, Match, MatchStatus, millis_between};

/// Clock and lifecycle commands an operator can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    /// Start the clock of a scheduled (or paused) match.
    Start,
    /// Stop the clock, folding the running interval.
    Pause,
    /// Restart the clock after a pause.
    Resume,
    /// Close the match regardless of the score.
    Finish,
}

/// Errors raised by match mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// Finished matches are read-only.
    #[error("match `{id}` is already finished")]
    AlreadyFinished {
        /// Identifier of the finished match.
        id: Uuid,
    },
}

/// Effect of a mutation on the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Command accepted but nothing changed (e.g. starting a running match).
    Unchanged,
    /// Visible state changed.
    Changed,
    /// The match moved to `finished` during this mutation.
    Completed,
}

impl Outcome {
    /// Whether subscribers and storage need to hear about the mutation.
    pub fn is_visible(self) -> bool {
        !matches!(self, Outcome::Unchanged)
    }
}

/// Partial metadata update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New name for side A.
    pub team_a: Option<String>,
    /// New name for side B.
    pub team_b: Option<String>,
    /// New competition stage.
    pub stage: Option<String>,
    /// New court label.
    pub court: Option<String>,
}

impl MatchStatus {
    /// Status reached by applying `event`, or `None` when the event is a no-op.
    ///
    /// Finished matches never reach this point: callers reject them first.
    fn next(self, event: MatchEvent) -> Option<MatchStatus> {
        match (self, event) {
            (
                MatchStatus::Scheduled | MatchStatus::Paused,
                MatchEvent::Start | MatchEvent::Resume,
            ) => Some(MatchStatus::Running),
            (MatchStatus::Running, MatchEvent::Pause) => Some(MatchStatus::Paused),
            (MatchStatus::Finished, _) => None,
            (_, MatchEvent::Finish) => Some(MatchStatus::Finished),
            (MatchStatus::Running, MatchEvent::Start | MatchEvent::Resume)
            | (MatchStatus::Scheduled | MatchStatus::Paused, MatchEvent::Pause) => None,
        }
    }
}

impl Match {
    /// Reject mutations on finished matches.
    pub fn ensure_editable(&self) -> Result<(), MatchError> {
        if self.status == MatchStatus::Finished {
            return Err(MatchError::AlreadyFinished { id: self.id });
        }
        Ok(())
    }

    /// Apply a lifecycle command at `now`.
    pub fn apply(&mut self, event: MatchEvent, now: SystemTime) -> Result<Outcome, MatchError> {
        self.ensure_editable()?;

        let Some(next) = self.status.next(event) else {
            return Ok(Outcome::Unchanged);
        };

        match next {
            MatchStatus::Running => {
                self.running = true;
                self.status = MatchStatus::Running;
                self.started_at = Some(now);
                self.paused_at = None;
            }
            MatchStatus::Paused => {
                self.fold_running_interval(now);
                self.status = MatchStatus::Paused;
                self.paused_at = Some(now);
            }
            MatchStatus::Finished => {
                self.close(now);
                self.touch(now);
                return Ok(Outcome::Completed);
            }
            MatchStatus::Scheduled => return Ok(Outcome::Unchanged),
        }

        self.touch(now);
        Ok(Outcome::Changed)
    }

    /// Start the clock; a no-op when it already runs.
    pub fn start(&mut self, now: SystemTime) -> Result<Outcome, MatchError> {
        self.apply(MatchEvent::Start, now)
    }

    /// Stop the clock; a no-op when it is not running.
    pub fn pause(&mut self, now: SystemTime) -> Result<Outcome, MatchError> {
        self.apply(MatchEvent::Pause, now)
    }

    /// Restart the clock; same effect as [`Match::start`].
    pub fn resume(&mut self, now: SystemTime) -> Result<Outcome, MatchError> {
        self.apply(MatchEvent::Resume, now)
    }

    /// Close the match immediately whatever the score.
    pub fn finish(&mut self, now: SystemTime) -> Result<Outcome, MatchError> {
        self.apply(MatchEvent::Finish, now)
    }

    /// Rename the match or its teams, or move it to another stage or court.
    ///
    /// Blank names are ignored so a side can never end up unnamed.
    pub fn edit_meta(&mut self, update: MetaUpdate, now: SystemTime) -> Result<Outcome, MatchError> {
        self.ensure_editable()?;

        let MetaUpdate {
            name,
            team_a,
            team_b,
            stage,
            court,
        } = update;

        if let Some(name) = non_blank(name) {
            self.name = name;
        }
        if let Some(team_a) = non_blank(team_a) {
            self.teams[0].name = team_a;
        }
        if let Some(team_b) = non_blank(team_b) {
            self.teams[1].name = team_b;
        }
        if let Some(stage) = non_blank(stage) {
            self.stage = stage;
        }
        if let Some(court) = court {
            self.court = court.trim().to_string();
        }

        self.touch(now);
        Ok(Outcome::Changed)
    }

    /// Operator correction: zero the points of the game in progress.
    pub fn reset_current_game(&mut self, now: SystemTime) -> Result<Outcome, MatchError> {
        self.ensure_editable()?;
        self.current_game = GameScore::default();
        self.touch(now);
        Ok(Outcome::Changed)
    }

    /// Operator override of the serving side.
    pub fn toggle_server(&mut self, now: SystemTime) -> Result<Outcome, MatchError> {
        self.ensure_editable()?;
        self.server = self.server.opponent();
        self.touch(now);
        Ok(Outcome::Changed)
    }

    /// Move to `finished`, folding any open interval first.
    pub(crate) fn close(&mut self, now: SystemTime) {
        self.fold_running_interval(now);
        self.status = MatchStatus::Finished;
        self.paused_at = None;
        self.ended_at = Some(now);
    }

    /// Add the open running interval to `accumulated_ms` and stop the clock.
    fn fold_running_interval(&mut self, now: SystemTime) {
        if self.running {
            let started_at = self.started_at.unwrap_or(now);
            self.accumulated_ms = self
                .accumulated_ms
                .saturating_add(millis_between(started_at, now));
        }
        self.running = false;
        self.started_at = None;
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::match_record::{
        Rules, Side,
        tests::{at, new_match},
    };

    #[test]
    fn start_runs_the_clock() {
        let mut m = new_match(Rules::default());

        assert_eq!(m.start(at(1_000)).unwrap(), Outcome::Changed);
        assert_eq!(m.status, MatchStatus::Running);
        assert!(m.running);
        assert_eq!(m.started_at, Some(at(1_000)));
        assert_eq!(m.paused_at, None);
        assert_eq!(m.version, 1);
    }

    #[test]
    fn start_is_idempotent_while_running() {
        let mut m = new_match(Rules::default());
        m.start(at(1_000)).unwrap();

        assert_eq!(m.start(at(3_000)).unwrap(), Outcome::Unchanged);
        assert_eq!(m.resume(at(3_000)).unwrap(), Outcome::Unchanged);
        assert_eq!(m.started_at, Some(at(1_000)));
        assert_eq!(m.version, 1);
    }

    #[test]
    fn pause_without_running_is_a_no_op() {
        let mut m = new_match(Rules::default());

        assert_eq!(m.pause(at(2_000)).unwrap(), Outcome::Unchanged);
        assert_eq!(m.status, MatchStatus::Scheduled);
        assert_eq!(m.paused_at, None);
    }

    #[test]
    fn pause_resume_round_trip_accumulates_only_running_time() {
        let mut m = new_match(Rules::default());

        m.start(at(0)).unwrap();
        m.pause(at(5_000)).unwrap();
        assert_eq!(m.status, MatchStatus::Paused);
        assert_eq!(m.accumulated_ms, 5_000);
        assert_eq!(m.started_at, None);
        assert_eq!(m.paused_at, Some(at(5_000)));

        m.resume(at(9_000)).unwrap();
        assert_eq!(m.accumulated_ms, 5_000);
        assert_eq!(m.elapsed_ms(at(10_000)), 6_000);

        m.pause(at(11_000)).unwrap();
        assert_eq!(m.accumulated_ms, 7_000);
        assert_eq!(m.elapsed_ms(at(500_000)), 7_000);
    }

    #[test]
    fn elapsed_never_decreases_while_running() {
        let mut m = new_match(Rules::default());
        m.start(at(0)).unwrap();
        m.pause(at(2_000)).unwrap();
        m.resume(at(4_000)).unwrap();

        let mut last = 0;
        for offset in (4_000..20_000).step_by(750) {
            let elapsed = m.elapsed_ms(at(offset));
            assert!(elapsed >= last);
            last = elapsed;
        }
    }

    #[test]
    fn finish_folds_open_interval() {
        let mut m = new_match(Rules::default());
        m.start(at(0)).unwrap();

        assert_eq!(m.finish(at(42_000)).unwrap(), Outcome::Completed);
        assert_eq!(m.status, MatchStatus::Finished);
        assert!(!m.running);
        assert_eq!(m.accumulated_ms, 42_000);
        assert_eq!(m.ended_at, Some(at(42_000)));
        assert_eq!(m.started_at, None);
    }

    #[test]
    fn finish_is_allowed_before_any_point() {
        let mut m = new_match(Rules::default());

        assert_eq!(m.finish(at(10)).unwrap(), Outcome::Completed);
        assert_eq!(m.accumulated_ms, 0);
        assert_eq!(m.ended_at, Some(at(10)));
    }

    #[test]
    fn finished_match_rejects_every_mutation() {
        let mut m = new_match(Rules::default());
        m.finish(at(0)).unwrap();
        let frozen = m.clone();
        let expected = MatchError::AlreadyFinished { id: m.id };

        assert_eq!(m.start(at(1)).unwrap_err(), expected);
        assert_eq!(m.pause(at(1)).unwrap_err(), expected);
        assert_eq!(m.resume(at(1)).unwrap_err(), expected);
        assert_eq!(m.finish(at(1)).unwrap_err(), expected);
        assert_eq!(m.reset_current_game(at(1)).unwrap_err(), expected);
        assert_eq!(m.toggle_server(at(1)).unwrap_err(), expected);
        assert_eq!(
            m.edit_meta(MetaUpdate::default(), at(1)).unwrap_err(),
            expected
        );
        assert_eq!(m, frozen);
    }

    #[test]
    fn edit_meta_is_partial_and_ignores_blank_names() {
        let mut m = new_match(Rules::default());

        m.edit_meta(
            MetaUpdate {
                name: Some("  Semi 1 ".into()),
                team_a: Some("   ".into()),
                team_b: Some("Lopez/Diaz".into()),
                stage: None,
                court: Some(" ".into()),
            },
            at(5),
        )
        .unwrap();

        assert_eq!(m.name, "Semi 1");
        assert_eq!(m.team(Side::A).name, "Ruiz/Paz");
        assert_eq!(m.team(Side::B).name, "Lopez/Diaz");
        assert_eq!(m.stage, "Final");
        assert_eq!(m.court, "");
        assert_eq!(m.updated_at, at(5));
    }

    #[test]
    fn toggle_server_only_flips_the_server() {
        let mut m = new_match(Rules::default());
        m.current_game.points_a = 2;
        let before = m.clone();

        m.toggle_server(at(1)).unwrap();

        assert_eq!(m.server, Side::B);
        assert_eq!(m.current_game, before.current_game);
        assert_eq!(m.sets, before.sets);
        assert_eq!(m.status, before.status);
    }

    #[test]
    fn reset_current_game_only_clears_points() {
        let mut m = new_match(Rules::default());
        m.start(at(0)).unwrap();
        m.current_game.points_a = 3;
        m.current_game.points_b = 3;
        m.current_game.advantage = Some(Side::B);
        m.sets[0].games_a = 4;
        let before = m.clone();

        m.reset_current_game(at(1)).unwrap();

        assert_eq!(m.current_game, GameScore::default());
        assert_eq!(m.sets, before.sets);
        assert_eq!(m.server, before.server);
        assert_eq!(m.status, MatchStatus::Running);
    }
}

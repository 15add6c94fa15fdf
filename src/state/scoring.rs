//! Point, game and set progression for tennis/padel scoring.
//!
//! Every entry point takes the match and the current instant and leaves the
//! record in a consistent state: counters, server rotation, tie-break flag and
//! lifecycle status are updated together. Nothing here performs I/O.

use std::time::SystemTime;

use crate::state::{
    lifecycle::{MatchError, Outcome},
    match_record::{GameScore, Match, MatchStatus, SetScore, Side},
};

/// Points needed to close a regular game (0, 15, 30, 40, game).
const POINTS_TO_WIN_GAME: u8 = 4;
/// Points at which both sides are at 40.
const DEUCE_POINTS: u8 = 3;
/// Games a side needs, with a two game lead, to take a set without tie-break.
const GAMES_TO_WIN_SET: u16 = 6;

/// Score labels shown on the scoreboard for the game in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointCall {
    /// Label for side A.
    pub a: String,
    /// Label for side B.
    pub b: String,
}

impl Match {
    /// Award the next point to `side`.
    pub fn award_point(&mut self, side: Side, now: SystemTime) -> Result<Outcome, MatchError> {
        self.ensure_editable()?;

        if self.tie_break_active() {
            self.point_in_tie_break(side, now);
        } else {
            self.point_in_regular_game(side, now);
        }

        Ok(self.settle(now))
    }

    /// Credit a whole game to `winner`, as if its last point had just been played.
    pub fn award_game(&mut self, winner: Side, now: SystemTime) -> Result<Outcome, MatchError> {
        self.ensure_editable()?;
        self.win_game(winner, now);
        Ok(self.settle(now))
    }

    /// Credit the set in progress to `winner`.
    pub fn award_set(
        &mut self,
        winner: Side,
        via_tie_break: bool,
        now: SystemTime,
    ) -> Result<Outcome, MatchError> {
        self.ensure_editable()?;
        self.win_set(winner, via_tie_break, now);
        Ok(self.settle(now))
    }

    /// Scoreboard labels for the game in progress (`0/15/30/40/AD`, or raw
    /// tie-break points).
    pub fn point_call(&self) -> PointCall {
        if let Some(set) = self.current_set().filter(|set| set.tie_break.active) {
            return PointCall {
                a: set.tie_break.points_a.to_string(),
                b: set.tie_break.points_b.to_string(),
            };
        }

        let game = &self.current_game;
        let label = |side: Side, points: u8| match game.advantage {
            Some(leader) if leader == side => "AD".to_string(),
            _ => regular_point_label(points).to_string(),
        };

        PointCall {
            a: label(Side::A, game.points_a),
            b: label(Side::B, game.points_b),
        }
    }

    fn point_in_tie_break(&mut self, side: Side, now: SystemTime) {
        let target = self.rules.tie_break_points;
        let tie_break = &mut self.current_set_mut().tie_break;
        match side {
            Side::A => tie_break.points_a += 1,
            Side::B => tie_break.points_b += 1,
        }

        let (a, b) = (tie_break.points_a, tie_break.points_b);
        if (a >= target || b >= target) && a.abs_diff(b) >= 2 {
            let winner = if a > b { Side::A } else { Side::B };
            self.win_set(winner, true, now);
        }
    }

    fn point_in_regular_game(&mut self, side: Side, now: SystemTime) {
        if self.rules.no_advantage {
            // Golden point: 40-40 is not special, the next point reaches 4.
            *self.current_game.points_mut(side) += 1;
            let GameScore {
                points_a, points_b, ..
            } = self.current_game;
            if points_a >= POINTS_TO_WIN_GAME || points_b >= POINTS_TO_WIN_GAME {
                let winner = if points_a > points_b { Side::A } else { Side::B };
                self.win_game(winner, now);
            }
            return;
        }

        let game = &mut self.current_game;
        if game.points_a == DEUCE_POINTS && game.points_b == DEUCE_POINTS {
            let advantage = game.advantage;
            match advantage {
                None => game.advantage = Some(side),
                Some(leader) if leader == side => self.win_game(side, now),
                Some(_) => game.advantage = None,
            }
            return;
        }

        let points = game.points_mut(side);
        *points += 1;
        if *points >= POINTS_TO_WIN_GAME {
            self.win_game(side, now);
        }
    }

    fn win_game(&mut self, winner: Side, now: SystemTime) {
        self.current_game = GameScore::default();
        self.server = self.server.opponent();

        let trigger = self.rules.tie_break_at.trigger_games();
        let set = self.current_set_mut();
        *set.games_mut(winner) += 1;

        if !set.tie_break.active
            && trigger.is_some_and(|games| set.games_a == games && set.games_b == games)
        {
            set.tie_break.active = true;
            set.tie_break.points_a = 0;
            set.tie_break.points_b = 0;
        }

        if set.tie_break.active {
            return;
        }

        let (a, b) = (set.games_a, set.games_b);
        if (a >= GAMES_TO_WIN_SET || b >= GAMES_TO_WIN_SET) && a.abs_diff(b) >= 2 {
            let leader = if a > b { Side::A } else { Side::B };
            self.win_set(leader, false, now);
        }
    }

    fn win_set(&mut self, winner: Side, via_tie_break: bool, now: SystemTime) {
        *self.sets_won_mut(winner) += 1;

        if via_tie_break {
            let (winner_games, loser_games) = self.rules.tie_break_at.tie_break_set_score();
            let set = self.current_set_mut();
            *set.games_mut(winner) = winner_games;
            *set.games_mut(winner.opponent()) = loser_games;
            set.tie_break.active = false;
        }

        let sets_to_win = self.rules.sets_to_win();
        if self.sets_won_a >= sets_to_win || self.sets_won_b >= sets_to_win {
            self.close(now);
            return;
        }

        self.sets.push(SetScore::default());
        self.server = self.server.opponent();
    }

    /// Stamp the mutation and report whether it completed the match.
    fn settle(&mut self, now: SystemTime) -> Outcome {
        self.touch(now);
        if self.status == MatchStatus::Finished {
            Outcome::Completed
        } else {
            Outcome::Changed
        }
    }
}

fn regular_point_label(points: u8) -> &'static str {
    match points {
        0 => "0",
        1 => "15",
        2 => "30",
        _ => "40",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::match_record::{
        Rules, TieBreakAt, TieBreak,
        tests::{at, new_match},
    };

    fn points(m: &mut Match, sequence: &str) {
        for label in sequence.chars() {
            let side = label.to_string().parse::<Side>().expect("side label");
            m.award_point(side, at(0)).expect("match accepts points");
        }
    }

    fn hold_game(m: &mut Match, side: Side) {
        let mut guard = 0;
        let games_before = games_won(m, side);
        let sets_before = m.sets.len();
        while games_won(m, side) == games_before && m.sets.len() == sets_before {
            m.award_point(side, at(0)).expect("match accepts points");
            guard += 1;
            assert!(guard < 16, "game never ended");
            if m.status == MatchStatus::Finished {
                break;
            }
        }
    }

    fn games_won(m: &Match, side: Side) -> u16 {
        let set = m.current_set().expect("current set");
        match side {
            Side::A => set.games_a,
            Side::B => set.games_b,
        }
    }

    /// Play games alternately until the current set reaches `games`-`games`.
    fn reach_all(m: &mut Match, games: u16) {
        for _ in 0..games {
            hold_game(m, Side::A);
            hold_game(m, Side::B);
        }
    }

    #[test]
    fn regular_points_count_up_to_forty() {
        let mut m = new_match(Rules::default());
        points(&mut m, "AAB");

        assert_eq!(m.current_game.points_a, 2);
        assert_eq!(m.current_game.points_b, 1);
        assert_eq!(
            m.point_call(),
            PointCall {
                a: "30".into(),
                b: "15".into()
            }
        );
    }

    #[test]
    fn four_straight_points_win_the_game() {
        let mut m = new_match(Rules::default());
        points(&mut m, "AAAA");

        assert_eq!(m.sets[0].games_a, 1);
        assert_eq!(m.current_game, GameScore::default());
        assert_eq!(m.server, Side::B);
    }

    #[test]
    fn golden_point_decides_at_forty_all() {
        let mut m = new_match(Rules {
            no_advantage: true,
            ..Rules::default()
        });

        points(&mut m, "ABABAB");
        assert_eq!((m.current_game.points_a, m.current_game.points_b), (3, 3));
        assert_eq!(m.current_game.advantage, None);

        points(&mut m, "A");
        assert_eq!(m.sets[0].games_a, 1);
        assert_eq!(m.sets[0].games_b, 0);
        assert_eq!(m.current_game, GameScore::default());
    }

    #[test]
    fn golden_point_can_go_to_the_receiver() {
        let mut m = new_match(Rules {
            no_advantage: true,
            ..Rules::default()
        });

        points(&mut m, "AAABBBB");
        assert_eq!(m.sets[0].games_b, 1);
        assert_eq!(m.sets[0].games_a, 0);
    }

    #[test]
    fn deuce_alternating_points_never_end_the_game() {
        let mut m = new_match(Rules::default());
        points(&mut m, "ABABAB");

        for _ in 0..10 {
            points(&mut m, "AB");
            assert_eq!((m.current_game.points_a, m.current_game.points_b), (3, 3));
            assert_eq!(m.current_game.advantage, None);
            assert_eq!(m.sets[0].games_a + m.sets[0].games_b, 0);
        }
    }

    #[test]
    fn advantage_then_same_side_wins_the_game() {
        let mut m = new_match(Rules::default());
        points(&mut m, "ABABAB");

        points(&mut m, "A");
        assert_eq!(m.current_game.advantage, Some(Side::A));
        assert_eq!(
            m.point_call(),
            PointCall {
                a: "AD".into(),
                b: "40".into()
            }
        );

        points(&mut m, "A");
        assert_eq!(m.sets[0].games_a, 1);
        assert_eq!(m.current_game, GameScore::default());
    }

    #[test]
    fn advantage_lost_returns_to_deuce() {
        let mut m = new_match(Rules::default());
        points(&mut m, "ABABABB");
        assert_eq!(m.current_game.advantage, Some(Side::B));

        points(&mut m, "A");
        assert_eq!(m.current_game.advantage, None);
        assert_eq!((m.current_game.points_a, m.current_game.points_b), (3, 3));
    }

    #[test]
    fn server_flips_after_every_game() {
        let mut m = new_match(Rules::default());
        assert_eq!(m.server, Side::A);
        hold_game(&mut m, Side::A);
        assert_eq!(m.server, Side::B);
        hold_game(&mut m, Side::A);
        assert_eq!(m.server, Side::A);
    }

    #[test]
    fn set_needs_six_games_and_two_game_lead() {
        let mut m = new_match(Rules {
            tie_break_at: TieBreakAt::Never,
            ..Rules::default()
        });

        reach_all(&mut m, 5);
        hold_game(&mut m, Side::A);
        assert_eq!((m.sets[0].games_a, m.sets[0].games_b), (6, 5));
        assert_eq!(m.sets_won_a, 0);

        hold_game(&mut m, Side::A);
        assert_eq!((m.sets[0].games_a, m.sets[0].games_b), (7, 5));
        assert_eq!(m.sets_won_a, 1);
        assert_eq!(m.sets.len(), 2);
    }

    #[test]
    fn six_love_takes_the_set() {
        let mut m = new_match(Rules::default());
        for _ in 0..6 {
            hold_game(&mut m, Side::B);
        }

        assert_eq!(m.sets_won_b, 1);
        assert_eq!((m.sets[0].games_a, m.sets[0].games_b), (0, 6));
        assert_eq!(m.sets[1], SetScore::default());
    }

    #[test]
    fn tie_break_activates_exactly_at_six_all() {
        let mut m = new_match(Rules::default());

        reach_all(&mut m, 5);
        assert!(!m.tie_break_active());
        hold_game(&mut m, Side::A);
        assert!(!m.tie_break_active());
        hold_game(&mut m, Side::B);

        assert_eq!((m.sets[0].games_a, m.sets[0].games_b), (6, 6));
        assert!(m.tie_break_active());
        assert_eq!(
            m.sets[0].tie_break,
            TieBreak {
                active: true,
                points_a: 0,
                points_b: 0
            }
        );
    }

    #[test]
    fn tie_break_activates_at_five_all_for_short_sets() {
        let mut m = new_match(Rules {
            tie_break_at: TieBreakAt::FiveAll,
            ..Rules::default()
        });

        reach_all(&mut m, 4);
        assert!(!m.tie_break_active());
        reach_all(&mut m, 1);

        assert_eq!((m.sets[0].games_a, m.sets[0].games_b), (5, 5));
        assert!(m.tie_break_active());
    }

    #[test]
    fn no_tie_break_when_disabled() {
        let mut m = new_match(Rules {
            tie_break_at: TieBreakAt::Never,
            ..Rules::default()
        });

        reach_all(&mut m, 8);
        assert_eq!((m.sets[0].games_a, m.sets[0].games_b), (8, 8));
        assert!(!m.tie_break_active());
    }

    #[test]
    fn advantage_set_game_count_is_unbounded() {
        let mut m = new_match(Rules {
            tie_break_at: TieBreakAt::Never,
            ..Rules::default()
        });

        reach_all(&mut m, 300);
        assert_eq!((m.sets[0].games_a, m.sets[0].games_b), (300, 300));
        assert_eq!(m.sets_won_a + m.sets_won_b, 0);

        hold_game(&mut m, Side::B);
        hold_game(&mut m, Side::B);
        assert_eq!((m.sets[0].games_a, m.sets[0].games_b), (300, 302));
        assert_eq!(m.sets_won_b, 1);
        assert_eq!(m.sets.len(), 2);
    }

    #[test]
    fn tie_break_points_score_outside_the_regular_game() {
        let mut m = new_match(Rules::default());
        reach_all(&mut m, 6);

        points(&mut m, "AAB");
        assert_eq!(m.sets[0].tie_break.points_a, 2);
        assert_eq!(m.sets[0].tie_break.points_b, 1);
        assert_eq!(m.current_game, GameScore::default());
        assert_eq!(
            m.point_call(),
            PointCall {
                a: "2".into(),
                b: "1".into()
            }
        );
    }

    #[test]
    fn tie_break_needs_two_point_margin() {
        let mut m = new_match(Rules::default());
        reach_all(&mut m, 6);

        points(&mut m, "ABABABABABAB");
        points(&mut m, "A");
        assert!(m.tie_break_active());
        assert_eq!(m.sets_won_a, 0);

        points(&mut m, "A");
        assert!(!m.tie_break_active());
        assert_eq!(m.sets_won_a, 1);
        assert_eq!((m.sets[0].games_a, m.sets[0].games_b), (7, 6));
    }

    #[test]
    fn tie_break_win_at_six_all_is_recorded_seven_six() {
        let mut m = new_match(Rules::default());
        reach_all(&mut m, 6);
        let server_at_tie_break = m.server;

        // 7-5 for A.
        points(&mut m, "ABABABABAB");
        points(&mut m, "AA");

        assert_eq!(m.sets[0].games_a, 7);
        assert_eq!(m.sets[0].games_b, 6);
        assert!(!m.sets[0].tie_break.active);
        assert_eq!(m.sets[0].tie_break.points_a, 7);
        assert_eq!(m.sets[0].tie_break.points_b, 5);
        assert_eq!(m.sets_won_a, 1);
        assert_eq!(m.sets.len(), 2);
        assert_eq!(m.sets[1], SetScore::default());
        assert_eq!(m.server, server_at_tie_break.opponent());
        assert_eq!(m.status, MatchStatus::Scheduled);
    }

    #[test]
    fn tie_break_server_rotation_over_a_full_set() {
        let mut m = new_match(Rules::default());
        let server_at_set_start = m.server;

        reach_all(&mut m, 6);
        // Twelve games flip the server an even number of times.
        assert_eq!(m.server, server_at_set_start);

        points(&mut m, "AAAAAAA");
        assert_eq!(m.sets_won_a, 1);
        assert_eq!(m.server, server_at_set_start.opponent());
    }

    #[test]
    fn tie_break_win_at_five_all_is_recorded_six_five() {
        let mut m = new_match(Rules {
            tie_break_at: TieBreakAt::FiveAll,
            ..Rules::default()
        });
        reach_all(&mut m, 5);

        points(&mut m, "BBBBBBB");

        assert_eq!((m.sets[0].games_a, m.sets[0].games_b), (5, 6));
        assert_eq!(m.sets_won_b, 1);
    }

    #[test]
    fn custom_tie_break_target() {
        let mut m = new_match(Rules {
            tie_break_points: 10,
            ..Rules::default()
        });
        reach_all(&mut m, 6);

        points(&mut m, "AAAAAAAAA");
        assert!(m.tie_break_active());
        points(&mut m, "A");
        assert_eq!(m.sets_won_a, 1);
    }

    #[test]
    fn best_of_three_finishes_after_two_sets() {
        let mut m = new_match(Rules::default());
        m.start(at(0)).unwrap();

        for _ in 0..6 {
            hold_game(&mut m, Side::A);
        }
        assert_eq!(m.status, MatchStatus::Running);

        for _ in 0..5 {
            hold_game(&mut m, Side::A);
        }
        let outcome = m.award_point(Side::A, at(0)).unwrap();
        assert_eq!(outcome, Outcome::Changed);
        points(&mut m, "AA");
        let outcome = m.award_point(Side::A, at(90_000)).unwrap();

        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(m.status, MatchStatus::Finished);
        assert!(!m.running);
        assert_eq!(m.sets_won_a, 2);
        assert_eq!(m.sets.len(), 2);
        assert_eq!(m.accumulated_ms, 90_000);
        assert_eq!(m.ended_at, Some(at(90_000)));
    }

    #[test]
    fn finished_match_ignores_further_points() {
        let mut m = new_match(Rules {
            best_of_sets: 1,
            ..Rules::default()
        });
        for _ in 0..6 {
            hold_game(&mut m, Side::B);
        }
        assert_eq!(m.status, MatchStatus::Finished);
        let frozen = m.clone();

        assert_eq!(
            m.award_point(Side::A, at(1)).unwrap_err(),
            MatchError::AlreadyFinished { id: m.id }
        );
        assert_eq!(m, frozen);
        assert_eq!(m.sets.len(), 1);
    }

    #[test]
    fn set_count_never_exceeds_best_of() {
        let mut m = new_match(Rules {
            best_of_sets: 5,
            ..Rules::default()
        });
        let mut leader = Side::A;
        while m.status != MatchStatus::Finished {
            for _ in 0..6 {
                hold_game(&mut m, leader);
            }
            leader = leader.opponent();
        }

        assert_eq!(m.sets_won_a + m.sets_won_b, 5);
        assert_eq!(m.sets_won_a, 3);
        assert_eq!(m.sets.len(), 5);
    }

    #[test]
    fn award_game_and_set_are_guarded_and_stamped() {
        let mut m = new_match(Rules {
            best_of_sets: 1,
            ..Rules::default()
        });

        assert_eq!(m.award_game(Side::A, at(3)).unwrap(), Outcome::Changed);
        assert_eq!(m.sets[0].games_a, 1);
        assert_eq!(m.updated_at, at(3));

        assert_eq!(
            m.award_set(Side::B, false, at(4)).unwrap(),
            Outcome::Completed
        );
        assert_eq!(m.sets_won_b, 1);
        assert!(m.award_game(Side::A, at(5)).is_err());
    }
}

//! Interactive schedule editing.
//!
//! A [`ScheduleSession`] owns one [`Schedule`] of a shared [`Season`] and
//! applies single edits to it. Every accepted edit is followed by one
//! feasibility evaluation, so [`ScheduleSession::report`] always describes
//! the current state. A refused edit returns a [`MutationError`] and leaves
//! both the schedule and the report untouched.
//!
//! Edits that break a soft rule (a rematch inside the gap, a weekly quota
//! over its maximum) are accepted; the report carries the violation.
//! Edits the schedule itself cannot represent (double bookings, locked
//! weeks, full bye slots) are refused.
//!
//! [`step`] is the same transition as a pure function, for hosts that keep
//! their own history.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use league_schedule::models::{
//!     League, LeagueRules, Matchup, MatchupCategory, MatchupId, Season, TeamId, Week,
//! };
//! use league_schedule::session::ScheduleSession;
//!
//! let matchups = vec![Matchup::new(0, TeamId(0), TeamId(1), MatchupCategory::InGroup)];
//! let season = Season::new(2026, League::uniform(2, 1, 1), LeagueRules::default(), matchups);
//! let mut session = ScheduleSession::new(Arc::new(season));
//! session.place_game(MatchupId(0), Week(1)).unwrap();
//! assert!(session.unscheduled().is_empty());
//! ```

use std::fmt;
use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{MutationError, ScheduleError};
use crate::feasibility::{ConstraintReport, Pipeline};
use crate::models::{Blocker, GameId, MatchupId, Occupancy, Schedule, Season, TeamId, Week};
use crate::solver::{solve, CancelToken, SolveReport, SolverConfig};
use crate::stats::ScheduleStats;

/// One edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    PlaceGame { matchup: MatchupId, week: Week },
    RemoveGame { game: GameId },
    AssignBye { team: TeamId, week: Week },
    RemoveBye { team: TeamId, week: Week },
    /// Closes every week before `week`.
    AdvanceFrontier { week: Week },
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::PlaceGame { matchup, week } => write!(f, "place {matchup} in {week}"),
            Mutation::RemoveGame { game } => write!(f, "remove {game}"),
            Mutation::AssignBye { team, week } => write!(f, "bye for {team} in {week}"),
            Mutation::RemoveBye { team, week } => write!(f, "drop bye of {team} in {week}"),
            Mutation::AdvanceFrontier { week } => write!(f, "advance frontier to {week}"),
        }
    }
}

/// Applies one edit to a copy of `schedule` and evaluates the result.
pub fn step(
    season: &Season,
    pipeline: &Pipeline,
    schedule: &Schedule,
    mutation: &Mutation,
) -> Result<(Schedule, ConstraintReport), MutationError> {
    let mut next = schedule.clone();
    apply(season, &mut next, mutation)?;
    let report = pipeline.evaluate(season, &next);
    Ok((next, report))
}

fn apply(
    season: &Season,
    schedule: &mut Schedule,
    mutation: &Mutation,
) -> Result<(), MutationError> {
    match *mutation {
        Mutation::PlaceGame { matchup, week } => {
            let m = season
                .matchup(matchup)
                .ok_or(MutationError::UnknownMatchup(matchup))?;
            open_week(season, schedule, week)?;
            if let Some(game) = schedule.game_for_matchup(matchup) {
                return Err(MutationError::MatchupAlreadyScheduled {
                    matchup,
                    week: game.week,
                });
            }
            let occ = Occupancy::from_schedule(season, schedule);
            for team in m.teams() {
                if !occ.is_free(team, week) {
                    return Err(MutationError::TeamUnavailable { team, week });
                }
            }
            schedule.add_game(matchup, week);
        }
        Mutation::RemoveGame { game } => {
            let week = schedule
                .game(game)
                .map(|g| g.week)
                .ok_or(MutationError::UnknownGame(game))?;
            open_week(season, schedule, week)?;
            schedule.remove_game(game);
        }
        Mutation::AssignBye { team, week } => {
            if season.team_index(team).is_none() {
                return Err(MutationError::UnknownTeam(team));
            }
            open_week(season, schedule, week)?;
            let occ = Occupancy::from_schedule(season, schedule);
            occ.can_bye(team, week).map_err(|blocker| match blocker {
                Blocker::ByeOutsideWindow(week) => MutationError::ByeOutsideWindow { team, week },
                Blocker::ByeSlotsFull(week) => MutationError::ByeSlotsFull(week),
                Blocker::ByeQuotaReached(team) => MutationError::ByeQuotaExceeded(team),
                Blocker::WeekOutOfRange(week) => MutationError::WeekOutOfRange(week),
                Blocker::UnknownTeam(team) => MutationError::UnknownTeam(team),
                _ => MutationError::TeamUnavailable { team, week },
            })?;
            schedule.add_bye(team, week);
        }
        Mutation::RemoveBye { team, week } => {
            if season.team_index(team).is_none() {
                return Err(MutationError::UnknownTeam(team));
            }
            open_week(season, schedule, week)?;
            if !schedule.remove_bye(team, week) {
                return Err(MutationError::ByeNotFound { team, week });
            }
        }
        Mutation::AdvanceFrontier { week } => {
            // One past the last week closes the whole season.
            if week.0 == 0 || week.0 > season.rules.weeks.saturating_add(1) {
                return Err(MutationError::WeekOutOfRange(week));
            }
            if week < schedule.frontier {
                return Err(MutationError::WeekLocked(week));
            }
            schedule.frontier = week;
        }
    }
    Ok(())
}

fn open_week(season: &Season, schedule: &Schedule, week: Week) -> Result<(), MutationError> {
    if !season.contains_week(week) {
        return Err(MutationError::WeekOutOfRange(week));
    }
    if schedule.is_closed(week) {
        return Err(MutationError::WeekLocked(week));
    }
    Ok(())
}

/// Single-owner editing session.
///
/// Multi-threaded hosts wrap the session in a mutex; the season is shared
/// read-only.
#[derive(Debug, Clone)]
pub struct ScheduleSession {
    season: Arc<Season>,
    pipeline: Pipeline,
    schedule: Schedule,
    report: ConstraintReport,
}

impl ScheduleSession {
    /// A session over an empty schedule.
    pub fn new(season: Arc<Season>) -> Self {
        Self::with_schedule(season, Schedule::new())
    }

    /// A session resuming an existing schedule.
    pub fn with_schedule(season: Arc<Season>, schedule: Schedule) -> Self {
        let pipeline = Pipeline::new();
        let report = pipeline.evaluate(&season, &schedule);
        Self {
            season,
            pipeline,
            schedule,
            report,
        }
    }

    /// Replaces the pipeline and re-evaluates.
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.report = pipeline.evaluate(&self.season, &self.schedule);
        self.pipeline = pipeline;
        self
    }

    pub fn season(&self) -> &Arc<Season> {
        &self.season
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Report of the current schedule.
    pub fn report(&self) -> &ConstraintReport {
        &self.report
    }

    /// Matchups not yet bound to a week.
    pub fn unscheduled(&self) -> Vec<MatchupId> {
        self.season.unscheduled(&self.schedule)
    }

    pub fn stats(&self) -> ScheduleStats {
        ScheduleStats::calculate(&self.season, &self.schedule)
    }

    /// Applies one edit and re-evaluates.
    pub fn apply(&mut self, mutation: Mutation) -> Result<&ConstraintReport, MutationError> {
        match step(&self.season, &self.pipeline, &self.schedule, &mutation) {
            Ok((schedule, report)) => {
                debug!("session: {mutation}, worst status {}", report.worst());
                self.schedule = schedule;
                self.report = report;
                Ok(&self.report)
            }
            Err(e) => {
                debug!("session: refused to {mutation}: {e}");
                Err(e)
            }
        }
    }

    pub fn place_game(
        &mut self,
        matchup: MatchupId,
        week: Week,
    ) -> Result<&ConstraintReport, MutationError> {
        self.apply(Mutation::PlaceGame { matchup, week })
    }

    pub fn remove_game(&mut self, game: GameId) -> Result<&ConstraintReport, MutationError> {
        self.apply(Mutation::RemoveGame { game })
    }

    pub fn assign_bye(
        &mut self,
        team: TeamId,
        week: Week,
    ) -> Result<&ConstraintReport, MutationError> {
        self.apply(Mutation::AssignBye { team, week })
    }

    pub fn remove_bye(
        &mut self,
        team: TeamId,
        week: Week,
    ) -> Result<&ConstraintReport, MutationError> {
        self.apply(Mutation::RemoveBye { team, week })
    }

    pub fn advance_frontier(&mut self, week: Week) -> Result<&ConstraintReport, MutationError> {
        self.apply(Mutation::AdvanceFrontier { week })
    }

    /// Solves the rest of the season around the current games.
    ///
    /// On success the schedule and report are replaced together; on failure
    /// or cancellation the session is unchanged.
    pub fn regenerate(
        &mut self,
        config: &SolverConfig,
        cancel: &CancelToken,
    ) -> Result<SolveReport, ScheduleError> {
        let (schedule, solve_report) = solve(&self.season, &self.schedule, config, cancel)?;
        info!(
            "session: regenerated {} games with {}",
            schedule.game_count(),
            solve_report.strategy
        );
        self.report = self.pipeline.evaluate(&self.season, &schedule);
        self.schedule = schedule;
        Ok(solve_report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feasibility::{Dimension, Status, Subject};
    use crate::models::{League, LeagueRules, Matchup, MatchupCategory, WeekRange};

    /// Four teams, single round robin over four weeks, one bye each.
    fn round_robin() -> Arc<Season> {
        let league = League::uniform(2, 1, 2);
        let rules = LeagueRules::default()
            .with_weeks(4)
            .with_games_per_team(3)
            .with_bye_window(2, 4)
            .with_max_byes_per_week(2)
            .with_min_rematch_gap(2);
        let t = TeamId;
        let pairs = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
        let matchups = pairs
            .iter()
            .enumerate()
            .map(|(i, &(h, a))| Matchup::new(i as u16, t(h), t(a), MatchupCategory::FarCross))
            .collect();
        Arc::new(Season::new(2026, league, rules, matchups))
    }

    #[test]
    fn test_remove_game_restores_matchup() {
        let mut session = ScheduleSession::new(round_robin());
        let initial = session.report().clone();

        let placed = session.place_game(MatchupId(0), Week(1)).unwrap();
        let capacity = placed.entry(Dimension::GameCapacity, Subject::League).unwrap();
        assert_eq!(capacity.evidence.demand, 5);
        assert!(!session.unscheduled().contains(&MatchupId(0)));

        let game = session.schedule().games[0].id;
        session.remove_game(game).unwrap();
        assert!(session.unscheduled().contains(&MatchupId(0)));
        assert_eq!(session.report(), &initial);
    }

    #[test]
    fn test_double_booking_is_refused() {
        let mut session = ScheduleSession::new(round_robin());
        session.place_game(MatchupId(0), Week(1)).unwrap();
        let before = session.schedule().clone();

        let err = session.place_game(MatchupId(1), Week(1)).unwrap_err();
        assert_eq!(
            err,
            MutationError::TeamUnavailable {
                team: TeamId(0),
                week: Week(1)
            }
        );
        assert_eq!(session.schedule(), &before);

        let err = session.place_game(MatchupId(0), Week(2)).unwrap_err();
        assert_eq!(
            err,
            MutationError::MatchupAlreadyScheduled {
                matchup: MatchupId(0),
                week: Week(1)
            }
        );
    }

    #[test]
    fn test_locked_and_out_of_range_weeks() {
        let season = round_robin();
        let schedule = Schedule::new().with_fixed_week(Week(2));
        let mut session = ScheduleSession::with_schedule(season, schedule);
        assert_eq!(
            session.place_game(MatchupId(0), Week(2)).unwrap_err(),
            MutationError::WeekLocked(Week(2))
        );
        assert_eq!(
            session.place_game(MatchupId(0), Week(5)).unwrap_err(),
            MutationError::WeekOutOfRange(Week(5))
        );
        assert_eq!(
            session.place_game(MatchupId(9), Week(1)).unwrap_err(),
            MutationError::UnknownMatchup(MatchupId(9))
        );
    }

    #[test]
    fn test_frontier_closes_earlier_weeks() {
        let mut session = ScheduleSession::new(round_robin());
        session.place_game(MatchupId(0), Week(1)).unwrap();
        session.advance_frontier(Week(2)).unwrap();

        let game = session.schedule().games[0].id;
        assert_eq!(
            session.remove_game(game).unwrap_err(),
            MutationError::WeekLocked(Week(1))
        );
        assert_eq!(
            session.advance_frontier(Week(1)).unwrap_err(),
            MutationError::WeekLocked(Week(1))
        );
        // T2 and T3 sat out week 1, which is outside the bye window.
        let t2 = session
            .report()
            .entry(Dimension::TeamByes, Subject::Team(TeamId(2)))
            .unwrap();
        assert_eq!(t2.status, Status::Violated);
    }

    #[test]
    fn test_bye_rules() {
        let mut session = ScheduleSession::new(round_robin());
        assert_eq!(
            session.assign_bye(TeamId(0), Week(1)).unwrap_err(),
            MutationError::ByeOutsideWindow {
                team: TeamId(0),
                week: Week(1)
            }
        );
        session.assign_bye(TeamId(0), Week(2)).unwrap();
        assert_eq!(
            session.assign_bye(TeamId(0), Week(3)).unwrap_err(),
            MutationError::ByeQuotaExceeded(TeamId(0))
        );
        session.assign_bye(TeamId(1), Week(2)).unwrap();
        assert_eq!(
            session.assign_bye(TeamId(2), Week(2)).unwrap_err(),
            MutationError::ByeSlotsFull(Week(2))
        );
        assert_eq!(
            session.assign_bye(TeamId(7), Week(2)).unwrap_err(),
            MutationError::UnknownTeam(TeamId(7))
        );

        session.remove_bye(TeamId(0), Week(2)).unwrap();
        assert_eq!(
            session.remove_bye(TeamId(0), Week(2)).unwrap_err(),
            MutationError::ByeNotFound {
                team: TeamId(0),
                week: Week(2)
            }
        );
    }

    #[test]
    fn test_soft_rules_are_reported_not_refused() {
        let league = League::uniform(2, 1, 1);
        let rules = LeagueRules::default()
            .with_weeks(4)
            .with_games_per_team(2)
            .with_bye_window(1, 4)
            .with_min_rematch_gap(3);
        let matchups = vec![
            Matchup::new(0, TeamId(0), TeamId(1), MatchupCategory::InGroup),
            Matchup::new(1, TeamId(1), TeamId(0), MatchupCategory::InGroup),
        ];
        let season = Arc::new(Season::new(2026, league, rules, matchups));
        let mut session = ScheduleSession::new(season);
        session.place_game(MatchupId(0), Week(1)).unwrap();
        let report = session.place_game(MatchupId(1), Week(2)).unwrap();
        let gap = report
            .entry(Dimension::RematchGap, Subject::Pair(TeamId(0), TeamId(1)))
            .unwrap();
        assert_eq!(gap.status, Status::Violated);
    }

    #[test]
    fn test_step_leaves_input_untouched() {
        let season = round_robin();
        let schedule = Schedule::new();
        let (next, report) = step(
            &season,
            &Pipeline::new(),
            &schedule,
            &Mutation::PlaceGame {
                matchup: MatchupId(5),
                week: Week(1),
            },
        )
        .unwrap();
        assert_eq!(schedule.game_count(), 0);
        assert_eq!(next.game_count(), 1);
        assert_eq!(report, Pipeline::new().evaluate(&season, &next));
    }

    #[test]
    fn test_regenerate_replaces_schedule() {
        let mut season = (*round_robin()).clone();
        season.rules.bye_window = WeekRange::new(1, 4);
        let mut session = ScheduleSession::new(Arc::new(season));
        let report = session
            .regenerate(&SolverConfig::default(), &CancelToken::new())
            .unwrap();
        assert!(!report.attempts.is_empty());
        assert_eq!(session.schedule().game_count(), 6);
        assert!(session.unscheduled().is_empty());
        assert!(session.report().is_feasible());
    }

    #[test]
    fn test_cancelled_regenerate_keeps_session() {
        let mut session = ScheduleSession::new(round_robin());
        session.place_game(MatchupId(0), Week(1)).unwrap();
        let before = session.schedule().clone();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = session
            .regenerate(&SolverConfig::default(), &cancel)
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Cancelled));
        assert_eq!(session.schedule(), &before);
    }

    #[test]
    fn test_schedule_json_round_trip() {
        let mut session = ScheduleSession::new(round_robin());
        session.place_game(MatchupId(0), Week(1)).unwrap();
        session.assign_bye(TeamId(2), Week(2)).unwrap();
        session.advance_frontier(Week(2)).unwrap();

        let json = session.schedule().to_json().unwrap();
        let restored = Schedule::from_json(&json).unwrap();
        assert_eq!(&restored, session.schedule());

        let resumed = ScheduleSession::with_schedule(session.season().clone(), restored);
        assert_eq!(resumed.report(), session.report());
    }

    #[test]
    fn test_mutation_display() {
        let m = Mutation::PlaceGame {
            matchup: MatchupId(3),
            week: Week(7),
        };
        assert_eq!(m.to_string(), "place M3 in week 7");
    }
}

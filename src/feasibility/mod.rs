//! Incremental feasibility pipeline.
//!
//! Evaluates a partial schedule against the remaining matchup pool and
//! reports, per (dimension, subject), whether the season can still be
//! completed. The evaluation is a pure function of the [`Season`] and the
//! [`Schedule`]; running it twice on the same state yields the same report.
//!
//! Stages run cheapest first:
//!
//! | Stage | Checks | Cost |
//! |-------|--------|------|
//! | [`Stage::Bounds`] | game capacity, bye accounting, bye supply, weekly quotas, home/away balance | O(teams × weeks) |
//! | [`Stage::Pairing`] | a maximum matching of required teams in each of the next open weeks | O(lookahead × teams³) |
//! | [`Stage::Forecast`] | rematch windows, rematch gaps, per-group capacity, bye assignment | O(pairs × weeks + teams² × weeks) |
//!
//! League and group aggregates are always reported; team, pair, week and
//! quota entries appear only when they are tight or violated.
//!
//! # Usage
//!
//! ```
//! use league_schedule::feasibility::{Dimension, Pipeline, Status};
//! use league_schedule::models::{League, LeagueRules, Schedule, Season};
//!
//! let season = Season::new(2026, League::uniform(2, 1, 2), LeagueRules::default(), Vec::new());
//! let report = Pipeline::new().evaluate(&season, &Schedule::new());
//! assert_eq!(report.status(Dimension::GameCapacity), Status::Healthy);
//! ```

mod bounds;
mod forecast;
mod matching;
mod pairing;
mod report;

pub use matching::{max_matching, Matching};
pub use report::{
    ConstraintReport, Dimension, Evidence, Narrator, PlainNarrator, ReportEntry, Stage, Status,
    Subject,
};

use std::collections::BTreeMap;

use log::debug;

use crate::models::{Cascade, FeasibilityConfig, Matchup, Occupancy, Schedule, Season, TeamId, Week};
use crate::solver::rest_owed;

/// Runs the feasibility stages.
///
/// Thresholds come from the season's rules unless overridden with
/// [`with_config`](Self::with_config).
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: Option<FeasibilityConfig>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the season's thresholds.
    pub fn with_config(mut self, config: FeasibilityConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Evaluates `schedule` against the rest of the season.
    pub fn evaluate(&self, season: &Season, schedule: &Schedule) -> ConstraintReport {
        let config = self
            .config
            .clone()
            .unwrap_or_else(|| season.rules.feasibility.clone());
        let ctx = Context::new(season, schedule, config);

        let mut entries: Vec<ReportEntry> = Vec::new();
        let mut stages_run = Vec::new();
        let mut suppressed = Vec::new();
        for stage in Stage::ALL {
            let violated = entries.iter().any(|e| e.status == Status::Violated);
            if ctx.config.cascade == Cascade::ShortCircuit && violated {
                suppressed.push(stage);
                continue;
            }
            let found = match stage {
                Stage::Bounds => bounds::run(&ctx),
                Stage::Pairing => pairing::run(&ctx),
                Stage::Forecast => forecast::run(&ctx),
            };
            debug!("feasibility: {stage:?} produced {} entries", found.len());
            entries.extend(found);
            stages_run.push(stage);
        }
        ConstraintReport::new(entries, stages_run, suppressed)
    }
}

/// Shared inputs of one evaluation.
pub(crate) struct Context<'a> {
    pub season: &'a Season,
    pub occ: Occupancy<'a>,
    pub config: FeasibilityConfig,
    pub open: Vec<Week>,
    owed: BTreeMap<TeamId, usize>,
}

impl<'a> Context<'a> {
    fn new(season: &'a Season, schedule: &Schedule, config: FeasibilityConfig) -> Self {
        let occ = Occupancy::from_schedule(season, schedule);
        let open = occ.open_weeks();
        let owed = rest_owed(&occ).into_iter().collect();
        Self {
            season,
            occ,
            config,
            open,
            owed,
        }
    }

    pub fn margin(&self) -> usize {
        usize::from(self.config.tight_margin)
    }

    /// Rest weeks the team still needs.
    pub fn owed(&self, team: TeamId) -> usize {
        self.owed.get(&team).copied().unwrap_or(0)
    }

    /// Unscheduled matchups of a team.
    pub fn remaining_of(&self, team: TeamId) -> impl Iterator<Item = &'a Matchup> + '_ {
        self.season
            .matchups_of(team)
            .filter(move |m| !self.occ.is_placed(m.id))
    }

    /// Bye slots still free in a week.
    pub fn bye_room(&self, week: Week) -> usize {
        self.season
            .bye_capacity(week)
            .saturating_sub(self.occ.week_byes(week))
    }

    /// Open bye-window weeks in which the team could still rest.
    pub fn bye_weeks_for(&self, team: TeamId) -> Vec<Week> {
        self.open
            .iter()
            .copied()
            .filter(|&w| self.bye_room(w) > 0 && self.occ.is_free(team, w))
            .collect()
    }
}

//! Week assignment solver.
//!
//! Maps every matchup of a [`Season`] to one week, keeping the games already
//! in the base schedule. Three strategies are tried in order:
//!
//! 1. [`Strategy::Relaxation`]: proportional fitting over the continuous
//!    relaxation of the [`AssignmentModel`](formulation::AssignmentModel),
//!    then rounding.
//! 2. [`Strategy::RotationLayout`]: exact layout of rotation rounds with a
//!    backtracking search over per-division bye patterns.
//! 3. [`Strategy::Greedy`]: priority-ordered week filling with seeded
//!    restarts.
//!
//! Every candidate is checked by [`verify`] before it is returned.
//!
//! # Usage
//!
//! ```no_run
//! use league_schedule::models::{League, LeagueRules, PriorStandings};
//! use league_schedule::solver::{generate_schedule, CancelToken, SolverConfig};
//!
//! let league = League::uniform(2, 4, 4);
//! let standings = PriorStandings::from_league(2026, &league);
//! let generated = generate_schedule(
//!     &league,
//!     &standings,
//!     &LeagueRules::default(),
//!     &[],
//!     &SolverConfig::default(),
//!     &CancelToken::new(),
//! )
//! .unwrap();
//! assert_eq!(generated.schedule.game_count(), 272);
//! ```

pub mod formulation;
mod greedy;
mod layout;
pub mod priority;
mod relaxation;
mod verify;

pub use verify::verify;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::generator::generate_matchups;
use crate::models::{
    Blocker, FixedWeek, League, LeagueRules, MatchupId, Occupancy, PriorStandings, Schedule,
    Season, TeamId, Violation, ViolationType,
};
use crate::validation::{validate_input, ValidationError, ValidationErrorKind};

/// Search budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Proportional fitting sweeps.
    pub relaxation_iterations: usize,
    /// Largest bound violation accepted as converged.
    pub relaxation_tolerance: f64,
    /// Search nodes for the rotation layout.
    pub layout_node_budget: usize,
    /// Greedy attempts; the first keeps the priority order, the rest shuffle ties.
    pub greedy_restarts: usize,
    /// Seed of the restart RNG.
    pub seed: u64,
    /// Wall-clock limit for the whole solve.
    pub time_budget: Option<Duration>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            relaxation_iterations: 300,
            relaxation_tolerance: 1e-3,
            layout_node_budget: 200_000,
            greedy_restarts: 16,
            seed: 0,
            time_budget: None,
        }
    }
}

impl SolverConfig {
    pub fn with_relaxation_iterations(mut self, iterations: usize) -> Self {
        self.relaxation_iterations = iterations;
        self
    }

    pub fn with_relaxation_tolerance(mut self, tolerance: f64) -> Self {
        self.relaxation_tolerance = tolerance;
        self
    }

    pub fn with_layout_node_budget(mut self, nodes: usize) -> Self {
        self.layout_node_budget = nodes;
        self
    }

    pub fn with_greedy_restarts(mut self, restarts: usize) -> Self {
        self.greedy_restarts = restarts;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; running solves stop at their next check.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Solver strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    Relaxation,
    RotationLayout,
    Greedy,
}

impl Strategy {
    /// Order in which strategies are tried.
    pub const ORDER: [Strategy; 3] = [
        Strategy::Relaxation,
        Strategy::RotationLayout,
        Strategy::Greedy,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Strategy::Relaxation => "relaxation",
            Strategy::RotationLayout => "rotation layout",
            Strategy::Greedy => "greedy",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of one strategy attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttemptOutcome {
    /// Complete and verified.
    Solved,
    /// The strategy could not produce a usable candidate.
    Degenerate(String),
    /// The strategy's preconditions do not hold for this season.
    NotApplicable(String),
    /// A candidate with unplaced matchups or violations.
    Residual { unplaced: usize, violations: usize },
    /// The wall-clock budget ran out during the attempt.
    OutOfTime,
}

/// One strategy attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub strategy: Strategy,
    pub outcome: AttemptOutcome,
    pub elapsed: Duration,
}

/// How a solve went.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveReport {
    /// Attempts in the order they ran.
    pub attempts: Vec<Attempt>,
    /// Strategy that produced the schedule.
    pub strategy: Strategy,
    pub elapsed: Duration,
}

impl SolveReport {
    /// Attempts that did not solve.
    pub fn degenerate(&self) -> impl Iterator<Item = &Attempt> {
        self.attempts
            .iter()
            .filter(|a| a.outcome != AttemptOutcome::Solved)
    }
}

/// Output of [`generate_schedule`].
#[derive(Debug, Clone)]
pub struct GeneratedSchedule {
    pub season: Season,
    pub schedule: Schedule,
    pub report: SolveReport,
}

/// Why a strategy stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stop {
    Cancelled,
    OutOfTime,
}

/// Cancellation and deadline checks shared by the strategies.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Budget<'a> {
    cancel: &'a CancelToken,
    deadline: Option<Instant>,
}

impl<'a> Budget<'a> {
    pub(crate) fn new(cancel: &'a CancelToken, time_budget: Option<Duration>) -> Self {
        Self {
            cancel,
            deadline: time_budget.map(|d| Instant::now() + d),
        }
    }

    pub(crate) fn check(&self) -> Result<(), Stop> {
        if self.cancel.is_cancelled() {
            return Err(Stop::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Stop::OutOfTime),
            _ => Ok(()),
        }
    }
}

/// What a strategy hands back.
pub(crate) enum Placement<'a> {
    /// Every matchup has a week.
    Complete(Occupancy<'a>),
    /// Best partial placement.
    Partial(Occupancy<'a>),
    Degenerate(String),
    NotApplicable(String),
}

/// Best failed candidate so far.
struct Residual {
    unplaced: Vec<MatchupId>,
    blame: Vec<ViolationType>,
    violations: Vec<Violation>,
}

impl Residual {
    fn from_occupancy(occ: &Occupancy<'_>, violations: Vec<Violation>) -> Self {
        let unplaced: Vec<MatchupId> = occ.unplaced().collect();
        let blame = blame(occ, &unplaced, &violations);
        Self {
            unplaced,
            blame,
            violations,
        }
    }

    fn better_than(&self, other: &Residual) -> bool {
        (self.unplaced.len(), self.violations.len())
            < (other.unplaced.len(), other.violations.len())
    }
}

/// Solves the season on top of `base`.
///
/// Games already in `base` stay where they are. Weeks that `base` marks as
/// fixed or places before its frontier receive no new games.
///
/// # Errors
/// - [`ScheduleError::StructuralInfeasibility`] when capacity is short
/// - [`ScheduleError::Cancelled`] when `cancel` fires
/// - [`ScheduleError::PartialResidual`] when no strategy completes
pub fn solve(
    season: &Season,
    base: &Schedule,
    config: &SolverConfig,
    cancel: &CancelToken,
) -> Result<(Schedule, SolveReport), ScheduleError> {
    let started = Instant::now();
    let budget = Budget::new(cancel, config.time_budget);
    let occ = Occupancy::from_schedule(season, base);
    precheck(&occ)?;

    let mut attempts = Vec::new();
    let mut best: Option<Residual> = None;

    for strategy in Strategy::ORDER {
        let attempt_start = Instant::now();
        debug!("solver: trying {strategy}");
        let result = match strategy {
            Strategy::Relaxation => relaxation::solve(&occ, config, &budget),
            Strategy::RotationLayout => layout::solve(&occ, config, &budget),
            Strategy::Greedy => greedy::solve(&occ, config, &budget),
        };

        let (outcome, residual) = match result {
            Err(Stop::Cancelled) => {
                info!("solver: cancelled during {strategy}");
                return Err(ScheduleError::Cancelled);
            }
            Err(Stop::OutOfTime) => (AttemptOutcome::OutOfTime, None),
            Ok(Placement::Complete(done)) => {
                let schedule = finalize(done.clone(), base);
                let violations = verify(season, &schedule);
                if violations.is_empty() {
                    attempts.push(Attempt {
                        strategy,
                        outcome: AttemptOutcome::Solved,
                        elapsed: attempt_start.elapsed(),
                    });
                    let report = SolveReport {
                        attempts,
                        strategy,
                        elapsed: started.elapsed(),
                    };
                    info!(
                        "solver: {} games placed by {strategy} in {:?}",
                        schedule.game_count(),
                        report.elapsed
                    );
                    return Ok((schedule, report));
                }
                let outcome = AttemptOutcome::Residual {
                    unplaced: 0,
                    violations: violations.len(),
                };
                (outcome, Some(Residual::from_occupancy(&done, violations)))
            }
            Ok(Placement::Partial(partial)) => {
                let outcome = AttemptOutcome::Residual {
                    unplaced: partial.unplaced_count(),
                    violations: 0,
                };
                (outcome, Some(Residual::from_occupancy(&partial, Vec::new())))
            }
            Ok(Placement::Degenerate(reason)) => (AttemptOutcome::Degenerate(reason), None),
            Ok(Placement::NotApplicable(reason)) => (AttemptOutcome::NotApplicable(reason), None),
        };

        warn!("solver: {strategy} failed: {outcome:?}");
        let out_of_time = outcome == AttemptOutcome::OutOfTime;
        attempts.push(Attempt {
            strategy,
            outcome,
            elapsed: attempt_start.elapsed(),
        });
        if let Some(candidate) = residual {
            if best.as_ref().map_or(true, |b| candidate.better_than(b)) {
                best = Some(candidate);
            }
        }
        if out_of_time {
            break;
        }
    }

    let best = best.unwrap_or_else(|| Residual::from_occupancy(&occ, Vec::new()));
    warn!(
        "solver: no strategy completed; {} matchups unplaced after {} attempts",
        best.unplaced.len(),
        attempts.len()
    );
    Err(ScheduleError::PartialResidual {
        unplaced: best.unplaced,
        blame: best.blame,
        violations: best.violations,
    })
}

/// Validates inputs, generates the pool and solves the season.
///
/// `fixed` weeks are locked: their games are bound to matchups of the pool
/// and no other game is added to them.
pub fn generate_schedule(
    league: &League,
    standings: &PriorStandings,
    rules: &LeagueRules,
    fixed: &[FixedWeek],
    config: &SolverConfig,
    cancel: &CancelToken,
) -> Result<GeneratedSchedule, ScheduleError> {
    validate_input(league, standings, rules, fixed).map_err(ScheduleError::InvalidInput)?;
    let league = league.with_standings(standings);
    let matchups = generate_matchups(&league, standings.season, rules)?;
    let season = Season::new(standings.season, league, rules.clone(), matchups);
    let base = bind_fixed(&season, fixed)?;
    let (schedule, report) = solve(&season, &base, config, cancel)?;
    Ok(GeneratedSchedule {
        season,
        schedule,
        report,
    })
}

/// Binds fixed `(home, away)` games to pool matchups.
fn bind_fixed(season: &Season, fixed: &[FixedWeek]) -> Result<Schedule, ScheduleError> {
    let mut schedule = Schedule::new();
    let mut errors = Vec::new();
    for fw in fixed {
        schedule.fixed_weeks.insert(fw.week);
        for &(home, away) in &fw.games {
            let found = season.matchups.iter().find(|m| {
                m.home == home && m.away == away && schedule.game_for_matchup(m.id).is_none()
            });
            match found {
                Some(m) => {
                    schedule.add_game(m.id, fw.week);
                }
                None => errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidFixedWeek,
                    format!("{away}@{home} in {} is not an open matchup of the pool", fw.week),
                )),
            }
        }
    }
    if errors.is_empty() {
        Ok(schedule)
    } else {
        Err(ScheduleError::InvalidInput(errors))
    }
}

/// Arithmetic capacity checks.
fn precheck(occ: &Occupancy<'_>) -> Result<(), ScheduleError> {
    let season = occ.season();
    let rules = &season.rules;
    let teams = season.team_count();

    let rest = usize::from(rules.weeks).saturating_sub(usize::from(rules.games_per_team));
    if rest != usize::from(rules.byes_per_team) {
        return Err(ScheduleError::StructuralInfeasibility {
            class: ViolationType::ByeCount,
            demand: usize::from(rules.byes_per_team),
            supply: rest,
            detail: format!(
                "{} weeks minus {} games leaves {rest} rest weeks per team",
                rules.weeks, rules.games_per_team
            ),
        });
    }

    let games = season.matchups.len();
    let capacity: usize = season.weeks().map(|w| season.max_games(w)).sum();
    if games > capacity {
        return Err(ScheduleError::StructuralInfeasibility {
            class: ViolationType::WeekCapacity,
            demand: games,
            supply: capacity,
            detail: "more matchups than weekly game slots".into(),
        });
    }

    let byes = teams * usize::from(rules.byes_per_team);
    let slots: usize = season.weeks().map(|w| season.bye_capacity(w)).sum();
    if byes > slots {
        return Err(ScheduleError::StructuralInfeasibility {
            class: ViolationType::ByeCapacity,
            demand: byes,
            supply: slots,
            detail: format!("bye window {} cannot hold every bye", rules.bye_window),
        });
    }
    let floor: usize = season.weeks().map(|w| season.min_games(w)).sum();
    if floor > games {
        return Err(ScheduleError::StructuralInfeasibility {
            class: ViolationType::WeekCapacity,
            demand: floor,
            supply: games,
            detail: "too few matchups to fill every week to its minimum".into(),
        });
    }
    Ok(())
}

/// Turns every empty cell into an explicit bye and writes the schedule.
fn finalize(mut occ: Occupancy<'_>, base: &Schedule) -> Schedule {
    let season = occ.season();
    for &team in season.team_ids() {
        for week in season.weeks() {
            if occ.is_free(team, week) {
                occ.reserve_bye(team, week);
            }
        }
    }
    occ.to_schedule(base.clone())
}

/// Invariant classes behind a residual, most frequent first.
fn blame(
    occ: &Occupancy<'_>,
    unplaced: &[MatchupId],
    violations: &[Violation],
) -> Vec<ViolationType> {
    let mut counts: BTreeMap<ViolationType, usize> = BTreeMap::new();
    let open = occ.open_weeks();
    for &m in unplaced {
        for &w in &open {
            let class = match occ.can_place(m, w) {
                Err(Blocker::TeamBusy(_)) => ViolationType::DoubleBooking,
                Err(Blocker::WeekFull(_)) => ViolationType::WeekCapacity,
                Err(Blocker::RematchGap { .. }) => ViolationType::RematchGap,
                Err(Blocker::QuotaFull { .. }) => ViolationType::CategoryQuota,
                _ => continue,
            };
            *counts.entry(class).or_insert(0) += 1;
        }
    }
    for v in violations {
        *counts.entry(v.violation_type).or_insert(0) += 1;
    }
    if counts.is_empty() && !unplaced.is_empty() {
        counts.insert(ViolationType::MatchupCoverage, unplaced.len());
    }
    let mut ranked: Vec<(ViolationType, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.into_iter().map(|(class, _)| class).collect()
}

/// Teams still owed rest weeks, with how many.
pub(crate) fn rest_owed(occ: &Occupancy<'_>) -> Vec<(TeamId, usize)> {
    let season = occ.season();
    let quota = usize::from(season.rules.byes_per_team);
    season
        .team_ids()
        .iter()
        .map(|&t| (t, quota.saturating_sub(occ.rest_weeks(t).len())))
        .filter(|&(_, n)| n > 0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategoryQuotas, Matchup, MatchupCategory, Week};

    /// 2 conferences × 2 divisions × 2 teams, 7 games over 8 weeks.
    fn small_rules() -> LeagueRules {
        LeagueRules::default()
            .with_weeks(8)
            .with_games_per_team(7)
            .with_bye_window(2, 7)
            .with_max_byes_per_week(4)
            .with_min_rematch_gap(2)
            .with_category_quotas(CategoryQuotas::new(2, 2, 3))
    }

    /// Four teams, single round robin over four weeks with one bye each.
    fn round_robin() -> Season {
        let league = League::uniform(2, 1, 2);
        let rules = LeagueRules::default()
            .with_weeks(4)
            .with_games_per_team(3)
            .with_bye_window(1, 4)
            .with_max_byes_per_week(2)
            .with_min_rematch_gap(2)
            .with_category_quotas(CategoryQuotas::new(1, 0, 2));
        let t = TeamId;
        let pairs = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
        let matchups = pairs
            .iter()
            .enumerate()
            .map(|(i, &(h, a))| Matchup::new(i as u16, t(h), t(a), MatchupCategory::FarCross))
            .collect();
        Season::new(2026, league, rules, matchups)
    }

    #[test]
    fn test_nfl_shaped_season_solves() {
        let league = League::uniform(2, 4, 4);
        let standings = PriorStandings::from_league(2026, &league);
        let generated = generate_schedule(
            &league,
            &standings,
            &LeagueRules::default(),
            &[],
            &SolverConfig::default(),
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(generated.season.matchups.len(), 272);
        assert_eq!(generated.schedule.game_count(), 272);
        assert_eq!(generated.schedule.byes.len(), 32);
        assert!(verify(&generated.season, &generated.schedule).is_empty());
        assert_eq!(
            generated.report.attempts.last().map(|a| &a.outcome),
            Some(&AttemptOutcome::Solved)
        );
    }

    #[test]
    fn test_small_league_solves() {
        let league = League::uniform(2, 2, 2);
        let standings = PriorStandings::from_league(2026, &league);
        let generated = generate_schedule(
            &league,
            &standings,
            &small_rules(),
            &[],
            &SolverConfig::default(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(generated.schedule.game_count(), 28);
        assert!(verify(&generated.season, &generated.schedule).is_empty());
    }

    #[test]
    fn test_greedy_fallback_without_rounds() {
        let season = round_robin();
        let config = SolverConfig::default().with_relaxation_iterations(0);
        let (schedule, report) =
            solve(&season, &Schedule::new(), &config, &CancelToken::new()).unwrap();
        assert_eq!(schedule.game_count(), 6);
        assert!(verify(&season, &schedule).is_empty());
        assert!(matches!(
            report.attempts[1].outcome,
            AttemptOutcome::NotApplicable(_)
        ));
    }

    #[test]
    fn test_fixed_round_is_pinned() {
        let league = League::uniform(2, 2, 2);
        let standings = PriorStandings::from_league(2026, &league);
        let rules = small_rules();
        let pool = generate_matchups(&league, 2026, &rules).unwrap();
        let round: Vec<&Matchup> = pool.iter().filter(|m| m.round == Some(2)).collect();
        assert_eq!(round.len(), 4);
        let fixed = vec![round
            .iter()
            .fold(FixedWeek::new(Week(1)), |fw, m| fw.with_game(m.home, m.away))];

        let generated = generate_schedule(
            &league,
            &standings,
            &rules,
            &fixed,
            &SolverConfig::default(),
            &CancelToken::new(),
        )
        .unwrap();
        for m in round {
            let game = generated.schedule.game_for_matchup(m.id).unwrap();
            assert_eq!(game.week, Week(1));
        }
        assert_eq!(generated.schedule.games_in_week(Week(1)).len(), 4);
        assert!(generated.schedule.is_fixed(Week(1)));
        assert!(verify(&generated.season, &generated.schedule).is_empty());
    }

    #[test]
    fn test_unknown_fixed_game_is_invalid_input() {
        let league = League::uniform(2, 2, 2);
        let standings = PriorStandings::from_league(2026, &league);
        // Only one matchup has 0 hosting 1.
        let fixed = vec![
            FixedWeek::new(Week(1)).with_game(TeamId(0), TeamId(1)),
            FixedWeek::new(Week(2)).with_game(TeamId(0), TeamId(1)),
        ];
        let err = generate_schedule(
            &league,
            &standings,
            &small_rules(),
            &fixed,
            &SolverConfig::default(),
            &CancelToken::new(),
        )
        .unwrap_err();
        match err {
            ScheduleError::InvalidInput(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].kind, ValidationErrorKind::InvalidFixedWeek);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_precheck_rejects_bye_arithmetic() {
        let mut season = round_robin();
        season.rules.weeks = 5;
        let err = solve(
            &season,
            &Schedule::new(),
            &SolverConfig::default(),
            &CancelToken::new(),
        )
        .unwrap_err();
        match err {
            ScheduleError::StructuralInfeasibility {
                class,
                demand,
                supply,
                ..
            } => {
                assert_eq!(class, ViolationType::ByeCount);
                assert_eq!((demand, supply), (1, 2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_precheck_rejects_bye_supply() {
        let mut season = round_robin();
        season.rules.max_byes_per_week = 1;
        season.rules.bye_window = crate::models::WeekRange::new(1, 3);
        let err = solve(
            &season,
            &Schedule::new(),
            &SolverConfig::default(),
            &CancelToken::new(),
        )
        .unwrap_err();
        assert_eq!(err.class(), Some(ViolationType::ByeCapacity));
    }

    #[test]
    fn test_cancelled_before_start() {
        let season = round_robin();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = solve(&season, &Schedule::new(), &SolverConfig::default(), &cancel).unwrap_err();
        assert!(matches!(err, ScheduleError::Cancelled));
    }

    #[test]
    fn test_config_builders() {
        let config = SolverConfig::default()
            .with_seed(7)
            .with_greedy_restarts(3)
            .with_layout_node_budget(10)
            .with_relaxation_tolerance(1e-2)
            .with_time_budget(Duration::from_secs(1));
        assert_eq!(config.seed, 7);
        assert_eq!(config.greedy_restarts, 3);
        assert_eq!(config.layout_node_budget, 10);
        assert_eq!(config.time_budget, Some(Duration::from_secs(1)));
    }
}

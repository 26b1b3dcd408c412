//! Greedy week filling.
//!
//! # Algorithm
//! For each open week in order:
//! 1. If the week is in the bye window, reserve byes for teams still owed
//!    one, spreading them evenly over the remaining window weeks and keeping
//!    the number of playing teams even
//! 2. Rank the unplaced matchups with the [`PriorityEngine`]
//! 3. Place every ranked matchup that [`Occupancy::can_place`] accepts
//!
//! The first attempt keeps the priority order; restarts shuffle the input
//! order (and so every tie) with a seeded RNG. The best attempt is kept.
//!
//! # Complexity
//! O(restarts × weeks × m log m) for m matchups, plus context capture.

use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::priority::{PlacementContext, PriorityEngine};
use super::{finalize, rest_owed, verify, Budget, Placement, SolverConfig, Stop};
use crate::models::{Matchup, MatchupId, Occupancy, Schedule, TeamId, Week};

pub(super) fn solve<'a>(
    occ: &Occupancy<'a>,
    config: &SolverConfig,
    budget: &Budget<'_>,
) -> Result<Placement<'a>, Stop> {
    budget.check()?;
    let season = occ.season();
    let engine = PriorityEngine::standard();
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut best: Option<(Occupancy<'a>, (usize, usize))> = None;
    for attempt in 0..config.greedy_restarts.max(1) {
        match budget.check() {
            Err(Stop::OutOfTime) if best.is_some() => break,
            other => other?,
        }
        let mut order: Vec<MatchupId> = occ.unplaced().collect();
        let mut teams: Vec<TeamId> = season.team_ids().to_vec();
        if attempt > 0 {
            order.shuffle(&mut rng);
            teams.shuffle(&mut rng);
        }

        let filled = fill(occ, &engine, &order, &teams);
        let unplaced = filled.unplaced_count();
        let violations = if unplaced == 0 {
            verify(season, &finalize(filled.clone(), &Schedule::new())).len()
        } else {
            0
        };
        debug!("greedy: attempt {attempt} left {unplaced} unplaced, {violations} violations");
        if unplaced == 0 && violations == 0 {
            return Ok(Placement::Complete(filled));
        }
        let score = (unplaced, violations);
        if best.as_ref().map_or(true, |(_, s)| score < *s) {
            best = Some((filled, score));
        }
    }

    Ok(match best {
        Some((filled, _)) if filled.unplaced_count() == 0 => Placement::Complete(filled),
        Some((filled, _)) => Placement::Partial(filled),
        None => Placement::Partial(occ.clone()),
    })
}

/// One greedy pass over the open weeks.
fn fill<'a>(
    occ: &Occupancy<'a>,
    engine: &PriorityEngine,
    order: &[MatchupId],
    teams: &[TeamId],
) -> Occupancy<'a> {
    let season = occ.season();
    let mut work = occ.clone();
    let open = work.open_weeks();

    for (i, &week) in open.iter().enumerate() {
        if season.rules.is_bye_week(week) {
            let window_left = open[i..]
                .iter()
                .filter(|&&w| season.rules.is_bye_week(w))
                .count();
            reserve_byes(&mut work, week, window_left, teams);
        }

        let context = PlacementContext::capture(&work, week);
        let mut pending: Vec<&Matchup> = order
            .iter()
            .filter(|&&m| !work.is_placed(m))
            .filter_map(|&m| season.matchup(m))
            .collect();
        engine.sort(&mut pending, &context);
        for m in pending {
            if work.can_place(m.id, week).is_ok() {
                work.place(m.id, week);
            }
        }
    }
    work
}

/// Reserves this week's share of the outstanding byes.
fn reserve_byes(work: &mut Occupancy<'_>, week: Week, window_left: usize, teams: &[TeamId]) {
    let season = work.season();
    let owed: Vec<TeamId> = {
        let owing = rest_owed(work);
        teams
            .iter()
            .copied()
            .filter(|t| owing.iter().any(|(o, _)| o == t) && work.can_bye(*t, week).is_ok())
            .collect()
    };
    if owed.is_empty() || window_left == 0 {
        return;
    }

    let room = season.bye_capacity(week).saturating_sub(work.week_byes(week));
    let playing = season.team_count() - work.week_byes(week);
    let mut want = owed.len().div_ceil(window_left);
    if (playing - want.min(playing)) % 2 == 1 {
        want += 1;
    }
    want = want.min(room).min(owed.len());
    if (playing - want.min(playing)) % 2 == 1 {
        want = want.saturating_sub(1);
    }

    for &team in owed.iter().take(want) {
        work.reserve_bye(team, week);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{League, LeagueRules, MatchupCategory, Season};
    use crate::solver::CancelToken;

    fn round_robin(max_byes: u8) -> Season {
        let league = League::uniform(2, 1, 2);
        let rules = LeagueRules::default()
            .with_weeks(4)
            .with_games_per_team(3)
            .with_bye_window(1, 4)
            .with_max_byes_per_week(max_byes)
            .with_min_rematch_gap(2);
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
    fn test_first_attempt_completes_round_robin() {
        let season = round_robin(2);
        let occ = Occupancy::new(&season);
        let cancel = CancelToken::new();
        let budget = Budget::new(&cancel, None);
        let config = SolverConfig::default().with_greedy_restarts(1);
        match solve(&occ, &config, &budget).unwrap() {
            Placement::Complete(done) => {
                assert_eq!(done.unplaced_count(), 0);
                assert_eq!(done.placed_week(MatchupId(5)), Some(Week(1)));
                assert_eq!(done.placed_week(MatchupId(0)), Some(Week(2)));
            }
            _ => panic!("greedy should complete a round robin"),
        }
    }

    #[test]
    fn test_byes_are_spread_and_even() {
        let season = round_robin(2);
        let mut occ = Occupancy::new(&season);
        let teams = season.team_ids().to_vec();
        reserve_byes(&mut occ, Week(1), 4, &teams);
        assert_eq!(occ.week_byes(Week(1)), 2);
        reserve_byes(&mut occ, Week(2), 3, &teams);
        assert_eq!(occ.week_byes(Week(2)), 2);
        reserve_byes(&mut occ, Week(3), 2, &teams);
        assert_eq!(occ.week_byes(Week(3)), 0);
    }

    #[test]
    fn test_single_bye_slot_never_leaves_odd_players() {
        let season = round_robin(1);
        let mut occ = Occupancy::new(&season);
        let teams = season.team_ids().to_vec();
        reserve_byes(&mut occ, Week(1), 4, &teams);
        assert_eq!(occ.week_byes(Week(1)), 0);
    }

    #[test]
    fn test_restarts_are_deterministic() {
        let season = round_robin(2);
        let occ = Occupancy::new(&season);
        let cancel = CancelToken::new();
        let budget = Budget::new(&cancel, None);
        let config = SolverConfig::default().with_seed(11).with_greedy_restarts(4);
        let weeks = |p: Placement<'_>| match p {
            Placement::Complete(o) | Placement::Partial(o) => {
                season.matchups.iter().map(|m| o.placed_week(m.id)).collect::<Vec<_>>()
            }
            _ => Vec::new(),
        };
        let a = weeks(solve(&occ, &config, &budget).unwrap());
        let b = weeks(solve(&occ, &config, &budget).unwrap());
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn test_greedy_completes_generated_pool() {
        use crate::models::{CategoryQuotas, PriorStandings, WeekRange, WeeklyQuota};
        use crate::solver::{generate_schedule, AttemptOutcome, Strategy};

        // Seven games in seven weeks: no byes, so the rotation layout does
        // not apply, and the opening week must be all division games.
        let league = League::uniform(2, 2, 2);
        let standings = PriorStandings::from_league(2026, &league);
        let mut rules = LeagueRules::default()
            .with_weeks(7)
            .with_games_per_team(7)
            .with_bye_window(2, 7)
            .with_max_byes_per_week(4)
            .with_min_rematch_gap(2)
            .with_category_quotas(CategoryQuotas::new(2, 2, 3))
            .with_weekly_quota(
                WeeklyQuota::new(WeekRange::new(1, 1), MatchupCategory::InGroup).with_min(4),
            );
        rules.byes_per_team = 0;
        let config = SolverConfig::default().with_relaxation_iterations(0);

        let generated =
            generate_schedule(&league, &standings, &rules, &[], &config, &CancelToken::new())
                .unwrap();
        assert_eq!(generated.report.strategy, Strategy::Greedy);
        assert!(matches!(
            generated.report.attempts[1].outcome,
            AttemptOutcome::NotApplicable(_)
        ));
        assert_eq!(generated.schedule.game_count(), 28);
        assert!(generated.schedule.byes.is_empty());
        assert!(verify(&generated.season, &generated.schedule).is_empty());

        let week1 = generated.schedule.games_in_week(Week(1));
        assert_eq!(week1.len(), 4);
        assert!(week1.iter().all(|g| generated
            .season
            .matchup(g.matchup)
            .is_some_and(|m| m.category == MatchupCategory::InGroup)));
    }
}

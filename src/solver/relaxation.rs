//! Continuous relaxation with proportional fitting and rounding.
//!
//! # Algorithm
//! 1. Spread each matchup's unit mass evenly over its eligible weeks
//! 2. Sweep the constraints, rescaling the variables of every violated
//!    bound toward it, until the largest violation is within tolerance
//! 3. Round: visit variables by descending mass and place each one that
//!    [`Occupancy::can_place`] still accepts
//!
//! # Complexity
//! O(sweeps × Σ|constraint|) for fitting, O(v log v) for rounding.
//!
//! # Reference
//! Deming & Stephan (1940), "On a least squares adjustment of a sampled
//! frequency table when the expected marginal totals are known"

use std::cmp::Ordering;

use log::debug;

use super::formulation::{AssignmentModel, LinearConstraint};
use super::{Budget, Placement, SolverConfig, Stop};
use crate::models::Occupancy;

pub(super) fn solve<'a>(
    occ: &Occupancy<'a>,
    config: &SolverConfig,
    budget: &Budget<'_>,
) -> Result<Placement<'a>, Stop> {
    budget.check()?;
    if occ.unplaced_count() == 0 {
        return Ok(Placement::Complete(occ.clone()));
    }

    let model = AssignmentModel::build(occ);
    debug!(
        "relaxation: {} variables, {} constraints",
        model.variable_count(),
        model.constraint_count()
    );
    if let Some(m) = model.empty_domains().first() {
        return Ok(Placement::Degenerate(format!("{m} has no eligible week")));
    }

    let mut x = vec![0.0; model.variable_count()];
    for m in occ.unplaced() {
        let domain = model.domain(m);
        let share = 1.0 / domain.len() as f64;
        for &v in domain {
            x[v] = share;
        }
    }

    let tolerance = config.relaxation_tolerance;
    let mut sweep = 0;
    loop {
        let residual = max_violation(model.constraints(), &x);
        if residual <= tolerance {
            debug!("relaxation: converged after {sweep} sweeps");
            break;
        }
        if sweep >= config.relaxation_iterations {
            return Ok(Placement::Degenerate(format!(
                "residual {residual:.4} after {sweep} sweeps"
            )));
        }
        if sweep % 16 == 0 {
            budget.check()?;
        }
        for c in model.constraints() {
            if let Err(reason) = fit(c, &mut x, tolerance) {
                return Ok(Placement::Degenerate(reason));
            }
        }
        sweep += 1;
    }

    let mut order: Vec<usize> = (0..x.len()).collect();
    order.sort_by(|&a, &b| {
        x[b].partial_cmp(&x[a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });

    let mut rounded = occ.clone();
    for v in order {
        let var = model.variables()[v];
        if rounded.can_place(var.matchup, var.week).is_ok() {
            rounded.place(var.matchup, var.week);
        }
    }
    let left = rounded.unplaced_count();
    if left > 0 {
        return Ok(Placement::Degenerate(format!(
            "rounding left {left} matchups unplaced"
        )));
    }
    Ok(Placement::Complete(rounded))
}

/// Rescales the variables of one constraint toward its bounds.
fn fit(c: &LinearConstraint, x: &mut [f64], tolerance: f64) -> Result<(), String> {
    let sum: f64 = c.vars.iter().map(|&v| x[v]).sum();
    if sum > c.upper + tolerance {
        let factor = if c.upper <= 0.0 { 0.0 } else { c.upper / sum };
        for &v in &c.vars {
            x[v] *= factor;
        }
    } else if sum < c.lower - tolerance {
        if sum <= f64::EPSILON {
            return Err(format!(
                "fractional mass collapsed for a {:?} constraint",
                c.family
            ));
        }
        let factor = c.lower / sum;
        for &v in &c.vars {
            x[v] = (x[v] * factor).min(1.0);
        }
    }
    Ok(())
}

fn max_violation(constraints: &[LinearConstraint], x: &[f64]) -> f64 {
    constraints
        .iter()
        .map(|c| {
            let sum: f64 = c.vars.iter().map(|&v| x[v]).sum();
            (sum - c.upper).max(c.lower - sum).max(0.0)
        })
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        League, LeagueRules, Matchup, MatchupCategory, MatchupId, Schedule, Season, TeamId, Week,
    };
    use crate::solver::formulation::Family;
    use crate::solver::CancelToken;

    fn season(gap: u8) -> Season {
        let league = League::uniform(2, 1, 2);
        let rules = LeagueRules::default()
            .with_weeks(4)
            .with_games_per_team(3)
            .with_bye_window(1, 4)
            .with_max_byes_per_week(2)
            .with_min_rematch_gap(gap);
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
    fn test_uniform_start_is_already_fitted() {
        let season = season(2);
        let occ = Occupancy::new(&season);
        let cancel = CancelToken::new();
        let budget = Budget::new(&cancel, None);
        let config = SolverConfig::default().with_relaxation_iterations(0);

        // Every bound holds at the uniform point, so rounding runs.
        match solve(&occ, &config, &budget).unwrap() {
            Placement::Complete(done) => assert_eq!(done.unplaced_count(), 0),
            Placement::Degenerate(reason) => assert!(reason.contains("rounding")),
            _ => panic!("unexpected placement"),
        }
    }

    #[test]
    fn test_empty_domain_is_degenerate() {
        let season = season(2);
        let mut schedule = Schedule::new()
            .with_fixed_week(Week(1))
            .with_fixed_week(Week(2))
            .with_fixed_week(Week(3))
            .with_fixed_week(Week(4));
        schedule.add_game(MatchupId(0), Week(1));
        let occ = Occupancy::from_schedule(&season, &schedule);
        let cancel = CancelToken::new();
        let budget = Budget::new(&cancel, None);

        match solve(&occ, &SolverConfig::default(), &budget).unwrap() {
            Placement::Degenerate(reason) => assert!(reason.contains("no eligible week")),
            _ => panic!("expected a degenerate relaxation"),
        }
    }

    #[test]
    fn test_cancel_stops_relaxation() {
        let season = season(2);
        let occ = Occupancy::new(&season);
        let cancel = CancelToken::new();
        cancel.cancel();
        let budget = Budget::new(&cancel, None);
        assert!(matches!(
            solve(&occ, &SolverConfig::default(), &budget),
            Err(Stop::Cancelled)
        ));
    }

    #[test]
    fn test_fit_scales_down_and_up() {
        let c = LinearConstraint {
            family: Family::TeamWeek,
            vars: vec![0, 1],
            lower: 0.0,
            upper: 1.0,
        };
        let mut x = vec![0.8, 0.8];
        fit(&c, &mut x, 1e-6).unwrap();
        assert!((x[0] + x[1] - 1.0).abs() < 1e-9);

        let once = LinearConstraint {
            family: Family::MatchupOnce,
            vars: vec![0, 1],
            lower: 1.0,
            upper: 1.0,
        };
        let mut zero = vec![0.0, 0.0];
        assert!(fit(&once, &mut zero, 1e-6).is_err());
    }
}

//! Binary assignment formulation.
//!
//! One variable per (unplaced matchup, eligible week). Constraint families:
//!
//! | Family | Scope | Bound |
//! |--------|-------|-------|
//! | (a) `MatchupOnce` | matchup | = 1 |
//! | (b) `TeamWeek` | team × open week | ≤ 1 |
//! | (c) `TeamTotal` | team | = games still needed |
//! | (d) `WeekGames` | open week | [min, max] − placed |
//! | (e) `RematchWindow` | repeat pair × gap window | ≤ 1 − placed meetings |
//! | (f) `WeeklyQuota` | quota × open week | [min, max] − placed |
//!
//! Rematch spacing is expressed per repeat pair and sliding window of `gap`
//! consecutive weeks, so the family grows with pairs × weeks rather than
//! matchups².
//!
//! # Reference
//! Nemhauser & Trick (1998), "Scheduling a major college basketball
//! conference", Operations Research 46(1).

use std::collections::BTreeMap;

use crate::models::{MatchupId, Occupancy, TeamId, Week};

/// A (matchup, week) decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variable {
    pub matchup: MatchupId,
    pub week: Week,
}

/// Constraint family tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Family {
    MatchupOnce,
    TeamWeek,
    TeamTotal,
    WeekGames,
    RematchWindow,
    WeeklyQuota,
}

/// `lower ≤ Σ x[vars] ≤ upper`.
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    pub family: Family,
    pub vars: Vec<usize>,
    pub lower: f64,
    pub upper: f64,
}

impl LinearConstraint {
    /// Whether an integral assignment satisfies the constraint.
    pub fn holds(&self, assignment: &[bool]) -> bool {
        let sum = self.vars.iter().filter(|&&v| assignment[v]).count() as f64;
        sum >= self.lower - 1e-9 && sum <= self.upper + 1e-9
    }
}

/// Assignment model over the open weeks of a partial placement.
#[derive(Debug, Clone)]
pub struct AssignmentModel {
    variables: Vec<Variable>,
    constraints: Vec<LinearConstraint>,
    domains: BTreeMap<MatchupId, Vec<usize>>,
}

impl AssignmentModel {
    /// Builds the model for every unplaced matchup of `occ`.
    ///
    /// A week is eligible for a matchup when it is open and
    /// [`Occupancy::can_place`] accepts it against the placements already
    /// in `occ`.
    pub fn build(occ: &Occupancy<'_>) -> Self {
        let season = occ.season();
        let rules = &season.rules;
        let open = occ.open_weeks();

        let mut variables = Vec::new();
        let mut domains: BTreeMap<MatchupId, Vec<usize>> = BTreeMap::new();
        for m in occ.unplaced() {
            let domain = domains.entry(m).or_default();
            for &w in &open {
                if occ.can_place(m, w).is_ok() {
                    domain.push(variables.len());
                    variables.push(Variable { matchup: m, week: w });
                }
            }
        }

        let mut by_team_week: BTreeMap<(TeamId, Week), Vec<usize>> = BTreeMap::new();
        let mut by_team: BTreeMap<TeamId, Vec<usize>> = BTreeMap::new();
        let mut by_week: BTreeMap<Week, Vec<usize>> = BTreeMap::new();
        for (i, v) in variables.iter().enumerate() {
            let Some(m) = season.matchup(v.matchup) else {
                continue;
            };
            for team in m.teams() {
                by_team_week.entry((team, v.week)).or_default().push(i);
                by_team.entry(team).or_default().push(i);
            }
            by_week.entry(v.week).or_default().push(i);
        }

        let mut constraints = Vec::new();

        // (a)
        for vars in domains.values() {
            constraints.push(LinearConstraint {
                family: Family::MatchupOnce,
                vars: vars.clone(),
                lower: 1.0,
                upper: 1.0,
            });
        }

        // (b)
        for vars in by_team_week.into_values() {
            if vars.len() > 1 {
                constraints.push(LinearConstraint {
                    family: Family::TeamWeek,
                    vars,
                    lower: 0.0,
                    upper: 1.0,
                });
            }
        }

        // (c)
        let needed = f64::from(rules.games_per_team);
        for &team in season.team_ids() {
            let remaining = (needed - occ.team_games(team) as f64).max(0.0);
            constraints.push(LinearConstraint {
                family: Family::TeamTotal,
                vars: by_team.remove(&team).unwrap_or_default(),
                lower: remaining,
                upper: remaining,
            });
        }

        // (d)
        for &w in &open {
            let placed = occ.week_games(w) as f64;
            constraints.push(LinearConstraint {
                family: Family::WeekGames,
                vars: by_week.get(&w).cloned().unwrap_or_default(),
                lower: (season.min_games(w) as f64 - placed).max(0.0),
                upper: (season.max_games(w) as f64 - placed).max(0.0),
            });
        }

        // (e)
        let gap = rules.min_rematch_gap;
        if gap > 1 {
            for (a, b) in season.repeat_pairs() {
                let pair_vars: Vec<usize> = variables
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| {
                        season
                            .matchup(v.matchup)
                            .is_some_and(|m| m.pair() == (a, b))
                    })
                    .map(|(i, _)| i)
                    .collect();
                if pair_vars.is_empty() {
                    continue;
                }
                let met = occ.meetings(a, b);
                let last_start = rules.weeks.saturating_sub(gap - 1).max(1);
                for start in 1..=last_start {
                    let window = start..start + gap;
                    let vars: Vec<usize> = pair_vars
                        .iter()
                        .copied()
                        .filter(|&i| window.contains(&variables[i].week.0))
                        .collect();
                    if vars.is_empty() {
                        continue;
                    }
                    let placed = met.iter().filter(|w| window.contains(&w.0)).count() as f64;
                    constraints.push(LinearConstraint {
                        family: Family::RematchWindow,
                        vars,
                        lower: 0.0,
                        upper: (1.0 - placed).max(0.0),
                    });
                }
            }
        }

        // (f)
        for quota in &rules.weekly_quotas {
            for &w in open.iter().filter(|&&w| quota.weeks.contains(w)) {
                let vars: Vec<usize> = by_week
                    .get(&w)
                    .map(|vs| {
                        vs.iter()
                            .copied()
                            .filter(|&i| {
                                season
                                    .matchup(variables[i].matchup)
                                    .is_some_and(|m| m.category == quota.category)
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                let placed = occ.category_count(w, quota.category) as f64;
                constraints.push(LinearConstraint {
                    family: Family::WeeklyQuota,
                    vars,
                    lower: (f64::from(quota.min) - placed).max(0.0),
                    upper: quota
                        .max
                        .map_or(f64::INFINITY, |max| (f64::from(max) - placed).max(0.0)),
                });
            }
        }

        Self {
            variables,
            constraints,
            domains,
        }
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    /// Variable indices of one matchup.
    pub fn domain(&self, matchup: MatchupId) -> &[usize] {
        self.domains.get(&matchup).map_or(&[], |d| d.as_slice())
    }

    /// Matchups with no eligible week.
    pub fn empty_domains(&self) -> Vec<MatchupId> {
        self.domains
            .iter()
            .filter(|(_, d)| d.is_empty())
            .map(|(&m, _)| m)
            .collect()
    }

    /// Number of constraints per family.
    pub fn family_counts(&self) -> BTreeMap<Family, usize> {
        let mut counts = BTreeMap::new();
        for c in &self.constraints {
            *counts.entry(c.family).or_insert(0) += 1;
        }
        counts
    }

    /// Indices of constraints an integral assignment violates.
    pub fn evaluate(&self, assignment: &[bool]) -> Vec<usize> {
        self.constraints
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.holds(assignment))
            .map(|(i, _)| i)
            .collect()
    }
}

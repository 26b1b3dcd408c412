//! Placement priority rules.
//!
//! The greedy strategy asks, week by week, which unplaced matchup to try
//! next. Rules score a matchup against a [`PlacementContext`]; a
//! [`PriorityEngine`] chains them.
//!
//! # Score Convention
//! **Lower score = higher priority.**
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4;
//! Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::models::{Matchup, MatchupId, Occupancy, TeamId, Week};

/// Score returned by a placement rule. Lower = placed first.
pub type RuleScore = f64;

/// A rule that ranks matchups for placement.
pub trait PlacementRule: Send + Sync + Debug {
    /// Rule name.
    fn name(&self) -> &'static str;

    /// Scores a matchup; lower = higher priority.
    fn evaluate(&self, matchup: &Matchup, context: &PlacementContext) -> RuleScore;
}

/// Snapshot of the placement state for one week.
#[derive(Debug, Clone, Default)]
pub struct PlacementContext {
    /// Week being filled.
    pub week: Week,
    /// Open weeks from `week` on where the matchup is still placeable.
    pub options: BTreeMap<MatchupId, usize>,
    /// Free open weeks minus games still owed, per team.
    pub slack: BTreeMap<TeamId, i64>,
}

impl PlacementContext {
    /// Captures the context for filling `week`.
    pub fn capture(occ: &Occupancy<'_>, week: Week) -> Self {
        let season = occ.season();
        let ahead: Vec<Week> = occ
            .open_weeks()
            .into_iter()
            .filter(|&w| w >= week)
            .collect();

        let options = occ
            .unplaced()
            .map(|m| {
                let n = ahead.iter().filter(|&&w| occ.can_place(m, w).is_ok()).count();
                (m, n)
            })
            .collect();

        let owed = i64::from(season.rules.games_per_team);
        let slack = season
            .team_ids()
            .iter()
            .map(|&t| {
                let free = ahead.iter().filter(|&&w| occ.is_free(t, w)).count() as i64;
                (t, free - (owed - occ.team_games(t) as i64))
            })
            .collect();

        Self {
            week,
            options,
            slack,
        }
    }
}

/// In-group before near cross before far cross.
#[derive(Debug, Clone, Copy)]
pub struct CategoryFirst;

impl PlacementRule for CategoryFirst {
    fn name(&self) -> &'static str {
        "CATEGORY"
    }

    fn evaluate(&self, matchup: &Matchup, _context: &PlacementContext) -> RuleScore {
        f64::from(matchup.category.priority())
    }
}

/// Fewest remaining legal weeks first.
#[derive(Debug, Clone, Copy)]
pub struct MostConstrained;

impl PlacementRule for MostConstrained {
    fn name(&self) -> &'static str {
        "MOST_CONSTRAINED"
    }

    fn evaluate(&self, matchup: &Matchup, context: &PlacementContext) -> RuleScore {
        context
            .options
            .get(&matchup.id)
            .map_or(f64::INFINITY, |&n| n as f64)
    }
}

/// Teams with the least spare weeks first.
#[derive(Debug, Clone, Copy)]
pub struct LeastSlack;

impl PlacementRule for LeastSlack {
    fn name(&self) -> &'static str {
        "LEAST_SLACK"
    }

    fn evaluate(&self, matchup: &Matchup, context: &PlacementContext) -> RuleScore {
        matchup
            .teams()
            .iter()
            .filter_map(|t| context.slack.get(t))
            .min()
            .map_or(0.0, |&s| s as f64)
    }
}

/// How ties are broken after all rules are exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TieBreaker {
    /// Keep the input order.
    #[default]
    InputOrder,
    /// Lowest matchup id first.
    ById,
}

/// Sequential rule chain.
///
/// The first rule whose scores differ by more than epsilon decides; later
/// rules only break ties.
///
/// # Example
/// ```
/// use league_schedule::solver::priority::{
///     CategoryFirst, MostConstrained, PriorityEngine, TieBreaker,
/// };
///
/// let engine = PriorityEngine::new()
///     .with_rule(CategoryFirst)
///     .with_rule(MostConstrained)
///     .with_tie_breaker(TieBreaker::ById);
/// assert_eq!(engine.rule_names(), vec!["CATEGORY", "MOST_CONSTRAINED"]);
/// ```
#[derive(Clone)]
pub struct PriorityEngine {
    rules: Vec<Arc<dyn PlacementRule>>,
    tie_breaker: TieBreaker,
    epsilon: f64,
}

impl PriorityEngine {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            tie_breaker: TieBreaker::InputOrder,
            epsilon: 1e-9,
        }
    }

    /// The default chain: category, most constrained, least slack, id.
    pub fn standard() -> Self {
        Self::new()
            .with_rule(CategoryFirst)
            .with_rule(MostConstrained)
            .with_rule(LeastSlack)
    }

    pub fn with_rule<R: PlacementRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    pub fn with_tie_breaker(mut self, tie_breaker: TieBreaker) -> Self {
        self.tie_breaker = tie_breaker;
        self
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Sorts matchups by priority, highest first. The sort is stable.
    pub fn sort(&self, matchups: &mut [&Matchup], context: &PlacementContext) {
        matchups.sort_by(|a, b| self.compare(a, b, context));
    }

    fn compare(&self, a: &Matchup, b: &Matchup, context: &PlacementContext) -> Ordering {
        for rule in &self.rules {
            let score_a = rule.evaluate(a, context);
            let score_b = rule.evaluate(b, context);
            if (score_a - score_b).abs() > self.epsilon {
                return score_a.partial_cmp(&score_b).unwrap_or(Ordering::Equal);
            }
        }
        match self.tie_breaker {
            TieBreaker::InputOrder => Ordering::Equal,
            TieBreaker::ById => a.id.cmp(&b.id),
        }
    }
}

impl Default for PriorityEngine {
    fn default() -> Self {
        Self::standard()
    }
}

impl Debug for PriorityEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriorityEngine")
            .field("rules", &self.rule_names())
            .field("tie_breaker", &self.tie_breaker)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchupCategory;

    fn matchups() -> Vec<Matchup> {
        let t = TeamId;
        vec![
            Matchup::new(0, t(0), t(2), MatchupCategory::FarCross),
            Matchup::new(1, t(1), t(3), MatchupCategory::NearCross),
            Matchup::new(2, t(0), t(1), MatchupCategory::InGroup),
            Matchup::new(3, t(2), t(3), MatchupCategory::InGroup),
        ]
    }

    #[test]
    fn test_category_then_constraint() {
        let pool = matchups();
        let mut refs: Vec<&Matchup> = pool.iter().collect();
        let mut ctx = PlacementContext::default();
        ctx.options.insert(MatchupId(2), 5);
        ctx.options.insert(MatchupId(3), 2);
        ctx.options.insert(MatchupId(0), 1);
        ctx.options.insert(MatchupId(1), 9);

        PriorityEngine::new()
            .with_rule(CategoryFirst)
            .with_rule(MostConstrained)
            .sort(&mut refs, &ctx);
        let order: Vec<u16> = refs.iter().map(|m| m.id.0).collect();
        assert_eq!(order, vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_tie_breakers() {
        let pool = matchups();
        let ctx = PlacementContext::default();

        let mut refs: Vec<&Matchup> = pool.iter().rev().collect();
        PriorityEngine::new().sort(&mut refs, &ctx);
        assert_eq!(refs[0].id, MatchupId(3));

        PriorityEngine::new()
            .with_tie_breaker(TieBreaker::ById)
            .sort(&mut refs, &ctx);
        assert_eq!(refs[0].id, MatchupId(0));
    }

    #[test]
    fn test_least_slack_uses_tighter_team() {
        let pool = matchups();
        let mut ctx = PlacementContext::default();
        ctx.slack.insert(TeamId(0), 3);
        ctx.slack.insert(TeamId(1), 0);
        ctx.slack.insert(TeamId(2), 2);
        ctx.slack.insert(TeamId(3), 4);
        assert_eq!(LeastSlack.evaluate(&pool[2], &ctx), 0.0);
        assert_eq!(LeastSlack.evaluate(&pool[0], &ctx), 2.0);
    }
}

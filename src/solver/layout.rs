//! Exact layout of rotation rounds.
//!
//! When every matchup carries a rotation round and every round is a perfect
//! matching, the season is `rounds + 1` weeks long and each team rests once.
//! In-group rounds decouple per division: they occupy `in_group_rounds + 1`
//! weeks spread over the bye window, and each division rests in one of
//! them. Cross rounds fill the other weeks whole.
//!
//! A division rests by one of two patterns:
//! - `Full(b)`: the whole division rests in week `b`; its rounds are played
//!   in order over the other in-group weeks.
//! - `Split(u, v)`: the last round is halved; the first half plays in `u`
//!   while the second half rests, and the other way round in `v`.
//!
//! A depth-first search picks one pattern per division so that no week
//! exceeds its bye capacity and every repeat pair keeps the rematch gap.
//!
//! # Complexity
//! At most `layout_node_budget` search nodes; each node costs O(patterns ×
//! weeks).

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use super::{Budget, Placement, SolverConfig, Stop};
use crate::models::{GroupRef, MatchupCategory, MatchupId, Occupancy, Season, TeamId, Week};

/// How one division takes its bye.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pattern {
    Full(Week),
    Split(Week, Week),
}

impl Pattern {
    fn is_split(self) -> bool {
        matches!(self, Pattern::Split(..))
    }
}

/// A pattern expanded into games and rests.
#[derive(Debug, Clone)]
struct GroupLayout {
    pattern: Pattern,
    games: Vec<(MatchupId, Week)>,
    rests: Vec<(TeamId, Week)>,
    /// Byes added per week.
    load: Vec<(Week, usize)>,
}

/// Rounds and weeks derived from the pool.
#[derive(Debug)]
struct RoundPlan {
    /// In-group weeks, ascending.
    group_weeks: Vec<Week>,
    /// Cross round → week.
    cross: Vec<(u8, Week)>,
    /// Per division: games of each in-group round.
    groups: Vec<(GroupRef, Vec<Vec<MatchupId>>)>,
    rounds: BTreeMap<u8, Vec<MatchupId>>,
}

impl RoundPlan {
    fn build(occ: &Occupancy<'_>) -> Result<Self, String> {
        let season = occ.season();
        let rules = &season.rules;
        if rules.byes_per_team != 1 {
            return Err("layout needs exactly one bye per team".into());
        }

        let mut rounds: BTreeMap<u8, Vec<MatchupId>> = BTreeMap::new();
        for m in &season.matchups {
            let round = m
                .round
                .ok_or_else(|| format!("{} has no rotation round", m.id))?;
            rounds.entry(round).or_default().push(m.id);
        }
        let teams = season.team_count();
        for (r, ids) in &rounds {
            let covered: BTreeSet<TeamId> = ids
                .iter()
                .filter_map(|&id| season.matchup(id))
                .flat_map(|m| m.teams())
                .collect();
            if ids.len() * 2 != teams || covered.len() != teams {
                return Err(format!("round {r} is not a perfect matching"));
            }
        }
        if season.week_count() != rounds.len() + 1 {
            return Err(format!(
                "{} weeks cannot hold {} rounds and one rest week",
                season.week_count(),
                rounds.len()
            ));
        }

        let in_group = |ids: &Vec<MatchupId>| {
            ids.iter().all(|&id| {
                season
                    .matchup(id)
                    .is_some_and(|m| m.category == MatchupCategory::InGroup)
            })
        };
        let group_rounds: Vec<u8> = rounds
            .iter()
            .filter(|(_, ids)| in_group(ids))
            .map(|(&r, _)| r)
            .collect();
        let cross_rounds: Vec<u8> = rounds
            .iter()
            .filter(|(_, ids)| !in_group(ids))
            .map(|(&r, _)| r)
            .collect();
        if group_rounds.is_empty() {
            return Err("no in-group rounds".into());
        }

        let mut groups: BTreeMap<GroupRef, Vec<Vec<MatchupId>>> = BTreeMap::new();
        for (k, r) in group_rounds.iter().enumerate() {
            for &id in &rounds[r] {
                let group = season
                    .matchup(id)
                    .and_then(|m| season.league.group_of(m.home))
                    .ok_or_else(|| format!("{id} has no division"))?;
                let slots = groups
                    .entry(group)
                    .or_insert_with(|| vec![Vec::new(); group_rounds.len()]);
                slots[k].push(id);
            }
        }
        for (group, slots) in &groups {
            let size = slots[0].len();
            if size == 0 || slots.iter().any(|s| s.len() != size) {
                return Err(format!("{group} plays uneven in-group rounds"));
            }
        }

        // Locked weeks must hold a whole cross round; open weeks must be empty.
        let mut pinned: BTreeMap<Week, u8> = BTreeMap::new();
        for week in season.weeks() {
            let placed: BTreeSet<MatchupId> = season
                .matchups
                .iter()
                .filter(|m| occ.placed_week(m.id) == Some(week))
                .map(|m| m.id)
                .collect();
            if occ.is_open(week) {
                if !placed.is_empty() {
                    return Err(format!("{week} already holds games"));
                }
                continue;
            }
            let round = cross_rounds.iter().copied().find(|r| {
                rounds[r].len() == placed.len() && rounds[r].iter().all(|id| placed.contains(id))
            });
            match round {
                Some(r) => {
                    pinned.insert(week, r);
                }
                None => return Err(format!("locked {week} does not hold a whole cross round")),
            }
        }

        let candidates: Vec<Week> = occ
            .open_weeks()
            .into_iter()
            .filter(|&w| rules.is_bye_week(w))
            .collect();
        let needed = group_rounds.len() + 1;
        if candidates.len() < needed {
            return Err(format!(
                "{} open bye weeks for {needed} in-group weeks",
                candidates.len()
            ));
        }
        let group_weeks = spread(&candidates, needed);

        let pinned_rounds: BTreeSet<u8> = pinned.values().copied().collect();
        let mut free_rounds = cross_rounds
            .iter()
            .copied()
            .filter(|r| !pinned_rounds.contains(r));
        let mut cross = Vec::new();
        for week in season.weeks().filter(|w| !group_weeks.contains(w)) {
            let round = match pinned.get(&week) {
                Some(&r) => r,
                None => free_rounds
                    .next()
                    .ok_or_else(|| format!("no cross round left for {week}"))?,
            };
            cross.push((round, week));
        }

        Ok(Self {
            group_weeks,
            cross,
            groups: groups.into_iter().collect(),
            rounds,
        })
    }
}

/// `count` weeks spread evenly over `candidates`, first and last included.
fn spread(candidates: &[Week], count: usize) -> Vec<Week> {
    let n = candidates.len();
    if count <= 1 {
        return candidates.iter().take(count).copied().collect();
    }
    (0..count)
        .map(|i| candidates[i * (n - 1) / (count - 1)])
        .collect()
}

/// Expands a pattern for one division, or `None` if it breaks the rematch gap.
fn expand(
    season: &Season,
    pattern: Pattern,
    slots: &[Vec<MatchupId>],
    group_weeks: &[Week],
) -> Option<GroupLayout> {
    let mut games = Vec::new();
    let mut rests = Vec::new();
    let teams_of = |ids: &[MatchupId]| -> Vec<TeamId> {
        ids.iter()
            .filter_map(|&id| season.matchup(id))
            .flat_map(|m| m.teams())
            .collect()
    };

    match pattern {
        Pattern::Full(b) => {
            let weeks: Vec<Week> = group_weeks.iter().copied().filter(|&w| w != b).collect();
            for (ids, &w) in slots.iter().zip(&weeks) {
                games.extend(ids.iter().map(|&id| (id, w)));
            }
            rests.extend(teams_of(&slots[0]).into_iter().map(|t| (t, b)));
        }
        Pattern::Split(u, v) => {
            let weeks: Vec<Week> = group_weeks
                .iter()
                .copied()
                .filter(|&w| w != u && w != v)
                .collect();
            let (last, rest) = slots.split_last()?;
            for (ids, &w) in rest.iter().zip(&weeks) {
                games.extend(ids.iter().map(|&id| (id, w)));
            }
            let (first_half, second_half) = last.split_at(last.len() / 2);
            games.extend(first_half.iter().map(|&id| (id, u)));
            games.extend(second_half.iter().map(|&id| (id, v)));
            rests.extend(teams_of(second_half).into_iter().map(|t| (t, u)));
            rests.extend(teams_of(first_half).into_iter().map(|t| (t, v)));
        }
    }

    let gap = season.rules.min_rematch_gap;
    let mut met: BTreeMap<(TeamId, TeamId), Vec<Week>> = BTreeMap::new();
    for &(id, w) in &games {
        if let Some(m) = season.matchup(id) {
            met.entry(m.pair()).or_default().push(w);
        }
    }
    for weeks in met.values() {
        for (i, a) in weeks.iter().enumerate() {
            if weeks[i + 1..].iter().any(|b| a.distance(*b) < gap) {
                return None;
            }
        }
    }

    let mut load: BTreeMap<Week, usize> = BTreeMap::new();
    for &(_, w) in &rests {
        *load.entry(w).or_insert(0) += 1;
    }
    Some(GroupLayout {
        pattern,
        games,
        rests,
        load: load.into_iter().collect(),
    })
}

struct Search<'b> {
    options: Vec<Vec<GroupLayout>>,
    load: BTreeMap<Week, usize>,
    capacity: BTreeMap<Week, usize>,
    chosen: Vec<usize>,
    nodes: usize,
    limit: usize,
    budget: &'b Budget<'b>,
}

impl Search<'_> {
    fn fits(&self, layout: &GroupLayout) -> Option<usize> {
        let mut peak = 0;
        for &(w, n) in &layout.load {
            let after = self.load.get(&w).copied().unwrap_or(0) + n;
            if after > self.capacity.get(&w).copied().unwrap_or(0) {
                return None;
            }
            peak = peak.max(after);
        }
        Some(peak)
    }

    fn apply(&mut self, group: usize, option: usize, sign: bool) {
        for &(w, n) in &self.options[group][option].load {
            let entry = self.load.entry(w).or_insert(0);
            if sign {
                *entry += n;
            } else {
                *entry -= n;
            }
        }
    }

    fn run(&mut self, group: usize) -> Result<bool, Stop> {
        if group == self.options.len() {
            return Ok(true);
        }
        self.nodes += 1;
        if self.nodes > self.limit {
            return Ok(false);
        }
        if self.nodes % 1024 == 0 {
            self.budget.check()?;
        }

        let mut order: Vec<(bool, usize, usize)> = self.options[group]
            .iter()
            .enumerate()
            .filter_map(|(i, o)| self.fits(o).map(|peak| (o.pattern.is_split(), peak, i)))
            .collect();
        order.sort_unstable();

        for (_, _, i) in order {
            self.apply(group, i, true);
            self.chosen.push(i);
            if self.run(group + 1)? {
                return Ok(true);
            }
            self.chosen.pop();
            self.apply(group, i, false);
        }
        Ok(false)
    }
}

pub(super) fn solve<'a>(
    occ: &Occupancy<'a>,
    config: &SolverConfig,
    budget: &Budget<'_>,
) -> Result<Placement<'a>, Stop> {
    budget.check()?;
    let season = occ.season();
    let plan = match RoundPlan::build(occ) {
        Ok(plan) => plan,
        Err(reason) => return Ok(Placement::NotApplicable(reason)),
    };
    debug!(
        "layout: in-group weeks {:?}, {} cross rounds, {} divisions",
        plan.group_weeks.iter().map(|w| w.0).collect::<Vec<_>>(),
        plan.cross.len(),
        plan.groups.len()
    );

    let mut options = Vec::with_capacity(plan.groups.len());
    for (group, slots) in &plan.groups {
        let mut patterns: Vec<Pattern> =
            plan.group_weeks.iter().map(|&b| Pattern::Full(b)).collect();
        if slots.last().is_some_and(|last| last.len() >= 2) {
            for (i, &u) in plan.group_weeks.iter().enumerate() {
                for &v in &plan.group_weeks[i + 1..] {
                    patterns.push(Pattern::Split(u, v));
                }
            }
        }
        let layouts: Vec<GroupLayout> = patterns
            .into_iter()
            .filter_map(|p| expand(season, p, slots, &plan.group_weeks))
            .collect();
        if layouts.is_empty() {
            return Ok(Placement::Degenerate(format!(
                "no bye pattern of {group} keeps the rematch gap"
            )));
        }
        options.push(layouts);
    }

    let capacity = season
        .weeks()
        .map(|w| (w, season.bye_capacity(w).saturating_sub(occ.week_byes(w))))
        .collect();
    let mut search = Search {
        options,
        load: BTreeMap::new(),
        capacity,
        chosen: Vec::new(),
        nodes: 0,
        limit: config.layout_node_budget,
        budget,
    };
    if !search.run(0)? {
        let reason = if search.nodes > search.limit {
            format!("search budget of {} nodes exhausted", search.limit)
        } else {
            "no combination of division bye patterns fits the bye capacity".to_string()
        };
        return Ok(Placement::Degenerate(reason));
    }
    debug!("layout: patterns found after {} nodes", search.nodes);

    let mut placed = occ.clone();
    for &(round, week) in &plan.cross {
        if placed.is_closed(week) {
            continue;
        }
        for &id in &plan.rounds[&round] {
            placed.place(id, week);
        }
    }
    for (g, &i) in search.chosen.iter().enumerate() {
        let layout = &search.options[g][i];
        for &(id, w) in &layout.games {
            placed.place(id, w);
        }
        for &(t, w) in &layout.rests {
            placed.reserve_bye(t, w);
        }
    }
    Ok(Placement::Complete(placed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate_matchups;
    use crate::models::{CategoryQuotas, League, LeagueRules, Schedule};
    use crate::solver::{verify, CancelToken};

    fn nfl() -> Season {
        let league = League::uniform(2, 4, 4);
        let rules = LeagueRules::default();
        let pool = generate_matchups(&league, 2026, &rules).unwrap();
        Season::new(2026, league, rules, pool)
    }

    #[test]
    fn test_spread_includes_both_ends() {
        let window: Vec<Week> = (5..=14).map(Week).collect();
        let picked: Vec<u8> = spread(&window, 7).iter().map(|w| w.0).collect();
        assert_eq!(picked, vec![5, 6, 8, 9, 11, 12, 14]);
    }

    #[test]
    fn test_full_pattern_expansion() {
        let season = nfl();
        let occ = Occupancy::new(&season);
        let plan = RoundPlan::build(&occ).unwrap();
        let (_, slots) = &plan.groups[0];
        let layout = expand(&season, Pattern::Full(Week(9)), slots, &plan.group_weeks).unwrap();
        assert_eq!(layout.games.len(), 12);
        assert_eq!(layout.rests.len(), 4);
        assert_eq!(layout.load, vec![(Week(9), 4)]);
        assert!(layout.games.iter().all(|&(_, w)| w != Week(9)));
    }

    #[test]
    fn test_split_pattern_expansion() {
        let season = nfl();
        let occ = Occupancy::new(&season);
        let plan = RoundPlan::build(&occ).unwrap();
        let (_, slots) = &plan.groups[0];
        let layout =
            expand(&season, Pattern::Split(Week(5), Week(6)), slots, &plan.group_weeks).unwrap();
        assert_eq!(layout.games.len(), 12);
        assert_eq!(layout.load, vec![(Week(5), 2), (Week(6), 2)]);
    }

    #[test]
    fn test_nfl_layout_verifies() {
        let season = nfl();
        let occ = Occupancy::new(&season);
        let cancel = CancelToken::new();
        let budget = Budget::new(&cancel, None);
        let placed = match solve(&occ, &SolverConfig::default(), &budget).unwrap() {
            Placement::Complete(p) => p,
            _ => panic!("layout should apply to a rotation pool"),
        };
        assert_eq!(placed.unplaced_count(), 0);
        let schedule = placed.to_schedule(Schedule::new());
        assert_eq!(schedule.byes.len(), 32);
        assert!(verify(&season, &schedule).is_empty());
    }

    #[test]
    fn test_layout_ignores_weekly_quotas() {
        use crate::models::{ViolationType, WeekRange, WeeklyQuota};

        // Division games sit in the bye window, so week 1 holds a cross round.
        let mut season = nfl();
        season.rules.weekly_quotas.push(
            WeeklyQuota::new(WeekRange::new(1, 1), MatchupCategory::InGroup).with_min(16),
        );
        let occ = Occupancy::new(&season);
        let cancel = CancelToken::new();
        let budget = Budget::new(&cancel, None);
        let placed = match solve(&occ, &SolverConfig::default(), &budget).unwrap() {
            Placement::Complete(p) => p,
            _ => panic!("layout should still complete"),
        };
        let schedule = placed.to_schedule(Schedule::new());
        let violations = verify(&season, &schedule);
        assert!(!violations.is_empty());
        assert!(violations
            .iter()
            .all(|v| v.violation_type == ViolationType::CategoryQuota));
    }

    #[test]
    fn test_not_applicable_without_rounds() {
        let league = League::uniform(2, 2, 2);
        let rules = LeagueRules::default()
            .with_weeks(8)
            .with_games_per_team(7)
            .with_bye_window(2, 7)
            .with_category_quotas(CategoryQuotas::new(2, 2, 3));
        let mut pool = generate_matchups(&league, 2026, &rules).unwrap();
        pool[3].round = None;
        let season = Season::new(2026, league, rules, pool);
        let occ = Occupancy::new(&season);
        let cancel = CancelToken::new();
        let budget = Budget::new(&cancel, None);
        match solve(&occ, &SolverConfig::default(), &budget).unwrap() {
            Placement::NotApplicable(reason) => assert!(reason.contains("M3")),
            _ => panic!("expected not applicable"),
        }
    }

    #[test]
    fn test_tight_budget_is_degenerate() {
        let season = nfl();
        let occ = Occupancy::new(&season);
        let cancel = CancelToken::new();
        let budget = Budget::new(&cancel, None);
        let config = SolverConfig::default().with_layout_node_budget(3);
        match solve(&occ, &config, &budget).unwrap() {
            Placement::Degenerate(reason) => assert!(reason.contains("budget")),
            _ => panic!("expected an exhausted search"),
        }
    }
}

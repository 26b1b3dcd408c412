//! Matchup generator.
//!
//! Derives the required matchup pool of one season from group membership,
//! prior-season ranks and the season year. Tiers, for `S` teams per
//! division, `D` divisions per conference and `C` conferences:
//!
//! | Tier | Category | Games per team |
//! |------|----------|----------------|
//! | Division double round robin | in-group | 2(S-1) |
//! | Conference division rotation | near | S |
//! | Conference same-rank games | near | D-2 |
//! | Cross-conference division rotation | far | S |
//! | Extra game (when one short) | far | 1 |
//!
//! Every matchup carries a rotation round; each round is a perfect matching
//! of the league, which the layout solver exploits.
//!
//! # Reference
//! de Werra (1981), "Scheduling in sports"; Kendall et al. (2010),
//! "Scheduling in sports: An annotated bibliography", Computers & OR 37(1).

mod balance;
mod check;
mod rotation;

pub use check::check_pool;
pub use rotation::{balanced_orientation, circle_rounds};

use log::debug;
use std::collections::BTreeSet;

use crate::error::ScheduleError;
use crate::models::{
    GroupRef, League, LeagueRules, Matchup, MatchupCategory, TeamId, ViolationType,
};
use rotation::{first_hosts, latin_pairs};

/// Teams indexed by (conference, division, rank) positions.
#[derive(Debug, Clone)]
pub(crate) struct Structure {
    slots: Vec<Vec<Vec<TeamId>>>,
}

impl Structure {
    /// Builds the index from a ranked league. Positions follow ascending
    /// conference and division numbers and ascending rank.
    pub(crate) fn from_league(league: &League) -> Self {
        let slots = league
            .conferences()
            .into_iter()
            .map(|c| {
                league
                    .divisions_in(c)
                    .into_iter()
                    .map(|d| {
                        league
                            .group_members(GroupRef::new(c, d))
                            .iter()
                            .map(|t| t.id)
                            .collect()
                    })
                    .collect()
            })
            .collect();
        Self { slots }
    }

    pub(crate) fn conference_count(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn division_count(&self) -> usize {
        self.slots.first().map_or(0, |c| c.len())
    }

    pub(crate) fn group_size(&self) -> usize {
        self.slots
            .first()
            .and_then(|c| c.first())
            .map_or(0, |d| d.len())
    }

    /// Whether every conference has the same division count and every
    /// division the same size, all of them even.
    pub(crate) fn is_regular(&self) -> bool {
        let (d, s) = (self.division_count(), self.group_size());
        self.slots.len() % 2 == 0
            && d % 2 == 0
            && s % 2 == 0
            && self
                .slots
                .iter()
                .all(|c| c.len() == d && c.iter().all(|div| div.len() == s))
    }

    /// Smallest and largest division size.
    pub(crate) fn size_range(&self) -> (usize, usize) {
        let sizes = self.slots.iter().flatten().map(Vec::len);
        (sizes.clone().min().unwrap_or(0), sizes.max().unwrap_or(0))
    }

    pub(crate) fn team(&self, conference: usize, division: usize, rank: usize) -> TeamId {
        self.slots[conference][division][rank]
    }

    pub(crate) fn division(&self, conference: usize, division: usize) -> &[TeamId] {
        &self.slots[conference][division]
    }

    pub(crate) fn conference_teams(&self, conference: usize) -> impl Iterator<Item = TeamId> + '_ {
        self.slots[conference].iter().flatten().copied()
    }

    /// (conference, division, rank) of a team.
    pub(crate) fn position(&self, team: TeamId) -> Option<(usize, usize, usize)> {
        for (c, conf) in self.slots.iter().enumerate() {
            for (d, div) in conf.iter().enumerate() {
                if let Some(i) = div.iter().position(|&t| t == team) {
                    return Some((c, d, i));
                }
            }
        }
        None
    }

    /// Games per team produced by the structural tiers.
    pub(crate) fn structural_games(&self) -> usize {
        let s = self.group_size();
        let d = self.division_count();
        2 * (s - 1) + s + (d - 2) + s
    }
}

struct PoolBuilder {
    matchups: Vec<Matchup>,
}

impl PoolBuilder {
    fn push(&mut self, home: TeamId, away: TeamId, category: MatchupCategory, round: usize) {
        let id = self.matchups.len() as u16;
        self.matchups
            .push(Matchup::new(id, home, away, category).with_round(round as u8));
    }
}

/// Generates the matchup pool for `year`.
///
/// `league` must already carry prior-season ranks; see
/// [`validate_league`](crate::validation::validate_league). Irregular
/// shapes are refused before any matchup is built. The pool is checked
/// with [`check_pool`] before it is returned.
///
/// # Errors
/// [`ScheduleError::StructuralInfeasibility`] when conferences or divisions
/// are unequal or odd-sized, when the structural tiers
/// leave a deficit other than 0 or 1 games, when the extra-game pass runs
/// out of opponents, or when the pool fails its check.
pub fn generate_matchups(
    league: &League,
    year: u16,
    rules: &LeagueRules,
) -> Result<Vec<Matchup>, ScheduleError> {
    let structure = Structure::from_league(league);
    let (confs, divs, size) = (
        structure.conference_count(),
        structure.division_count(),
        structure.group_size(),
    );
    if confs < 2 || divs < 2 || size < 2 {
        return Err(ScheduleError::StructuralInfeasibility {
            class: ViolationType::GameCount,
            demand: 2,
            supply: confs.min(divs).min(size),
            detail: "league needs at least 2 conferences, divisions and teams per division".into(),
        });
    }
    if !structure.is_regular() {
        let (smallest, largest) = structure.size_range();
        return Err(ScheduleError::StructuralInfeasibility {
            class: ViolationType::GameCount,
            demand: largest,
            supply: smallest,
            detail: "conferences and divisions must be equal and even in size".into(),
        });
    }

    let target = usize::from(rules.games_per_team);
    let base = structure.structural_games();
    if base > target || target - base > 1 {
        return Err(ScheduleError::StructuralInfeasibility {
            class: ViolationType::GameCount,
            demand: target,
            supply: base,
            detail: format!(
                "rotation tiers give {base} games per team; deficit must be 0 or 1"
            ),
        });
    }

    let y = usize::from(year);
    let mut pool = PoolBuilder {
        matchups: Vec::with_capacity(league.team_count() * target / 2),
    };

    // In-group double round robin: first legs, then return legs in the same order.
    let group_rounds = circle_rounds(size);
    let legs = size - 1;
    for c in 0..confs {
        for d in 0..divs {
            let members = structure.division(c, d);
            for (r, pairs) in group_rounds.iter().enumerate() {
                for (slot, &(a, b)) in pairs.iter().enumerate() {
                    let (home, away) = if (r + slot) % 2 == 0 {
                        (members[a], members[b])
                    } else {
                        (members[b], members[a])
                    };
                    pool.push(home, away, MatchupCategory::InGroup, r);
                    pool.push(away, home, MatchupCategory::InGroup, r + legs);
                }
            }
        }
    }
    let mut round = 2 * legs;

    // Conference division rotation.
    let division_rounds = circle_rounds(divs);
    let near_index = y % (divs - 1);
    for c in 0..confs {
        for &(p, q) in &division_rounds[near_index] {
            for k in 0..size {
                for (i, j) in latin_pairs(size, k) {
                    let (a, b) = (structure.team(c, p, i), structure.team(c, q, j));
                    let (home, away) = if first_hosts(i, j, year) { (a, b) } else { (b, a) };
                    pool.push(home, away, MatchupCategory::NearCross, round + k);
                }
            }
        }
    }
    round += size;

    // Same-rank games against the divisions of the remaining circle rounds.
    let same_rank: Vec<&Vec<(usize, usize)>> = division_rounds
        .iter()
        .enumerate()
        .filter(|&(r, _)| r != near_index)
        .map(|(_, pairs)| pairs)
        .collect();
    let edges: Vec<(usize, usize)> = same_rank.iter().flat_map(|p| p.iter().copied()).collect();
    let oriented = balanced_orientation(divs, &edges);
    for c in 0..confs {
        let mut e = 0;
        for (r, pairs) in same_rank.iter().enumerate() {
            for _ in pairs.iter() {
                let (host, guest) = oriented[e];
                e += 1;
                for i in 0..size {
                    pool.push(
                        structure.team(c, host, i),
                        structure.team(c, guest, i),
                        MatchupCategory::NearCross,
                        round + r,
                    );
                }
            }
        }
    }
    round += same_rank.len();

    // Cross-conference division rotation.
    let conference_rounds = circle_rounds(confs);
    for &(c1, c2) in &conference_rounds[y % (confs - 1)] {
        for d in 0..divs {
            let e = (d + y) % divs;
            for k in 0..size {
                for (i, j) in latin_pairs(size, k) {
                    let (a, b) = (structure.team(c1, d, i), structure.team(c2, e, j));
                    let (home, away) = if first_hosts(i, j, year) { (a, b) } else { (b, a) };
                    pool.push(home, away, MatchupCategory::FarCross, round + k);
                }
            }
        }
    }
    round += size;

    if target > base {
        let met: BTreeSet<(TeamId, TeamId)> = pool.matchups.iter().map(|m| m.pair()).collect();
        for (home, away) in balance::extra_games(&structure, year, &met)? {
            pool.push(home, away, MatchupCategory::FarCross, round);
        }
        round += 1;
    }

    debug!(
        "generated {} matchups in {round} rounds for {year} ({confs}x{divs}x{size})",
        pool.matchups.len()
    );

    check_pool(league, rules, &pool.matchups).map_err(|violations| {
        let class = violations
            .first()
            .map_or(ViolationType::MatchupCoverage, |v| v.violation_type);
        ScheduleError::StructuralInfeasibility {
            class,
            demand: league.team_count() * target / 2,
            supply: pool.matchups.len(),
            detail: violations
                .iter()
                .map(|v| v.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        }
    })?;
    Ok(pool.matchups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategoryQuotas, MatchupId, PriorStandings};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn small_rules() -> LeagueRules {
        LeagueRules::default()
            .with_weeks(8)
            .with_games_per_team(7)
            .with_bye_window(2, 7)
            .with_max_byes_per_week(4)
            .with_category_quotas(CategoryQuotas::new(2, 2, 3))
    }

    #[test]
    fn test_full_league_pool_size() {
        let league = League::uniform(2, 4, 4);
        let pool = generate_matchups(&league, 2026, &LeagueRules::default()).unwrap();
        assert_eq!(pool.len(), 272);
        assert!(pool.iter().enumerate().all(|(i, m)| m.id == MatchupId(i as u16)));
    }

    #[test]
    fn test_uneven_division_is_structurally_infeasible() {
        let mut league = League::uniform(2, 2, 4);
        league.teams.retain(|t| t.id != TeamId(15));
        let rules = LeagueRules::default().with_games_per_team(14);
        match generate_matchups(&league, 2026, &rules) {
            Err(ScheduleError::StructuralInfeasibility { demand, supply, .. }) => {
                assert_eq!((demand, supply), (4, 3));
            }
            other => panic!("expected structural infeasibility, got {other:?}"),
        }
    }

    #[test]
    fn test_rounds_are_perfect_matchings() {
        let league = League::uniform(2, 4, 4);
        let pool = generate_matchups(&league, 2025, &LeagueRules::default()).unwrap();
        let mut rounds: BTreeMap<u8, Vec<TeamId>> = BTreeMap::new();
        for m in &pool {
            let r = rounds.entry(m.round.unwrap()).or_default();
            r.push(m.home);
            r.push(m.away);
        }
        assert_eq!(rounds.len(), 17);
        for teams in rounds.values() {
            let distinct: BTreeSet<_> = teams.iter().collect();
            assert_eq!(teams.len(), 32);
            assert_eq!(distinct.len(), 32);
        }
    }

    #[test]
    fn test_in_group_return_legs_are_reversed() {
        let league = League::uniform(2, 4, 4);
        let pool = generate_matchups(&league, 2026, &LeagueRules::default()).unwrap();
        for m in pool.iter().filter(|m| m.category == MatchupCategory::InGroup) {
            let r = m.round.unwrap();
            if r < 3 {
                assert!(pool
                    .iter()
                    .any(|o| o.round == Some(r + 3) && o.home == m.away && o.away == m.home));
            }
        }
    }

    #[test]
    fn test_small_league_with_extra_game() {
        let league = League::uniform(2, 2, 2);
        let pool = generate_matchups(&league, 2026, &small_rules()).unwrap();
        assert_eq!(pool.len(), 28);
        assert_eq!(check_pool(&league, &small_rules(), &pool), Ok(()));
    }

    #[test]
    fn test_rotation_changes_with_year() {
        let league = League::uniform(2, 4, 4);
        let rules = LeagueRules::default();
        let a = generate_matchups(&league, 2026, &rules).unwrap();
        let b = generate_matchups(&league, 2027, &rules).unwrap();
        let pairs = |pool: &[Matchup]| -> BTreeSet<(TeamId, TeamId)> {
            pool.iter()
                .filter(|m| m.category != MatchupCategory::InGroup)
                .map(|m| m.pair())
                .collect()
        };
        assert_ne!(pairs(&a), pairs(&b));
    }

    #[test]
    fn test_deficit_too_large_is_structural() {
        let league = League::uniform(2, 4, 4);
        let rules = LeagueRules::default()
            .with_games_per_team(19)
            .with_category_quotas(CategoryQuotas::new(6, 6, 7));
        let err = generate_matchups(&league, 2026, &rules).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::StructuralInfeasibility {
                class: ViolationType::GameCount,
                demand: 19,
                supply: 16,
                ..
            }
        ));
    }

    #[test]
    fn test_quota_mismatch_fails_the_check() {
        let league = League::uniform(2, 4, 4);
        let rules = LeagueRules::default().with_category_quotas(CategoryQuotas::new(6, 7, 4));
        let err = generate_matchups(&league, 2026, &rules).unwrap_err();
        assert_eq!(err.class(), Some(ViolationType::CategoryQuota));
    }

    proptest! {
        #[test]
        fn prop_pool_matches_quotas(
            year in 2000u16..2100,
            perms in proptest::collection::vec(Just(vec![1u8, 2, 3, 4]).prop_shuffle(), 8),
        ) {
            let base = League::uniform(2, 4, 4);
            let mut standings = PriorStandings::new(year);
            for (g, group) in base.groups().into_iter().enumerate() {
                for (team, &rank) in base.group_members(group).iter().zip(&perms[g]) {
                    standings = standings.with_rank(team.id, rank);
                }
            }
            let league = base.with_standings(&standings);
            let rules = LeagueRules::default();
            let pool = generate_matchups(&league, year, &rules).unwrap();
            prop_assert_eq!(pool.len(), 32 * 17 / 2);
            prop_assert!(check_pool(&league, &rules, &pool).is_ok());
        }
    }
}

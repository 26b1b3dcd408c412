//! Matchup pool checker.
//!
//! A generated pool must match the declared quotas exactly. Any deviation is
//! reported as a [`Violation`]; callers treat a non-empty list as a hard
//! failure.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{
    League, LeagueRules, Matchup, MatchupCategory, MatchupId, TeamId, Violation, ViolationType,
};

/// Checks a matchup pool against the league and rules.
///
/// Checks:
/// 1. Total count is `teams × games_per_team / 2` and ids are dense
/// 2. No self matchups, unknown teams or directed duplicates
/// 3. Categories agree with group membership
/// 4. In-group pairs meet exactly twice in opposite directions, every
///    other pair at most once
/// 5. Per team: total and per-category counts equal the quotas; in-group
///    home equals in-group away; home count is ⌊G/2⌋ or ⌈G/2⌉
pub fn check_pool(
    league: &League,
    rules: &LeagueRules,
    matchups: &[Matchup],
) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();
    let games = usize::from(rules.games_per_team);
    let expected = league.team_count() * games / 2;

    if matchups.len() != expected {
        violations.push(Violation::new(
            ViolationType::MatchupCoverage,
            "pool",
            format!("expected {expected} matchups, found {}", matchups.len()),
        ));
    }

    let mut directed = BTreeSet::new();
    let mut pairs: BTreeMap<(TeamId, TeamId), Vec<&Matchup>> = BTreeMap::new();
    for (i, m) in matchups.iter().enumerate() {
        if m.id != MatchupId(i as u16) {
            violations.push(Violation::new(
                ViolationType::MatchupCoverage,
                m.id.to_string(),
                format!("{} is stored at position {i}", m.id),
            ));
        }
        if m.home == m.away {
            violations.push(Violation::new(
                ViolationType::MatchupCoverage,
                m.id.to_string(),
                format!("{} pairs {} with itself", m.id, m.home),
            ));
            continue;
        }
        let (Some(home), Some(away)) = (league.team(m.home), league.team(m.away)) else {
            violations.push(Violation::new(
                ViolationType::MatchupCoverage,
                m.id.to_string(),
                format!("{} references an unknown team", m.id),
            ));
            continue;
        };
        if !directed.insert((m.home, m.away)) {
            violations.push(Violation::new(
                ViolationType::MatchupCoverage,
                m.id.to_string(),
                format!("{} duplicates {}@{}", m.id, m.away, m.home),
            ));
        }
        let actual = if home.group == away.group {
            MatchupCategory::InGroup
        } else if home.group.conference == away.group.conference {
            MatchupCategory::NearCross
        } else {
            MatchupCategory::FarCross
        };
        if actual != m.category {
            violations.push(Violation::new(
                ViolationType::CategoryQuota,
                m.id.to_string(),
                format!("{} is tagged {} but is {}", m.id, m.category, actual),
            ));
        }
        pairs.entry(m.pair()).or_default().push(m);
    }

    for group in league.groups() {
        let members = league.group_members(group);
        for (x, a) in members.iter().enumerate() {
            for b in &members[x + 1..] {
                let met = pairs.get(&(a.id.min(b.id), a.id.max(b.id)));
                let ok = match met {
                    Some(ms) if ms.len() == 2 => ms[0].home == ms[1].away,
                    _ => false,
                };
                if !ok {
                    violations.push(Violation::new(
                        ViolationType::MatchupCoverage,
                        format!("{}-{}", a.id, b.id),
                        format!(
                            "{} and {} must meet twice with venues swapped, found {}",
                            a.id,
                            b.id,
                            met.map_or(0, |ms| ms.len())
                        ),
                    ));
                }
            }
        }
    }
    for (&(a, b), ms) in &pairs {
        if ms.len() > 1 && ms[0].category != MatchupCategory::InGroup {
            violations.push(Violation::new(
                ViolationType::MatchupCoverage,
                format!("{a}-{b}"),
                format!("{a} and {b} meet {} times outside their group", ms.len()),
            ));
        }
    }

    let mut totals: BTreeMap<TeamId, TeamTally> = league
        .teams
        .iter()
        .map(|t| (t.id, TeamTally::default()))
        .collect();
    for m in matchups {
        if m.home == m.away {
            continue;
        }
        if let Some(t) = totals.get_mut(&m.home) {
            t.record(m.category, true);
        }
        if let Some(t) = totals.get_mut(&m.away) {
            t.record(m.category, false);
        }
    }
    let (low, high) = (games / 2, games.div_ceil(2));
    for (team, tally) in totals {
        if tally.total != games {
            violations.push(Violation::new(
                ViolationType::GameCount,
                team.to_string(),
                format!("{team} has {} matchups, needs {games}", tally.total),
            ));
        }
        for category in MatchupCategory::ALL {
            let quota = usize::from(rules.category_quotas.quota(category));
            let have = tally.by_category[category.index()];
            if have != quota {
                violations.push(Violation::new(
                    ViolationType::CategoryQuota,
                    team.to_string(),
                    format!("{team} has {have} {category} matchups, quota is {quota}"),
                ));
            }
        }
        if tally.in_group_home * 2 != tally.by_category[MatchupCategory::InGroup.index()] {
            violations.push(Violation::new(
                ViolationType::HomeAwayBalance,
                team.to_string(),
                format!("{team} hosts {} of its in-group games", tally.in_group_home),
            ));
        }
        if tally.home < low || tally.home > high {
            violations.push(Violation::new(
                ViolationType::HomeAwayBalance,
                team.to_string(),
                format!("{team} hosts {} games, expected {low} or {high}", tally.home),
            ));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

#[derive(Debug, Default)]
struct TeamTally {
    total: usize,
    home: usize,
    in_group_home: usize,
    by_category: [usize; 3],
}

impl TeamTally {
    fn record(&mut self, category: MatchupCategory, home: bool) {
        self.total += 1;
        self.by_category[category.index()] += 1;
        if home {
            self.home += 1;
            if category == MatchupCategory::InGroup {
                self.in_group_home += 1;
            }
        }
    }
}

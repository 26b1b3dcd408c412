//! Season reference data: league, rules and the generated matchup pool.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{
    pair_key, League, LeagueRules, Matchup, MatchupId, Schedule, TeamId, Week, WeekInfo,
};

/// Immutable inputs shared by the solver, the pipeline and editing sessions.
///
/// Matchup ids equal their index in `matchups`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SeasonData")]
pub struct Season {
    pub year: u16,
    pub league: League,
    pub rules: LeagueRules,
    pub matchups: Vec<Matchup>,
    #[serde(skip_serializing)]
    team_ids: Vec<TeamId>,
}

/// Serialized form of a [`Season`]; the team index is rebuilt on load.
#[derive(Deserialize)]
struct SeasonData {
    year: u16,
    league: League,
    rules: LeagueRules,
    matchups: Vec<Matchup>,
}

impl From<SeasonData> for Season {
    fn from(data: SeasonData) -> Self {
        Season::new(data.year, data.league, data.rules, data.matchups)
    }
}

impl Season {
    pub fn new(year: u16, league: League, rules: LeagueRules, matchups: Vec<Matchup>) -> Self {
        let team_ids = league.team_ids();
        Self {
            year,
            league,
            rules,
            matchups,
            team_ids,
        }
    }

    pub fn matchup(&self, id: MatchupId) -> Option<&Matchup> {
        self.matchups.get(id.index()).filter(|m| m.id == id)
    }

    /// Teams in ascending id order.
    pub fn team_ids(&self) -> &[TeamId] {
        &self.team_ids
    }

    pub fn team_count(&self) -> usize {
        self.team_ids.len()
    }

    /// Dense index of a team.
    #[inline]
    pub fn team_index(&self, team: TeamId) -> Option<usize> {
        self.team_ids.binary_search(&team).ok()
    }

    /// Number of weeks in the season.
    #[inline]
    pub fn week_count(&self) -> usize {
        usize::from(self.rules.weeks)
    }

    /// Whether `week` belongs to the season.
    #[inline]
    pub fn contains_week(&self, week: Week) -> bool {
        week.0 >= 1 && week.0 <= self.rules.weeks
    }

    /// All weeks in order.
    pub fn weeks(&self) -> impl Iterator<Item = Week> {
        (1..=self.rules.weeks).map(Week)
    }

    /// Games a week can hold (every team playing).
    pub fn max_games(&self, _week: Week) -> usize {
        self.team_count() / 2
    }

    /// Fewest games a week may hold given the bye rules.
    pub fn min_games(&self, week: Week) -> usize {
        let n = self.team_count();
        if self.rules.is_bye_week(week) {
            n.saturating_sub(usize::from(self.rules.max_byes_per_week))
                .div_ceil(2)
        } else {
            n / 2
        }
    }

    /// Byes a week can hold.
    pub fn bye_capacity(&self, week: Week) -> usize {
        if self.rules.is_bye_week(week) {
            usize::from(self.rules.max_byes_per_week).min(self.team_count())
        } else {
            0
        }
    }

    /// Static and schedule-dependent flags of a week.
    pub fn week_info(&self, week: Week, schedule: &Schedule) -> WeekInfo {
        WeekInfo {
            week,
            fixed: schedule.is_fixed(week),
            bye_eligible: self.rules.is_bye_week(week),
            closed: week < schedule.frontier,
        }
    }

    /// Matchups involving a team.
    pub fn matchups_of(&self, team: TeamId) -> impl Iterator<Item = &Matchup> {
        self.matchups.iter().filter(move |m| m.involves(team))
    }

    /// Number of matchups between each unordered pair.
    pub fn pair_counts(&self) -> BTreeMap<(TeamId, TeamId), usize> {
        let mut counts = BTreeMap::new();
        for m in &self.matchups {
            *counts.entry(m.pair()).or_insert(0) += 1;
        }
        counts
    }

    /// Pairs that meet more than once.
    pub fn repeat_pairs(&self) -> BTreeSet<(TeamId, TeamId)> {
        self.pair_counts()
            .into_iter()
            .filter(|&(_, n)| n > 1)
            .map(|(pair, _)| pair)
            .collect()
    }

    /// Matchups between two teams.
    pub fn matchups_between(&self, a: TeamId, b: TeamId) -> Vec<&Matchup> {
        let key = pair_key(a, b);
        self.matchups.iter().filter(|m| m.pair() == key).collect()
    }

    /// Matchups without a game in `schedule`.
    pub fn unscheduled(&self, schedule: &Schedule) -> Vec<MatchupId> {
        let placed: BTreeSet<MatchupId> = schedule.games.iter().map(|g| g.matchup).collect();
        self.matchups
            .iter()
            .map(|m| m.id)
            .filter(|id| !placed.contains(id))
            .collect()
    }
}

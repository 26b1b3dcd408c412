//! Team and league reference data.
//!
//! Teams belong to exactly one division, and each division belongs to one
//! conference. Both levels are "groups" in the matchup rules: in-group games
//! are division games, near cross-group games stay inside the conference and
//! far cross-group games cross conferences.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Team identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub u16);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Group membership of a team: division `division` of conference `conference`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupRef {
    pub conference: u8,
    pub division: u8,
}

impl GroupRef {
    pub fn new(conference: u8, division: u8) -> Self {
        Self {
            conference,
            division,
        }
    }
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}/D{}", self.conference, self.division)
    }
}

/// A team (immutable reference data).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Unique team identifier.
    pub id: TeamId,
    /// Short code (e.g., "KC").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Division / conference membership.
    pub group: GroupRef,
    /// Prior-season finish within the division (1 = first).
    pub prior_rank: u8,
}

impl Team {
    /// Creates a team ranked first in its division.
    pub fn new(id: u16, code: impl Into<String>, group: GroupRef) -> Self {
        Self {
            id: TeamId(id),
            code: code.into(),
            name: String::new(),
            group,
            prior_rank: 1,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the prior-season division rank.
    pub fn with_rank(mut self, rank: u8) -> Self {
        self.prior_rank = rank;
        self
    }
}

/// Final division ranks of the previous season, keyed by team.
///
/// `season` is the year of the season being scheduled; rotations are keyed
/// on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorStandings {
    pub season: u16,
    pub ranks: BTreeMap<TeamId, u8>,
}

impl PriorStandings {
    pub fn new(season: u16) -> Self {
        Self {
            season,
            ranks: BTreeMap::new(),
        }
    }

    /// Records a team's division rank.
    pub fn with_rank(mut self, team: TeamId, rank: u8) -> Self {
        self.ranks.insert(team, rank);
        self
    }

    /// Takes ranks from the teams' own `prior_rank` fields.
    pub fn from_league(season: u16, league: &League) -> Self {
        Self {
            season,
            ranks: league.teams.iter().map(|t| (t.id, t.prior_rank)).collect(),
        }
    }
}

/// The set of teams taking part in a season.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
    pub teams: Vec<Team>,
}

impl League {
    pub fn new(teams: Vec<Team>) -> Self {
        Self { teams }
    }

    /// Builds a uniform league: `conferences × divisions × per_division`
    /// teams, numbered consecutively and ranked 1..=per_division inside each
    /// division.
    pub fn uniform(conferences: u8, divisions: u8, per_division: u8) -> Self {
        let mut teams = Vec::new();
        let mut next_id: u16 = 0;
        for c in 0..conferences {
            for d in 0..divisions {
                for r in 0..per_division {
                    let group = GroupRef::new(c, d);
                    teams.push(
                        Team::new(next_id, format!("C{c}D{d}R{}", r + 1), group).with_rank(r + 1),
                    );
                    next_id += 1;
                }
            }
        }
        Self { teams }
    }

    /// Returns a copy with ranks replaced by `standings` (teams missing from
    /// the standings keep their current rank).
    pub fn with_standings(&self, standings: &PriorStandings) -> Self {
        let teams = self
            .teams
            .iter()
            .map(|t| {
                let mut t = t.clone();
                if let Some(&rank) = standings.ranks.get(&t.id) {
                    t.prior_rank = rank;
                }
                t
            })
            .collect();
        Self { teams }
    }

    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, id: TeamId) -> bool {
        self.team(id).is_some()
    }

    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    /// Team ids in ascending order.
    pub fn team_ids(&self) -> Vec<TeamId> {
        let mut ids: Vec<TeamId> = self.teams.iter().map(|t| t.id).collect();
        ids.sort();
        ids
    }

    /// Distinct conference indices, ascending.
    pub fn conferences(&self) -> Vec<u8> {
        let set: BTreeSet<u8> = self.teams.iter().map(|t| t.group.conference).collect();
        set.into_iter().collect()
    }

    /// Distinct divisions, ascending.
    pub fn groups(&self) -> Vec<GroupRef> {
        let set: BTreeSet<GroupRef> = self.teams.iter().map(|t| t.group).collect();
        set.into_iter().collect()
    }

    /// Division indices of one conference, ascending.
    pub fn divisions_in(&self, conference: u8) -> Vec<u8> {
        let set: BTreeSet<u8> = self
            .teams
            .iter()
            .filter(|t| t.group.conference == conference)
            .map(|t| t.group.division)
            .collect();
        set.into_iter().collect()
    }

    /// Members of a division ordered by prior rank, then id.
    pub fn group_members(&self, group: GroupRef) -> Vec<&Team> {
        let mut members: Vec<&Team> = self.teams.iter().filter(|t| t.group == group).collect();
        members.sort_by_key(|t| (t.prior_rank, t.id));
        members
    }

    /// Group of a team.
    pub fn group_of(&self, id: TeamId) -> Option<GroupRef> {
        self.team(id).map(|t| t.group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_league_shape() {
        let league = League::uniform(2, 4, 4);
        assert_eq!(league.team_count(), 32);
        assert_eq!(league.conferences(), vec![0, 1]);
        assert_eq!(league.divisions_in(1), vec![0, 1, 2, 3]);
        assert_eq!(league.groups().len(), 8);

        let members = league.group_members(GroupRef::new(1, 2));
        assert_eq!(members.len(), 4);
        let ranks: Vec<u8> = members.iter().map(|t| t.prior_rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_with_standings_overrides_ranks() {
        let league = League::uniform(2, 2, 2);
        let standings = PriorStandings::new(2025)
            .with_rank(TeamId(0), 2)
            .with_rank(TeamId(1), 1);
        let ranked = league.with_standings(&standings);

        assert_eq!(ranked.team(TeamId(0)).unwrap().prior_rank, 2);
        assert_eq!(ranked.team(TeamId(1)).unwrap().prior_rank, 1);
        let order: Vec<TeamId> = ranked
            .group_members(GroupRef::new(0, 0))
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(order, vec![TeamId(1), TeamId(0)]);
    }

    #[test]
    fn test_standings_from_league() {
        let league = League::uniform(2, 2, 2);
        let standings = PriorStandings::from_league(2026, &league);
        assert_eq!(standings.season, 2026);
        assert_eq!(standings.ranks.len(), 8);
        assert_eq!(standings.ranks[&TeamId(1)], 2);
    }
}

//! Matchup model.
//!
//! A matchup is a required, directed (home/away) pairing generated before
//! any week assignment. Binding a matchup to a week makes it a game.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::TeamId;

/// Matchup identifier (its index in the season's matchup pool).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchupId(pub u16);

impl MatchupId {
    #[inline]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Display for MatchupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}

/// Rule tier a matchup was generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MatchupCategory {
    /// Same division.
    InGroup,
    /// Same conference, other division.
    NearCross,
    /// Other conference.
    FarCross,
}

impl MatchupCategory {
    pub const ALL: [MatchupCategory; 3] = [
        MatchupCategory::InGroup,
        MatchupCategory::NearCross,
        MatchupCategory::FarCross,
    ];

    /// Placement priority (lower = placed first).
    pub fn priority(self) -> u8 {
        match self {
            MatchupCategory::InGroup => 0,
            MatchupCategory::NearCross => 1,
            MatchupCategory::FarCross => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MatchupCategory::InGroup => "in-group",
            MatchupCategory::NearCross => "cross-group-near",
            MatchupCategory::FarCross => "cross-group-far",
        }
    }

    /// Dense index into per-category tables.
    #[inline]
    pub fn index(self) -> usize {
        usize::from(self.priority())
    }
}

impl fmt::Display for MatchupCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A required directed pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matchup {
    pub id: MatchupId,
    pub home: TeamId,
    pub away: TeamId,
    pub category: MatchupCategory,
    /// Rotation round from the generator. Every round is a perfect matching
    /// of the league; `None` for hand-built pools.
    pub round: Option<u8>,
}

impl Matchup {
    pub fn new(id: u16, home: TeamId, away: TeamId, category: MatchupCategory) -> Self {
        Self {
            id: MatchupId(id),
            home,
            away,
            category,
            round: None,
        }
    }

    /// Sets the rotation round.
    pub fn with_round(mut self, round: u8) -> Self {
        self.round = Some(round);
        self
    }

    #[inline]
    pub fn involves(&self, team: TeamId) -> bool {
        self.home == team || self.away == team
    }

    /// The other participant, if `team` takes part.
    pub fn opponent(&self, team: TeamId) -> Option<TeamId> {
        if self.home == team {
            Some(self.away)
        } else if self.away == team {
            Some(self.home)
        } else {
            None
        }
    }

    /// Unordered pair key (smaller id first).
    #[inline]
    pub fn pair(&self) -> (TeamId, TeamId) {
        pair_key(self.home, self.away)
    }

    #[inline]
    pub fn teams(&self) -> [TeamId; 2] {
        [self.home, self.away]
    }
}

impl fmt::Display for Matchup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}@{} ({})", self.id, self.away, self.home, self.category)
    }
}

/// Unordered pair key for two teams.
#[inline]
pub fn pair_key(a: TeamId, b: TeamId) -> (TeamId, TeamId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matchup_opponent_and_pair() {
        let m = Matchup::new(0, TeamId(7), TeamId(3), MatchupCategory::InGroup).with_round(2);
        assert_eq!(m.opponent(TeamId(7)), Some(TeamId(3)));
        assert_eq!(m.opponent(TeamId(3)), Some(TeamId(7)));
        assert_eq!(m.opponent(TeamId(1)), None);
        assert_eq!(m.pair(), (TeamId(3), TeamId(7)));
        assert_eq!(m.round, Some(2));
        assert!(m.involves(TeamId(3)));
    }

    #[test]
    fn test_category_priority_order() {
        let mut cats = vec![
            MatchupCategory::FarCross,
            MatchupCategory::InGroup,
            MatchupCategory::NearCross,
        ];
        cats.sort_by_key(|c| c.priority());
        assert_eq!(cats, MatchupCategory::ALL.to_vec());
    }
}

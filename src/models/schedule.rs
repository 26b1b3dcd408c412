//! Schedule (solution) model.
//!
//! A schedule binds matchups to weeks. It may be partial while a human is
//! editing it; the solver only returns complete schedules. Byes are stored
//! only when reserved explicitly; in closed weeks a team without a game is
//! on an implicit bye.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::{MatchupId, TeamId, Week};

/// Game identifier, unique within one schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub u32);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G{}", self.0)
    }
}

/// Recorded final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub home_score: u16,
    pub away_score: u16,
}

/// A matchup bound to a week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub matchup: MatchupId,
    pub week: Week,
    /// Result, once played.
    #[serde(default)]
    pub outcome: Option<GameOutcome>,
}

/// A team off in a week.
///
/// Ordered by week, then team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Bye {
    pub week: Week,
    pub team: TeamId,
}

impl Bye {
    pub fn new(team: TeamId, week: Week) -> Self {
        Self { week, team }
    }
}

/// A locked week given before solving, as (home, away) pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedWeek {
    pub week: Week,
    pub games: Vec<(TeamId, TeamId)>,
}

impl FixedWeek {
    pub fn new(week: Week) -> Self {
        Self {
            week,
            games: Vec::new(),
        }
    }

    /// Adds a game.
    pub fn with_game(mut self, home: TeamId, away: TeamId) -> Self {
        self.games.push((home, away));
        self
    }
}

/// Games and byes of one season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Games in creation order (ascending id).
    pub games: Vec<Game>,
    /// Explicitly reserved byes.
    #[serde(default)]
    pub byes: BTreeSet<Bye>,
    /// Locked weeks.
    #[serde(default)]
    pub fixed_weeks: BTreeSet<Week>,
    /// First week still open for edits.
    #[serde(default)]
    pub frontier: Week,
    #[serde(default)]
    next_game_id: u32,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            games: Vec::new(),
            byes: BTreeSet::new(),
            fixed_weeks: BTreeSet::new(),
            frontier: Week::FIRST,
            next_game_id: 0,
        }
    }
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a week as locked.
    pub fn with_fixed_week(mut self, week: Week) -> Self {
        self.fixed_weeks.insert(week);
        self
    }

    /// Adds a game and returns its id.
    pub fn add_game(&mut self, matchup: MatchupId, week: Week) -> GameId {
        let id = GameId(self.next_game_id);
        self.next_game_id += 1;
        self.games.push(Game {
            id,
            matchup,
            week,
            outcome: None,
        });
        id
    }

    /// Removes a game, returning it.
    pub fn remove_game(&mut self, id: GameId) -> Option<Game> {
        let pos = self.games.iter().position(|g| g.id == id)?;
        Some(self.games.remove(pos))
    }

    /// Adds a bye. Returns `false` if it was already present.
    pub fn add_bye(&mut self, team: TeamId, week: Week) -> bool {
        self.byes.insert(Bye::new(team, week))
    }

    /// Removes a bye. Returns `false` if it was absent.
    pub fn remove_bye(&mut self, team: TeamId, week: Week) -> bool {
        self.byes.remove(&Bye::new(team, week))
    }

    pub fn has_bye(&self, team: TeamId, week: Week) -> bool {
        self.byes.contains(&Bye::new(team, week))
    }

    /// Records a result. Returns `false` for an unknown game.
    pub fn record_outcome(&mut self, id: GameId, outcome: GameOutcome) -> bool {
        match self.games.iter_mut().find(|g| g.id == id) {
            Some(game) => {
                game.outcome = Some(outcome);
                true
            }
            None => false,
        }
    }

    pub fn game(&self, id: GameId) -> Option<&Game> {
        self.games.iter().find(|g| g.id == id)
    }

    /// The game a matchup is bound to, if any.
    pub fn game_for_matchup(&self, matchup: MatchupId) -> Option<&Game> {
        self.games.iter().find(|g| g.matchup == matchup)
    }

    /// Games of one week.
    pub fn games_in_week(&self, week: Week) -> Vec<&Game> {
        self.games.iter().filter(|g| g.week == week).collect()
    }

    /// Explicit byes of one team.
    pub fn byes_of(&self, team: TeamId) -> Vec<Week> {
        self.byes
            .iter()
            .filter(|b| b.team == team)
            .map(|b| b.week)
            .collect()
    }

    /// Whether a week is locked.
    #[inline]
    pub fn is_fixed(&self, week: Week) -> bool {
        self.fixed_weeks.contains(&week)
    }

    /// Whether a week is before the frontier or locked.
    #[inline]
    pub fn is_closed(&self, week: Week) -> bool {
        week < self.frontier || self.is_fixed(week)
    }

    /// Number of games.
    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    /// Serializes the schedule to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes a schedule from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// An invariant a schedule breaks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Related entity (team, week, matchup or pair).
    pub entity_id: String,
    /// Human-readable description.
    pub message: String,
    /// Severity (0-100, higher = worse).
    pub severity: i32,
}

/// Classification of schedule invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ViolationType {
    /// A matchup is unscheduled or scheduled twice.
    MatchupCoverage,
    /// A team's game count differs from its requirement.
    GameCount,
    /// A team plays twice (or plays and rests) in one week.
    DoubleBooking,
    /// A week holds too many or too few games.
    WeekCapacity,
    /// A bye falls outside the bye window.
    ByeWindow,
    /// Too many teams rest in one week.
    ByeCapacity,
    /// A team's bye count differs from its requirement.
    ByeCount,
    /// Two meetings of a pair are closer than the minimum gap.
    RematchGap,
    /// A weekly category quota is not met.
    CategoryQuota,
    /// A team's home and away counts are unbalanced.
    HomeAwayBalance,
    /// A team exceeds the road streak limit.
    RoadStreak,
}

impl ViolationType {
    pub fn label(self) -> &'static str {
        match self {
            ViolationType::MatchupCoverage => "matchup coverage",
            ViolationType::GameCount => "game count",
            ViolationType::DoubleBooking => "double booking",
            ViolationType::WeekCapacity => "week capacity",
            ViolationType::ByeWindow => "bye window",
            ViolationType::ByeCapacity => "bye capacity",
            ViolationType::ByeCount => "bye count",
            ViolationType::RematchGap => "rematch gap",
            ViolationType::CategoryQuota => "category quota",
            ViolationType::HomeAwayBalance => "home/away balance",
            ViolationType::RoadStreak => "road streak",
        }
    }

    fn severity(self) -> i32 {
        match self {
            ViolationType::MatchupCoverage | ViolationType::DoubleBooking => 100,
            ViolationType::GameCount | ViolationType::WeekCapacity => 90,
            ViolationType::ByeCount | ViolationType::ByeWindow | ViolationType::ByeCapacity => 80,
            ViolationType::RematchGap | ViolationType::CategoryQuota => 70,
            ViolationType::HomeAwayBalance | ViolationType::RoadStreak => 50,
        }
    }
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Violation {
    /// Creates a violation with the type's default severity.
    pub fn new(
        violation_type: ViolationType,
        entity_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            entity_id: entity_id.into(),
            message: message.into(),
            severity: violation_type.severity(),
        }
    }

    /// Creates a double booking violation.
    pub fn double_booking(team: TeamId, week: Week) -> Self {
        Self::new(
            ViolationType::DoubleBooking,
            team.to_string(),
            format!("{team} is booked more than once in {week}"),
        )
    }

    /// Creates a rematch gap violation.
    pub fn rematch_gap(pair: (TeamId, TeamId), first: Week, second: Week, gap: u8) -> Self {
        Self::new(
            ViolationType::RematchGap,
            format!("{}-{}", pair.0, pair.1),
            format!(
                "{} and {} meet in {first} and {second}, less than {gap} weeks apart",
                pair.0, pair.1
            ),
        )
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.violation_type, self.message)
    }
}

//! Season scheduling domain models.
//!
//! Reference data (teams, rules, the matchup pool) is immutable once a
//! [`Season`] is built. [`Schedule`] is the mutable value that editing
//! sessions and the solver produce; [`Occupancy`] is the indexed view used
//! while placing games.
//!
//! # Domain Mappings
//!
//! | league-schedule | Football | Basketball | Generic tournament |
//! |-----------------|----------|------------|--------------------|
//! | Group | Division | Division | Pool |
//! | Conference | Conference | Conference | Bracket half |
//! | Matchup | Fixture | Fixture | Pairing |
//! | Week | Week | Round | Round |

mod matchup;
mod occupancy;
mod rules;
mod schedule;
mod season;
mod team;
mod week;

pub use matchup::{pair_key, Matchup, MatchupCategory, MatchupId};
pub use occupancy::{Blocker, Occupancy, Slot};
pub use rules::{Cascade, CategoryQuotas, FeasibilityConfig, LeagueRules, WeeklyQuota};
pub use schedule::{
    Bye, FixedWeek, Game, GameId, GameOutcome, Schedule, Violation, ViolationType,
};
pub use season::Season;
pub use team::{GroupRef, League, PriorStandings, Team, TeamId};
pub use week::{Week, WeekInfo, WeekRange};

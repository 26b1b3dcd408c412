//! Season schedule construction for round-robin style leagues.
//!
//! Builds a season in two steps and keeps it feasible while people edit it:
//! the required matchups are generated from rotation rules and prior
//! standings, then every matchup is assigned to a week. After each manual
//! edit, a staged pipeline reports whether the rest of the season can still
//! be completed.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Team`, `League`, `LeagueRules`, `Matchup`,
//!   `Season`, `Schedule`, `Occupancy`, `Violation`
//! - **`validation`**: Input integrity checks (league shape, ranks, rules, fixed weeks)
//! - **`generator`**: Rotation-based matchup pool generation and pool checks
//! - **`solver`**: Week assignment (relaxation, rotation layout, greedy) and `verify`
//! - **`feasibility`**: Incremental feasibility pipeline and `ConstraintReport`
//! - **`session`**: Single-owner editing sessions with atomic mutations
//! - **`stats`**: Per-team and per-week schedule summaries
//! - **`error`**: `ScheduleError`, `MutationError`, `ConfigError`
//!
//! # Architecture
//!
//! Reference data (`Season`) is immutable and shared; `Schedule` is the only
//! mutable state. The generator and the solver are bounded one-shot
//! computations; the pipeline is a pure function of (season, schedule).
//!
//! # References
//!
//! - de Werra (1981), "Scheduling in sports"
//! - Kendall et al. (2010), "Scheduling in sports: An annotated bibliography"
//! - Rasmussen & Trick (2008), "Round robin scheduling: a survey"

pub mod error;
pub mod feasibility;
pub mod generator;
pub mod models;
pub mod session;
pub mod solver;
pub mod stats;
pub mod validation;

pub use error::{ConfigError, MutationError, ScheduleError};
pub use feasibility::{ConstraintReport, Pipeline};
pub use session::{Mutation, ScheduleSession};
pub use solver::{generate_schedule, CancelToken, SolverConfig};

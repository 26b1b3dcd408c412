//! Error types.
//!
//! Batch generation fails with [`ScheduleError`]; single edits are refused
//! with [`MutationError`] and leave the schedule untouched. Feasibility
//! problems found after an accepted edit are report data, not errors.

use thiserror::Error;

use crate::models::{GameId, MatchupId, TeamId, Violation, ViolationType, Week};
use crate::validation::ValidationError;

/// Failure of a batch generation.
#[derive(Debug, Clone, Error)]
pub enum ScheduleError {
    /// The rules cannot yield a valid pool, or capacity is arithmetically short.
    #[error("structurally infeasible ({class}): demand {demand}, supply {supply}; {detail}")]
    StructuralInfeasibility {
        class: ViolationType,
        demand: usize,
        supply: usize,
        detail: String,
    },

    /// Every strategy left matchups unplaced.
    #[error("{} matchups left unplaced; failing invariants: {blame:?}", .unplaced.len())]
    PartialResidual {
        /// Matchups of the best attempt that have no week.
        unplaced: Vec<MatchupId>,
        /// Invariant classes responsible, most frequent first.
        blame: Vec<ViolationType>,
        /// Violations of the best attempt.
        violations: Vec<Violation>,
    },

    /// The cancel token fired.
    #[error("schedule generation cancelled")]
    Cancelled,

    /// League, standings, rules or fixed weeks are malformed.
    #[error("invalid input: {}", summarize(.0))]
    InvalidInput(Vec<ValidationError>),
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ScheduleError {
    /// Invariant class behind the failure, if there is one.
    pub fn class(&self) -> Option<ViolationType> {
        match self {
            ScheduleError::StructuralInfeasibility { class, .. } => Some(*class),
            ScheduleError::PartialResidual { blame, .. } => blame.first().copied(),
            _ => None,
        }
    }
}

/// A refused edit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("unknown matchup {0}")]
    UnknownMatchup(MatchupId),

    #[error("unknown game {0}")]
    UnknownGame(GameId),

    #[error("unknown team {0}")]
    UnknownTeam(TeamId),

    #[error("{0} is outside the season")]
    WeekOutOfRange(Week),

    #[error("{0} is locked")]
    WeekLocked(Week),

    #[error("matchup {matchup} is already scheduled in {week}")]
    MatchupAlreadyScheduled { matchup: MatchupId, week: Week },

    #[error("{team} already has a game or bye in {week}")]
    TeamUnavailable { team: TeamId, week: Week },

    #[error("{week} is outside the bye window ({team})")]
    ByeOutsideWindow { team: TeamId, week: Week },

    #[error("{0} has no byes left")]
    ByeQuotaExceeded(TeamId),

    #[error("{0} has no bye slots left")]
    ByeSlotsFull(Week),

    #[error("{team} has no reserved bye in {week}")]
    ByeNotFound { team: TeamId, week: Week },
}

/// Failure loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to write config: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    /// The document parsed but its constants contradict each other.
    #[error("inconsistent rules: {}", summarize(.0))]
    Invalid(Vec<ValidationError>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_message_carries_shortfall() {
        let err = ScheduleError::StructuralInfeasibility {
            class: ViolationType::ByeCapacity,
            demand: 32,
            supply: 30,
            detail: "bye window too small".into(),
        };
        let text = err.to_string();
        assert!(text.contains("bye capacity"));
        assert!(text.contains("demand 32, supply 30"));
        assert_eq!(err.class(), Some(ViolationType::ByeCapacity));
    }

    #[test]
    fn test_residual_message() {
        let err = ScheduleError::PartialResidual {
            unplaced: vec![MatchupId(3), MatchupId(9)],
            blame: vec![ViolationType::RematchGap],
            violations: Vec::new(),
        };
        assert!(err.to_string().starts_with("2 matchups left unplaced"));
        assert_eq!(err.class(), Some(ViolationType::RematchGap));
    }

    #[test]
    fn test_mutation_messages() {
        let err = MutationError::TeamUnavailable {
            team: TeamId(4),
            week: Week(9),
        };
        assert_eq!(err.to_string(), "T4 already has a game or bye in week 9");
        assert_eq!(
            MutationError::WeekLocked(Week(1)).to_string(),
            "week 1 is locked"
        );
    }
}

//! Input validation for season scheduling.
//!
//! Checks structural integrity of the league, standings, rules and fixed
//! weeks before any matchup is generated. Detects:
//! - Duplicate team ids or codes
//! - Uneven or odd-sized conferences, divisions and groups
//! - Missing, duplicate or out-of-range division ranks
//! - Inconsistent rule constants
//! - Fixed weeks referencing unknown teams or double-booking a team
//!
//! All issues are collected; validation never stops at the first one.

use crate::models::{FixedWeek, League, LeagueRules, PriorStandings, TeamId};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two teams share an id or code.
    DuplicateId,
    /// A reference names a team outside the league.
    UnknownTeam,
    /// Conferences, divisions or groups are odd-sized or unequal.
    UnevenStructure,
    /// Division ranks are not a permutation of 1..=size.
    InvalidRank,
    /// Rule constants contradict each other.
    InvalidRules,
    /// A fixed week is out of range or books a team twice.
    InvalidFixedWeek,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

fn finish(errors: Vec<ValidationError>) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates every input of a batch generation.
///
/// Ranks are checked after `standings` have been applied to the league.
pub fn validate_input(
    league: &League,
    standings: &PriorStandings,
    rules: &LeagueRules,
    fixed: &[FixedWeek],
) -> ValidationResult {
    let mut errors = Vec::new();
    for team in standings.ranks.keys() {
        if !league.contains(*team) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownTeam,
                format!("Standings reference unknown team {team}"),
            ));
        }
    }
    let ranked = league.with_standings(standings);
    for result in [
        validate_league(&ranked),
        validate_rules(rules),
        validate_fixed_weeks(&ranked, rules, fixed),
    ] {
        if let Err(mut e) = result {
            errors.append(&mut e);
        }
    }
    finish(errors)
}

/// Validates league structure.
///
/// Checks:
/// 1. No duplicate team ids or codes
/// 2. An even number (at least 2) of conferences
/// 3. Every conference has the same even number of divisions
/// 4. Every division has the same even number (at least 2) of teams
/// 5. Division ranks are exactly 1..=size
pub fn validate_league(league: &League) -> ValidationResult {
    let mut errors = Vec::new();

    let mut ids = HashSet::new();
    let mut codes = HashSet::new();
    for team in &league.teams {
        if !ids.insert(team.id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate team ID: {}", team.id),
            ));
        }
        if !team.code.is_empty() && !codes.insert(team.code.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate team code: {}", team.code),
            ));
        }
    }

    let conferences = league.conferences();
    if conferences.len() < 2 || conferences.len() % 2 != 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::UnevenStructure,
            format!(
                "League needs an even number of conferences (at least 2), found {}",
                conferences.len()
            ),
        ));
    }

    let division_counts: BTreeSet<usize> = conferences
        .iter()
        .map(|&c| league.divisions_in(c).len())
        .collect();
    if division_counts.len() > 1 {
        errors.push(ValidationError::new(
            ValidationErrorKind::UnevenStructure,
            format!("Conferences have different division counts: {division_counts:?}"),
        ));
    } else if let Some(&d) = division_counts.first() {
        if d < 2 || d % 2 != 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnevenStructure,
                format!("Conferences need an even number of divisions (at least 2), found {d}"),
            ));
        }
    }

    let groups = league.groups();
    let sizes: BTreeSet<usize> = groups
        .iter()
        .map(|&g| league.group_members(g).len())
        .collect();
    if sizes.len() > 1 {
        errors.push(ValidationError::new(
            ValidationErrorKind::UnevenStructure,
            format!("Divisions have different sizes: {sizes:?}"),
        ));
    } else if let Some(&s) = sizes.first() {
        if s < 2 || s % 2 != 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnevenStructure,
                format!("Divisions need an even number of teams (at least 2), found {s}"),
            ));
        }
    }

    for group in groups {
        let members = league.group_members(group);
        let ranks: Vec<u8> = members.iter().map(|t| t.prior_rank).collect();
        let expected: Vec<u8> = (1..=members.len() as u8).collect();
        if ranks != expected {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidRank,
                format!("Division {group} ranks {ranks:?} are not 1..={}", members.len()),
            ));
        }
    }

    finish(errors)
}

/// Validates rule constants.
pub fn validate_rules(rules: &LeagueRules) -> ValidationResult {
    let mut errors = Vec::new();
    let mut invalid = |message: String| {
        errors.push(ValidationError::new(ValidationErrorKind::InvalidRules, message));
    };

    if rules.weeks == 0 {
        invalid("Season has no weeks".into());
    }
    if rules.games_per_team == 0 {
        invalid("Teams must play at least one game".into());
    }
    if u16::from(rules.games_per_team) != rules.category_quotas.total() {
        invalid(format!(
            "Category quotas sum to {} but games per team is {}",
            rules.category_quotas.total(),
            rules.games_per_team
        ));
    }
    if rules.byes_per_team > 0 {
        let window = rules.bye_window;
        if window.is_empty() || window.start.0 == 0 || window.end.0 > rules.weeks {
            invalid(format!(
                "Bye window {window} does not fit a {}-week season",
                rules.weeks
            ));
        }
        if rules.max_byes_per_week == 0 {
            invalid("Byes are required but no week may host one".into());
        }
    }
    for (i, quota) in rules.weekly_quotas.iter().enumerate() {
        if quota.weeks.is_empty() || quota.weeks.start.0 == 0 || quota.weeks.end.0 > rules.weeks
        {
            invalid(format!("Weekly quota #{i} covers {} outside the season", quota.weeks));
        }
        if let Some(max) = quota.max {
            if max < quota.min {
                invalid(format!("Weekly quota #{i} has min {} above max {max}", quota.min));
            }
        }
    }

    finish(errors)
}

/// Validates fixed weeks against the league and rules.
pub fn validate_fixed_weeks(
    league: &League,
    rules: &LeagueRules,
    fixed: &[FixedWeek],
) -> ValidationResult {
    let mut errors = Vec::new();
    let mut seen_weeks = BTreeSet::new();

    for fw in fixed {
        if fw.week.0 == 0 || fw.week.0 > rules.weeks {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidFixedWeek,
                format!("Fixed {} is outside the season", fw.week),
            ));
        }
        if !seen_weeks.insert(fw.week) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidFixedWeek,
                format!("{} is fixed twice", fw.week),
            ));
        }

        let mut booked: BTreeMap<TeamId, usize> = BTreeMap::new();
        for &(home, away) in &fw.games {
            for team in [home, away] {
                if !league.contains(team) {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::UnknownTeam,
                        format!("Fixed {} references unknown team {team}", fw.week),
                    ));
                }
                *booked.entry(team).or_insert(0) += 1;
            }
            if home == away {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidFixedWeek,
                    format!("Fixed {} pairs {home} with itself", fw.week),
                ));
            }
        }
        for (team, count) in booked {
            if count > 1 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidFixedWeek,
                    format!("{team} plays {count} times in fixed {}", fw.week),
                ));
            }
        }
    }

    finish(errors)
}

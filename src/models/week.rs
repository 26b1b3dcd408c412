//! Week ordinals and week ranges.
//!
//! Weeks are 1-based ordinals within a season. A season of N weeks spans
//! `Week(1)..=Week(N)`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 1-based week ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Week(pub u8);

impl Week {
    /// The opening week.
    pub const FIRST: Week = Week(1);

    /// Creates a week from its ordinal.
    pub fn new(number: u8) -> Self {
        Self(number)
    }

    /// Week ordinal (1-based).
    #[inline]
    pub fn number(self) -> u8 {
        self.0
    }

    /// Zero-based index, for array-backed per-week tables.
    #[inline]
    pub fn index(self) -> usize {
        usize::from(self.0.saturating_sub(1))
    }

    /// The following week.
    #[inline]
    pub fn next(self) -> Week {
        Week(self.0.saturating_add(1))
    }

    /// Absolute distance in weeks.
    #[inline]
    pub fn distance(self, other: Week) -> u8 {
        self.0.abs_diff(other.0)
    }
}

impl Default for Week {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for Week {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "week {}", self.0)
    }
}

/// An inclusive range of weeks `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekRange {
    /// First week (inclusive).
    pub start: Week,
    /// Last week (inclusive).
    pub end: Week,
}

impl WeekRange {
    /// Creates a range from two ordinals.
    pub fn new(start: u8, end: u8) -> Self {
        Self {
            start: Week(start),
            end: Week(end),
        }
    }

    /// A range containing a single week.
    pub fn single(week: Week) -> Self {
        Self {
            start: week,
            end: week,
        }
    }

    #[inline]
    pub fn contains(&self, week: Week) -> bool {
        week >= self.start && week <= self.end
    }

    /// Number of weeks in the range (0 if inverted).
    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            usize::from(self.end.0 - self.start.0) + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates the weeks of the range in order.
    pub fn iter(&self) -> impl Iterator<Item = Week> {
        (self.start.0..=self.end.0).map(Week)
    }
}

impl fmt::Display for WeekRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "weeks {}-{}", self.start.0, self.end.0)
    }
}

/// Static and schedule-dependent flags of one week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekInfo {
    pub week: Week,
    /// Locked by a fixed assignment; no edits allowed.
    pub fixed: bool,
    /// Inside the bye window.
    pub bye_eligible: bool,
    /// Before the editing frontier.
    pub closed: bool,
}

impl WeekInfo {
    /// Whether games or byes may still be placed in this week.
    pub fn is_open(&self) -> bool {
        !self.fixed && !self.closed
    }
}

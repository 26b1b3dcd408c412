//! League rule constants.
//!
//! Everything the generator, solver and feasibility pipeline treat as
//! static configuration lives in [`LeagueRules`]. Defaults describe the
//! 32-team, 18-week season: 17 games, one bye between weeks 5 and 14 and at
//! most six teams off in any week.
//!
//! Rules load from TOML; missing keys fall back to the defaults.
//!
//! ```
//! use league_schedule::models::LeagueRules;
//!
//! let rules = LeagueRules::from_toml_str("max_byes_per_week = 4").unwrap();
//! assert_eq!(rules.max_byes_per_week, 4);
//! assert_eq!(rules.weeks, 18);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{MatchupCategory, Week, WeekRange};
use crate::error::ConfigError;
use crate::validation::validate_rules;

/// Static scheduling rules of a league.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeagueRules {
    /// Season length in weeks.
    pub weeks: u8,
    /// Games each team plays.
    pub games_per_team: u8,
    /// Byes each team takes.
    pub byes_per_team: u8,
    /// Weeks that may host byes.
    pub bye_window: WeekRange,
    /// Maximum teams on bye in one week (K).
    pub max_byes_per_week: u8,
    /// Minimum weeks between two meetings of the same pair.
    pub min_rematch_gap: u8,
    /// Per-team game counts by category.
    pub category_quotas: CategoryQuotas,
    /// Per-week category bounds.
    pub weekly_quotas: Vec<WeeklyQuota>,
    /// Longest allowed run of consecutive away games.
    pub max_road_streak: Option<u8>,
    /// Feasibility pipeline thresholds.
    pub feasibility: FeasibilityConfig,
}

impl Default for LeagueRules {
    fn default() -> Self {
        Self {
            weeks: 18,
            games_per_team: 17,
            byes_per_team: 1,
            bye_window: WeekRange::new(5, 14),
            max_byes_per_week: 6,
            min_rematch_gap: 4,
            category_quotas: CategoryQuotas::default(),
            weekly_quotas: Vec::new(),
            max_road_streak: None,
            feasibility: FeasibilityConfig::default(),
        }
    }
}

impl LeagueRules {
    /// Parses rules from a TOML document and checks them with
    /// [`validate_rules`].
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let rules: Self = toml::from_str(source)?;
        validate_rules(&rules).map_err(ConfigError::Invalid)?;
        Ok(rules)
    }

    /// Reads rules from a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Serializes the rules to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Sets the season length.
    pub fn with_weeks(mut self, weeks: u8) -> Self {
        self.weeks = weeks;
        self
    }

    /// Sets the per-team game count.
    pub fn with_games_per_team(mut self, games: u8) -> Self {
        self.games_per_team = games;
        self
    }

    /// Sets the bye window.
    pub fn with_bye_window(mut self, start: u8, end: u8) -> Self {
        self.bye_window = WeekRange::new(start, end);
        self
    }

    /// Sets the per-week bye cap.
    pub fn with_max_byes_per_week(mut self, max: u8) -> Self {
        self.max_byes_per_week = max;
        self
    }

    /// Sets the minimum rematch gap.
    pub fn with_min_rematch_gap(mut self, gap: u8) -> Self {
        self.min_rematch_gap = gap;
        self
    }

    /// Sets the per-team category quotas.
    pub fn with_category_quotas(mut self, quotas: CategoryQuotas) -> Self {
        self.category_quotas = quotas;
        self
    }

    /// Adds a weekly category quota.
    pub fn with_weekly_quota(mut self, quota: WeeklyQuota) -> Self {
        self.weekly_quotas.push(quota);
        self
    }

    /// Sets the road streak limit.
    pub fn with_max_road_streak(mut self, streak: u8) -> Self {
        self.max_road_streak = Some(streak);
        self
    }

    /// Sets the feasibility thresholds.
    pub fn with_feasibility(mut self, feasibility: FeasibilityConfig) -> Self {
        self.feasibility = feasibility;
        self
    }

    /// Last week of the season.
    pub fn last_week(&self) -> Week {
        Week(self.weeks)
    }

    /// All weeks of the season.
    pub fn season_weeks(&self) -> WeekRange {
        WeekRange::new(1, self.weeks)
    }

    /// Whether `week` may host byes.
    #[inline]
    pub fn is_bye_week(&self, week: Week) -> bool {
        self.bye_window.contains(week)
    }
}

/// Games per team by matchup category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryQuotas {
    pub in_group: u8,
    pub near_cross: u8,
    pub far_cross: u8,
}

impl Default for CategoryQuotas {
    fn default() -> Self {
        Self {
            in_group: 6,
            near_cross: 6,
            far_cross: 5,
        }
    }
}

impl CategoryQuotas {
    pub fn new(in_group: u8, near_cross: u8, far_cross: u8) -> Self {
        Self {
            in_group,
            near_cross,
            far_cross,
        }
    }

    /// Quota for one category.
    pub fn quota(&self, category: MatchupCategory) -> u8 {
        match category {
            MatchupCategory::InGroup => self.in_group,
            MatchupCategory::NearCross => self.near_cross,
            MatchupCategory::FarCross => self.far_cross,
        }
    }

    /// Sum over all categories.
    pub fn total(&self) -> u16 {
        u16::from(self.in_group) + u16::from(self.near_cross) + u16::from(self.far_cross)
    }
}

/// Bounds on the number of games of one category in each week of a range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyQuota {
    /// Weeks the bound applies to (each week separately).
    pub weeks: WeekRange,
    pub category: MatchupCategory,
    /// Minimum games of the category per week.
    #[serde(default)]
    pub min: u8,
    /// Maximum games of the category per week.
    #[serde(default)]
    pub max: Option<u8>,
}

impl WeeklyQuota {
    /// A quota with no bounds yet.
    pub fn new(weeks: WeekRange, category: MatchupCategory) -> Self {
        Self {
            weeks,
            category,
            min: 0,
            max: None,
        }
    }

    /// Sets the per-week minimum.
    pub fn with_min(mut self, min: u8) -> Self {
        self.min = min;
        self
    }

    /// Sets the per-week maximum.
    pub fn with_max(mut self, max: u8) -> Self {
        self.max = Some(max);
        self
    }

    /// Whether the quota constrains `week` for matchups of `category`.
    #[inline]
    pub fn applies(&self, week: Week, category: MatchupCategory) -> bool {
        self.category == category && self.weeks.contains(week)
    }
}

/// How pipeline stages chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cascade {
    /// Run every stage and merge the entries.
    #[default]
    Complete,
    /// Skip later stages once a stage reports a violation.
    ShortCircuit,
}

/// Feasibility pipeline thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeasibilityConfig {
    /// Slack at or below this margin is reported as tight.
    pub tight_margin: u16,
    /// Open weeks checked by the pairing stage.
    pub pairing_lookahead: u8,
    /// Rematch windows with fewer legal weeks than this are tight.
    pub rematch_tight_below: u8,
    pub cascade: Cascade,
}

impl Default for FeasibilityConfig {
    fn default() -> Self {
        Self {
            tight_margin: 2,
            pairing_lookahead: 3,
            rematch_tight_below: 3,
            cascade: Cascade::Complete,
        }
    }
}

impl FeasibilityConfig {
    pub fn with_tight_margin(mut self, margin: u16) -> Self {
        self.tight_margin = margin;
        self
    }

    pub fn with_pairing_lookahead(mut self, weeks: u8) -> Self {
        self.pairing_lookahead = weeks;
        self
    }

    pub fn with_cascade(mut self, cascade: Cascade) -> Self {
        self.cascade = cascade;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules() {
        let rules = LeagueRules::default();
        assert_eq!(rules.weeks, 18);
        assert_eq!(rules.games_per_team, 17);
        assert_eq!(rules.category_quotas.total(), 17);
        assert!(rules.is_bye_week(Week(5)));
        assert!(!rules.is_bye_week(Week(15)));
        assert_eq!(rules.feasibility.cascade, Cascade::Complete);
    }

    #[test]
    fn test_rules_from_toml() {
        let source = r#"
            weeks = 8
            games_per_team = 7
            max_byes_per_week = 4
            max_road_streak = 3

            [bye_window]
            start = 2
            end = 7

            [category_quotas]
            in_group = 2
            near_cross = 2
            far_cross = 3

            [[weekly_quotas]]
            weeks = { start = 8, end = 8 }
            category = "InGroup"
            min = 2

            [feasibility]
            cascade = "ShortCircuit"
        "#;
        let rules = LeagueRules::from_toml_str(source).unwrap();
        assert_eq!(rules.weeks, 8);
        assert_eq!(rules.bye_window, WeekRange::new(2, 7));
        assert_eq!(rules.category_quotas.total(), 7);
        assert_eq!(rules.max_road_streak, Some(3));
        assert_eq!(rules.weekly_quotas.len(), 1);
        assert_eq!(rules.weekly_quotas[0].min, 2);
        assert_eq!(rules.weekly_quotas[0].max, None);
        assert_eq!(rules.feasibility.cascade, Cascade::ShortCircuit);
        // Unspecified keys keep defaults.
        assert_eq!(rules.min_rematch_gap, 4);
        assert_eq!(rules.feasibility.pairing_lookahead, 3);
    }

    #[test]
    fn test_rules_toml_round_trip() {
        let rules = LeagueRules::default()
            .with_max_road_streak(3)
            .with_weekly_quota(
                WeeklyQuota::new(WeekRange::new(18, 18), MatchupCategory::InGroup).with_min(16),
            );
        let text = rules.to_toml_string().unwrap();
        let back = LeagueRules::from_toml_str(&text).unwrap();
        assert_eq!(back, rules);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = LeagueRules::from_toml_str("weeks = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_inconsistent_rules_are_rejected_on_load() {
        let source = r#"
            weeks = 10
            games_per_team = 9

            [bye_window]
            start = 5
            end = 14
        "#;
        match LeagueRules::from_toml_str(source) {
            Err(ConfigError::Invalid(errors)) => {
                // Quotas still sum to 17 and the window ends past week 10.
                assert_eq!(errors.len(), 2);
                assert!(errors.iter().any(|e| e.message.contains("Bye window")));
            }
            other => panic!("expected invalid rules, got {other:?}"),
        }
    }

    #[test]
    fn test_weekly_quota_applies() {
        let q = WeeklyQuota::new(WeekRange::new(17, 18), MatchupCategory::InGroup).with_max(16);
        assert!(q.applies(Week(18), MatchupCategory::InGroup));
        assert!(!q.applies(Week(16), MatchupCategory::InGroup));
        assert!(!q.applies(Week(18), MatchupCategory::FarCross));
    }
}

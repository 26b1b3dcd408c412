//! Schedule summary statistics.
//!
//! Computes per-team and per-week summaries of a (possibly partial)
//! schedule.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Completion | Scheduled games / matchups in the pool |
//! | Home/away split | Home and away games per team |
//! | Longest road trip | Most consecutive away games, byes ignored |
//! | Rest weeks | Explicit byes plus closed weeks without a game |
//! | Rematch spacing | Weeks between repeat meetings |
//! | Record | Wins, losses and ties from recorded outcomes |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{MatchupCategory, Occupancy, Schedule, Season, Slot, TeamId, Week};

/// Summary of one team.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStats {
    pub games: usize,
    pub home: usize,
    pub away: usize,
    pub rest_weeks: Vec<Week>,
    /// Most consecutive away games, byes ignored.
    pub longest_road_trip: usize,
    pub wins: usize,
    pub losses: usize,
    pub ties: usize,
}

impl TeamStats {
    /// `home - away`.
    pub fn home_balance(&self) -> i64 {
        self.home as i64 - self.away as i64
    }
}

/// Summary of one week.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekStats {
    pub games: usize,
    /// Explicit byes.
    pub byes: usize,
    /// Games per category, indexed by [`MatchupCategory::index`].
    pub by_category: [usize; 3],
}

/// Schedule summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleStats {
    pub games_scheduled: usize,
    pub matchups_total: usize,
    /// Fraction of the pool scheduled (0.0..1.0).
    pub completion: f64,
    pub by_team: BTreeMap<TeamId, TeamStats>,
    pub by_week: BTreeMap<Week, WeekStats>,
    /// Shortest spacing between two meetings of a pair, if any pair met twice.
    pub min_rematch_spacing: Option<u8>,
    /// Mean spacing between repeat meetings.
    pub avg_rematch_spacing: f64,
}

impl ScheduleStats {
    /// Computes the statistics of `schedule`.
    pub fn calculate(season: &Season, schedule: &Schedule) -> Self {
        let occ = Occupancy::from_schedule(season, schedule);

        let mut by_team = BTreeMap::new();
        for &team in season.team_ids() {
            let mut stats = TeamStats {
                games: occ.team_games(team),
                home: occ.team_home_games(team),
                rest_weeks: occ.rest_weeks(team),
                ..TeamStats::default()
            };
            stats.away = stats.games - stats.home.min(stats.games);

            let mut trip = 0;
            for week in season.weeks() {
                let Some(Slot::Game(id)) = occ.slot(team, week) else {
                    continue;
                };
                if season.matchup(id).is_some_and(|m| m.away == team) {
                    trip += 1;
                    stats.longest_road_trip = stats.longest_road_trip.max(trip);
                } else {
                    trip = 0;
                }
            }
            by_team.insert(team, stats);
        }

        for game in &schedule.games {
            let (Some(m), Some(outcome)) = (season.matchup(game.matchup), game.outcome) else {
                continue;
            };
            let (home_won, away_won) = (
                outcome.home_score > outcome.away_score,
                outcome.away_score > outcome.home_score,
            );
            for (team, won, lost) in [(m.home, home_won, away_won), (m.away, away_won, home_won)] {
                if let Some(stats) = by_team.get_mut(&team) {
                    match (won, lost) {
                        (true, _) => stats.wins += 1,
                        (_, true) => stats.losses += 1,
                        _ => stats.ties += 1,
                    }
                }
            }
        }

        let by_week = season
            .weeks()
            .map(|week| {
                let stats = WeekStats {
                    games: occ.week_games(week),
                    byes: occ.week_byes(week),
                    by_category: [
                        occ.category_count(week, MatchupCategory::InGroup),
                        occ.category_count(week, MatchupCategory::NearCross),
                        occ.category_count(week, MatchupCategory::FarCross),
                    ],
                };
                (week, stats)
            })
            .collect();

        let spacings: Vec<u8> = occ
            .met_pairs()
            .flat_map(|(_, weeks)| weeks.windows(2).map(|w| w[0].distance(w[1])))
            .collect();
        let avg_rematch_spacing = if spacings.is_empty() {
            0.0
        } else {
            spacings.iter().map(|&s| f64::from(s)).sum::<f64>() / spacings.len() as f64
        };

        let matchups_total = season.matchups.len();
        let games_scheduled = season.matchups.len() - occ.unplaced_count();
        let completion = if matchups_total == 0 {
            1.0
        } else {
            games_scheduled as f64 / matchups_total as f64
        };

        Self {
            games_scheduled,
            matchups_total,
            completion,
            by_team,
            by_week,
            min_rematch_spacing: spacings.iter().copied().min(),
            avg_rematch_spacing,
        }
    }

    /// Largest `|home - away|` over all teams.
    pub fn max_home_imbalance(&self) -> u64 {
        self.by_team
            .values()
            .map(|t| t.home_balance().unsigned_abs())
            .max()
            .unwrap_or(0)
    }

    /// Whether the schedule meets the given quality thresholds.
    pub fn meets_thresholds(&self, max_road_trip: usize, min_rematch_spacing: u8) -> bool {
        let trips_ok = self
            .by_team
            .values()
            .all(|t| t.longest_road_trip <= max_road_trip);
        let spacing_ok = self
            .min_rematch_spacing
            .map_or(true, |s| s >= min_rematch_spacing);
        trips_ok && spacing_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameOutcome, League, LeagueRules, Matchup, MatchupId};

    fn season() -> Season {
        let league = League::uniform(2, 1, 2);
        let rules = LeagueRules::default()
            .with_weeks(6)
            .with_games_per_team(3)
            .with_bye_window(1, 6)
            .with_min_rematch_gap(2);
        let t = TeamId;
        let matchups = vec![
            Matchup::new(0, t(0), t(1), MatchupCategory::InGroup),
            Matchup::new(1, t(1), t(0), MatchupCategory::InGroup),
            Matchup::new(2, t(2), t(0), MatchupCategory::FarCross),
            Matchup::new(3, t(3), t(0), MatchupCategory::FarCross),
        ];
        Season::new(2026, league, rules, matchups)
    }

    #[test]
    fn test_stats_basic() {
        let season = season();
        let mut schedule = Schedule::new();
        schedule.add_game(MatchupId(0), Week(1));
        schedule.add_game(MatchupId(2), Week(2));
        schedule.add_game(MatchupId(3), Week(3));
        schedule.add_game(MatchupId(1), Week(4));
        schedule.add_bye(TeamId(0), Week(5));

        let stats = ScheduleStats::calculate(&season, &schedule);
        assert_eq!(stats.games_scheduled, 4);
        assert!((stats.completion - 1.0).abs() < 1e-10);

        let t0 = &stats.by_team[&TeamId(0)];
        assert_eq!(t0.games, 4);
        assert_eq!(t0.home, 1);
        assert_eq!(t0.away, 3);
        // Away at T2 and T3, then at T1.
        assert_eq!(t0.longest_road_trip, 3);
        assert_eq!(t0.rest_weeks, vec![Week(5)]);
        assert_eq!(stats.max_home_imbalance(), 2);

        assert_eq!(stats.by_week[&Week(1)].by_category, [1, 0, 0]);
        assert_eq!(stats.by_week[&Week(5)].byes, 1);
        assert_eq!(stats.min_rematch_spacing, Some(3));
        assert!((stats.avg_rematch_spacing - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_stats_records() {
        let season = season();
        let mut schedule = Schedule::new();
        let a = schedule.add_game(MatchupId(0), Week(1));
        let b = schedule.add_game(MatchupId(2), Week(2));
        schedule.record_outcome(a, GameOutcome { home_score: 24, away_score: 17 });
        schedule.record_outcome(b, GameOutcome { home_score: 10, away_score: 10 });

        let stats = ScheduleStats::calculate(&season, &schedule);
        let t0 = &stats.by_team[&TeamId(0)];
        assert_eq!((t0.wins, t0.losses, t0.ties), (1, 0, 1));
        let t1 = &stats.by_team[&TeamId(1)];
        assert_eq!((t1.wins, t1.losses, t1.ties), (0, 1, 0));
        assert!((stats.completion - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_stats_empty() {
        let season = season();
        let stats = ScheduleStats::calculate(&season, &Schedule::new());
        assert_eq!(stats.games_scheduled, 0);
        assert_eq!(stats.min_rematch_spacing, None);
        assert!((stats.avg_rematch_spacing - 0.0).abs() < 1e-10);
        assert!(stats.meets_thresholds(0, 4));
    }

    #[test]
    fn test_meets_thresholds() {
        let season = season();
        let mut schedule = Schedule::new();
        schedule.add_game(MatchupId(2), Week(1));
        schedule.add_game(MatchupId(3), Week(2));
        schedule.add_game(MatchupId(0), Week(3));
        schedule.add_game(MatchupId(1), Week(5));

        let stats = ScheduleStats::calculate(&season, &schedule);
        assert_eq!(stats.by_team[&TeamId(0)].longest_road_trip, 2);
        assert!(stats.meets_thresholds(2, 2));
        assert!(!stats.meets_thresholds(1, 2));
        assert!(!stats.meets_thresholds(2, 3));
    }
}

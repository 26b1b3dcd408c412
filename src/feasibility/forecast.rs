//! Rolling reserve forecast.
//!
//! Looks past the next few weeks at the resources the rest of the season
//! draws on: the windows left for repeat meetings, each group's room for its
//! own games, and whether every owed bye can still land in its own slot.

use crate::models::{MatchupCategory, TeamId, Week};

use super::matching::max_matching;
use super::{Context, Dimension, Evidence, ReportEntry, Status, Subject};

pub(super) fn run(ctx: &Context<'_>) -> Vec<ReportEntry> {
    let mut out = Vec::new();
    rematches(ctx, &mut out);
    groups(ctx, &mut out);
    byes(ctx, &mut out);
    out
}

/// Rematch windows of repeat pairs and meetings already placed too close.
fn rematches(ctx: &Context<'_>, out: &mut Vec<ReportEntry>) {
    let season = ctx.season;
    let gap = season.rules.min_rematch_gap;
    let tight_below = usize::from(ctx.config.rematch_tight_below);

    for (a, b) in season.repeat_pairs() {
        let subject = Subject::Pair(a, b);
        let met = ctx.occ.meetings(a, b);
        for pair in met.windows(2) {
            if pair[0].distance(pair[1]) < gap {
                out.push(
                    ReportEntry::new(
                        Dimension::RematchGap,
                        subject,
                        Status::Violated,
                        Evidence::new(usize::from(gap), usize::from(pair[0].distance(pair[1]))),
                    )
                    .with_teams(vec![a, b])
                    .with_weeks(vec![pair[0], pair[1]]),
                );
                break;
            }
        }

        let remaining: Vec<_> = season
            .matchups_between(a, b)
            .into_iter()
            .filter(|m| !ctx.occ.is_placed(m.id))
            .collect();
        let Some(next) = remaining.first() else {
            continue;
        };
        let legal: Vec<Week> = ctx
            .open
            .iter()
            .copied()
            .filter(|&w| ctx.occ.can_place(next.id, w).is_ok())
            .collect();

        let entry = if met.is_empty() {
            // Both meetings still to play: they need two legal weeks `gap`
            // apart.
            let needed = remaining.len();
            let spread = match (legal.first(), legal.last()) {
                (Some(&first), Some(&last)) => first.distance(last) >= gap,
                _ => false,
            };
            if needed > 1 && !spread {
                ReportEntry::new(
                    Dimension::RematchWindow,
                    subject,
                    Status::Violated,
                    Evidence::new(needed, legal.len()),
                )
            } else {
                continue;
            }
        } else {
            let status = match legal.len() {
                0 => Status::Violated,
                n if n < tight_below => Status::Tight,
                _ => continue,
            };
            ReportEntry::new(
                Dimension::RematchWindow,
                subject,
                status,
                Evidence::new(remaining.len(), legal.len()),
            )
        };
        out.push(entry.with_teams(vec![a, b]).with_weeks(legal));
    }
}

/// Each group's remaining in-group games against the pairs its free
/// members can still form.
fn groups(ctx: &Context<'_>, out: &mut Vec<ReportEntry>) {
    let season = ctx.season;
    for group in season.league.groups() {
        let members: Vec<TeamId> = season
            .league
            .group_members(group)
            .iter()
            .map(|t| t.id)
            .collect();
        let demand = season
            .matchups
            .iter()
            .filter(|m| {
                m.category == MatchupCategory::InGroup
                    && members.contains(&m.home)
                    && !ctx.occ.is_placed(m.id)
            })
            .count();
        let supply: usize = ctx
            .open
            .iter()
            .map(|&w| members.iter().filter(|&&t| ctx.occ.is_free(t, w)).count() / 2)
            .sum();

        let mut entry = ReportEntry::graded(
            Dimension::GroupForecast,
            Subject::Group(group),
            Evidence::new(demand, supply),
            ctx.margin(),
        );
        if entry.status > Status::Healthy {
            entry = entry.with_teams(members);
        }
        out.push(entry);
    }
}

/// Assigns every owed bye to its own free slot in an open window week.
fn byes(ctx: &Context<'_>, out: &mut Vec<ReportEntry>) {
    let season = ctx.season;
    let mut owners: Vec<TeamId> = Vec::new();
    for &team in season.team_ids() {
        owners.extend(std::iter::repeat(team).take(ctx.owed(team)));
    }
    let mut slots: Vec<Week> = Vec::new();
    for &week in &ctx.open {
        slots.extend(std::iter::repeat(week).take(ctx.bye_room(week)));
    }

    let adjacency: Vec<Vec<usize>> = owners
        .iter()
        .map(|&team| {
            slots
                .iter()
                .enumerate()
                .filter(|&(_, &w)| ctx.occ.is_free(team, w))
                .map(|(i, _)| i)
                .collect()
        })
        .collect();
    let matching = max_matching(&adjacency, slots.len());
    let short: Vec<TeamId> = matching.unmatched().into_iter().map(|i| owners[i]).collect();

    let entry = if short.is_empty() {
        // Every owed bye has a slot; grade the spare ones.
        ReportEntry::graded(
            Dimension::ByeForecast,
            Subject::League,
            Evidence::new(owners.len(), slots.len()),
            ctx.margin(),
        )
    } else {
        let evidence = Evidence::new(owners.len(), matching.size);
        ReportEntry::new(Dimension::ByeForecast, Subject::League, Status::Violated, evidence)
            .with_teams(short)
    };
    out.push(entry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feasibility::Pipeline;
    use crate::models::{
        GroupRef, League, LeagueRules, Matchup, MatchupId, Schedule, Season, WeekRange,
    };

    /// One group of four playing each other twice, plus nothing else.
    fn group_season() -> Season {
        let league = League::uniform(2, 1, 4);
        let rules = LeagueRules::default()
            .with_weeks(8)
            .with_games_per_team(6)
            .with_bye_window(2, 7)
            .with_max_byes_per_week(4)
            .with_min_rematch_gap(2);
        let t = TeamId;
        let pairs = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
        let mut matchups = Vec::new();
        for &(h, a) in &pairs {
            let id = matchups.len() as u16;
            matchups.push(Matchup::new(id, t(h), t(a), MatchupCategory::InGroup));
            matchups.push(Matchup::new(id + 1, t(a), t(h), MatchupCategory::InGroup));
        }
        Season::new(2026, league, rules, matchups)
    }

    #[test]
    fn test_group_forecast_counts_free_pairs() {
        let season = group_season();
        let mut schedule = Schedule::new();
        schedule.frontier = Week(6);
        let report = Pipeline::new().evaluate(&season, &schedule);
        let entry = report
            .entry(Dimension::GroupForecast, Subject::Group(GroupRef::new(0, 0)))
            .expect("group entry");
        // Three open weeks, two pairs each.
        assert_eq!(entry.evidence, Evidence::new(12, 6));
        assert_eq!(entry.status, Status::Violated);
        assert_eq!(entry.teams.len(), 4);

        let other = report
            .entry(Dimension::GroupForecast, Subject::Group(GroupRef::new(1, 0)))
            .expect("empty group entry");
        assert_eq!(other.evidence, Evidence::new(0, 6));
        assert_eq!(other.status, Status::Healthy);
    }

    #[test]
    fn test_unplayed_pair_needs_spread_weeks() {
        let season = group_season();
        let mut schedule = Schedule::new();
        // Only weeks 7 and 8 stay open; a gap of 2 cannot fit both meetings.
        schedule.frontier = Week(7);
        let report = Pipeline::new().evaluate(&season, &schedule);
        let entry = report
            .entry(Dimension::RematchWindow, Subject::Pair(TeamId(0), TeamId(1)))
            .expect("window entry");
        assert_eq!(entry.status, Status::Violated);
        assert_eq!(entry.weeks, vec![Week(7), Week(8)]);
    }

    #[test]
    fn test_bye_forecast_needs_distinct_free_weeks() {
        let mut season = group_season();
        season.rules.bye_window = WeekRange::new(2, 3);
        season.rules.max_byes_per_week = 2;
        let mut schedule = Schedule::new();
        schedule.add_game(MatchupId(0), Week(1));
        schedule.add_game(MatchupId(10), Week(1));
        schedule.add_bye(TeamId(2), Week(3));
        schedule.add_bye(TeamId(3), Week(3));
        schedule.add_bye(TeamId(4), Week(2));
        schedule.frontier = Week(2);

        // T0 and T1 both still need a bye and week 2 has one slot left.
        let report = Pipeline::new().evaluate(&season, &schedule);
        let entry = report
            .entry(Dimension::ByeForecast, Subject::League)
            .expect("bye forecast");
        assert_eq!(entry.status, Status::Violated);
        assert_eq!(entry.evidence, Evidence::new(2, 1));
        assert_eq!(entry.teams, vec![TeamId(1)]);
    }

    #[test]
    fn test_bye_forecast_tight_when_slots_just_cover() {
        let mut season = group_season();
        season.rules.bye_window = WeekRange::new(2, 3);
        season.rules.max_byes_per_week = 2;
        let mut schedule = Schedule::new();
        schedule.add_game(MatchupId(0), Week(1));
        schedule.add_game(MatchupId(10), Week(1));
        schedule.add_bye(TeamId(2), Week(3));
        schedule.add_bye(TeamId(3), Week(3));
        schedule.frontier = Week(2);

        // T0 and T1 owe a bye; week 2 holds exactly two.
        let report = Pipeline::new().evaluate(&season, &schedule);
        let entry = report
            .entry(Dimension::ByeForecast, Subject::League)
            .expect("bye forecast");
        assert_eq!(entry.status, Status::Tight);
        assert_eq!(entry.evidence, Evidence::new(2, 2));
        assert!(entry.teams.is_empty());
    }
}

//! Counting bounds.

use crate::models::{MatchupCategory, Slot, TeamId, Week};

use super::{Context, Dimension, Evidence, ReportEntry, Status, Subject};

pub(super) fn run(ctx: &Context<'_>) -> Vec<ReportEntry> {
    let mut out = Vec::new();
    game_capacity(ctx, &mut out);
    team_byes(ctx, &mut out);
    bye_supply(ctx, &mut out);
    category_quotas(ctx, &mut out);
    home_away(ctx, &mut out);
    out
}

/// Unscheduled matchups against the room left in open weeks.
fn game_capacity(ctx: &Context<'_>, out: &mut Vec<ReportEntry>) {
    let season = ctx.season;
    let demand = ctx.occ.unplaced_count();
    let supply: usize = ctx
        .open
        .iter()
        .map(|&w| season.max_games(w).saturating_sub(ctx.occ.week_games(w)))
        .sum();
    out.push(ReportEntry::graded(
        Dimension::GameCapacity,
        Subject::League,
        Evidence::new(demand, supply),
        ctx.margin(),
    ));

    // A team with as many free weeks as games left is the normal state, so
    // per-team entries only flag shortfalls.
    for &team in season.team_ids() {
        let demand = ctx.remaining_of(team).count();
        let free = ctx.open.iter().filter(|&&w| ctx.occ.is_free(team, w)).count();
        let supply = free.saturating_sub(ctx.owed(team));
        if demand > supply {
            out.push(
                ReportEntry::new(
                    Dimension::GameCapacity,
                    Subject::Team(team),
                    Status::Violated,
                    Evidence::new(demand, supply),
                )
                .with_teams(vec![team]),
            );
        }
    }
}

/// Per-team rest accounting.
fn team_byes(ctx: &Context<'_>, out: &mut Vec<ReportEntry>) {
    let rules = &ctx.season.rules;
    let quota = usize::from(rules.byes_per_team);
    for &team in ctx.season.team_ids() {
        let rests = ctx.occ.rest_weeks(team);
        let outside: Vec<Week> = rests
            .iter()
            .copied()
            .filter(|&w| !rules.is_bye_week(w))
            .collect();

        let entry = if rests.len() > quota {
            ReportEntry::new(
                Dimension::TeamByes,
                Subject::Team(team),
                Status::Violated,
                Evidence::new(rests.len(), quota),
            )
            .with_weeks(rests)
        } else if !outside.is_empty() {
            ReportEntry::new(
                Dimension::TeamByes,
                Subject::Team(team),
                Status::Violated,
                Evidence::new(rests.len(), quota),
            )
            .with_weeks(outside)
        } else {
            let owed = ctx.owed(team);
            let candidates = ctx.bye_weeks_for(team);
            let entry = ReportEntry::graded(
                Dimension::TeamByes,
                Subject::Team(team),
                Evidence::new(owed, candidates.len()),
                ctx.margin(),
            );
            entry.with_weeks(candidates)
        };
        if entry.status > Status::Healthy {
            out.push(entry.with_teams(vec![team]));
        }
    }
}

/// Teams owed a bye against the bye slots left in open window weeks.
fn bye_supply(ctx: &Context<'_>, out: &mut Vec<ReportEntry>) {
    let season = ctx.season;
    let needing: Vec<TeamId> = season
        .team_ids()
        .iter()
        .copied()
        .filter(|&t| ctx.owed(t) > 0)
        .collect();
    let demand: usize = needing.iter().map(|&t| ctx.owed(t)).sum();
    let slots: Vec<Week> = ctx
        .open
        .iter()
        .copied()
        .filter(|&w| ctx.bye_room(w) > 0)
        .collect();
    let supply: usize = slots.iter().map(|&w| ctx.bye_room(w)).sum();

    let mut entry = ReportEntry::graded(
        Dimension::ByeSupply,
        Subject::League,
        Evidence::new(demand, supply),
        ctx.margin(),
    );
    if entry.status > Status::Healthy {
        entry = entry.with_teams(needing).with_weeks(slots);
    }
    out.push(entry);

    // Closed window weeks where more teams sat out than the week allows.
    for week in season.weeks().filter(|&w| ctx.occ.is_closed(w)) {
        if !season.rules.is_bye_week(week) {
            continue;
        }
        let resting: Vec<TeamId> = season
            .team_ids()
            .iter()
            .copied()
            .filter(|&t| !matches!(ctx.occ.slot(t, week), Some(Slot::Game(_))))
            .collect();
        let capacity = season.bye_capacity(week);
        if resting.len() > capacity {
            out.push(
                ReportEntry::new(
                    Dimension::ByeSupply,
                    Subject::Week(week),
                    Status::Violated,
                    Evidence::new(resting.len(), capacity),
                )
                .with_teams(resting)
                .with_weeks(vec![week]),
            );
        }
    }
}

/// Weekly category quotas: placed maxima, closed minima, and the minima
/// still to fill against unscheduled matchups of the category.
fn category_quotas(ctx: &Context<'_>, out: &mut Vec<ReportEntry>) {
    let season = ctx.season;
    for (i, q) in season.rules.weekly_quotas.iter().enumerate() {
        let min = usize::from(q.min);
        let mut broken = Vec::new();
        let mut demand = 0;
        for week in q.weeks.iter().filter(|&w| season.contains_week(w)) {
            let n = ctx.occ.category_count(week, q.category);
            if q.max.is_some_and(|max| n > usize::from(max)) {
                broken.push(week);
            } else if n < min {
                if ctx.occ.is_closed(week) {
                    broken.push(week);
                } else {
                    demand += min - n;
                }
            }
        }
        let supply = remaining_in(ctx, q.category);

        let entry = if broken.is_empty() {
            ReportEntry::graded(
                Dimension::CategoryQuota,
                Subject::Quota(i),
                Evidence::new(demand, supply),
                ctx.margin(),
            )
        } else {
            ReportEntry::new(
                Dimension::CategoryQuota,
                Subject::Quota(i),
                Status::Violated,
                Evidence::new(demand, supply),
            )
            .with_weeks(broken)
        };
        out.push(entry);
    }
}

fn remaining_in(ctx: &Context<'_>, category: MatchupCategory) -> usize {
    ctx.season
        .matchups
        .iter()
        .filter(|m| m.category == category && !ctx.occ.is_placed(m.id))
        .count()
}

/// Road-game balance under a streak limit `L`: a team with `h` home games
/// can play at most `L × (h + 1)` away games without an over-long streak.
fn home_away(ctx: &Context<'_>, out: &mut Vec<ReportEntry>) {
    let season = ctx.season;
    let Some(limit) = season.rules.max_road_streak else {
        return;
    };
    let limit = usize::from(limit);

    for &team in season.team_ids() {
        let home = season.matchups_of(team).filter(|m| m.home == team).count();
        let away = season.matchups_of(team).filter(|m| m.away == team).count();

        let mut streak: Vec<Week> = Vec::new();
        let mut longest: Vec<Week> = Vec::new();
        for week in season.weeks() {
            let Some(Slot::Game(id)) = ctx.occ.slot(team, week) else {
                continue;
            };
            if season.matchup(id).is_some_and(|m| m.away == team) {
                streak.push(week);
                if streak.len() > longest.len() {
                    longest = streak.clone();
                }
            } else {
                streak.clear();
            }
        }

        let evidence = Evidence::new(away, limit * (home + 1));
        let entry = if longest.len() > limit {
            ReportEntry::new(
                Dimension::HomeAwayBalance,
                Subject::Team(team),
                Status::Violated,
                evidence,
            )
            .with_weeks(longest)
        } else {
            ReportEntry::graded(
                Dimension::HomeAwayBalance,
                Subject::Team(team),
                evidence,
                ctx.margin(),
            )
        };
        if entry.status > Status::Healthy {
            out.push(entry.with_teams(vec![team]));
        }
    }
}

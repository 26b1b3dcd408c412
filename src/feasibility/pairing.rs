//! Per-week pairing check.
//!
//! In each of the next `pairing_lookahead` open weeks, every free team that
//! cannot rest there must play. Required teams are matched against free
//! opponents they still owe a legal game; a required team left unmatched
//! cannot be scheduled that week.

use crate::models::{TeamId, Week};

use super::matching::max_matching;
use super::{Context, Dimension, Evidence, ReportEntry, Status, Subject};

pub(super) fn run(ctx: &Context<'_>) -> Vec<ReportEntry> {
    let lookahead = usize::from(ctx.config.pairing_lookahead);
    ctx.open
        .iter()
        .take(lookahead)
        .map(|&week| check_week(ctx, week))
        .collect()
}

fn check_week(ctx: &Context<'_>, week: Week) -> ReportEntry {
    let season = ctx.season;
    let free: Vec<TeamId> = season
        .team_ids()
        .iter()
        .copied()
        .filter(|&t| ctx.occ.is_free(t, week))
        .collect();
    let bye_open = ctx.bye_room(week) > 0;
    let required: Vec<TeamId> = free
        .iter()
        .copied()
        .filter(|&t| !(bye_open && ctx.owed(t) > 0))
        .filter(|&t| ctx.remaining_of(t).next().is_some())
        .collect();

    let adjacency: Vec<Vec<usize>> = required
        .iter()
        .map(|&team| {
            free.iter()
                .enumerate()
                .filter(|&(_, &other)| other != team)
                .filter(|&(_, &other)| {
                    ctx.remaining_of(team).any(|m| {
                        m.opponent(team) == Some(other) && ctx.occ.can_place(m.id, week).is_ok()
                    })
                })
                .map(|(i, _)| i)
                .collect()
        })
        .collect();

    let matching = max_matching(&adjacency, free.len());
    let unmatched: Vec<TeamId> = matching.unmatched().into_iter().map(|i| required[i]).collect();
    let single: Vec<TeamId> = required
        .iter()
        .zip(&adjacency)
        .filter(|(_, edges)| edges.len() == 1)
        .map(|(&t, _)| t)
        .collect();

    let evidence = Evidence::new(required.len(), matching.size);
    let subject = Subject::Week(week);
    let entry = if !unmatched.is_empty() {
        ReportEntry::new(Dimension::WeekPairing, subject, Status::Violated, evidence)
            .with_teams(unmatched)
    } else if !single.is_empty() {
        ReportEntry::new(Dimension::WeekPairing, subject, Status::Tight, evidence)
            .with_teams(single)
    } else {
        ReportEntry::new(Dimension::WeekPairing, subject, Status::Healthy, evidence)
    };
    entry.with_weeks(vec![week])
}

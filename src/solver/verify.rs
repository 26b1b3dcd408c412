//! Exact invariant check of a complete schedule.

use std::collections::BTreeMap;

use crate::models::{MatchupCategory, Schedule, Season, TeamId, Violation, ViolationType, Week};

/// Checks a complete schedule against every season invariant.
///
/// Checks:
/// 1. Every matchup is scheduled exactly once, inside the season
/// 2. No team has two slots (games or byes) in one week
/// 3. Every team plays `games_per_team` games
/// 4. Every week holds between its minimum and maximum game count
/// 5. Every team rests `byes_per_team` weeks, all inside the bye window,
///    and no week exceeds its bye capacity
/// 6. Repeat meetings are at least `min_rematch_gap` weeks apart
/// 7. Weekly category quotas hold
/// 8. No team exceeds the road streak limit, if one is set
///
/// A week without a game for a team counts as a rest week whether or not
/// the bye is explicit.
pub fn verify(season: &Season, schedule: &Schedule) -> Vec<Violation> {
    let rules = &season.rules;
    let mut violations = Vec::new();

    let mut times: Vec<usize> = vec![0; season.matchups.len()];
    let mut games_by_team: BTreeMap<TeamId, Vec<(Week, bool)>> = BTreeMap::new();
    let mut slots: BTreeMap<(TeamId, Week), usize> = BTreeMap::new();
    let mut week_games: BTreeMap<Week, usize> = BTreeMap::new();
    let mut week_category: BTreeMap<(Week, MatchupCategory), usize> = BTreeMap::new();
    let mut meetings: BTreeMap<(TeamId, TeamId), Vec<Week>> = BTreeMap::new();

    for game in &schedule.games {
        let Some(m) = season.matchup(game.matchup) else {
            violations.push(Violation::new(
                ViolationType::MatchupCoverage,
                game.id.to_string(),
                format!("{} references unknown matchup {}", game.id, game.matchup),
            ));
            continue;
        };
        if !season.contains_week(game.week) {
            violations.push(Violation::new(
                ViolationType::MatchupCoverage,
                m.id.to_string(),
                format!("{} is scheduled outside the season in {}", m.id, game.week),
            ));
            continue;
        }
        times[m.id.index()] += 1;
        for team in m.teams() {
            *slots.entry((team, game.week)).or_insert(0) += 1;
            games_by_team
                .entry(team)
                .or_default()
                .push((game.week, team == m.away));
        }
        *week_games.entry(game.week).or_insert(0) += 1;
        *week_category.entry((game.week, m.category)).or_insert(0) += 1;
        meetings.entry(m.pair()).or_default().push(game.week);
    }
    for bye in &schedule.byes {
        *slots.entry((bye.team, bye.week)).or_insert(0) += 1;
    }

    // 1
    for m in &season.matchups {
        match times[m.id.index()] {
            1 => {}
            0 => violations.push(Violation::new(
                ViolationType::MatchupCoverage,
                m.id.to_string(),
                format!("{} is not scheduled", m.id),
            )),
            n => violations.push(Violation::new(
                ViolationType::MatchupCoverage,
                m.id.to_string(),
                format!("{} is scheduled {n} times", m.id),
            )),
        }
    }

    // 2
    for (&(team, week), &n) in &slots {
        if n > 1 {
            violations.push(Violation::double_booking(team, week));
        }
    }

    // 3
    let needed = usize::from(rules.games_per_team);
    for &team in season.team_ids() {
        let played = games_by_team.get(&team).map_or(0, |g| g.len());
        if played != needed {
            violations.push(Violation::new(
                ViolationType::GameCount,
                team.to_string(),
                format!("{team} plays {played} games, needs {needed}"),
            ));
        }
    }

    // 4
    for week in season.weeks() {
        let n = week_games.get(&week).copied().unwrap_or(0);
        let (min, max) = (season.min_games(week), season.max_games(week));
        if n < min || n > max {
            violations.push(Violation::new(
                ViolationType::WeekCapacity,
                week.to_string(),
                format!("{week} holds {n} games, allowed {min}-{max}"),
            ));
        }
    }

    // 5
    let quota = usize::from(rules.byes_per_team);
    let mut resting: BTreeMap<Week, usize> = BTreeMap::new();
    for &team in season.team_ids() {
        let played: Vec<Week> = games_by_team
            .get(&team)
            .map(|g| g.iter().map(|&(w, _)| w).collect())
            .unwrap_or_default();
        let rests: Vec<Week> = season.weeks().filter(|w| !played.contains(w)).collect();
        if rests.len() != quota {
            violations.push(Violation::new(
                ViolationType::ByeCount,
                team.to_string(),
                format!("{team} rests {} weeks, needs {quota}", rests.len()),
            ));
        }
        for &week in &rests {
            *resting.entry(week).or_insert(0) += 1;
            if !rules.is_bye_week(week) {
                violations.push(Violation::new(
                    ViolationType::ByeWindow,
                    team.to_string(),
                    format!("{team} rests in {week}, outside {}", rules.bye_window),
                ));
            }
        }
    }
    for (&week, &n) in &resting {
        let capacity = season.bye_capacity(week);
        if rules.is_bye_week(week) && n > capacity {
            violations.push(Violation::new(
                ViolationType::ByeCapacity,
                week.to_string(),
                format!("{n} teams rest in {week}, capacity {capacity}"),
            ));
        }
    }

    // 6
    let gap = rules.min_rematch_gap;
    for (&pair, weeks) in &mut meetings {
        weeks.sort();
        for w in weeks.windows(2) {
            if w[0].distance(w[1]) < gap {
                violations.push(Violation::rematch_gap(pair, w[0], w[1], gap));
            }
        }
    }

    // 7
    for (i, q) in rules.weekly_quotas.iter().enumerate() {
        for week in q.weeks.iter().filter(|&w| season.contains_week(w)) {
            let n = week_category
                .get(&(week, q.category))
                .copied()
                .unwrap_or(0);
            let over = q.max.is_some_and(|max| n > usize::from(max));
            if n < usize::from(q.min) || over {
                violations.push(Violation::new(
                    ViolationType::CategoryQuota,
                    week.to_string(),
                    format!("{week} holds {n} {} games, quota #{i} breached", q.category),
                ));
            }
        }
    }

    // 8
    if let Some(limit) = rules.max_road_streak {
        for (&team, games) in &mut games_by_team {
            games.sort();
            let mut streak = 0usize;
            for &(week, away) in games.iter() {
                streak = if away { streak + 1 } else { 0 };
                if streak == usize::from(limit) + 1 {
                    violations.push(Violation::new(
                        ViolationType::RoadStreak,
                        team.to_string(),
                        format!("{team} is on the road {streak} games in a row by {week}"),
                    ));
                }
            }
        }
    }

    violations
}

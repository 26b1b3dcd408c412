//! Week-by-team occupancy index.
//!
//! [`Occupancy`] is the working view of a schedule that placement code
//! queries: which slot each team holds in each week, per-week game, bye and
//! category counts, and the weeks every pair has met. The solver builds one
//! and mutates it while placing; the session and the feasibility pipeline
//! derive one from a [`Schedule`].

use std::collections::BTreeMap;
use std::fmt;

use super::{pair_key, MatchupCategory, MatchupId, Schedule, Season, TeamId, Week};

/// What a team does in a week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Game(MatchupId),
    Bye,
}

/// Why a placement is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocker {
    WeekOutOfRange(Week),
    UnknownMatchup(MatchupId),
    UnknownTeam(TeamId),
    AlreadyPlaced(MatchupId),
    TeamBusy(TeamId),
    WeekFull(Week),
    RematchGap { met: Week },
    QuotaFull { quota: usize },
    ByeOutsideWindow(Week),
    ByeSlotsFull(Week),
    ByeQuotaReached(TeamId),
}

impl fmt::Display for Blocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Blocker::WeekOutOfRange(w) => write!(f, "{w} is outside the season"),
            Blocker::UnknownMatchup(m) => write!(f, "unknown matchup {m}"),
            Blocker::UnknownTeam(t) => write!(f, "unknown team {t}"),
            Blocker::AlreadyPlaced(m) => write!(f, "{m} is already scheduled"),
            Blocker::TeamBusy(t) => write!(f, "{t} is already booked"),
            Blocker::WeekFull(w) => write!(f, "{w} has no room left"),
            Blocker::RematchGap { met } => write!(f, "too close to the meeting in {met}"),
            Blocker::QuotaFull { quota } => write!(f, "weekly quota #{quota} is full"),
            Blocker::ByeOutsideWindow(w) => write!(f, "{w} is outside the bye window"),
            Blocker::ByeSlotsFull(w) => write!(f, "{w} has no bye slots left"),
            Blocker::ByeQuotaReached(t) => write!(f, "{t} has no byes left"),
        }
    }
}

/// Slot grid plus running counts.
#[derive(Debug, Clone)]
pub struct Occupancy<'a> {
    season: &'a Season,
    weeks: usize,
    slots: Vec<Option<Slot>>,
    placed: Vec<Option<Week>>,
    closed: Vec<bool>,
    week_games: Vec<usize>,
    week_byes: Vec<usize>,
    week_category: Vec<[usize; 3]>,
    team_games: Vec<usize>,
    team_byes: Vec<usize>,
    team_home: Vec<usize>,
    meetings: BTreeMap<(TeamId, TeamId), Vec<Week>>,
    conflicts: Vec<(TeamId, Week)>,
}

impl<'a> Occupancy<'a> {
    /// An empty grid with every week open.
    pub fn new(season: &'a Season) -> Self {
        let weeks = season.week_count();
        let teams = season.team_count();
        Self {
            season,
            weeks,
            slots: vec![None; teams * weeks],
            placed: vec![None; season.matchups.len()],
            closed: vec![false; weeks],
            week_games: vec![0; weeks],
            week_byes: vec![0; weeks],
            week_category: vec![[0; 3]; weeks],
            team_games: vec![0; teams],
            team_byes: vec![0; teams],
            team_home: vec![0; teams],
            meetings: BTreeMap::new(),
            conflicts: Vec::new(),
        }
    }

    /// Loads every game and explicit bye of `schedule`.
    ///
    /// Double bookings are kept in [`conflicts`](Self::conflicts) instead of
    /// overwriting the first occupant. Games of unknown matchups or outside
    /// the season are skipped.
    pub fn from_schedule(season: &'a Season, schedule: &Schedule) -> Self {
        let mut occ = Self::new(season);
        for (i, closed) in occ.closed.iter_mut().enumerate() {
            let week = Week((i + 1) as u8);
            *closed = schedule.is_closed(week);
        }
        for game in &schedule.games {
            if season.matchup(game.matchup).is_some()
                && season.contains_week(game.week)
                && occ.placed[game.matchup.index()].is_none()
            {
                occ.place(game.matchup, game.week);
            }
        }
        for bye in &schedule.byes {
            if season.contains_week(bye.week) && season.team_index(bye.team).is_some() {
                occ.reserve_bye(bye.team, bye.week);
            }
        }
        occ
    }

    pub fn season(&self) -> &'a Season {
        self.season
    }

    #[inline]
    fn cell(&self, team: TeamId, week: Week) -> Option<usize> {
        let t = self.season.team_index(team)?;
        if week.0 == 0 || week.index() >= self.weeks {
            return None;
        }
        Some(t * self.weeks + week.index())
    }

    /// Slot of a team in a week.
    pub fn slot(&self, team: TeamId, week: Week) -> Option<Slot> {
        self.cell(team, week).and_then(|c| self.slots[c])
    }

    /// Whether the team has neither a game nor a bye in `week`.
    pub fn is_free(&self, team: TeamId, week: Week) -> bool {
        self.cell(team, week)
            .map(|c| self.slots[c].is_none())
            .unwrap_or(false)
    }

    /// Whether the week is before the frontier or locked.
    pub fn is_closed(&self, week: Week) -> bool {
        week.0 >= 1 && self.closed.get(week.index()).copied().unwrap_or(true)
    }

    /// Whether games and byes may still be added to the week.
    pub fn is_open(&self, week: Week) -> bool {
        self.season.contains_week(week) && !self.is_closed(week)
    }

    /// Open weeks in order.
    pub fn open_weeks(&self) -> Vec<Week> {
        self.season.weeks().filter(|&w| self.is_open(w)).collect()
    }

    pub fn placed_week(&self, matchup: MatchupId) -> Option<Week> {
        self.placed.get(matchup.index()).copied().flatten()
    }

    pub fn is_placed(&self, matchup: MatchupId) -> bool {
        self.placed_week(matchup).is_some()
    }

    /// Matchups without a week, in id order.
    pub fn unplaced(&self) -> impl Iterator<Item = MatchupId> + '_ {
        self.placed
            .iter()
            .enumerate()
            .filter(|(_, w)| w.is_none())
            .map(|(i, _)| MatchupId(i as u16))
    }

    pub fn unplaced_count(&self) -> usize {
        self.placed.iter().filter(|w| w.is_none()).count()
    }

    pub fn week_games(&self, week: Week) -> usize {
        self.week_games.get(week.index()).copied().unwrap_or(0)
    }

    /// Explicit byes in a week.
    pub fn week_byes(&self, week: Week) -> usize {
        self.week_byes.get(week.index()).copied().unwrap_or(0)
    }

    pub fn category_count(&self, week: Week, category: MatchupCategory) -> usize {
        self.week_category
            .get(week.index())
            .map(|c| c[category.index()])
            .unwrap_or(0)
    }

    pub fn team_games(&self, team: TeamId) -> usize {
        self.season
            .team_index(team)
            .map(|t| self.team_games[t])
            .unwrap_or(0)
    }

    pub fn team_home_games(&self, team: TeamId) -> usize {
        self.season
            .team_index(team)
            .map(|t| self.team_home[t])
            .unwrap_or(0)
    }

    /// Explicit byes of a team.
    pub fn team_byes(&self, team: TeamId) -> usize {
        self.season
            .team_index(team)
            .map(|t| self.team_byes[t])
            .unwrap_or(0)
    }

    /// Weeks a team rests: explicit byes plus closed weeks without a game.
    pub fn rest_weeks(&self, team: TeamId) -> Vec<Week> {
        self.season
            .weeks()
            .filter(|&w| match self.slot(team, w) {
                Some(Slot::Bye) => true,
                Some(Slot::Game(_)) => false,
                None => self.is_closed(w),
            })
            .collect()
    }

    /// Weeks the pair has met so far, ascending.
    pub fn meetings(&self, a: TeamId, b: TeamId) -> &[Week] {
        self.meetings
            .get(&pair_key(a, b))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Every pair with at least one placed meeting.
    pub fn met_pairs(&self) -> impl Iterator<Item = (&(TeamId, TeamId), &Vec<Week>)> {
        self.meetings.iter()
    }

    /// Team/week cells booked more than once.
    pub fn conflicts(&self) -> &[(TeamId, Week)] {
        &self.conflicts
    }

    /// Whether the matchup can be played in `week`.
    pub fn can_place(&self, matchup: MatchupId, week: Week) -> Result<(), Blocker> {
        if !self.season.contains_week(week) {
            return Err(Blocker::WeekOutOfRange(week));
        }
        let m = self
            .season
            .matchup(matchup)
            .ok_or(Blocker::UnknownMatchup(matchup))?;
        if self.is_placed(matchup) {
            return Err(Blocker::AlreadyPlaced(matchup));
        }
        for team in m.teams() {
            let cell = self.cell(team, week).ok_or(Blocker::UnknownTeam(team))?;
            if self.slots[cell].is_some() {
                return Err(Blocker::TeamBusy(team));
            }
        }
        if self.week_games(week) >= self.season.max_games(week) {
            return Err(Blocker::WeekFull(week));
        }
        let gap = self.season.rules.min_rematch_gap;
        if let Some(&met) = self
            .meetings(m.home, m.away)
            .iter()
            .find(|&&f| f.distance(week) < gap)
        {
            return Err(Blocker::RematchGap { met });
        }
        for (i, quota) in self.season.rules.weekly_quotas.iter().enumerate() {
            if let Some(max) = quota.max {
                if quota.applies(week, m.category)
                    && self.category_count(week, m.category) >= usize::from(max)
                {
                    return Err(Blocker::QuotaFull { quota: i });
                }
            }
        }
        Ok(())
    }

    /// Whether the team can rest in `week`.
    pub fn can_bye(&self, team: TeamId, week: Week) -> Result<(), Blocker> {
        if !self.season.contains_week(week) {
            return Err(Blocker::WeekOutOfRange(week));
        }
        let cell = self.cell(team, week).ok_or(Blocker::UnknownTeam(team))?;
        if self.slots[cell].is_some() {
            return Err(Blocker::TeamBusy(team));
        }
        if !self.season.rules.is_bye_week(week) {
            return Err(Blocker::ByeOutsideWindow(week));
        }
        if self.week_byes(week) >= self.season.bye_capacity(week) {
            return Err(Blocker::ByeSlotsFull(week));
        }
        if self.team_byes(team) >= usize::from(self.season.rules.byes_per_team) {
            return Err(Blocker::ByeQuotaReached(team));
        }
        Ok(())
    }

    /// Books a matchup into a week without checking rules.
    ///
    /// Cells already taken are recorded as conflicts and keep their first
    /// occupant. Unknown matchups and weeks outside the season are ignored.
    pub fn place(&mut self, matchup: MatchupId, week: Week) {
        let season = self.season;
        let Some(m) = season.matchup(matchup) else {
            return;
        };
        if !season.contains_week(week) || self.is_placed(matchup) {
            return;
        }
        for team in m.teams() {
            if let Some(cell) = self.cell(team, week) {
                if self.slots[cell].is_some() {
                    self.conflicts.push((team, week));
                } else {
                    self.slots[cell] = Some(Slot::Game(matchup));
                }
            }
            if let Some(t) = season.team_index(team) {
                self.team_games[t] += 1;
            }
        }
        if let Some(t) = season.team_index(m.home) {
            self.team_home[t] += 1;
        }
        let w = week.index();
        self.placed[matchup.index()] = Some(week);
        self.week_games[w] += 1;
        self.week_category[w][m.category.index()] += 1;
        let met = self.meetings.entry(m.pair()).or_default();
        met.push(week);
        met.sort();
    }

    /// Reverses [`place`](Self::place).
    pub fn unplace(&mut self, matchup: MatchupId) {
        let season = self.season;
        let Some(m) = season.matchup(matchup) else {
            return;
        };
        let Some(week) = self.placed_week(matchup) else {
            return;
        };
        for team in m.teams() {
            if let Some(cell) = self.cell(team, week) {
                if self.slots[cell] == Some(Slot::Game(matchup)) {
                    self.slots[cell] = None;
                }
            }
            if let Some(t) = season.team_index(team) {
                self.team_games[t] -= 1;
            }
        }
        if let Some(t) = season.team_index(m.home) {
            self.team_home[t] -= 1;
        }
        let w = week.index();
        self.placed[matchup.index()] = None;
        self.week_games[w] -= 1;
        self.week_category[w][m.category.index()] -= 1;
        if let Some(met) = self.meetings.get_mut(&m.pair()) {
            if let Some(pos) = met.iter().position(|&x| x == week) {
                met.remove(pos);
            }
            if met.is_empty() {
                self.meetings.remove(&m.pair());
            }
        }
    }

    /// Books a bye without checking rules.
    pub fn reserve_bye(&mut self, team: TeamId, week: Week) {
        let Some(cell) = self.cell(team, week) else {
            return;
        };
        if self.slots[cell].is_some() {
            self.conflicts.push((team, week));
            return;
        }
        self.slots[cell] = Some(Slot::Bye);
        self.week_byes[week.index()] += 1;
        if let Some(t) = self.season.team_index(team) {
            self.team_byes[t] += 1;
        }
    }

    /// Reverses [`reserve_bye`](Self::reserve_bye).
    pub fn release_bye(&mut self, team: TeamId, week: Week) {
        let Some(cell) = self.cell(team, week) else {
            return;
        };
        if self.slots[cell] != Some(Slot::Bye) {
            return;
        }
        self.slots[cell] = None;
        self.week_byes[week.index()] -= 1;
        if let Some(t) = self.season.team_index(team) {
            self.team_byes[t] -= 1;
        }
    }

    /// Writes the placements back into a schedule.
    ///
    /// Games are added in week order, then matchup order; explicit byes are
    /// copied as reserved byes.
    pub fn to_schedule(&self, mut base: Schedule) -> Schedule {
        let mut pending: Vec<(Week, MatchupId)> = self
            .placed
            .iter()
            .enumerate()
            .filter_map(|(i, w)| w.map(|w| (w, MatchupId(i as u16))))
            .filter(|&(_, m)| base.game_for_matchup(m).is_none())
            .collect();
        pending.sort();
        for (week, matchup) in pending {
            base.add_game(matchup, week);
        }
        for &team in self.season.team_ids() {
            for week in self.season.weeks() {
                if self.slot(team, week) == Some(Slot::Bye) {
                    base.add_bye(team, week);
                }
            }
        }
        base
    }
}

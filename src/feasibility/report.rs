//! Feasibility report types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{GroupRef, TeamId, Week};

/// Entry status, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    Healthy,
    Tight,
    Violated,
}

impl Status {
    /// Grades a demand against its supply.
    ///
    /// Zero demand is always healthy; slack at or below `margin` is tight.
    pub fn grade(demand: usize, supply: usize, margin: usize) -> Self {
        if demand == 0 {
            Status::Healthy
        } else if demand > supply {
            Status::Violated
        } else if supply - demand <= margin {
            Status::Tight
        } else {
            Status::Healthy
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Healthy => "HEALTHY",
            Status::Tight => "TIGHT",
            Status::Violated => "VIOLATED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Counting bounds.
    Bounds,
    /// Per-week matchings.
    Pairing,
    /// Rolling reserve forecast.
    Forecast,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Bounds, Stage::Pairing, Stage::Forecast];
}

/// What an entry measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Dimension {
    GameCapacity,
    TeamByes,
    ByeSupply,
    CategoryQuota,
    HomeAwayBalance,
    WeekPairing,
    RematchWindow,
    RematchGap,
    GroupForecast,
    ByeForecast,
}

impl Dimension {
    pub fn stage(self) -> Stage {
        match self {
            Dimension::GameCapacity
            | Dimension::TeamByes
            | Dimension::ByeSupply
            | Dimension::CategoryQuota
            | Dimension::HomeAwayBalance => Stage::Bounds,
            Dimension::WeekPairing => Stage::Pairing,
            Dimension::RematchWindow
            | Dimension::RematchGap
            | Dimension::GroupForecast
            | Dimension::ByeForecast => Stage::Forecast,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Dimension::GameCapacity => "game capacity",
            Dimension::TeamByes => "team byes",
            Dimension::ByeSupply => "bye supply",
            Dimension::CategoryQuota => "category quota",
            Dimension::HomeAwayBalance => "home/away balance",
            Dimension::WeekPairing => "week pairing",
            Dimension::RematchWindow => "rematch window",
            Dimension::RematchGap => "rematch gap",
            Dimension::GroupForecast => "group forecast",
            Dimension::ByeForecast => "bye forecast",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What an entry is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Subject {
    League,
    Team(TeamId),
    Pair(TeamId, TeamId),
    Group(GroupRef),
    Week(Week),
    /// Index into the weekly quota list.
    Quota(usize),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::League => f.write_str("league"),
            Subject::Team(t) => write!(f, "{t}"),
            Subject::Pair(a, b) => write!(f, "{a}-{b}"),
            Subject::Group(g) => write!(f, "{g}"),
            Subject::Week(w) => write!(f, "{w}"),
            Subject::Quota(i) => write!(f, "quota #{i}"),
        }
    }
}

/// Numeric evidence behind a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Evidence {
    pub demand: usize,
    pub supply: usize,
}

impl Evidence {
    pub fn new(demand: usize, supply: usize) -> Self {
        Self { demand, supply }
    }

    /// `supply - demand`; negative when short.
    pub fn slack(&self) -> i64 {
        self.supply as i64 - self.demand as i64
    }
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "demand {}, supply {}", self.demand, self.supply)
    }
}

/// One (dimension, subject) finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub dimension: Dimension,
    pub subject: Subject,
    pub stage: Stage,
    pub status: Status,
    pub evidence: Evidence,
    /// Teams involved (unmatched, short of a bye, ...).
    pub teams: Vec<TeamId>,
    /// Weeks involved (legal windows, offending weeks, ...).
    pub weeks: Vec<Week>,
}

impl ReportEntry {
    pub fn new(dimension: Dimension, subject: Subject, status: Status, evidence: Evidence) -> Self {
        Self {
            dimension,
            subject,
            stage: dimension.stage(),
            status,
            evidence,
            teams: Vec::new(),
            weeks: Vec::new(),
        }
    }

    /// Entry graded from its evidence.
    pub fn graded(
        dimension: Dimension,
        subject: Subject,
        evidence: Evidence,
        margin: usize,
    ) -> Self {
        let status = Status::grade(evidence.demand, evidence.supply, margin);
        Self::new(dimension, subject, status, evidence)
    }

    pub fn with_teams(mut self, mut teams: Vec<TeamId>) -> Self {
        teams.sort();
        teams.dedup();
        self.teams = teams;
        self
    }

    pub fn with_weeks(mut self, mut weeks: Vec<Week>) -> Self {
        weeks.sort();
        weeks.dedup();
        self.weeks = weeks;
        self
    }

    fn key(&self) -> (Dimension, Subject) {
        (self.dimension, self.subject)
    }
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}): {}",
            self.status, self.dimension, self.subject, self.evidence
        )?;
        if !self.teams.is_empty() {
            let teams: Vec<String> = self.teams.iter().map(|t| t.to_string()).collect();
            write!(f, "; teams {}", teams.join(", "))?;
        }
        if !self.weeks.is_empty() {
            let weeks: Vec<String> = self.weeks.iter().map(|w| w.0.to_string()).collect();
            write!(f, "; weeks {}", weeks.join(", "))?;
        }
        Ok(())
    }
}

/// Snapshot of one evaluation.
///
/// Entries are sorted by (dimension, subject) so repeated evaluations of
/// the same state serialize identically.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConstraintReport {
    pub entries: Vec<ReportEntry>,
    /// Stages that ran.
    pub stages_run: Vec<Stage>,
    /// Stages skipped after a violation in short-circuit mode.
    pub suppressed: Vec<Stage>,
}

impl ConstraintReport {
    pub fn new(
        mut entries: Vec<ReportEntry>,
        stages_run: Vec<Stage>,
        suppressed: Vec<Stage>,
    ) -> Self {
        entries.sort_by_key(|e| e.key());
        entries.dedup_by_key(|e| e.key());
        Self {
            entries,
            stages_run,
            suppressed,
        }
    }

    /// Worst status of one dimension; healthy when it has no entries.
    pub fn status(&self, dimension: Dimension) -> Status {
        self.entries
            .iter()
            .filter(|e| e.dimension == dimension)
            .map(|e| e.status)
            .max()
            .unwrap_or(Status::Healthy)
    }

    /// Worst status overall.
    pub fn worst(&self) -> Status {
        self.entries
            .iter()
            .map(|e| e.status)
            .max()
            .unwrap_or(Status::Healthy)
    }

    pub fn entry(&self, dimension: Dimension, subject: Subject) -> Option<&ReportEntry> {
        self.entries
            .binary_search_by_key(&(dimension, subject), |e| e.key())
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn of_dimension(&self, dimension: Dimension) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(move |e| e.dimension == dimension)
    }

    /// Entries at `status` or worse.
    pub fn at_least(&self, status: Status) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(move |e| e.status >= status)
    }

    /// Whether no entry is violated.
    pub fn is_feasible(&self) -> bool {
        self.worst() < Status::Violated
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Turns report entries into user-facing text.
///
/// The crate only ships [`PlainNarrator`]; hosts plug in their own
/// templating.
pub trait Narrator {
    /// Text for one entry, or `None` to stay silent.
    fn narrate(&self, entry: &ReportEntry) -> Option<String>;

    /// Text for every entry the narrator speaks about, in report order.
    fn narrate_report(&self, report: &ConstraintReport) -> Vec<String> {
        report
            .entries
            .iter()
            .filter_map(|e| self.narrate(e))
            .collect()
    }
}

/// Narrates tight and violated entries with their `Display` form.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainNarrator;

impl Narrator for PlainNarrator {
    fn narrate(&self, entry: &ReportEntry) -> Option<String> {
        (entry.status > Status::Healthy).then(|| entry.to_string())
    }
}

use serde::Serialize;

use crate::model::TicketStatus;
use crate::query::bucket::{BucketKey, Granularity};

/// Ticket, task and effort counts shared by rows, team rollups and series
/// points.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Counts {
    pub open: u64,
    pub closed: u64,
    /// `open + closed`; statuses outside both sets are not counted.
    pub total: u64,
    pub tasks: u64,
    pub man_hours: f64,
}

impl Counts {
    pub(crate) fn add_open(&mut self) {
        self.open += 1;
        self.total += 1;
    }

    pub(crate) fn add_closed(&mut self) {
        self.closed += 1;
        self.total += 1;
    }

    pub(crate) fn add_task(&mut self) {
        self.tasks += 1;
    }

    pub(crate) fn add_hours(&mut self, hours: f64) {
        self.man_hours += hours;
    }

    pub fn merge(&mut self, other: &Counts) {
        self.open += other.open;
        self.closed += other.closed;
        self.total += other.total;
        self.tasks += other.tasks;
        self.man_hours += other.man_hours;
    }

    pub fn is_zero(&self) -> bool {
        self.total == 0 && self.tasks == 0 && self.man_hours == 0.0
    }
}

/// One table row: a member, or the unassigned bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRow {
    /// `None` for the unassigned row.
    pub member_id: Option<u64>,
    pub name: String,
    pub team: String,
    #[serde(flatten)]
    pub counts: Counts,
}

/// Per-team rollup of member rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRow {
    /// `None` for work without a roster owner.
    pub team_id: Option<u64>,
    pub team: String,
    pub members: u64,
    #[serde(flatten)]
    pub counts: Counts,
}

/// One point of a chart series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub key: BucketKey,
    pub label: String,
    #[serde(flatten)]
    pub counts: Counts,
}

/// Dense, ordered series: one point per bucket of the grid, zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketSeries {
    pub granularity: Granularity,
    pub reference_year: i32,
    pub points: Vec<SeriesPoint>,
}

impl BucketSeries {
    /// Sum of all points.
    pub fn totals(&self) -> Counts {
        let mut total = Counts::default();
        for point in &self.points {
            total.merge(&point.counts);
        }
        total
    }

    pub fn labels(&self) -> Vec<&str> {
        self.points.iter().map(|p| p.label.as_str()).collect()
    }
}

/// Ticket counts per GLPI status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusBreakdown {
    pub new: u64,
    pub assigned: u64,
    pub planned: u64,
    pub pending: u64,
    pub solved: u64,
    pub closed: u64,
    pub unknown: u64,
    /// Assigned + planned + pending.
    pub not_solved: u64,
    pub total: u64,
}

impl StatusBreakdown {
    pub fn record(&mut self, status: TicketStatus) {
        match status {
            TicketStatus::New => self.new += 1,
            TicketStatus::Assigned => self.assigned += 1,
            TicketStatus::Planned => self.planned += 1,
            TicketStatus::Pending => self.pending += 1,
            TicketStatus::Solved => self.solved += 1,
            TicketStatus::Closed => self.closed += 1,
            TicketStatus::Unknown(_) => self.unknown += 1,
        }
        if matches!(
            status,
            TicketStatus::Assigned | TicketStatus::Planned | TicketStatus::Pending
        ) {
            self.not_solved += 1;
        }
        self.total += 1;
    }
}

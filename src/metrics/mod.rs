pub mod types;

pub use types::*;

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use crate::config::ReportConfig;
use crate::error::{Error, Result};
use crate::join::{AnnotatedRecord, Record};
use crate::model::{Member, Team, TicketStatus};
use crate::query::bucket::{bucket_of_date, buckets_for, BucketKey, Granularity};
use crate::query::filter::ReportFilter;
use crate::query::sort::{locale_cmp, sorted_by, SortDirection};

/// Which ticket statuses count as open and which as closed. Statuses in
/// neither set still show up in the status breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPolicy {
    open: BTreeSet<TicketStatus>,
    closed: BTreeSet<TicketStatus>,
}

impl StatusPolicy {
    pub fn new(
        open: impl IntoIterator<Item = TicketStatus>,
        closed: impl IntoIterator<Item = TicketStatus>,
    ) -> Self {
        Self {
            open: open.into_iter().collect(),
            closed: closed.into_iter().collect(),
        }
    }

    pub fn is_open(&self, status: TicketStatus) -> bool {
        self.open.contains(&status)
    }

    pub fn is_closed(&self, status: TicketStatus) -> bool {
        self.closed.contains(&status)
    }
}

impl Default for StatusPolicy {
    fn default() -> Self {
        ReportConfig::default().status_policy()
    }
}

/// A table row to emit even when its member has no matching records.
#[derive(Debug, Clone, Copy)]
pub struct Seat<'a> {
    pub member: &'a Member,
    pub team: &'a Team,
}

/// Output of [`reduce`].
#[derive(Debug, Clone)]
pub struct Reduction {
    pub rows: Vec<AggregatedRow>,
    pub teams: Vec<TeamRow>,
    pub series: BucketSeries,
    pub status: StatusBreakdown,
    pub totals: Counts,
    /// Records without a usable date; they only count when the filter is
    /// not time-restricted.
    pub undated: u64,
}

/// Fold joined records into member rows, team rollups, a status breakdown
/// and a dense bucket series.
///
/// Rows start with one entry per seat, in seat order; rows for owners that
/// have no seat (including the unassigned row) are appended as they are
/// met. Rows honour the whole filter. The series ignores the filter's
/// bucket but honours its date range and year so that summing the series
/// gives the unbucketed totals.
pub fn reduce(
    records: &[AnnotatedRecord<'_>],
    seats: &[Seat<'_>],
    filter: &ReportFilter,
    config: &ReportConfig,
) -> Reduction {
    let policy = config.status_policy();
    let reference_year = filter.reference_year(config.reference_year());
    let grid = buckets_for(filter.granularity, reference_year, config.yearly_window);
    let restricted = filter.is_time_restricted();

    let mut rows = RowSet::new(config);
    for seat in seats {
        rows.seat(Some(seat.member), Some(seat.team));
    }

    let mut points: Vec<SeriesPoint> = grid
        .iter()
        .map(|key| SeriesPoint {
            key: *key,
            label: key.to_string(),
            counts: Counts::default(),
        })
        .collect();
    let point_index: HashMap<BucketKey, usize> =
        grid.iter().enumerate().map(|(i, k)| (*k, i)).collect();

    let mut status = StatusBreakdown::default();
    let mut undated = 0;

    for record in records {
        if record.occurred_on.is_none() {
            undated += 1;
        }

        let in_rows = match record.occurred_on {
            Some(date) => filter.matches(date),
            None => !restricted,
        };
        if in_rows {
            let idx = rows.seat(record.member, record.team);
            tally(&mut rows.rows[idx].counts, record, &policy);
            if let Record::Ticket(ticket) = record.record {
                status.record(ticket.status);
            }
        }

        let key = match record.occurred_on {
            Some(date) if filter.admits(date) => Some(bucket_of_date(date, filter.granularity)),
            None if filter.granularity == Granularity::All && !restricted => Some(BucketKey::All),
            _ => None,
        };
        if let Some(&idx) = key.as_ref().and_then(|k| point_index.get(k)) {
            tally(&mut points[idx].counts, record, &policy);
        }
    }

    let teams = rows.team_rows();
    let mut totals = Counts::default();
    for row in &rows.rows {
        totals.merge(&row.counts);
    }

    log::debug!(
        "reduced {} records into {} rows, {} series points ({} undated)",
        records.len(),
        rows.rows.len(),
        points.len(),
        undated
    );

    Reduction {
        rows: rows.rows,
        teams,
        series: BucketSeries {
            granularity: filter.granularity,
            reference_year,
            points,
        },
        status,
        totals,
        undated,
    }
}

fn tally(counts: &mut Counts, record: &AnnotatedRecord<'_>, policy: &StatusPolicy) {
    match record.record {
        Record::Ticket(ticket) => {
            if policy.is_open(ticket.status) {
                counts.add_open();
            } else if policy.is_closed(ticket.status) {
                counts.add_closed();
            }
        }
        Record::Task(_) => counts.add_task(),
    }
    counts.add_hours(record.hours);
}

/// Rows keyed by member id, remembering each row's team for the rollup.
struct RowSet<'c> {
    config: &'c ReportConfig,
    rows: Vec<AggregatedRow>,
    team_ids: Vec<Option<u64>>,
    index: HashMap<Option<u64>, usize>,
}

impl<'c> RowSet<'c> {
    fn new(config: &'c ReportConfig) -> Self {
        Self {
            config,
            rows: Vec::new(),
            team_ids: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Index of the row for `member`, creating it if needed.
    fn seat(&mut self, member: Option<&Member>, team: Option<&Team>) -> usize {
        let key = member.map(|m| m.id);
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let name = member
            .map(|m| m.display_name())
            .unwrap_or_else(|| self.config.unassigned_label.clone());
        let team_name = match (member, team) {
            (Some(_), Some(t)) => t.name.clone(),
            _ => self.config.no_team_label.clone(),
        };
        self.rows.push(AggregatedRow {
            member_id: key,
            name,
            team: team_name,
            counts: Counts::default(),
        });
        self.team_ids.push(member.and(team).map(|t| t.id));
        let idx = self.rows.len() - 1;
        self.index.insert(key, idx);
        idx
    }

    fn team_rows(&self) -> Vec<TeamRow> {
        let mut out: Vec<TeamRow> = Vec::new();
        let mut index: HashMap<Option<u64>, usize> = HashMap::new();
        for (row, team_id) in self.rows.iter().zip(&self.team_ids) {
            let idx = *index.entry(*team_id).or_insert_with(|| {
                out.push(TeamRow {
                    team_id: *team_id,
                    team: row.team.clone(),
                    members: 0,
                    counts: Counts::default(),
                });
                out.len() - 1
            });
            if row.member_id.is_some() {
                out[idx].members += 1;
            }
            out[idx].counts.merge(&row.counts);
        }
        out
    }
}

/// Sortable row columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowField {
    Name,
    Team,
    Open,
    Closed,
    Total,
    Tasks,
    ManHours,
}

impl FromStr for RowField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "name" => Ok(RowField::Name),
            "team" => Ok(RowField::Team),
            "open" => Ok(RowField::Open),
            "closed" => Ok(RowField::Closed),
            "total" => Ok(RowField::Total),
            "tasks" => Ok(RowField::Tasks),
            "hours" | "man_hours" => Ok(RowField::ManHours),
            other => Err(Error::Config(format!("unknown row field: {other}"))),
        }
    }
}

pub fn compare_rows(a: &AggregatedRow, b: &AggregatedRow, field: RowField) -> Ordering {
    match field {
        RowField::Name => locale_cmp(&a.name, &b.name),
        RowField::Team => locale_cmp(&a.team, &b.team),
        RowField::Open => a.counts.open.cmp(&b.counts.open),
        RowField::Closed => a.counts.closed.cmp(&b.counts.closed),
        RowField::Total => a.counts.total.cmp(&b.counts.total),
        RowField::Tasks => a.counts.tasks.cmp(&b.counts.tasks),
        RowField::ManHours => a.counts.man_hours.total_cmp(&b.counts.man_hours),
    }
}

/// Stable sort of rows into a new vector.
pub fn sort_rows(rows: &[AggregatedRow], field: RowField, direction: SortDirection) -> Vec<AggregatedRow> {
    sorted_by(rows, direction, |a, b| compare_rows(a, b, field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::join;
    use crate::model::{Roster, Task, Ticket};

    fn roster() -> Roster {
        Roster::new(vec![Team::new(
            1,
            "Alpha",
            vec![Member::new(1, "Bob", ""), Member::new(2, "Ann", "")],
        )])
    }

    fn seats(roster: &Roster) -> Vec<Seat<'_>> {
        let team = &roster.teams[0];
        team.members().iter().map(|member| Seat { member, team }).collect()
    }

    fn config() -> ReportConfig {
        ReportConfig {
            reference_year: Some(2024),
            ..ReportConfig::default()
        }
    }

    fn row(r: &Reduction, name: &str) -> Counts {
        r.rows.iter().find(|row| row.name == name).unwrap().counts.clone()
    }

    #[test]
    fn test_open_closed_and_solved() {
        let roster = roster();
        let tickets = vec![
            Ticket::new(1, Some(1), TicketStatus::New, "2024-01-02"),
            Ticket::new(2, Some(1), TicketStatus::Pending, "2024-01-02"),
            Ticket::new(3, Some(1), TicketStatus::Solved, "2024-01-02"),
            Ticket::new(4, Some(1), TicketStatus::Closed, "2024-01-02"),
            Ticket::new(5, Some(1), TicketStatus::Unknown(42), "2024-01-02"),
        ];
        let records = join(&roster, &tickets, &[]);
        let r = reduce(&records, &seats(&roster), &ReportFilter::new(), &config());

        let bob = row(&r, "Bob");
        assert_eq!(bob.open, 2);
        assert_eq!(bob.closed, 1);
        assert_eq!(bob.total, 3);
        assert_eq!(r.status.solved, 1);
        assert_eq!(r.status.unknown, 1);
        assert_eq!(r.status.not_solved, 1);
        assert_eq!(r.status.total, 5);
    }

    #[test]
    fn test_configurable_open_statuses() {
        let roster = roster();
        let tickets = vec![Ticket::new(3, Some(1), TicketStatus::Solved, "2024-01-02")];
        let records = join(&roster, &tickets, &[]);
        let mut config = config();
        config.open_statuses.push(TicketStatus::Solved);
        let r = reduce(&records, &seats(&roster), &ReportFilter::new(), &config);
        assert_eq!(row(&r, "Bob").open, 1);
    }

    #[test]
    fn test_man_hours_from_tasks_and_tickets() {
        let roster = roster();
        let mut ticket = Ticket::new(1, Some(2), TicketStatus::Closed, "2024-01-02");
        ticket.start_time = Some("2024-01-02 09:00:00".into());
        ticket.end_time = Some("2024-01-02 10:30:00".into());
        let tickets = vec![ticket];
        let tasks = vec![
            Task::new(7, 1, Some(2), "2024-01-02", 2.0),
            Task::new(8, 1, Some(2), "2024-01-03", 0.5),
        ];
        let records = join(&roster, &tickets, &tasks);
        let r = reduce(&records, &seats(&roster), &ReportFilter::new(), &config());

        let ann = row(&r, "Ann");
        assert_eq!(ann.tasks, 2);
        assert_eq!(ann.man_hours, 4.0);
        assert_eq!(row(&r, "Bob"), Counts::default());
    }

    #[test]
    fn test_series_is_dense_and_zero_filled() {
        let roster = roster();
        let tickets = vec![Ticket::new(1, Some(1), TicketStatus::Closed, "2024-03-03")];
        let records = join(&roster, &tickets, &[]);
        let filter = ReportFilter::new().granularity(Granularity::Monthly);
        let r = reduce(&records, &seats(&roster), &filter, &config());

        assert_eq!(r.series.points.len(), 12);
        assert_eq!(r.series.points[0].label, "January");
        assert_eq!(r.series.points[2].counts.closed, 1);
        assert_eq!(r.series.points.iter().filter(|p| p.counts.is_zero()).count(), 11);
    }

    #[test]
    fn test_series_sums_to_unfiltered_totals() {
        let roster = roster();
        let tickets = vec![
            Ticket::new(1, Some(1), TicketStatus::Closed, "2024-01-01"),
            Ticket::new(2, Some(2), TicketStatus::New, "2024-06-15"),
            Ticket::new(3, Some(99), TicketStatus::Assigned, "2024-12-31"),
            Ticket::new(4, Some(2), TicketStatus::Planned, "2023-12-31"),
        ];
        let tasks = vec![
            Task::new(10, 1, Some(1), "2024-02-29", 1.5),
            Task::new(11, 2, Some(2), "2024-12-30", 3.0),
        ];
        let records = join(&roster, &tickets, &tasks);

        for g in [Granularity::All, Granularity::Weekly, Granularity::Monthly, Granularity::Yearly] {
            let filter = ReportFilter::new().granularity(g);
            let r = reduce(&records, &seats(&roster), &filter, &config());
            assert_eq!(r.series.totals(), r.totals, "granularity {g}");
        }

        // the last days of 2024 are in week 1 of the 2025 grid
        let filter = ReportFilter::new().granularity(Granularity::Weekly).year(2025);
        let r = reduce(&records, &seats(&roster), &filter, &config());
        assert_eq!(r.series.totals(), r.totals);
        assert_eq!(r.totals.open, 1);
        assert_eq!(r.totals.tasks, 1);
        assert_eq!(r.series.points[0].counts.tasks, 1);
    }

    #[test]
    fn test_unassigned_row_appended() {
        let roster = roster();
        let tickets = vec![Ticket::new(1, Some(99), TicketStatus::New, "2024-01-02")];
        let records = join(&roster, &tickets, &[]);
        let r = reduce(&records, &seats(&roster), &ReportFilter::new(), &config());

        assert_eq!(r.rows.len(), 3);
        let last = r.rows.last().unwrap();
        assert_eq!(last.name, "Unassigned");
        assert_eq!(last.team, "N/A");
        assert_eq!(last.member_id, None);
        assert_eq!(last.counts.open, 1);

        assert_eq!(r.teams.len(), 2);
        assert_eq!(r.teams[0].team, "Alpha");
        assert_eq!(r.teams[0].members, 2);
        assert_eq!(r.teams[1].team, "N/A");
        assert_eq!(r.teams[1].members, 0);
    }

    #[test]
    fn test_undated_records_only_count_unfiltered() {
        let roster = roster();
        let tickets = vec![Ticket::new(1, Some(1), TicketStatus::New, "not-a-date")];
        let records = join(&roster, &tickets, &[]);

        let r = reduce(&records, &seats(&roster), &ReportFilter::new(), &config());
        assert_eq!(row(&r, "Bob").open, 1);
        assert_eq!(r.series.points[0].counts.open, 1);
        assert_eq!(r.undated, 1);

        let r = reduce(&records, &seats(&roster), &ReportFilter::new().yearly(2024), &config());
        assert_eq!(row(&r, "Bob").open, 0);
        assert_eq!(r.series.totals().open, 0);
    }

    #[test]
    fn test_sort_rows() {
        let rows: Vec<AggregatedRow> = [("bob", 3), ("Ann", 1), ("Cy", 2)]
            .iter()
            .map(|(name, open)| AggregatedRow {
                member_id: None,
                name: name.to_string(),
                team: String::new(),
                counts: Counts {
                    open: *open,
                    ..Counts::default()
                },
            })
            .collect();

        let by_name = sort_rows(&rows, RowField::Name, SortDirection::Ascending);
        let names: Vec<&str> = by_name.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Ann", "bob", "Cy"]);

        let by_open = sort_rows(&rows, RowField::Open, SortDirection::Descending);
        let opens: Vec<u64> = by_open.iter().map(|r| r.counts.open).collect();
        assert_eq!(opens, vec![3, 2, 1]);

        let mut reversed = sort_rows(&by_open, RowField::Open, SortDirection::Ascending);
        reversed.reverse();
        assert_eq!(reversed, by_open);
        assert_eq!(rows[0].name, "bob");
    }

    #[test]
    fn test_row_field_parse() {
        assert_eq!("man-hours".parse::<RowField>().unwrap(), RowField::ManHours);
        assert_eq!("Name".parse::<RowField>().unwrap(), RowField::Name);
        assert!("priority".parse::<RowField>().is_err());
    }
}

pub mod board;
pub mod tickets;

use serde::Serialize;

use crate::config::ReportConfig;
use crate::join::{join, AnnotatedRecord, RosterIndex};
use crate::metrics::{
    reduce, AggregatedRow, BucketSeries, Counts, Seat, StatusBreakdown, TeamRow,
};
use crate::model::{Roster, Task, Team, Ticket};
use crate::query::filter::ReportFilter;

/// Everything a report screen shows for one filter.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub filter: ReportFilter,
    /// Selected team name, `None` for all teams.
    pub team: Option<String>,
    pub rows: Vec<AggregatedRow>,
    pub teams: Vec<TeamRow>,
    pub series: BucketSeries,
    pub status: StatusBreakdown,
    pub totals: Counts,
    pub undated: u64,
}

/// Joined records narrowed to the filter's team, with the seats that make
/// up the table.
#[derive(Debug)]
pub struct Selection<'a> {
    pub team: Option<&'a Team>,
    pub teams: Vec<&'a Team>,
    pub seats: Vec<Seat<'a>>,
    pub records: Vec<AnnotatedRecord<'a>>,
}

/// Join and narrow to the filter's team.
///
/// With a team selected, records of its members are kept and attributed to
/// that team even when the member's first team is another one; unassigned
/// work is left out. An unknown team selects nothing. Without a team,
/// every roster member gets a seat in first-appearance order.
pub fn select<'a>(
    roster: &'a Roster,
    tickets: &'a [Ticket],
    tasks: &'a [Task],
    filter: &ReportFilter,
) -> Selection<'a> {
    let records = join(roster, tickets, tasks);

    let team = match filter.team.resolve(roster) {
        Ok(team) => team,
        Err(e) => {
            log::warn!("{e}; report will be empty");
            return Selection {
                team: None,
                teams: Vec::new(),
                seats: Vec::new(),
                records: Vec::new(),
            };
        }
    };

    match team {
        Some(team) => {
            let records = records
                .into_iter()
                .filter(|r| r.member_id().is_some_and(|id| team.has_member(id)))
                .map(|mut r| {
                    r.team = Some(team);
                    r
                })
                .collect();
            let seats = team
                .members()
                .iter()
                .map(|member| Seat { member, team })
                .collect();
            Selection {
                team: Some(team),
                teams: vec![team],
                seats,
                records,
            }
        }
        None => {
            let index = RosterIndex::new(roster);
            let seats = roster
                .members()
                .into_iter()
                .filter_map(|m| index.resolve(Some(m.id)))
                .map(|(member, team)| Seat { member, team })
                .collect();
            Selection {
                team: None,
                teams: roster.teams.iter().collect(),
                seats,
                records,
            }
        }
    }
}

/// Compute a report. Pure: no I/O, same inputs give the same output.
pub fn aggregate(
    roster: &Roster,
    tickets: &[Ticket],
    tasks: &[Task],
    filter: &ReportFilter,
    config: &ReportConfig,
) -> Report {
    let selection = select(roster, tickets, tasks, filter);
    log::debug!(
        "team {}: {} seats, {} records",
        filter.team,
        selection.seats.len(),
        selection.records.len()
    );

    let reduction = reduce(&selection.records, &selection.seats, filter, config);

    Report {
        filter: filter.clone(),
        team: selection.team.map(|t| t.name.clone()),
        rows: reduction.rows,
        teams: reduction.teams,
        series: reduction.series,
        status: reduction.status,
        totals: reduction.totals,
        undated: reduction.undated,
    }
}

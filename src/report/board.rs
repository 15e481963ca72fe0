use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::config::ReportConfig;
use crate::date_util::{week_range, WEEKS_PER_YEAR};
use crate::error::{Error, Result};
use crate::join::AnnotatedRecord;
use crate::model::{Roster, Task, Team, Ticket};
use crate::query::filter::ReportFilter;
use crate::text::strip_html;

use super::select;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardEntry {
    pub task_id: u64,
    pub ticket_id: u64,
    pub member: String,
    pub content: String,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamColumn {
    /// `None` for the unassigned column.
    pub team_id: Option<u64>,
    pub team: String,
    pub entries: Vec<BoardEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardDay {
    pub date: NaiveDate,
    pub weekday: String,
    pub teams: Vec<TeamColumn>,
}

/// Tasks of one week laid out by day and team.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekBoard {
    pub year: i32,
    pub week: u8,
    pub days: Vec<BoardDay>,
}

impl WeekBoard {
    pub fn entry_count(&self) -> usize {
        self.days
            .iter()
            .flat_map(|d| &d.teams)
            .map(|t| t.entries.len())
            .sum()
    }

    pub fn total_hours(&self) -> f64 {
        self.days
            .iter()
            .flat_map(|d| &d.teams)
            .flat_map(|t| &t.entries)
            .map(|e| e.hours)
            .sum()
    }
}

/// Lay out the tasks started during `week` of `year`.
///
/// Every day of the week's range gets one column per team in `teams`, empty
/// or not. That is Monday..Sunday, or up to two weeks for a folded week 52.
/// An unassigned column is added after them only when the week has
/// tasks without a roster owner. Ticket records are ignored.
pub fn weekly_board(
    records: &[AnnotatedRecord<'_>],
    teams: &[&Team],
    year: i32,
    week: u8,
    config: &ReportConfig,
) -> Result<WeekBoard> {
    if week == 0 || week > WEEKS_PER_YEAR {
        return Err(Error::BucketParse(format!(
            "week {week} out of range 1..={WEEKS_PER_YEAR}"
        )));
    }
    let (monday, last_day) = week_range(year, week)
        .ok_or_else(|| Error::BucketParse(format!("week {week} of {year}")))?;

    let in_week: Vec<(&AnnotatedRecord<'_>, &Task, NaiveDate)> = records
        .iter()
        .filter_map(|r| Some((r, r.as_task()?, r.occurred_on?)))
        .filter(|(_, _, date)| *date >= monday && *date <= last_day)
        .collect();
    let has_unassigned = in_week.iter().any(|(r, _, _)| r.team.is_none());

    let mut days = Vec::with_capacity(7);
    for date in monday.iter_days().take_while(|day| *day <= last_day) {
        let mut columns: Vec<TeamColumn> = teams
            .iter()
            .map(|team| TeamColumn {
                team_id: Some(team.id),
                team: team.name.clone(),
                entries: Vec::new(),
            })
            .collect();
        if has_unassigned {
            columns.push(TeamColumn {
                team_id: None,
                team: config.unassigned_label.clone(),
                entries: Vec::new(),
            });
        }

        for (record, task, _) in in_week.iter().filter(|(_, _, d)| *d == date) {
            let team_id = record.team.map(|t| t.id);
            let Some(column) = columns.iter_mut().find(|c| c.team_id == team_id) else {
                log::debug!("task {} belongs to a team outside the board", task.id);
                continue;
            };
            column.entries.push(BoardEntry {
                task_id: task.id,
                ticket_id: task.ticket_id,
                member: record
                    .member
                    .map(|m| m.display_name())
                    .unwrap_or_else(|| config.unassigned_label.clone()),
                content: strip_html(&task.content),
                hours: record.hours,
            });
        }

        days.push(BoardDay {
            date,
            weekday: date.weekday().to_string(),
            teams: columns,
        });
    }

    Ok(WeekBoard { year, week, days })
}

/// Weekly board for the filter's team selection. Only the team part of the
/// filter is used.
pub fn week_board(
    roster: &Roster,
    tickets: &[Ticket],
    tasks: &[Task],
    filter: &ReportFilter,
    year: i32,
    week: u8,
    config: &ReportConfig,
) -> Result<WeekBoard> {
    let selection = select(roster, tickets, tasks, filter);
    weekly_board(&selection.records, &selection.teams, year, week, config)
}

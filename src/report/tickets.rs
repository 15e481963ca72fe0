use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use serde::Serialize;

use crate::config::ReportConfig;
use crate::date_util::parse_timestamp;
use crate::error::{Error, Result};
use crate::join::{join, AnnotatedRecord};
use crate::model::{Roster, Task, Ticket, TicketStatus};
use crate::query::filter::ReportFilter;
use crate::query::sort::{locale_cmp, optional_cmp, sorted_by, SortDirection};
use crate::text::strip_html;

use super::select;

/// One line of the ticket table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketLine {
    pub id: u64,
    pub title: String,
    pub team: String,
    pub assigned_to: String,
    pub opened_at: String,
    pub resolved_at: Option<String>,
    pub status: TicketStatus,
    /// Plain-text content of the ticket's tasks, in task order.
    pub task_notes: Vec<String>,
    pub man_hours: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketField {
    Id,
    Title,
    Team,
    AssignedTo,
    Opened,
    Resolved,
    ManHours,
}

impl FromStr for TicketField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "id" => Ok(TicketField::Id),
            "title" => Ok(TicketField::Title),
            "team" => Ok(TicketField::Team),
            "assignee" | "assigned_to" => Ok(TicketField::AssignedTo),
            "opened" | "opened_at" => Ok(TicketField::Opened),
            "resolved" | "resolved_at" => Ok(TicketField::Resolved),
            "hours" | "man_hours" => Ok(TicketField::ManHours),
            other => Err(Error::Config(format!("unknown ticket field: {other}"))),
        }
    }
}

/// Build ticket lines from joined records, ordered by ticket id.
///
/// Ticket records become lines; task records supply notes and man-hours for
/// the ticket they point at. A ticket without tasks falls back to its own
/// start/end duration.
pub fn listing(records: &[AnnotatedRecord<'_>], config: &ReportConfig) -> Vec<TicketLine> {
    let mut tasks_by_ticket: HashMap<u64, Vec<&Task>> = HashMap::new();
    for task in records.iter().filter_map(|r| r.as_task()) {
        tasks_by_ticket.entry(task.ticket_id).or_default().push(task);
    }

    let mut lines: Vec<TicketLine> = records
        .iter()
        .filter_map(|record| record.as_ticket().map(|ticket| (record, ticket)))
        .map(|(record, ticket)| {
            let tasks = tasks_by_ticket.get(&ticket.id).map(Vec::as_slice).unwrap_or_default();
            let man_hours = if tasks.is_empty() {
                record.hours
            } else {
                tasks.iter().map(|t| t.duration_hours).sum()
            };
            TicketLine {
                id: ticket.id,
                title: ticket.title.clone(),
                team: record
                    .team
                    .map(|t| t.name.clone())
                    .unwrap_or_else(|| config.no_team_label.clone()),
                assigned_to: assigned_to(record, ticket, config),
                opened_at: ticket.opened_at.clone(),
                resolved_at: ticket.resolved_at.clone(),
                status: ticket.status,
                task_notes: tasks
                    .iter()
                    .map(|t| strip_html(&t.content))
                    .filter(|note| !note.is_empty())
                    .collect(),
                man_hours,
            }
        })
        .collect();

    lines.sort_by_key(|line| line.id);
    lines
}

/// Everyone listed on the ticket, comma-separated. Tickets exported without
/// a user list show their resolved owner.
fn assigned_to(record: &AnnotatedRecord<'_>, ticket: &Ticket, config: &ReportConfig) -> String {
    if !ticket.assignees.is_empty() {
        return ticket
            .assignees
            .iter()
            .map(|m| m.display_name())
            .collect::<Vec<_>>()
            .join(", ");
    }
    record
        .member
        .map(|m| m.display_name())
        .unwrap_or_else(|| config.unassigned_label.clone())
}

/// Ticket lines for a filter: tickets of the selected team whose opening
/// date matches, with notes from every task logged against them.
pub fn ticket_listing(
    roster: &Roster,
    tickets: &[Ticket],
    tasks: &[Task],
    filter: &ReportFilter,
    config: &ReportConfig,
) -> Vec<TicketLine> {
    let selection = select(roster, tickets, &[], filter);
    let restricted = filter.is_time_restricted();
    let mut records: Vec<AnnotatedRecord<'_>> = selection
        .records
        .into_iter()
        .filter(|r| match r.occurred_on {
            Some(date) => filter.matches(date),
            None => !restricted,
        })
        .collect();
    records.extend(join(roster, &[], tasks));
    listing(&records, config)
}

pub fn compare_lines(a: &TicketLine, b: &TicketLine, field: TicketField) -> Ordering {
    match field {
        TicketField::Id => a.id.cmp(&b.id),
        TicketField::Title => locale_cmp(&a.title, &b.title),
        TicketField::Team => locale_cmp(&a.team, &b.team),
        TicketField::AssignedTo => locale_cmp(&a.assigned_to, &b.assigned_to),
        TicketField::Opened => compare_times(Some(&a.opened_at), Some(&b.opened_at)),
        TicketField::Resolved => compare_times(a.resolved_at.as_deref(), b.resolved_at.as_deref()),
        TicketField::ManHours => a.man_hours.total_cmp(&b.man_hours),
    }
}

/// Parsed timestamps order chronologically; unparseable ones fall back to
/// text order after all valid ones.
fn compare_times(a: Option<&str>, b: Option<&str>) -> Ordering {
    let parse = |s: Option<&str>| s.and_then(|s| parse_timestamp(s).ok());
    match (parse(a), parse(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) if b.is_some() => Ordering::Less,
        (None, Some(_)) if a.is_some() => Ordering::Greater,
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => optional_cmp(a, b),
    }
}

pub fn sort_lines(lines: &[TicketLine], field: TicketField, direction: SortDirection) -> Vec<TicketLine> {
    sorted_by(lines, direction, |a, b| compare_lines(a, b, field))
}

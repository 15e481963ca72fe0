use std::collections::HashMap;

use chrono::NaiveDate;

use crate::date_util::{hours_between, parse_optional};
use crate::model::{Member, Roster, Task, Team, Ticket};

/// The source record behind an [`AnnotatedRecord`].
#[derive(Debug, Clone, Copy)]
pub enum Record<'a> {
    Ticket(&'a Ticket),
    Task(&'a Task),
}

impl Record<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Record::Ticket(_) => "ticket",
            Record::Task(_) => "task",
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            Record::Ticket(t) => t.id,
            Record::Task(t) => t.id,
        }
    }

    pub fn user_id(&self) -> Option<u64> {
        match self {
            Record::Ticket(t) => t.user_id,
            Record::Task(t) => t.user_id,
        }
    }

    fn timestamp(&self) -> Option<&str> {
        match self {
            Record::Ticket(t) => Some(t.opened_at.as_str()),
            Record::Task(t) => t.started_at.as_deref(),
        }
    }
}

/// A ticket or task with its resolved owner.
///
/// `member` and `team` are `None` when the owning user is absent from the
/// roster; such records are reported as unassigned rather than dropped.
#[derive(Debug, Clone)]
pub struct AnnotatedRecord<'a> {
    pub record: Record<'a>,
    pub member: Option<&'a Member>,
    pub team: Option<&'a Team>,
    /// Bucketing date: ticket opening or task start. `None` when missing or
    /// unparseable, in which case the record only counts towards unfiltered
    /// totals.
    pub occurred_on: Option<NaiveDate>,
    /// Man-hours carried by this record.
    pub hours: f64,
}

impl AnnotatedRecord<'_> {
    pub fn member_id(&self) -> Option<u64> {
        self.member.map(|m| m.id)
    }

    pub fn is_unassigned(&self) -> bool {
        self.member.is_none()
    }

    pub fn as_ticket(&self) -> Option<&Ticket> {
        match self.record {
            Record::Ticket(t) => Some(t),
            Record::Task(_) => None,
        }
    }

    pub fn as_task(&self) -> Option<&Task> {
        match self.record {
            Record::Task(t) => Some(t),
            Record::Ticket(_) => None,
        }
    }
}

/// Member id to (member, first team in roster order) lookup.
#[derive(Debug)]
pub struct RosterIndex<'a> {
    by_member: HashMap<u64, (&'a Member, &'a Team)>,
}

impl<'a> RosterIndex<'a> {
    pub fn new(roster: &'a Roster) -> Self {
        let mut by_member = HashMap::new();
        for team in &roster.teams {
            for member in team.members() {
                by_member.entry(member.id).or_insert((member, team));
            }
        }
        Self { by_member }
    }

    pub fn resolve(&self, user_id: Option<u64>) -> Option<(&'a Member, &'a Team)> {
        user_id.and_then(|id| self.by_member.get(&id).copied())
    }

    pub fn len(&self) -> usize {
        self.by_member.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_member.is_empty()
    }
}

/// Attribute every ticket and task to a member and team.
///
/// Output holds exactly one record per input ticket and task, tickets first,
/// each in input order.
pub fn join<'a>(roster: &'a Roster, tickets: &'a [Ticket], tasks: &'a [Task]) -> Vec<AnnotatedRecord<'a>> {
    let index = RosterIndex::new(roster);
    let mut out = Vec::with_capacity(tickets.len() + tasks.len());

    for ticket in tickets {
        let hours = ticket_hours(ticket);
        out.push(annotate(&index, Record::Ticket(ticket), hours));
    }
    for task in tasks {
        out.push(annotate(&index, Record::Task(task), task.duration_hours.max(0.0)));
    }

    let unassigned = out.iter().filter(|r| r.is_unassigned()).count();
    if unassigned > 0 {
        log::debug!("{unassigned} of {} records have no roster owner", out.len());
    }
    out
}

fn annotate<'a>(index: &RosterIndex<'a>, record: Record<'a>, hours: f64) -> AnnotatedRecord<'a> {
    let (member, team) = match index.resolve(record.user_id()) {
        Some((m, t)) => (Some(m), Some(t)),
        None => (None, None),
    };
    let occurred_on = match parse_optional(record.timestamp()) {
        Some(Ok(at)) => Some(at.date()),
        Some(Err(e)) => {
            log::warn!("{} {}: {e}; excluded from time buckets", record.kind(), record.id());
            None
        }
        None => None,
    };
    AnnotatedRecord {
        record,
        member,
        team,
        occurred_on,
        hours,
    }
}

/// Duration between a ticket's start and end times, 0 when either is
/// missing or unparseable.
pub fn ticket_hours(ticket: &Ticket) -> f64 {
    let start = parse_optional(ticket.start_time.as_deref());
    let end = parse_optional(ticket.end_time.as_deref());
    match (start, end) {
        (Some(Ok(start)), Some(Ok(end))) => hours_between(start, end),
        (Some(Err(e)), _) | (_, Some(Err(e))) => {
            log::warn!("ticket {}: {e}; duration counted as 0", ticket.id);
            0.0
        }
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TicketStatus;

    fn roster() -> Roster {
        Roster::new(vec![
            Team::new(1, "Alpha", vec![Member::new(1, "Bob", ""), Member::new(2, "Ann", "")]),
            Team::new(2, "Beta", vec![Member::new(2, "Ann", ""), Member::new(3, "Cy", "")]),
        ])
    }

    #[test]
    fn test_every_record_is_attributed_once() {
        let roster = roster();
        let tickets = vec![
            Ticket::new(10, Some(1), TicketStatus::Closed, "2024-03-03"),
            Ticket::new(11, Some(99), TicketStatus::New, "2024-03-04"),
            Ticket::new(12, None, TicketStatus::New, "2024-03-05"),
        ];
        let tasks = vec![Task::new(20, 10, Some(3), "2024-03-03", 2.0)];

        let joined = join(&roster, &tickets, &tasks);
        assert_eq!(joined.len(), 4);
        let ids: Vec<u64> = joined.iter().map(|r| r.record.id()).collect();
        assert_eq!(ids, vec![10, 11, 12, 20]);
        assert_eq!(joined.iter().filter(|r| r.is_unassigned()).count(), 2);
        assert_eq!(joined[3].team.unwrap().name, "Beta");
    }

    #[test]
    fn test_first_team_wins() {
        let roster = roster();
        let tickets = vec![Ticket::new(10, Some(2), TicketStatus::Assigned, "2024-03-03")];
        let joined = join(&roster, &tickets, &[]);
        assert_eq!(joined[0].team.unwrap().name, "Alpha");
        assert_eq!(joined[0].member.unwrap().first_name, "Ann");
    }

    #[test]
    fn test_invalid_timestamp_kept_without_date() {
        let roster = roster();
        let tickets = vec![Ticket::new(10, Some(1), TicketStatus::New, "yesterday")];
        let mut task = Task::new(20, 10, Some(1), "2024-03-03", 1.0);
        task.started_at = None;
        let tasks = vec![task];
        let joined = join(&roster, &tickets, &tasks);
        assert_eq!(joined.len(), 2);
        assert!(joined.iter().all(|r| r.occurred_on.is_none()));
    }

    #[test]
    fn test_ticket_hours() {
        let mut ticket = Ticket::new(10, Some(1), TicketStatus::Closed, "2024-03-03");
        assert_eq!(ticket_hours(&ticket), 0.0);

        ticket.start_time = Some("2024-03-03 08:00:00".into());
        assert_eq!(ticket_hours(&ticket), 0.0);

        ticket.end_time = Some("2024-03-03 11:30:00".into());
        assert_eq!(ticket_hours(&ticket), 3.5);

        ticket.end_time = Some("2024-03-03 07:00:00".into());
        assert_eq!(ticket_hours(&ticket), 0.0);

        ticket.end_time = Some("soon".into());
        assert_eq!(ticket_hours(&ticket), 0.0);
    }

    #[test]
    fn test_empty_roster() {
        let roster = Roster::default();
        let tickets = vec![Ticket::new(10, Some(1), TicketStatus::New, "2024-03-03")];
        let joined = join(&roster, &tickets, &[]);
        assert!(joined[0].is_unassigned());
        assert!(RosterIndex::new(&roster).is_empty());
    }
}

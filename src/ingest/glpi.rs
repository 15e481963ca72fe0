//! Raw GLPI payload shapes and their conversion into model types.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{Member, Roster, Task, Team, Ticket, TicketStatus};

use super::LoadReport;

/// A payload page: either a bare array or an `{ "items": [...] }` envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Bare(Vec<Value>),
    Items { items: Vec<Value> },
}

impl Payload {
    pub fn into_items(self) -> Vec<Value> {
        match self {
            Payload::Bare(items) => items,
            Payload::Items { items } => items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawUser {
    pub id: Option<u64>,
    #[serde(default, alias = "firstname")]
    pub first_name: Option<String>,
    #[serde(default, alias = "realname")]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawGroupUser {
    pub user: RawUser,
}

#[derive(Debug, Deserialize)]
pub struct RawGroup {
    pub id: Option<u64>,
    #[serde(default, alias = "completename")]
    pub name: Option<String>,
    #[serde(default)]
    pub group_users: Vec<RawGroupUser>,
}

/// Status as a numeric GLPI code or a name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawStatus {
    Code(i64),
    Name(String),
}

#[derive(Debug, Default, Deserialize)]
pub struct RawAdditional {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawTicket {
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    pub status: Option<RawStatus>,
    #[serde(alias = "open_date")]
    pub date: Option<String>,
    #[serde(default, alias = "solve_date")]
    pub solvedate: Option<String>,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub ticket_users: Vec<RawGroupUser>,
    #[serde(default)]
    pub additional_field: Option<RawAdditional>,
}

#[derive(Debug, Deserialize)]
pub struct RawTask {
    pub id: Option<u64>,
    #[serde(alias = "tickets_id")]
    pub ticket_id: Option<u64>,
    #[serde(default, alias = "users_id_tech")]
    pub user_id: Option<u64>,
    #[serde(default, alias = "begin")]
    pub start_date: Option<String>,
    #[serde(default)]
    pub duration_hr: Option<f64>,
    /// Seconds.
    #[serde(default)]
    pub actiontime: Option<f64>,
    #[serde(default)]
    pub content: Option<String>,
}

fn blank_to_none(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

impl TryFrom<RawGroup> for Team {
    type Error = Error;

    fn try_from(raw: RawGroup) -> Result<Self> {
        let id = raw
            .id
            .ok_or_else(|| Error::invalid_record("group", "missing id"))?;
        let name = blank_to_none(raw.name).unwrap_or_else(|| format!("Group {id}"));
        let members = raw
            .group_users
            .into_iter()
            .filter_map(|gu| {
                let Some(user_id) = gu.user.id else {
                    log::warn!("group {id}: member without id skipped");
                    return None;
                };
                Some(Member::new(
                    user_id,
                    gu.user.first_name.as_deref().unwrap_or_default(),
                    gu.user.last_name.as_deref().unwrap_or_default(),
                ))
            })
            .collect();
        Ok(Team::new(id, &name, members))
    }
}

impl TryFrom<RawTicket> for Ticket {
    type Error = Error;

    fn try_from(raw: RawTicket) -> Result<Self> {
        let id = raw
            .id
            .ok_or_else(|| Error::invalid_record("ticket", "missing id"))?;
        let status = match raw.status {
            Some(RawStatus::Code(code)) => TicketStatus::from_code(code),
            Some(RawStatus::Name(name)) => name.parse().unwrap_or_else(|_| {
                log::warn!("ticket {id}: unknown status {name}, kept as unknown");
                TicketStatus::UNRECOGNISED
            }),
            None => {
                log::warn!("ticket {id}: missing status, kept as unknown");
                TicketStatus::UNRECOGNISED
            }
        };
        let opened_at = blank_to_none(raw.date)
            .ok_or_else(|| Error::invalid_record("ticket", format!("{id}: missing opening date")))?;

        let mut seen = HashSet::new();
        let assignees: Vec<Member> = raw
            .ticket_users
            .into_iter()
            .filter_map(|tu| {
                let user_id = tu.user.id?;
                seen.insert(user_id).then(|| {
                    Member::new(
                        user_id,
                        tu.user.first_name.as_deref().unwrap_or_default(),
                        tu.user.last_name.as_deref().unwrap_or_default(),
                    )
                })
            })
            .collect();
        let user_id = raw.user_id.or_else(|| assignees.first().map(|m| m.id));
        let additional = raw.additional_field.unwrap_or_default();

        Ok(Ticket {
            id,
            title: raw.name.unwrap_or_default(),
            user_id,
            status,
            opened_at,
            resolved_at: blank_to_none(raw.solvedate),
            start_time: blank_to_none(additional.start_time),
            end_time: blank_to_none(additional.end_time),
            assignees,
        })
    }
}

impl TryFrom<RawTask> for Task {
    type Error = Error;

    fn try_from(raw: RawTask) -> Result<Self> {
        let id = raw
            .id
            .ok_or_else(|| Error::invalid_record("task", "missing id"))?;
        let ticket_id = raw
            .ticket_id
            .ok_or_else(|| Error::invalid_record("task", format!("{id}: missing ticket id")))?;
        let hours = raw
            .duration_hr
            .or_else(|| raw.actiontime.map(|secs| secs / 3600.0))
            .unwrap_or(0.0);
        if !hours.is_finite() {
            return Err(Error::invalid_record("task", format!("{id}: duration {hours}")));
        }

        Ok(Task {
            id,
            ticket_id,
            user_id: raw.user_id,
            started_at: blank_to_none(raw.start_date),
            duration_hours: hours.max(0.0),
            content: raw.content.unwrap_or_default(),
        })
    }
}

/// Decode a payload page item by item. Items that fail to deserialize or
/// convert are logged and counted as skipped; only a malformed page is an
/// error.
pub fn parse_items<R, T>(source: &str, text: &str) -> Result<(Vec<T>, LoadReport)>
where
    R: DeserializeOwned,
    T: TryFrom<R, Error = Error>,
{
    let payload: Payload = serde_json::from_str(text)?;
    let mut items = Vec::new();
    let mut skipped = 0u64;

    for value in payload.into_items() {
        let converted = serde_json::from_value::<R>(value)
            .map_err(Error::from)
            .and_then(T::try_from);
        match converted {
            Ok(item) => items.push(item),
            Err(e) => {
                log::warn!("{source}: skipping record: {e}");
                skipped += 1;
            }
        }
    }

    let report = LoadReport::from_counts(source.to_string(), items.len() as u64, skipped);
    Ok((items, report))
}

pub fn parse_roster(source: &str, text: &str) -> Result<(Roster, LoadReport)> {
    let (teams, report) = parse_items::<RawGroup, Team>(source, text)?;
    Ok((Roster::new(teams), report))
}

/// Tickets with duplicates across pages collapsed by id, first wins.
pub fn parse_tickets(source: &str, text: &str) -> Result<(Vec<Ticket>, LoadReport)> {
    let (tickets, mut report) = parse_items::<RawTicket, Ticket>(source, text)?;
    let mut seen = HashSet::new();
    let before = tickets.len();
    let tickets: Vec<Ticket> = tickets.into_iter().filter(|t| seen.insert(t.id)).collect();
    if tickets.len() < before {
        log::debug!("{source}: collapsed {} duplicate tickets", before - tickets.len());
        report.items_loaded = tickets.len() as u64;
    }
    Ok((tickets, report))
}

pub fn parse_tasks(source: &str, text: &str) -> Result<(Vec<Task>, LoadReport)> {
    parse_items::<RawTask, Task>(source, text)
}

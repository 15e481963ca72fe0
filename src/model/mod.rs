use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A person who can own tickets and tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
}

impl Member {
    pub fn new(id: u64, first_name: &str, last_name: &str) -> Self {
        Self {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        }
    }

    pub fn display_name(&self) -> String {
        match (self.first_name.trim(), self.last_name.trim()) {
            ("", "") => format!("User {}", self.id),
            (first, "") => first.to_string(),
            ("", last) => last.to_string(),
            (first, last) => format!("{first} {last}"),
        }
    }
}

/// A GLPI group and its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TeamFields")]
pub struct Team {
    pub id: u64,
    pub name: String,
    members: Vec<Member>,
}

/// Serialized form of a [`Team`]; deserializing goes through [`Team::new`].
#[derive(Deserialize)]
struct TeamFields {
    id: u64,
    name: String,
    #[serde(default)]
    members: Vec<Member>,
}

impl From<TeamFields> for Team {
    fn from(fields: TeamFields) -> Self {
        Team::new(fields.id, &fields.name, fields.members)
    }
}

impl Team {
    /// Build a team, keeping the first occurrence of any repeated member id.
    pub fn new(id: u64, name: &str, members: Vec<Member>) -> Self {
        let mut seen = HashSet::new();
        let members = members
            .into_iter()
            .filter(|m| seen.insert(m.id))
            .collect();
        Self {
            id,
            name: name.to_string(),
            members,
        }
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn has_member(&self, member_id: u64) -> bool {
        self.members.iter().any(|m| m.id == member_id)
    }
}

/// Ordered team directory. A member may appear in several teams.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    pub teams: Vec<Team>,
}

impl Roster {
    pub fn new(teams: Vec<Team>) -> Self {
        Self { teams }
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn team_by_id(&self, id: u64) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id)
    }

    /// Case-insensitive lookup by team name.
    pub fn team_by_name(&self, name: &str) -> Option<&Team> {
        let name = name.trim();
        self.teams.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Every distinct member, in order of first appearance.
    pub fn members(&self) -> Vec<&Member> {
        let mut seen = HashSet::new();
        self.teams
            .iter()
            .flat_map(|t| t.members.iter())
            .filter(|m| seen.insert(m.id))
            .collect()
    }
}

/// GLPI ticket status. Codes outside 1..=6 are kept as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    New,
    Assigned,
    Planned,
    Pending,
    Solved,
    Closed,
    Unknown(i64),
}

impl TicketStatus {
    /// Stand-in for a status name GLPI sent that has no known code.
    pub const UNRECOGNISED: TicketStatus = TicketStatus::Unknown(-1);

    pub fn from_code(code: i64) -> Self {
        match code {
            1 => TicketStatus::New,
            2 => TicketStatus::Assigned,
            3 => TicketStatus::Planned,
            4 => TicketStatus::Pending,
            5 => TicketStatus::Solved,
            6 => TicketStatus::Closed,
            other => TicketStatus::Unknown(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            TicketStatus::New => 1,
            TicketStatus::Assigned => 2,
            TicketStatus::Planned => 3,
            TicketStatus::Pending => 4,
            TicketStatus::Solved => 5,
            TicketStatus::Closed => 6,
            TicketStatus::Unknown(code) => *code,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TicketStatus::New => "new",
            TicketStatus::Assigned => "assigned",
            TicketStatus::Planned => "planned",
            TicketStatus::Pending => "pending",
            TicketStatus::Solved => "solved",
            TicketStatus::Closed => "closed",
            TicketStatus::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketStatus::Unknown(code) => write!(f, "unknown ({code})"),
            other => f.write_str(other.label()),
        }
    }
}

impl FromStr for TicketStatus {
    type Err = Error;

    /// Parse a status name (`closed`) or numeric code (`6`).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(code) = s.parse::<i64>() {
            return Ok(TicketStatus::from_code(code));
        }
        match s.to_lowercase().as_str() {
            "new" => Ok(TicketStatus::New),
            "assigned" => Ok(TicketStatus::Assigned),
            "planned" => Ok(TicketStatus::Planned),
            "pending" => Ok(TicketStatus::Pending),
            "solved" => Ok(TicketStatus::Solved),
            "closed" => Ok(TicketStatus::Closed),
            _ => Err(Error::Config(format!("unknown ticket status: {s}"))),
        }
    }
}

/// A ticket as consumed by the report core. Timestamps are kept as written
/// and parsed when the ticket is joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: u64,
    pub title: String,
    /// `None` means the ticket is unassigned.
    pub user_id: Option<u64>,
    pub status: TicketStatus,
    pub opened_at: String,
    pub resolved_at: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    /// Everyone listed on the ticket, owner included, in payload order.
    #[serde(default)]
    pub assignees: Vec<Member>,
}

impl Ticket {
    pub fn new(id: u64, user_id: Option<u64>, status: TicketStatus, opened_at: &str) -> Self {
        Self {
            id,
            title: String::new(),
            user_id,
            status,
            opened_at: opened_at.to_string(),
            resolved_at: None,
            start_time: None,
            end_time: None,
            assignees: Vec::new(),
        }
    }
}

/// A unit of work logged against a ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub ticket_id: u64,
    pub user_id: Option<u64>,
    pub started_at: Option<String>,
    /// Never negative.
    pub duration_hours: f64,
    pub content: String,
}

impl Task {
    pub fn new(id: u64, ticket_id: u64, user_id: Option<u64>, started_at: &str, duration_hours: f64) -> Self {
        Self {
            id,
            ticket_id,
            user_id,
            started_at: Some(started_at.to_string()),
            duration_hours: duration_hours.max(0.0),
            content: String::new(),
        }
    }
}

/// Everything a report is computed from.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub roster: Roster,
    pub tickets: Vec<Ticket>,
    pub tasks: Vec<Task>,
}

use std::path::{Path, PathBuf};

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::metrics::StatusPolicy;
use crate::model::TicketStatus;

pub const CONFIG_KEYS: [&str; 6] = [
    "open_statuses",
    "closed_statuses",
    "yearly_window",
    "reference_year",
    "unassigned_label",
    "no_team_label",
];

/// Report settings, stored as JSON.
///
/// Solved tickets are neither open nor closed by default; whether they
/// should count as open is a reporting policy decision, so both sets are
/// configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub open_statuses: Vec<TicketStatus>,
    pub closed_statuses: Vec<TicketStatus>,
    /// Trailing years shown in a yearly series.
    pub yearly_window: u16,
    /// Anchor year for weekly grids and yearly windows; current year if unset.
    pub reference_year: Option<i32>,
    pub unassigned_label: String,
    pub no_team_label: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            open_statuses: vec![
                TicketStatus::New,
                TicketStatus::Assigned,
                TicketStatus::Planned,
                TicketStatus::Pending,
            ],
            closed_statuses: vec![TicketStatus::Closed],
            yearly_window: 10,
            reference_year: None,
            unassigned_label: "Unassigned".to_string(),
            no_team_label: "N/A".to_string(),
        }
    }
}

impl ReportConfig {
    /// Default location: `<config dir>/glpireport/config.json`.
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("cannot determine config directory".into()))?;
        Ok(dir.join("glpireport").join("config.json"))
    }

    /// Load from a file that must exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let config: ReportConfig = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(s) = self
            .open_statuses
            .iter()
            .find(|s| self.closed_statuses.contains(s))
        {
            return Err(Error::Config(format!(
                "status {s} cannot be both open and closed"
            )));
        }
        Ok(())
    }

    pub fn status_policy(&self) -> StatusPolicy {
        StatusPolicy::new(
            self.open_statuses.iter().copied(),
            self.closed_statuses.iter().copied(),
        )
    }

    /// Configured reference year, or the current local year.
    pub fn reference_year(&self) -> i32 {
        self.reference_year
            .unwrap_or_else(|| chrono::Local::now().date_naive().year())
    }

    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "open_statuses" => join_statuses(&self.open_statuses),
            "closed_statuses" => join_statuses(&self.closed_statuses),
            "yearly_window" => self.yearly_window.to_string(),
            "reference_year" => self
                .reference_year
                .map(|y| y.to_string())
                .unwrap_or_default(),
            "unassigned_label" => self.unassigned_label.clone(),
            "no_team_label" => self.no_team_label.clone(),
            other => return Err(unknown_key(other)),
        };
        Ok(value)
    }

    /// Set a key from its text form. Status lists are comma-separated names
    /// or codes; an empty `reference_year` clears it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "open_statuses" => self.open_statuses = parse_statuses(value)?,
            "closed_statuses" => self.closed_statuses = parse_statuses(value)?,
            "yearly_window" => {
                self.yearly_window = value
                    .parse()
                    .map_err(|_| Error::Config(format!("invalid yearly_window: {value}")))?;
            }
            "reference_year" => {
                self.reference_year = if value.is_empty() {
                    None
                } else {
                    Some(
                        value
                            .parse()
                            .map_err(|_| Error::Config(format!("invalid reference_year: {value}")))?,
                    )
                };
            }
            "unassigned_label" => self.unassigned_label = value.to_string(),
            "no_team_label" => self.no_team_label = value.to_string(),
            other => return Err(unknown_key(other)),
        }
        self.validate()
    }

    pub fn entries(&self) -> Vec<(String, String)> {
        CONFIG_KEYS
            .iter()
            .filter_map(|k| self.get(k).ok().map(|v| (k.to_string(), v)))
            .collect()
    }
}

fn unknown_key(key: &str) -> Error {
    Error::Config(format!(
        "unknown key: {key} (expected one of: {})",
        CONFIG_KEYS.join(", ")
    ))
}

fn join_statuses(statuses: &[TicketStatus]) -> String {
    statuses
        .iter()
        .map(|s| match s {
            TicketStatus::Unknown(code) => code.to_string(),
            known => known.label().to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_statuses(value: &str) -> Result<Vec<TicketStatus>> {
    let mut out = Vec::new();
    for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let status: TicketStatus = part.parse()?;
        if !out.contains(&status) {
            out.push(status);
        }
    }
    Ok(out)
}

pub mod file;
pub mod glpi;

use serde::Serialize;

use crate::error::Result;
use crate::model::{Dataset, Roster, Task, Ticket};

/// Outcome of loading one kind of record.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub source: String,
    pub status: LoadStatus,
    pub items_loaded: u64,
    pub items_skipped: u64,
    pub error: Option<String>,
}

impl LoadReport {
    /// Create a LoadReport with the status derived from counts.
    pub fn from_counts(source: String, items_loaded: u64, items_skipped: u64) -> Self {
        let status = if items_skipped == 0 {
            LoadStatus::Success
        } else if items_loaded > 0 {
            LoadStatus::PartialFailure
        } else {
            LoadStatus::Failed
        };
        let error = if items_skipped > 0 {
            Some(format!("{items_skipped} records skipped"))
        } else {
            None
        };
        Self {
            source,
            status,
            items_loaded,
            items_skipped,
            error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadStatus {
    Success,
    PartialFailure,
    Failed,
}

/// Records loaded from a source, with the load outcome.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub items: T,
    pub report: LoadReport,
}

/// Where teams, tickets and tasks come from.
///
/// Implementations hold whatever connection or location state they need;
/// the report core only sees the loaded values.
pub trait DataSource {
    fn roster(&self) -> Result<Loaded<Roster>>;
    fn tickets(&self) -> Result<Loaded<Vec<Ticket>>>;
    fn tasks(&self) -> Result<Loaded<Vec<Task>>>;

    /// Load everything, returning one report per record kind.
    fn load(&self) -> Result<(Dataset, Vec<LoadReport>)> {
        let roster = self.roster()?;
        let tickets = self.tickets()?;
        let tasks = self.tasks()?;
        for report in [&roster.report, &tickets.report, &tasks.report] {
            log::info!(
                "{}: {} loaded, {} skipped",
                report.source,
                report.items_loaded,
                report.items_skipped
            );
        }
        let reports = vec![roster.report, tickets.report, tasks.report];
        Ok((
            Dataset {
                roster: roster.items,
                tickets: tickets.items,
                tasks: tasks.items,
            },
            reports,
        ))
    }
}

/// A source over data already in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pub dataset: Dataset,
}

impl MemorySource {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset }
    }
}

impl DataSource for MemorySource {
    fn roster(&self) -> Result<Loaded<Roster>> {
        Ok(Loaded {
            items: self.dataset.roster.clone(),
            report: LoadReport::from_counts("groups".into(), self.dataset.roster.teams.len() as u64, 0),
        })
    }

    fn tickets(&self) -> Result<Loaded<Vec<Ticket>>> {
        Ok(Loaded {
            items: self.dataset.tickets.clone(),
            report: LoadReport::from_counts("tickets".into(), self.dataset.tickets.len() as u64, 0),
        })
    }

    fn tasks(&self) -> Result<Loaded<Vec<Task>>> {
        Ok(Loaded {
            items: self.dataset.tasks.clone(),
            report: LoadReport::from_counts("tasks".into(), self.dataset.tasks.len() as u64, 0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Member, Team, TicketStatus};

    #[test]
    fn test_load_report_status() {
        assert_eq!(LoadReport::from_counts("t".into(), 5, 0).status, LoadStatus::Success);
        assert_eq!(LoadReport::from_counts("t".into(), 0, 0).status, LoadStatus::Success);
        assert_eq!(LoadReport::from_counts("t".into(), 5, 1).status, LoadStatus::PartialFailure);
        let failed = LoadReport::from_counts("t".into(), 0, 2);
        assert_eq!(failed.status, LoadStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("2 records skipped"));
    }

    #[test]
    fn test_memory_source_load() {
        let dataset = Dataset {
            roster: Roster::new(vec![Team::new(1, "Alpha", vec![Member::new(1, "Bob", "")])]),
            tickets: vec![Ticket::new(10, Some(1), TicketStatus::New, "2024-03-03")],
            tasks: Vec::new(),
        };
        let (loaded, reports) = MemorySource::new(dataset).load().unwrap();
        assert_eq!(loaded.tickets.len(), 1);
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].items_loaded, 1);
        assert!(reports.iter().all(|r| r.status == LoadStatus::Success));
    }
}

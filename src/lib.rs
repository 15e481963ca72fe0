pub mod config;
pub mod date_util;
pub mod error;
pub mod ingest;
pub mod join;
pub mod metrics;
pub mod model;
pub mod query;
pub mod report;
pub mod text;

pub use config::ReportConfig;
pub use error::{Error, Result};
pub use ingest::file::FileSource;
pub use ingest::{DataSource, LoadReport, LoadStatus, MemorySource};
pub use metrics::{
    sort_rows, AggregatedRow, BucketSeries, Counts, RowField, SeriesPoint, StatusBreakdown,
    StatusPolicy, TeamRow,
};
pub use model::{Dataset, Member, Roster, Task, Team, Ticket, TicketStatus};
pub use query::bucket::{bucket_of, buckets_for, BucketKey, Granularity};
pub use query::filter::{ReportFilter, TeamSelector};
pub use query::sort::{SortDirection, SortState};
pub use report::board::{BoardDay, BoardEntry, TeamColumn, WeekBoard};
pub use report::tickets::{sort_lines, TicketField, TicketLine};
pub use report::{aggregate, Report};

/// Main entry point: a loaded dataset plus the settings reports run with.
pub struct Reporter<S: DataSource> {
    source: S,
    config: ReportConfig,
    dataset: Dataset,
    loads: Vec<LoadReport>,
}

impl<S: DataSource> Reporter<S> {
    /// Load everything from `source`.
    pub fn open(source: S, config: ReportConfig) -> Result<Self> {
        config.validate()?;
        let (dataset, loads) = source.load()?;
        Ok(Self {
            source,
            config,
            dataset,
            loads,
        })
    }

    /// Reload from the source, replacing the current dataset.
    pub fn reload(&mut self) -> Result<&[LoadReport]> {
        let (dataset, loads) = self.source.load()?;
        self.dataset = dataset;
        self.loads = loads;
        Ok(&self.loads)
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Outcome of the last load, one entry per record kind.
    pub fn status(&self) -> &[LoadReport] {
        &self.loads
    }

    pub fn report(&self, filter: &ReportFilter) -> Report {
        aggregate(
            &self.dataset.roster,
            &self.dataset.tickets,
            &self.dataset.tasks,
            filter,
            &self.config,
        )
    }

    pub fn tickets(&self, filter: &ReportFilter) -> Vec<TicketLine> {
        report::tickets::ticket_listing(
            &self.dataset.roster,
            &self.dataset.tickets,
            &self.dataset.tasks,
            filter,
            &self.config,
        )
    }

    pub fn board(&self, filter: &ReportFilter, year: i32, week: u8) -> Result<WeekBoard> {
        report::board::week_board(
            &self.dataset.roster,
            &self.dataset.tickets,
            &self.dataset.tasks,
            filter,
            year,
            week,
            &self.config,
        )
    }

    /// Bucket grid for `granularity`, anchored at `year` or the configured
    /// reference year.
    pub fn buckets(&self, granularity: Granularity, year: Option<i32>) -> Vec<BucketKey> {
        let year = year.unwrap_or_else(|| self.config.reference_year());
        buckets_for(granularity, year, self.config.yearly_window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reporter() -> Reporter<MemorySource> {
        let dataset = Dataset {
            roster: Roster::new(vec![Team::new(
                1,
                "Alpha",
                vec![Member::new(1, "Bob", ""), Member::new(2, "Ann", "")],
            )]),
            tickets: vec![
                Ticket::new(10, Some(1), TicketStatus::Closed, "2024-03-03"),
                Ticket::new(11, Some(2), TicketStatus::Assigned, "2024-03-10"),
            ],
            tasks: vec![Task::new(20, 10, Some(1), "2024-03-03", 2.0)],
        };
        let config = ReportConfig {
            reference_year: Some(2024),
            ..ReportConfig::default()
        };
        Reporter::open(MemorySource::new(dataset), config).unwrap()
    }

    #[test]
    fn test_reporter_end_to_end() {
        let reporter = reporter();
        assert_eq!(reporter.status().len(), 3);

        let report = reporter.report(&ReportFilter::new().team_name("Alpha"));
        assert_eq!(report.totals.total, 2);
        assert_eq!(report.totals.man_hours, 2.0);

        let lines = reporter.tickets(&ReportFilter::new());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].man_hours, 2.0);

        let board = reporter.board(&ReportFilter::new(), 2024, 9).unwrap();
        assert_eq!(board.entry_count(), 1);

        assert_eq!(reporter.buckets(Granularity::Yearly, None).len(), 10);
        assert_eq!(reporter.buckets(Granularity::Weekly, Some(2020)).len(), 52);
    }

    #[test]
    fn test_open_rejects_conflicting_statuses() {
        let config = ReportConfig {
            closed_statuses: vec![TicketStatus::New],
            ..ReportConfig::default()
        };
        assert!(Reporter::open(MemorySource::default(), config).is_err());
    }
}

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::date_util::week_year;
use crate::error::{Error, Result};
use crate::model::{Roster, Team};
use crate::query::bucket::{BucketKey, Granularity};

/// Which part of the roster a report covers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum TeamSelector {
    #[default]
    All,
    Id(u64),
    /// Case-insensitive team name.
    Name(String),
}

impl TeamSelector {
    /// Parse CLI input: `all`, a numeric group id, or a team name.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            TeamSelector::All
        } else if let Ok(id) = s.parse::<u64>() {
            TeamSelector::Id(id)
        } else {
            TeamSelector::Name(s.to_string())
        }
    }

    /// Resolve against a roster. `Ok(None)` selects everyone.
    pub fn resolve<'a>(&self, roster: &'a Roster) -> Result<Option<&'a Team>> {
        let team = match self {
            TeamSelector::All => return Ok(None),
            TeamSelector::Id(id) => roster.team_by_id(*id),
            TeamSelector::Name(name) => roster.team_by_name(name),
        };
        team.map(Some)
            .ok_or_else(|| Error::NotFound(format!("team {self}")))
    }
}

impl fmt::Display for TeamSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamSelector::All => write!(f, "all"),
            TeamSelector::Id(id) => write!(f, "#{id}"),
            TeamSelector::Name(name) => write!(f, "{name}"),
        }
    }
}

/// Filter for a report run, built fluently.
///
/// ```
/// use glpireport::{Granularity, ReportFilter};
///
/// let filter = ReportFilter::new().team_name("Alpha").monthly(2).year(2024);
/// assert_eq!(filter.granularity, Granularity::Monthly);
/// ```
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportFilter {
    pub team: TeamSelector,
    pub granularity: Granularity,
    /// Specific bucket to restrict rows to. `None` leaves rows unrestricted
    /// in time while the series still uses `granularity`.
    pub bucket: Option<BucketKey>,
    /// Restricts weekly and monthly matches to one year and anchors the
    /// series grid.
    pub year: Option<i32>,
    /// Inclusive custom date range.
    pub between: Option<(NaiveDate, NaiveDate)>,
}

impl ReportFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn team(mut self, team: TeamSelector) -> Self {
        self.team = team;
        self
    }

    pub fn team_name(self, name: &str) -> Self {
        self.team(TeamSelector::Name(name.to_string()))
    }

    pub fn team_id(self, id: u64) -> Self {
        self.team(TeamSelector::Id(id))
    }

    /// Set the granularity without picking a bucket.
    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        if self.bucket.is_some_and(|b| b.granularity() != granularity) {
            self.bucket = None;
        }
        self
    }

    /// Restrict to one bucket; the granularity follows the key.
    pub fn bucket(mut self, key: BucketKey) -> Self {
        self.granularity = key.granularity();
        self.bucket = match key {
            BucketKey::All => None,
            other => Some(other),
        };
        self
    }

    pub fn weekly(self, week: u8) -> Self {
        self.bucket(BucketKey::Week(week))
    }

    /// Restrict to a 0-based month index.
    pub fn monthly(self, month0: u8) -> Self {
        self.bucket(BucketKey::Month(month0))
    }

    pub fn yearly(self, year: i32) -> Self {
        self.bucket(BucketKey::Year(year))
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.between = Some((from.min(to), from.max(to)));
        self
    }

    /// Year used for the weekly grid and the yearly window.
    pub fn reference_year(&self, fallback: i32) -> i32 {
        match (self.bucket, self.year) {
            (_, Some(y)) => y,
            (Some(BucketKey::Year(y)), None) => y,
            _ => fallback,
        }
    }

    /// Whether a dated record passes the range and year restrictions that
    /// apply to both rows and series.
    ///
    /// For weekly filters the year is the week grid's year, so a week
    /// straddling New Year belongs to the year its week 1 starts.
    pub fn admits(&self, date: NaiveDate) -> bool {
        if let Some((from, to)) = self.between {
            if date < from || date > to {
                return false;
            }
        }
        match (self.granularity, self.year) {
            (Granularity::Weekly, Some(y)) => week_year(date) == y,
            (Granularity::Monthly, Some(y)) => date.year() == y,
            _ => true,
        }
    }

    /// Whether the filter restricts by time at all.
    pub fn is_time_restricted(&self) -> bool {
        self.between.is_some()
            || self.bucket.is_some()
            || (self.year.is_some() && matches!(self.granularity, Granularity::Weekly | Granularity::Monthly))
    }

    /// Whether a dated record matches the full filter, bucket included.
    pub fn matches(&self, date: NaiveDate) -> bool {
        self.admits(date) && self.bucket.map_or(true, |key| key.contains(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_util::week_range;
    use crate::model::Member;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_team_selector_parse() {
        assert_eq!(TeamSelector::parse("All"), TeamSelector::All);
        assert_eq!(TeamSelector::parse(""), TeamSelector::All);
        assert_eq!(TeamSelector::parse("12"), TeamSelector::Id(12));
        assert_eq!(TeamSelector::parse("Service Desk"), TeamSelector::Name("Service Desk".into()));
    }

    #[test]
    fn test_team_selector_resolve() {
        let roster = Roster::new(vec![Team::new(3, "Alpha", vec![Member::new(1, "Bob", "")])]);
        assert!(TeamSelector::All.resolve(&roster).unwrap().is_none());
        assert_eq!(TeamSelector::Id(3).resolve(&roster).unwrap().unwrap().name, "Alpha");
        assert_eq!(TeamSelector::Name("ALPHA".into()).resolve(&roster).unwrap().unwrap().id, 3);
        assert!(TeamSelector::Name("Beta".into()).resolve(&roster).is_err());
    }

    #[test]
    fn test_builder_sets_granularity_from_bucket() {
        let filter = ReportFilter::new().weekly(17);
        assert_eq!(filter.granularity, Granularity::Weekly);
        assert_eq!(filter.bucket, Some(BucketKey::Week(17)));

        let filter = filter.granularity(Granularity::Monthly);
        assert_eq!(filter.bucket, None);

        let filter = ReportFilter::new().bucket(BucketKey::All);
        assert_eq!(filter.granularity, Granularity::All);
        assert!(filter.bucket.is_none());
    }

    #[test]
    fn test_monthly_ignores_year_unless_given() {
        let filter = ReportFilter::new().monthly(2);
        assert!(filter.matches(d(2023, 3, 10)));
        assert!(filter.matches(d(2024, 3, 10)));

        let filter = filter.year(2024);
        assert!(!filter.matches(d(2023, 3, 10)));
        assert!(filter.matches(d(2024, 3, 10)));
    }

    #[test]
    fn test_yearly_exact_match() {
        let filter = ReportFilter::new().yearly(2024);
        assert!(filter.matches(d(2024, 12, 31)));
        assert!(!filter.matches(d(2025, 1, 1)));
        assert_eq!(filter.reference_year(2030), 2024);
    }

    #[test]
    fn test_between_is_inclusive_and_ordered() {
        let filter = ReportFilter::new().between(d(2024, 3, 10), d(2024, 3, 1));
        assert_eq!(filter.between, Some((d(2024, 3, 1), d(2024, 3, 10))));
        assert!(filter.matches(d(2024, 3, 1)));
        assert!(filter.matches(d(2024, 3, 10)));
        assert!(!filter.matches(d(2024, 3, 11)));
        assert!(filter.is_time_restricted());
    }

    #[test]
    fn test_week_buckets_follow_the_year_grid() {
        let new_year_monday = d(2024, 12, 30);

        let week_one = ReportFilter::new().weekly(1).year(2025);
        assert!(week_one.matches(new_year_monday));
        assert!(week_one.matches(d(2025, 1, 5)));
        assert!(!week_one.matches(d(2025, 1, 6)));

        let week_52 = ReportFilter::new().weekly(52).year(2024);
        assert!(!week_52.matches(new_year_monday));
        assert!(week_52.matches(d(2024, 12, 29)));
        assert!(week_52.matches(d(2024, 12, 23)));
        assert!(!week_52.matches(d(2024, 12, 22)));
    }

    #[test]
    fn test_week_filter_agrees_with_week_range() {
        for (year, week) in [(2025, 1), (2024, 52), (2023, 52), (2024, 9)] {
            let filter = ReportFilter::new().weekly(week).year(year);
            let (start, end) = week_range(year, week).unwrap();
            let from = start - chrono::Duration::days(3);
            for date in from.iter_days().take(21) {
                let inside = date >= start && date <= end;
                assert_eq!(filter.matches(date), inside, "{date} in week {week} of {year}");
            }
        }
    }

    #[test]
    fn test_unrestricted_filter() {
        let filter = ReportFilter::new().granularity(Granularity::Weekly);
        assert!(!filter.is_time_restricted());
        assert!(filter.matches(d(1990, 1, 1)));
        assert_eq!(filter.reference_year(2026), 2026);
    }
}

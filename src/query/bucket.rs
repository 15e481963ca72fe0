use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::date_util::{last_day_of_month, parse_timestamp, week_of_year, week_range, MONTH_NAMES, WEEKS_PER_YEAR};
use crate::error::{Error, Result};

/// Unit of time bucketing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    All,
    Weekly,
    Monthly,
    Yearly,
}

impl FromStr for Granularity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" | "" => Ok(Granularity::All),
            "weekly" | "week" | "w" => Ok(Granularity::Weekly),
            "monthly" | "month" | "m" => Ok(Granularity::Monthly),
            "yearly" | "year" | "y" => Ok(Granularity::Yearly),
            other => Err(Error::BucketParse(format!("unknown granularity: {other}"))),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Granularity::All => "all",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
            Granularity::Yearly => "yearly",
        })
    }
}

/// A bucket value paired with its granularity.
///
/// Months are 0-based (`Month(0)` is January). Keys of different
/// granularities are never compared, so there is no `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BucketKey {
    All,
    Week(u8),
    Month(u8),
    Year(i32),
}

impl BucketKey {
    pub fn granularity(&self) -> Granularity {
        match self {
            BucketKey::All => Granularity::All,
            BucketKey::Week(_) => Granularity::Weekly,
            BucketKey::Month(_) => Granularity::Monthly,
            BucketKey::Year(_) => Granularity::Yearly,
        }
    }

    /// Parse a bucket value for a granularity.
    ///
    /// - Weekly: `17` or `W17` (1..=52)
    /// - Monthly: `February`, `feb`, or a 0-based index `1`
    /// - Yearly: `2025`
    /// - All: anything
    pub fn parse(granularity: Granularity, s: &str) -> Result<Self> {
        let s = s.trim();
        match granularity {
            Granularity::All => Ok(BucketKey::All),
            Granularity::Weekly => {
                let digits = s.strip_prefix(['W', 'w']).unwrap_or(s);
                let week: u8 = digits
                    .parse()
                    .map_err(|_| Error::BucketParse(format!("invalid week: {s}")))?;
                if (1..=WEEKS_PER_YEAR).contains(&week) {
                    Ok(BucketKey::Week(week))
                } else {
                    Err(Error::BucketParse(format!("week out of range: {s}")))
                }
            }
            Granularity::Monthly => {
                if let Ok(index) = s.parse::<u8>() {
                    return if index < 12 {
                        Ok(BucketKey::Month(index))
                    } else {
                        Err(Error::BucketParse(format!("month index out of range: {s}")))
                    };
                }
                let lower = s.to_lowercase();
                MONTH_NAMES
                    .iter()
                    .position(|name| {
                        let name = name.to_lowercase();
                        lower.len() >= 3 && name.starts_with(&lower)
                    })
                    .map(|i| BucketKey::Month(i as u8))
                    .ok_or_else(|| Error::BucketParse(format!("unknown month: {s}")))
            }
            Granularity::Yearly => s
                .parse::<i32>()
                .map(BucketKey::Year)
                .map_err(|_| Error::BucketParse(format!("invalid year: {s}"))),
        }
    }

    /// True when `date` falls in this bucket, ignoring the year for weeks
    /// and months.
    pub fn contains(&self, date: NaiveDate) -> bool {
        bucket_of_date(date, self.granularity()) == *self
    }

    /// Inclusive date range of this bucket within `year`. Yearly keys ignore
    /// `year`; `All` has no range.
    pub fn date_range(&self, year: i32) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            BucketKey::All => None,
            BucketKey::Week(w) => week_range(year, *w),
            BucketKey::Month(m) => {
                let month = *m as u32 + 1;
                Some((
                    NaiveDate::from_ymd_opt(year, month, 1)?,
                    last_day_of_month(year, month)?,
                ))
            }
            BucketKey::Year(y) => Some((
                NaiveDate::from_ymd_opt(*y, 1, 1)?,
                NaiveDate::from_ymd_opt(*y, 12, 31)?,
            )),
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketKey::All => write!(f, "All"),
            BucketKey::Week(w) => write!(f, "Week {w}"),
            BucketKey::Month(m) => {
                write!(f, "{}", MONTH_NAMES.get(*m as usize).copied().unwrap_or("?"))
            }
            BucketKey::Year(y) => write!(f, "{y}"),
        }
    }
}

/// Bucket for a calendar date. Total over all dates.
pub fn bucket_of_date(date: NaiveDate, granularity: Granularity) -> BucketKey {
    match granularity {
        Granularity::All => BucketKey::All,
        Granularity::Weekly => BucketKey::Week(week_of_year(date)),
        Granularity::Monthly => BucketKey::Month(date.month0() as u8),
        Granularity::Yearly => BucketKey::Year(date.year()),
    }
}

/// Bucket for a timestamp string.
pub fn bucket_of(timestamp: &str, granularity: Granularity) -> Result<BucketKey> {
    let at = parse_timestamp(timestamp)?;
    Ok(bucket_of_date(at.date(), granularity))
}

/// Every bucket of a granularity, in chart order.
///
/// Weekly yields 52 weeks and Monthly 12 months. Yearly yields the
/// `yearly_window` years ending at `reference_year`, oldest first.
pub fn buckets_for(granularity: Granularity, reference_year: i32, yearly_window: u16) -> Vec<BucketKey> {
    match granularity {
        Granularity::All => vec![BucketKey::All],
        Granularity::Weekly => (1..=WEEKS_PER_YEAR).map(BucketKey::Week).collect(),
        Granularity::Monthly => (0..12).map(BucketKey::Month).collect(),
        Granularity::Yearly => {
            let window = yearly_window.max(1) as i32;
            ((reference_year - window + 1)..=reference_year)
                .map(BucketKey::Year)
                .collect()
        }
    }
}

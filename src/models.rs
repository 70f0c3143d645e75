use crate::errors::AppError;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A 1-5 star rating. Cannot be constructed outside that range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Result<Self, AppError> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(AppError::validation(format!(
                "rating must be between {} and {}, got {value}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = AppError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One logged moment. `date` is wall-clock time in the configured zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub date: NaiveDateTime,
    pub rating: Rating,
}

impl Record {
    pub fn day(&self) -> NaiveDate {
        self.date.date()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub count: usize,
    pub ratings: Vec<u8>,
}

impl DayBucket {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            count: 0,
            ratings: Vec::new(),
        }
    }

    pub fn push(&mut self, rating: Rating) {
        self.ratings.push(rating.value());
        self.count = self.ratings.len();
    }
}

/// Inclusive calendar-day range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AppError> {
        if start > end {
            return Err(AppError::validation(format!(
                "range start {start} is after range end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn single(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityBin {
    Empty,
    One,
    Two,
    Three,
    Four,
    FivePlus,
}

impl IntensityBin {
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => Self::Empty,
            1 => Self::One,
            2 => Self::Two,
            3 => Self::Three,
            4 => Self::Four,
            _ => Self::FivePlus,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }
}

/// Up to seven consecutive days of one calendar year, Monday first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekRow {
    pub week_start: NaiveDate,
    pub days: Vec<NaiveDate>,
}

impl WeekRow {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.days.contains(&day)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total: usize,
    pub average: f64,
    pub histogram: BTreeMap<u8, usize>,
    pub five_star_rate: f64,
}

impl SummaryStats {
    pub fn count_for(&self, stars: u8) -> usize {
        self.histogram.get(&stars).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodCounts {
    pub this_week: usize,
    pub this_month: usize,
    pub this_year: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Week,
    Month,
    Year,
    Custom,
    All,
}

impl PeriodKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
            Self::Custom => "custom",
            Self::All => "all",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Week => "This week",
            Self::Month => "This month",
            Self::Year => "This year",
            Self::Custom => "Custom range",
            Self::All => "All time",
        }
    }

    /// Short title used in export file names.
    pub fn title(self) -> &'static str {
        match self {
            Self::Week => "Week",
            Self::Month => "Month",
            Self::Year => "Year",
            Self::Custom => "Custom",
            Self::All => "All",
        }
    }
}

impl FromStr for PeriodKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            "custom" => Ok(Self::Custom),
            "" | "all" => Ok(Self::All),
            other => Err(AppError::validation(format!(
                "period must be one of week, month, year, custom, all; got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPeriod {
    pub kind: PeriodKind,
    pub label: String,
    pub range: DateRange,
}

#[derive(Debug, Deserialize)]
pub struct CreateRecordRequest {
    pub rating: i64,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRatingRequest {
    pub rating: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HeatmapQuery {
    #[serde(default)]
    pub year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IndexQuery {
    #[serde(default)]
    pub notice: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub summary: SummaryStats,
    pub period_counts: PeriodCounts,
}

/// Parses a timestamp as sent by forms and API clients into wall-clock time
/// at `offset`. RFC 3339 values carrying their own offset are converted;
/// values without one (seconds, minutes-only `datetime-local` input, or a
/// bare date meaning midnight) are taken as already local.
pub fn parse_local_datetime(value: &str, offset: FixedOffset) -> Result<NaiveDateTime, AppError> {
    let value = value.trim();
    if let Ok(stamped) = DateTime::parse_from_rfc3339(value) {
        return Ok(stamped.with_timezone(&offset).naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(parsed);
        }
    }
    parse_day(value).map(|day| day.and_time(NaiveTime::MIN))
}

pub fn parse_day(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("'{value}' is not a valid YYYY-MM-DD date")))
}

/// Treats absent and blank query values alike; HTML date inputs submit "".
pub fn optional_day(value: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_day(value).map(Some),
    }
}

use crate::errors::AppError;
use crate::models::{
    DateRange, DayBucket, PeriodCounts, PeriodKind, Record, ReportQuery, ResolvedPeriod,
    SummaryStats, optional_day,
};
use chrono::{Datelike, Days, NaiveDate};
use std::collections::BTreeMap;

/// A named period plus the caller-supplied bounds used by `custom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodRequest {
    pub kind: PeriodKind,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl PeriodRequest {
    pub fn named(kind: PeriodKind) -> Self {
        Self {
            kind,
            start: None,
            end: None,
        }
    }

    pub fn custom(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            kind: PeriodKind::Custom,
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn from_query(query: &ReportQuery) -> Result<Self, AppError> {
        Ok(Self {
            kind: query.period.as_deref().unwrap_or("all").parse()?,
            start: optional_day(query.start.as_deref())?,
            end: optional_day(query.end.as_deref())?,
        })
    }
}

pub fn bucket_by_day(records: &[Record]) -> BTreeMap<NaiveDate, DayBucket> {
    let mut buckets: BTreeMap<NaiveDate, DayBucket> = BTreeMap::new();
    for record in records {
        let day = record.day();
        buckets
            .entry(day)
            .or_insert_with(|| DayBucket::empty(day))
            .push(record.rating);
    }
    // Input order must not leak into the output.
    for bucket in buckets.values_mut() {
        bucket.ratings.sort_unstable();
    }
    buckets
}

pub fn filter_by_range(records: &[Record], range: &DateRange) -> Vec<Record> {
    records
        .iter()
        .filter(|record| range.contains(record.day()))
        .cloned()
        .collect()
}

pub fn compute_summary(records: &[Record]) -> SummaryStats {
    let mut histogram: BTreeMap<u8, usize> = (1..=5).map(|stars| (stars, 0)).collect();
    let mut sum = 0u64;
    for record in records {
        let stars = record.rating.value();
        *histogram.entry(stars).or_default() += 1;
        sum = sum.saturating_add(u64::from(stars));
    }

    let total = records.len();
    let five_stars = histogram.get(&5).copied().unwrap_or(0);

    SummaryStats {
        total,
        average: ratio(sum as f64, total),
        histogram,
        five_star_rate: ratio(five_stars as f64 * 100.0, total),
    }
}

pub fn compute_period_counts(records: &[Record], today: NaiveDate) -> PeriodCounts {
    let count_in = |range: DateRange| records.iter().filter(|r| range.contains(r.day())).count();
    PeriodCounts {
        this_week: count_in(week_range(today)),
        this_month: count_in(month_range(today)),
        this_year: count_in(year_range(today)),
    }
}

pub fn resolve_period(
    request: &PeriodRequest,
    today: NaiveDate,
    records: &[Record],
) -> Result<ResolvedPeriod, AppError> {
    let range = match request.kind {
        PeriodKind::Week => week_range(today),
        PeriodKind::Month => month_range(today),
        PeriodKind::Year => year_range(today),
        PeriodKind::Custom => match (request.start, request.end) {
            (Some(start), Some(end)) => DateRange::new(start, end)?,
            _ => {
                return Err(AppError::validation(
                    "custom period requires both a start and an end date",
                ));
            }
        },
        PeriodKind::All => span_of(records).unwrap_or_else(|| DateRange::single(today)),
    };

    Ok(ResolvedPeriod {
        kind: request.kind,
        label: request.kind.label().to_string(),
        range,
    })
}

/// Mean of the given star values rounded to one decimal, 0 when empty.
pub fn average_of(ratings: &[u8]) -> f64 {
    let sum: u64 = ratings.iter().map(|&r| u64::from(r)).sum();
    ratio(sum as f64, ratings.len())
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn ratio(numerator: f64, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(numerator / total as f64)
}

/// Monday of the week holding `date`, or `None` when that Monday is before
/// the first representable day.
pub fn week_start(date: NaiveDate) -> Option<NaiveDate> {
    let back = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(back))
}

pub fn week_range(date: NaiveDate) -> DateRange {
    let start = week_start(date).unwrap_or(NaiveDate::MIN);
    DateRange {
        start,
        end: start.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX),
    }
}

pub fn month_range(date: NaiveDate) -> DateRange {
    let start = date.with_day(1).unwrap_or(date);
    let end = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year(), 12, 31)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1).and_then(|d| d.pred_opt())
    };
    DateRange {
        start,
        end: end.unwrap_or(date),
    }
}

pub fn year_range(date: NaiveDate) -> DateRange {
    DateRange {
        start: date.with_ordinal(1).unwrap_or(date),
        end: NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date),
    }
}

fn span_of(records: &[Record]) -> Option<DateRange> {
    let start = records.iter().map(Record::day).min()?;
    let end = records.iter().map(Record::day).max()?;
    Some(DateRange { start, end })
}

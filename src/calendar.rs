//! Year heatmap layout: Monday-first week rows and the month labels that
//! sit above them.

use crate::aggregate::{bucket_by_day, week_start};
use crate::errors::AppError;
use crate::models::{IntensityBin, Record, WeekRow};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthLabel {
    pub name: &'static str,
    pub week_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatmapCell {
    pub date: NaiveDate,
    pub count: usize,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatmapView {
    pub year: i32,
    pub weeks: Vec<Vec<HeatmapCell>>,
    pub months: Vec<MonthLabel>,
}

/// Week rows covering `year`. The first and last rows are clipped to the
/// year instead of being padded.
pub fn build_year_grid(year: i32) -> Result<Vec<WeekRow>, AppError> {
    let (first, last) = year_bounds(year)?;

    let mut weeks: Vec<WeekRow> = Vec::with_capacity(54);
    let days = std::iter::successors(Some(first), |day| day.succ_opt());
    for day in days.take_while(|day| *day <= last) {
        if day.weekday() != Weekday::Mon {
            if let Some(week) = weeks.last_mut() {
                week.days.push(day);
                continue;
            }
        }
        let week_start = week_start(day).ok_or_else(|| {
            AppError::validation(format!("year {year} starts before the first full week"))
        })?;
        weeks.push(WeekRow {
            week_start,
            days: vec![day],
        });
    }

    Ok(weeks)
}

/// Column index of the row holding each month's 1st. Months whose 1st is not
/// in any row are skipped.
pub fn month_label_positions(year: i32, weeks: &[WeekRow]) -> Vec<MonthLabel> {
    MONTH_NAMES
        .iter()
        .zip(1u32..)
        .filter_map(|(&name, month)| {
            let first = NaiveDate::from_ymd_opt(year, month, 1)?;
            let week_index = weeks.iter().position(|week| week.contains(first))?;
            Some(MonthLabel { name, week_index })
        })
        .collect()
}

pub fn build_heatmap(year: i32, records: &[Record]) -> Result<HeatmapView, AppError> {
    let grid = build_year_grid(year)?;
    let in_year: Vec<Record> = records
        .iter()
        .filter(|record| record.date.year() == year)
        .cloned()
        .collect();
    let buckets = bucket_by_day(&in_year);

    let weeks = grid
        .iter()
        .map(|week| {
            week.days
                .iter()
                .map(|day| {
                    let count = buckets.get(day).map_or(0, |bucket| bucket.count);
                    HeatmapCell {
                        date: *day,
                        count,
                        level: IntensityBin::from_count(count).level(),
                    }
                })
                .collect()
        })
        .collect();

    Ok(HeatmapView {
        year,
        months: month_label_positions(year, &grid),
        weeks,
    })
}

fn year_bounds(year: i32) -> Result<(NaiveDate, NaiveDate), AppError> {
    let first = NaiveDate::from_ymd_opt(year, 1, 1);
    let last = NaiveDate::from_ymd_opt(year, 12, 31);
    match (first, last) {
        (Some(first), Some(last)) => Ok((first, last)),
        _ => Err(AppError::validation(format!("year {year} is out of range"))),
    }
}

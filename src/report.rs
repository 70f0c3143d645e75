use crate::aggregate::{
    PeriodRequest, average_of, bucket_by_day, compute_summary, filter_by_range, resolve_period,
    round1,
};
use crate::errors::AppError;
use crate::export::export_file_name;
use crate::models::{Record, RecordId, ResolvedPeriod, SummaryStats};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

pub const REPORT_TITLE: &str = "Moment Log Report";
pub const RECENT_LIMIT: usize = 20;

const POSITIVE_THRESHOLD: f64 = 4.5;
const NEUTRAL_THRESHOLD: f64 = 3.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDocument {
    pub title: &'static str,
    pub generated_at: NaiveDateTime,
    pub period: ResolvedPeriod,
    pub summary: SummaryStats,
    pub distribution: Vec<DistributionBar>,
    pub daily: Vec<DailyRow>,
    pub recent: Vec<RecentRow>,
    pub total_records: usize,
    pub recent_truncated: bool,
    pub narrative: Narrative,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionBar {
    pub stars: u8,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub count: usize,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentRow {
    pub id: RecordId,
    pub date: NaiveDateTime,
    pub rating: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeBand {
    Positive,
    Neutral,
    Improvement,
    NoRecords,
}

impl NarrativeBand {
    /// Bands are chosen on the displayed (one decimal) average.
    pub fn for_average(total: usize, average: f64) -> Self {
        if total == 0 {
            Self::NoRecords
        } else if average >= POSITIVE_THRESHOLD {
            Self::Positive
        } else if average >= NEUTRAL_THRESHOLD {
            Self::Neutral
        } else {
            Self::Improvement
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Narrative {
    pub band: NarrativeBand,
    pub overview: Option<String>,
    pub headline: &'static str,
    pub message: &'static str,
}

impl Narrative {
    fn compose(period: &ResolvedPeriod, summary: &SummaryStats) -> Self {
        let band = NarrativeBand::for_average(summary.total, summary.average);
        let overview = (summary.total > 0).then(|| {
            format!(
                "{}: {} moments logged with an average rating of {:.1} stars; \
                 {:.1}% of them were five-star.",
                period.label, summary.total, summary.average, summary.five_star_rate
            )
        });
        let (headline, message) = match band {
            NarrativeBand::Positive => (
                "Wonderful!",
                "Things are going beautifully and satisfaction is high. Keep it up!",
            ),
            NarrativeBand::Neutral => (
                "Nicely done!",
                "Things are steady and satisfaction is good. There is room to make it even better.",
            ),
            NarrativeBand::Improvement => (
                "Room to grow.",
                "Talk more and learn what each other needs to create better moments together.",
            ),
            NarrativeBand::NoRecords => (
                "Nothing logged yet.",
                "No moments in this period. Start creating good memories!",
            ),
        };
        Self {
            band,
            overview,
            headline,
            message,
        }
    }
}

pub fn build_report(
    records: &[Record],
    request: &PeriodRequest,
    now: NaiveDateTime,
) -> Result<ReportDocument, AppError> {
    let period = resolve_period(request, now.date(), records)?;
    let selected = filter_by_range(records, &period.range);
    let summary = compute_summary(&selected);

    let distribution = (1..=5)
        .rev()
        .map(|stars| {
            let count = summary.count_for(stars);
            let percent = if summary.total == 0 {
                0.0
            } else {
                round1(count as f64 / summary.total as f64 * 100.0)
            };
            DistributionBar {
                stars,
                count,
                percent,
            }
        })
        .collect();

    let daily = bucket_by_day(&selected)
        .into_values()
        .map(|bucket| DailyRow {
            date: bucket.date,
            count: bucket.count,
            average: average_of(&bucket.ratings),
        })
        .collect();

    let mut newest_first = selected;
    newest_first.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
    let total_records = newest_first.len();
    let recent = newest_first
        .into_iter()
        .take(RECENT_LIMIT)
        .map(|record| RecentRow {
            id: record.id,
            date: record.date,
            rating: record.rating.value(),
        })
        .collect();

    Ok(ReportDocument {
        title: REPORT_TITLE,
        generated_at: now,
        narrative: Narrative::compose(&period, &summary),
        file_name: export_file_name(period.kind.title(), now.date()),
        period,
        summary,
        distribution,
        daily,
        recent,
        total_records,
        recent_truncated: total_records > RECENT_LIMIT,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PeriodKind, Rating};
    use chrono::Duration;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    fn record(id: &str, date: NaiveDateTime, rating: i64) -> Record {
        Record {
            id: RecordId::from(id),
            date,
            rating: Rating::new(rating).unwrap(),
        }
    }

    #[test]
    fn narrative_bands_have_no_gap_or_overlap() {
        assert_eq!(NarrativeBand::for_average(4, 4.5), NarrativeBand::Positive);
        assert_eq!(NarrativeBand::for_average(4, 4.4), NarrativeBand::Neutral);
        assert_eq!(NarrativeBand::for_average(4, 3.5), NarrativeBand::Neutral);
        assert_eq!(NarrativeBand::for_average(4, 3.4), NarrativeBand::Improvement);
        assert_eq!(NarrativeBand::for_average(0, 0.0), NarrativeBand::NoRecords);
    }

    #[test]
    fn average_of_exactly_four_and_a_half_is_positive() {
        let now = at(2024, 3, 20, 12);
        let records = vec![
            record("a", at(2024, 3, 1, 9), 5),
            record("b", at(2024, 3, 2, 9), 4),
        ];
        let report =
            build_report(&records, &PeriodRequest::named(PeriodKind::Month), now).unwrap();
        assert_eq!(report.summary.average, 4.5);
        assert_eq!(report.narrative.band, NarrativeBand::Positive);
        assert!(report.narrative.overview.is_some());
    }

    #[test]
    fn empty_period_gets_no_records_narrative() {
        let now = at(2024, 3, 20, 12);
        let records = vec![record("old", at(2023, 1, 1, 9), 1)];
        let report = build_report(&records, &PeriodRequest::named(PeriodKind::Week), now).unwrap();
        assert_eq!(report.summary.total, 0);
        assert_eq!(report.narrative.band, NarrativeBand::NoRecords);
        assert_eq!(report.narrative.overview, None);
        assert!(report.daily.is_empty());
        assert!(report.recent.is_empty());
        assert!(report.distribution.iter().all(|bar| bar.percent == 0.0));
    }

    #[test]
    fn daily_rows_ascend_and_recent_rows_descend() {
        let now = at(2024, 3, 20, 12);
        let records = vec![
            record("late", at(2024, 3, 8, 20), 1),
            record("early-a", at(2024, 3, 1, 9), 5),
            record("early-b", at(2024, 3, 1, 21), 2),
        ];
        let report =
            build_report(&records, &PeriodRequest::named(PeriodKind::Month), now).unwrap();

        let days: Vec<NaiveDate> = report.daily.iter().map(|row| row.date).collect();
        assert_eq!(
            days,
            vec![
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 8).unwrap()
            ]
        );
        assert_eq!(report.daily[0].count, 2);
        assert_eq!(report.daily[0].average, 3.5);

        let ids: Vec<&str> = report.recent.iter().map(|row| row.id.0.as_str()).collect();
        assert_eq!(ids, vec!["late", "early-b", "early-a"]);
        assert_eq!(report.narrative.band, NarrativeBand::Improvement);
    }

    #[test]
    fn recent_listing_is_truncated_but_total_is_kept() {
        let now = at(2024, 12, 31, 23);
        let start = at(2024, 1, 1, 8);
        let records: Vec<Record> = (0..30)
            .map(|i| record(&format!("r{i:02}"), start + Duration::days(i), 4))
            .collect();
        let report = build_report(&records, &PeriodRequest::named(PeriodKind::Year), now).unwrap();
        assert_eq!(report.recent.len(), RECENT_LIMIT);
        assert_eq!(report.total_records, 30);
        assert!(report.recent_truncated);
        assert_eq!(report.recent[0].id.0, "r29");
        assert_eq!(report.narrative.band, NarrativeBand::Neutral);
    }

    #[test]
    fn distribution_runs_from_five_stars_down() {
        let now = at(2024, 3, 20, 12);
        let records = vec![
            record("a", at(2024, 3, 1, 9), 5),
            record("b", at(2024, 3, 1, 10), 5),
            record("c", at(2024, 3, 2, 9), 1),
            record("d", at(2024, 3, 3, 9), 3),
        ];
        let report = build_report(&records, &PeriodRequest::named(PeriodKind::All), now).unwrap();
        let stars: Vec<u8> = report.distribution.iter().map(|bar| bar.stars).collect();
        assert_eq!(stars, vec![5, 4, 3, 2, 1]);
        assert_eq!(report.distribution[0].count, 2);
        assert_eq!(report.distribution[0].percent, 50.0);
        assert_eq!(report.summary.five_star_rate, 50.0);
        assert_eq!(report.file_name, "MomentReport_All_20240320.pdf");
    }

    #[test]
    fn custom_report_without_bounds_is_rejected() {
        let now = at(2024, 3, 20, 12);
        let result = build_report(&[], &PeriodRequest::named(PeriodKind::Custom), now);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn custom_report_may_span_years() {
        let now = at(2024, 3, 20, 12);
        let records = vec![
            record("dec", at(2023, 12, 30, 9), 4),
            record("jan", at(2024, 1, 2, 9), 4),
        ];
        let request = PeriodRequest::custom(
            NaiveDate::from_ymd_opt(2023, 12, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        );
        let report = build_report(&records, &request, now).unwrap();
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.period.label, "Custom range");
    }
}

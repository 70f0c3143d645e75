use crate::calendar::HeatmapView;
use crate::models::{PeriodCounts, PeriodKind, Record, SummaryStats};
use crate::report::{NarrativeBand, ReportDocument};
use chrono::{Datelike, NaiveDate};

pub struct Dashboard<'a> {
    pub today: NaiveDate,
    pub heatmap: HeatmapView,
    pub summary: SummaryStats,
    pub period_counts: PeriodCounts,
    pub notice: Option<Notice>,
    pub records: &'a [Record],
}

/// Fixed messages shown after a form round-trip. Only codes travel in the
/// URL, never free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Saved,
    Updated,
    Deleted,
    Invalid,
    InvalidRange,
    Failed,
}

impl Notice {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "saved" => Some(Self::Saved),
            "updated" => Some(Self::Updated),
            "deleted" => Some(Self::Deleted),
            "invalid" => Some(Self::Invalid),
            "range" => Some(Self::InvalidRange),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Saved => "saved",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Invalid => "invalid",
            Self::InvalidRange => "range",
            Self::Failed => "failed",
        }
    }

    pub fn href(self) -> String {
        format!("/?notice={}", self.code())
    }

    fn message(self) -> &'static str {
        match self {
            Self::Saved => "Moment saved.",
            Self::Updated => "Rating updated.",
            Self::Deleted => "Moment deleted.",
            Self::Invalid => "That input was not valid. Ratings go from 1 to 5.",
            Self::InvalidRange => {
                "Pick both a start and an end date (start first) for a custom report."
            }
            Self::Failed => "Something went wrong talking to the record store. Please try again.",
        }
    }

    fn is_error(self) -> bool {
        matches!(self, Self::Invalid | Self::InvalidRange | Self::Failed)
    }
}

pub fn render_index(dashboard: &Dashboard<'_>) -> String {
    let notice = dashboard
        .notice
        .map(|notice| {
            let class = if notice.is_error() { "notice error" } else { "notice" };
            format!(r#"<p class="{class}">{}</p>"#, notice.message())
        })
        .unwrap_or_default();

    INDEX_HTML
        .replace("{{NOTICE}}", &notice)
        .replace("{{YEAR}}", &dashboard.heatmap.year.to_string())
        .replace("{{HEATMAP}}", &heatmap_html(&dashboard.heatmap))
        .replace("{{STATS}}", &stats_html(&dashboard.summary, &dashboard.period_counts))
        .replace("{{QUICK_ADD}}", &quick_add_html())
        .replace("{{EXPORT_MENU}}", &export_menu_html(dashboard.today))
        .replace("{{MANAGE}}", &manage_html(dashboard.records))
}

pub fn render_report(document: &ReportDocument) -> String {
    let summary = &document.summary;
    let range = &document.period.range;

    let bars: String = document
        .distribution
        .iter()
        .map(|bar| {
            format!(
                r#"<div class="bar-row"><span>{} &#9733;</span><div class="bar"><div class="fill s{}" style="width:{}%"></div></div><span>{}</span></div>"#,
                bar.stars, bar.stars, bar.percent, bar.count
            )
        })
        .collect();

    let mut daily: String = document
        .daily
        .iter()
        .map(|row| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{:.1} &#9733;</td></tr>",
                row.date, row.count, row.average
            )
        })
        .collect();
    if document.daily.is_empty() {
        daily.push_str(
            r#"<tr><td colspan="3" class="empty">No moments in this period.</td></tr>"#,
        );
    }

    let mut recent: String = document
        .recent
        .iter()
        .map(|row| {
            format!(
                "<tr><td>{}</td><td>{} &#9733;</td></tr>",
                row.date.format("%Y-%m-%d %H:%M"),
                row.rating
            )
        })
        .collect();
    if document.recent.is_empty() {
        recent.push_str(
            r#"<tr><td colspan="2" class="empty">No moments in this period.</td></tr>"#,
        );
    }
    let truncated = if document.recent_truncated {
        format!(
            r#"<p class="note">Showing the {} most recent of {} moments.</p>"#,
            document.recent.len(),
            document.total_records
        )
    } else {
        String::new()
    };

    let narrative = &document.narrative;
    let band_class = match narrative.band {
        NarrativeBand::Positive => "positive",
        NarrativeBand::Neutral => "neutral",
        NarrativeBand::Improvement => "improvement",
        NarrativeBand::NoRecords => "empty",
    };
    let overview = narrative
        .overview
        .as_deref()
        .map(|text| format!("<p>{}</p>", escape(text)))
        .unwrap_or_default();

    REPORT_HTML
        .replace("{{FILE_NAME}}", &escape(&document.file_name))
        .replace("{{TITLE}}", document.title)
        .replace(
            "{{GENERATED}}",
            &document.generated_at.format("%Y-%m-%d %H:%M").to_string(),
        )
        .replace("{{PERIOD}}", &escape(&document.period.label))
        .replace("{{START}}", &range.start.to_string())
        .replace("{{END}}", &range.end.to_string())
        .replace("{{TOTAL}}", &summary.total.to_string())
        .replace("{{AVERAGE}}", &format!("{:.1}", summary.average))
        .replace("{{FIVE_STAR}}", &format!("{:.1}", summary.five_star_rate))
        .replace("{{BARS}}", &bars)
        .replace("{{DAILY}}", &daily)
        .replace("{{RECENT}}", &recent)
        .replace("{{TRUNCATED}}", &truncated)
        .replace("{{BAND}}", band_class)
        .replace("{{OVERVIEW}}", &overview)
        .replace("{{HEADLINE}}", narrative.headline)
        .replace("{{MESSAGE}}", narrative.message)
}

fn heatmap_html(view: &HeatmapView) -> String {
    let columns = view.weeks.len().max(1);

    let labels: String = view
        .months
        .iter()
        .map(|label| {
            format!(
                r#"<span style="grid-column:{}">{}</span>"#,
                label.week_index + 1,
                label.name
            )
        })
        .collect();

    let cells: String = view
        .weeks
        .iter()
        .enumerate()
        .flat_map(|(column, week)| week.iter().map(move |cell| (column, cell)))
        .map(|(column, cell)| {
            format!(
                r#"<div class="cell l{}" style="grid-column:{};grid-row:{}" title="{}: {}"></div>"#,
                cell.level,
                column + 1,
                cell.date.weekday().num_days_from_monday() + 1,
                cell.date,
                cell.count
            )
        })
        .collect();

    format!(
        r#"<div class="heatmap" style="--weeks:{columns}"><div class="months">{labels}</div><div class="grid">{cells}</div></div>"#
    )
}

fn stats_html(summary: &SummaryStats, counts: &PeriodCounts) -> String {
    let tiles = [
        ("Total", summary.total.to_string()),
        ("Average", format!("{:.1}", summary.average)),
        ("Five-star", format!("{:.1}%", summary.five_star_rate)),
        ("This week", counts.this_week.to_string()),
        ("This month", counts.this_month.to_string()),
        ("This year", counts.this_year.to_string()),
    ];
    tiles
        .iter()
        .map(|(label, value)| {
            format!(
                r#"<div class="stat"><span class="label">{label}</span><span class="value">{value}</span></div>"#
            )
        })
        .collect()
}

fn quick_add_html() -> String {
    (1..=5)
        .map(|stars| {
            format!(
                r#"<form method="post" action="/moments/quick/{stars}"><button class="star" type="submit">{stars}</button></form>"#
            )
        })
        .collect()
}

fn export_menu_html(today: NaiveDate) -> String {
    let options: String = [PeriodKind::Week, PeriodKind::Month, PeriodKind::Year, PeriodKind::All]
        .iter()
        .map(|kind| {
            format!(
                r#"<a class="pill" href="/report?period={}">{}</a>"#,
                kind.as_str(),
                kind.label()
            )
        })
        .collect();

    format!(
        r#"<div class="export">{options}
<form method="get" action="/report" class="custom">
  <input type="hidden" name="period" value="custom" />
  <input type="date" name="start" max="{today}" />
  <input type="date" name="end" max="{today}" />
  <button type="submit">Custom range</button>
</form></div>"#
    )
}

fn manage_html(records: &[Record]) -> String {
    let mut rows: String = records.iter().map(manage_row_html).collect();
    if records.is_empty() {
        rows.push_str(r#"<tr><td colspan="3" class="empty">Nothing logged yet.</td></tr>"#);
    }
    rows
}

fn manage_row_html(record: &Record) -> String {
    let id = escape(&record.id.0);
    let options: String = (1..=5)
        .map(|stars| {
            let selected = if stars == record.rating.value() { " selected" } else { "" };
            format!(r#"<option value="{stars}"{selected}>{stars}</option>"#)
        })
        .collect();
    format!(
        r#"<tr><td>{}</td><td><form method="post" action="/moments/{id}/rating" class="inline"><select name="rating">{options}</select><button type="submit">Save</button></form></td><td><form method="post" action="/moments/{id}/delete" class="inline" onsubmit="return confirm('Delete this moment?')"><button type="submit" class="danger">Delete</button></form></td></tr>"#,
        record.date.format("%Y-%m-%d %H:%M")
    )
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Moment Log</title>
  <style>
    :root {
      --bg: #fdf2f8;
      --ink: #334155;
      --accent: #db2777;
      --card: rgba(255, 255, 255, 0.9);
    }

    body {
      margin: 0;
      background: linear-gradient(135deg, var(--bg), #fff7ed);
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
      padding: 24px 16px 48px;
    }

    main {
      width: min(960px, 100%);
      margin: 0 auto;
      display: grid;
      gap: 20px;
    }

    section {
      background: var(--card);
      border-radius: 20px;
      padding: 20px 24px;
      box-shadow: 0 16px 40px rgba(219, 39, 119, 0.08);
    }

    h1 { margin: 0; color: var(--accent); }
    h2 { margin: 0 0 12px; font-size: 1.1rem; }

    .notice { background: #ecfdf5; border-radius: 12px; padding: 10px 14px; margin: 0; }
    .notice.error { background: #fef2f2; color: #b91c1c; }

    .heatmap { overflow-x: auto; }
    .heatmap .months, .heatmap .grid {
      display: grid;
      grid-template-columns: repeat(var(--weeks), 12px);
      gap: 3px;
      font-size: 0.7rem;
      color: #64748b;
    }
    .heatmap .grid { grid-template-rows: repeat(7, 12px); margin-top: 4px; }
    .cell { width: 12px; height: 12px; border-radius: 3px; }
    .l0 { background: #f1f5f9; }
    .l1 { background: #fce7f3; }
    .l2 { background: #fbcfe8; }
    .l3 { background: #f9a8d4; }
    .l4 { background: #f472b6; }
    .l5 { background: #db2777; }

    .stats { display: grid; grid-template-columns: repeat(auto-fit, minmax(130px, 1fr)); gap: 12px; }
    .stat { background: white; border-radius: 14px; padding: 12px; display: grid; gap: 4px; }
    .stat .label { font-size: 0.75rem; text-transform: uppercase; color: #94a3b8; }
    .stat .value { font-size: 1.5rem; font-weight: 600; color: var(--accent); }

    .quick { display: flex; gap: 10px; }
    .star, button {
      border: none;
      border-radius: 999px;
      padding: 10px 16px;
      background: var(--accent);
      color: white;
      font-weight: 600;
      cursor: pointer;
    }
    .danger { background: #64748b; }

    .export { display: flex; flex-wrap: wrap; gap: 8px; align-items: center; }
    .pill { padding: 8px 14px; border-radius: 999px; background: white; color: var(--accent); text-decoration: none; }
    .custom { display: flex; gap: 6px; }

    table { width: 100%; border-collapse: collapse; font-size: 0.9rem; }
    td { padding: 6px; border-bottom: 1px solid #f1f5f9; }
    .inline { display: inline-flex; gap: 6px; margin: 0; }
    .empty { text-align: center; color: #94a3b8; }
  </style>
</head>
<body>
  <main>
    <header><h1>Moment Log</h1></header>
    {{NOTICE}}
    <section>
      <h2>{{YEAR}} at a glance</h2>
      {{HEATMAP}}
    </section>
    <section>
      <h2>Quick add</h2>
      <div class="quick">{{QUICK_ADD}}</div>
    </section>
    <section>
      <h2>Insights</h2>
      <div class="stats">{{STATS}}</div>
    </section>
    <section>
      <h2>Export report</h2>
      {{EXPORT_MENU}}
    </section>
    <section>
      <details>
        <summary><strong>Manage moments</strong></summary>
        <form method="post" action="/moments" class="inline" style="margin:12px 0">
          <input type="datetime-local" name="date" required />
          <select name="rating">
            <option value="5">5</option><option value="4">4</option><option value="3">3</option>
            <option value="2">2</option><option value="1">1</option>
          </select>
          <button type="submit">Add</button>
        </form>
        <table>{{MANAGE}}</table>
      </details>
    </section>
  </main>
</body>
</html>
"#;

const REPORT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <title>{{FILE_NAME}}</title>
  <style>
    body { font-family: "Trebuchet MS", sans-serif; color: #334155; margin: 0; background: white; }
    article { max-width: 720px; margin: 0 auto; padding: 32px; }
    header { text-align: center; margin-bottom: 28px; }
    h1 { color: #db2777; margin: 0; }
    h2 { font-size: 1.05rem; margin: 28px 0 12px; }
    .meta { font-size: 0.85rem; color: #64748b; margin: 4px 0; }
    .tiles { display: grid; grid-template-columns: repeat(3, 1fr); gap: 12px; }
    .tile { border: 1px solid #fce7f3; border-radius: 10px; padding: 14px; text-align: center; }
    .tile strong { display: block; font-size: 1.3rem; color: #db2777; }
    .bar-row { display: flex; align-items: center; gap: 10px; margin: 6px 0; }
    .bar { flex: 1; background: #f1f5f9; border-radius: 999px; height: 10px; }
    .fill { height: 10px; border-radius: 999px; background: #f472b6; }
    .fill.s5 { background: #db2777; }
    table { width: 100%; border-collapse: collapse; font-size: 0.9rem; }
    td, th { padding: 6px; border-bottom: 1px solid #f1f5f9; text-align: left; }
    .empty { text-align: center; color: #94a3b8; }
    .note { font-size: 0.8rem; color: #64748b; text-align: center; }
    .summary { border-radius: 10px; padding: 14px; background: #fdf2f8; }
    .summary.improvement { background: #fff7ed; }
    .summary.empty { background: #f8fafc; }
    footer { text-align: center; font-size: 0.75rem; color: #94a3b8; margin-top: 40px; }
    @media print { .no-print { display: none; } }
  </style>
</head>
<body>
  <article>
    <p class="no-print"><a href="/">Back</a> · <button onclick="window.print()">Save as PDF</button></p>
    <header>
      <h1>{{TITLE}}</h1>
      <p class="meta">Generated {{GENERATED}}</p>
      <p class="meta">{{PERIOD}} ({{START}} to {{END}})</p>
    </header>

    <div class="tiles">
      <div class="tile"><strong>{{TOTAL}}</strong>Moments</div>
      <div class="tile"><strong>{{AVERAGE}}</strong>Average rating</div>
      <div class="tile"><strong>{{FIVE_STAR}}%</strong>Five-star</div>
    </div>

    <h2>Rating distribution</h2>
    {{BARS}}

    <h2>Daily breakdown</h2>
    <table>
      <tr><th>Date</th><th>Moments</th><th>Average</th></tr>
      {{DAILY}}
    </table>

    <h2>Recent moments</h2>
    <table>
      <tr><th>Time</th><th>Rating</th></tr>
      {{RECENT}}
    </table>
    {{TRUNCATED}}

    <h2>Summary</h2>
    <div class="summary {{BAND}}">
      {{OVERVIEW}}
      <p><strong>{{HEADLINE}}</strong> {{MESSAGE}}</p>
    </div>

    <footer>Moment Log · a personal keepsake, not for sharing</footer>
  </article>
</body>
</html>
"#;

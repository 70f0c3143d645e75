use crate::aggregate::{PeriodRequest, compute_period_counts, compute_summary};
use crate::calendar::{HeatmapView, build_heatmap};
use crate::errors::AppError;
use crate::export::{A4, CaptureSize, PageLayout, paginate};
use crate::models::{
    CreateRecordRequest, HeatmapQuery, IndexQuery, Rating, Record, RecordId, ReportQuery,
    StatsResponse, UpdateRatingRequest, parse_local_datetime,
};
use crate::report::{ReportDocument, build_report};
use crate::state::AppState;
use crate::ui::{Dashboard, Notice, render_index, render_report};
use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::Datelike;
use tracing::{error, warn};

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<IndexQuery>,
) -> Result<Html<String>, AppError> {
    let records = state.records().await;
    let today = state.today();
    let dashboard = Dashboard {
        today,
        heatmap: build_heatmap(today.year(), &records)?,
        summary: compute_summary(&records),
        period_counts: compute_period_counts(&records, today),
        notice: query.notice.as_deref().and_then(Notice::from_code),
        records: &records,
    };
    Ok(Html(render_index(&dashboard)))
}

pub async fn quick_add(State(state): State<AppState>, Path(rating): Path<i64>) -> Redirect {
    let outcome = match Rating::new(rating) {
        Ok(rating) => state.create_record(state.now(), rating).await.map(|_| ()),
        Err(err) => Err(err),
    };
    redirect_home(outcome, Notice::Saved)
}

pub async fn create_form(
    State(state): State<AppState>,
    Form(form): Form<CreateRecordRequest>,
) -> Redirect {
    let outcome = create_from_request(&state, form).await.map(|_| ());
    redirect_home(outcome, Notice::Saved)
}

pub async fn update_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<UpdateRatingRequest>,
) -> Redirect {
    let outcome = match Rating::new(form.rating) {
        Ok(rating) => state.update_rating(&RecordId(id), rating).await,
        Err(err) => Err(err),
    };
    redirect_home(outcome, Notice::Updated)
}

pub async fn delete_form(State(state): State<AppState>, Path(id): Path<String>) -> Redirect {
    let outcome = state.delete_record(&RecordId(id)).await;
    redirect_home(outcome, Notice::Deleted)
}

pub async fn report_page(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Response {
    match report_for(&state, &query).await {
        Ok(document) => Html(render_report(&document)).into_response(),
        Err(AppError::Validation(reason)) => {
            warn!("report request rejected: {reason}");
            Redirect::to(&Notice::InvalidRange.href()).into_response()
        }
        Err(err) => {
            error!("report rendering failed: {err}");
            err.into_response()
        }
    }
}

pub async fn list_records(State(state): State<AppState>) -> Json<Vec<Record>> {
    Json(state.records().await)
}

pub async fn create_record(
    State(state): State<AppState>,
    Json(payload): Json<CreateRecordRequest>,
) -> Result<(StatusCode, Json<Record>), AppError> {
    let record = create_from_request(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateRatingRequest>,
) -> Result<StatusCode, AppError> {
    let rating = Rating::new(payload.rating)?;
    state.update_rating(&RecordId(id), rating).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.delete_record(&RecordId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_heatmap(
    State(state): State<AppState>,
    Query(query): Query<HeatmapQuery>,
) -> Result<Json<HeatmapView>, AppError> {
    let year = query.year.unwrap_or_else(|| state.today().year());
    let records = state.records().await;
    Ok(Json(build_heatmap(year, &records)?))
}

pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let records = state.records().await;
    Json(StatsResponse {
        summary: compute_summary(&records),
        period_counts: compute_period_counts(&records, state.today()),
    })
}

pub async fn get_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportDocument>, AppError> {
    Ok(Json(report_for(&state, &query).await?))
}

pub async fn export_pages(Json(capture): Json<CaptureSize>) -> Result<Json<PageLayout>, AppError> {
    paginate(capture, A4).map(Json).map_err(|err| {
        error!("export layout failed: {err}");
        err
    })
}

async fn report_for(state: &AppState, query: &ReportQuery) -> Result<ReportDocument, AppError> {
    let request = PeriodRequest::from_query(query)?;
    let records = state.records().await;
    build_report(&records, &request, state.now())
}

async fn create_from_request(
    state: &AppState,
    request: CreateRecordRequest,
) -> Result<Record, AppError> {
    let rating = Rating::new(request.rating)?;
    let date = match request.date.as_deref().map(str::trim) {
        None | Some("") => state.now(),
        Some(value) => parse_local_datetime(value, state.config.utc_offset)?,
    };
    state.create_record(date, rating).await
}

fn redirect_home(outcome: Result<(), AppError>, success: Notice) -> Redirect {
    let notice = match outcome {
        Ok(()) => success,
        Err(err) if err.status() == StatusCode::BAD_REQUEST => {
            warn!("rejected form submission: {err}");
            Notice::Invalid
        }
        Err(err) => {
            error!("form submission failed: {err}");
            Notice::Failed
        }
    };
    Redirect::to(&notice.href())
}

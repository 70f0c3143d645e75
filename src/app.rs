use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post, put},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/report", get(handlers::report_page))
        .route("/moments", post(handlers::create_form))
        .route("/moments/quick/:rating", post(handlers::quick_add))
        .route("/moments/:id/rating", post(handlers::update_form))
        .route("/moments/:id/delete", post(handlers::delete_form))
        .route(
            "/api/records",
            get(handlers::list_records).post(handlers::create_record),
        )
        .route(
            "/api/records/:id",
            put(handlers::update_record).delete(handlers::delete_record),
        )
        .route("/api/heatmap", get(handlers::get_heatmap))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/report", get(handlers::get_report))
        .route("/api/export/pages", post(handlers::export_pages))
        .with_state(state)
}

use std::io::Cursor;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::warn;

use super::domain::CampSetup;
use super::service::{CampError, CampService};
use crate::workflows::closure::{CancelSignal, StepKey};
use crate::workflows::evaluation::{CampId, EventId, PlayerId, ScoreSubmission};

/// Router builder exposing camp registration, scoring, summaries, and closure.
pub fn camp_router(service: Arc<CampService>) -> Router {
    Router::new()
        .route("/api/v1/camps", post(create_camp_handler))
        .route("/api/v1/camps/:camp_id", get(camp_handler))
        .route("/api/v1/camps/:camp_id/scores", post(submit_score_handler))
        .route(
            "/api/v1/camps/:camp_id/scores/import",
            post(import_scores_handler),
        )
        .route(
            "/api/v1/camps/:camp_id/events/:event_id/summaries",
            get(summaries_handler),
        )
        .route(
            "/api/v1/camps/:camp_id/events/:event_id/players/:player_id",
            get(player_summary_handler),
        )
        .route("/api/v1/camps/:camp_id/closure", get(closure_progress_handler))
        .route("/api/v1/camps/:camp_id/closure/run", post(run_all_handler))
        .route(
            "/api/v1/camps/:camp_id/closure/steps/:step_id",
            post(run_step_handler),
        )
        .with_state(service)
}

pub(crate) fn error_response(error: CampError) -> Response {
    let status = error.status_code();
    if status.is_server_error() {
        warn!(%error, "camp request failed");
    }

    let mut payload = json!({ "error": error.to_string() });
    if let CampError::Closure(crate::workflows::closure::ClosureError::StepNotReady {
        waiting_on,
        ..
    }) = &error
    {
        payload["waiting_on"] = json!(waiting_on);
    }
    (status, Json(payload)).into_response()
}

pub(crate) async fn create_camp_handler(
    State(service): State<Arc<CampService>>,
    Json(setup): Json<CampSetup>,
) -> Response {
    match service.create_camp(setup) {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn camp_handler(
    State(service): State<Arc<CampService>>,
    Path(camp_id): Path<String>,
) -> Response {
    match service.camp_view(&CampId(camp_id)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_score_handler(
    State(service): State<Arc<CampService>>,
    Path(camp_id): Path<String>,
    Json(submission): Json<ScoreSubmission>,
) -> Response {
    match service.submit_score(&CampId(camp_id), submission) {
        Ok(outcome) => (StatusCode::ACCEPTED, Json(json!({ "outcome": outcome }))).into_response(),
        Err(error) => error_response(error),
    }
}

/// Body is the raw CSV sheet.
pub(crate) async fn import_scores_handler(
    State(service): State<Arc<CampService>>,
    Path(camp_id): Path<String>,
    body: String,
) -> Response {
    match service.import_scores(&CampId(camp_id), Cursor::new(body)) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn summaries_handler(
    State(service): State<Arc<CampService>>,
    Path((camp_id, event_id)): Path<(String, String)>,
) -> Response {
    match service.get_camp_summaries(&CampId(camp_id), &EventId(event_id)) {
        Ok(summaries) => (StatusCode::OK, Json(summaries)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn player_summary_handler(
    State(service): State<Arc<CampService>>,
    Path((camp_id, event_id, player_id)): Path<(String, String, String)>,
) -> Response {
    match service.get_player_summary(&CampId(camp_id), &EventId(event_id), &PlayerId(player_id)) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn closure_progress_handler(
    State(service): State<Arc<CampService>>,
    Path(camp_id): Path<String>,
) -> Response {
    match service.get_closure_progress(&CampId(camp_id)).await {
        Ok(progress) => (StatusCode::OK, Json(progress)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn run_all_handler(
    State(service): State<Arc<CampService>>,
    Path(camp_id): Path<String>,
) -> Response {
    match service
        .run_all_closure_steps(&CampId(camp_id), CancelSignal::never())
        .await
    {
        Ok(run) => (StatusCode::OK, Json(run)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn run_step_handler(
    State(service): State<Arc<CampService>>,
    Path((camp_id, step_id)): Path<(String, String)>,
) -> Response {
    let step = match step_id.parse::<StepKey>() {
        Ok(step) => step,
        Err(error) => return error_response(CampError::Closure(error)),
    };

    match service
        .run_closure_step(&CampId(camp_id), step, CancelSignal::never())
        .await
    {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(error) => error_response(error),
    }
}

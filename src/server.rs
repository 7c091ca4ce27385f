//! HTTP surface. Thin glue that turns requests into pipeline calls and
//! pipeline errors into `{"error": "..."}` bodies.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::PredictError;
use crate::history::{HistoryEntry, SessionStore};
use crate::service::{MatchQuery, OverUnderService};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<OverUnderService>,
    pub sessions: SessionStore,
}

type ApiError = (StatusCode, Json<Value>);

#[derive(Serialize)]
struct PredictResponse {
    league: String,
    team1: String,
    team2: String,
    predicted: f64,
    result: String,
    history: Vec<HistoryEntry>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/leagues", get(leagues_handler))
        .route("/leagues/:league/teams", get(teams_handler))
        .route("/sessions", post(start_session_handler))
        .route("/sessions/:id", delete(end_session_handler))
        .route("/sessions/:id/predict", post(predict_handler))
        .route(
            "/sessions/:id/history",
            get(history_handler).delete(reset_history_handler),
        )
        .with_state(state)
}

fn error_response(err: &PredictError) -> ApiError {
    let status = match err {
        PredictError::UnknownLeague(_) => StatusCode::NOT_FOUND,
        PredictError::RemoteFetchFailed { .. } => StatusCode::BAD_GATEWAY,
        PredictError::EmptyDataset(_) | PredictError::MissingColumn { .. } => {
            StatusCode::BAD_GATEWAY
        }
        PredictError::UnresolvedTeamName { .. } | PredictError::StatsLookup(_) => {
            StatusCode::BAD_REQUEST
        }
    };
    (status, Json(json!({ "error": format!("Error: {}", err) })))
}

fn unknown_session(id: Uuid) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("Error: unknown session {}", id) })),
    )
}

/// Health check handler
async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let health = state.service.health().await;

    let status = if health.consecutive_errors > 5 {
        "degraded"
    } else {
        "ok"
    };

    (
        StatusCode::OK,
        Json(json!({
            "service": "over-under",
            "version": env!("CARGO_PKG_VERSION"),
            "status": status,
            "cached_leagues": health.cached_leagues,
            "last_fetch": health.last_fetch.map(|t| t.to_rfc3339()),
            "fetch_count": health.fetch_count,
            "consecutive_errors": health.consecutive_errors,
            "match_cutoff": state.service.resolver().cutoff(),
            "match_metric": state.service.resolver().metric().to_string(),
        })),
    )
}

async fn leagues_handler(State(state): State<AppState>) -> Json<Value> {
    let leagues: Vec<Value> = state
        .service
        .leagues()
        .iter()
        .map(|l| json!({ "name": l.name(), "family": l.family() }))
        .collect();
    Json(json!({ "leagues": leagues }))
}

async fn teams_handler(
    State(state): State<AppState>,
    Path(league): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let table = state
        .service
        .table(&league)
        .await
        .map_err(|e| error_response(&e))?;
    Ok(Json(json!({ "league": table.league().name(), "teams": table.teams() })))
}

async fn start_session_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let id = state.sessions.start().await;
    (StatusCode::CREATED, Json(json!({ "session_id": id })))
}

async fn end_session_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.end(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(unknown_session(id))
    }
}

async fn predict_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(query): Json<MatchQuery>,
) -> Result<Json<PredictResponse>, ApiError> {
    let mut history = state.sessions.history(id).await.ok_or_else(|| unknown_session(id))?;

    let before = history.len();
    let prediction = state
        .service
        .query(&query, &mut history)
        .await
        .map_err(|e| error_response(&e))?;

    for entry in &history.list()[before..] {
        state.sessions.record(id, entry.clone()).await;
    }
    let history = state.sessions.history(id).await.ok_or_else(|| unknown_session(id))?;

    Ok(Json(PredictResponse {
        league: prediction.league.name().to_string(),
        team1: prediction.team1.clone(),
        team2: prediction.team2.clone(),
        predicted: prediction.predicted,
        result: prediction.formatted(),
        history: history.list().to_vec(),
    }))
}

async fn history_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let history = state.sessions.history(id).await.ok_or_else(|| unknown_session(id))?;
    Ok(Json(json!({ "session_id": id, "history": history })))
}

async fn reset_history_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.reset(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(unknown_session(id))
    }
}

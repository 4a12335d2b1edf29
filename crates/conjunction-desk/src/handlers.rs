use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use lexicon_rules::ValidationReport;
use lexicon_store::{CorpusError, TrackedBatch, TrackerError};
use lexicon_types::BatchStatus;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::desk::{Desk, DeskError, Submission};

#[derive(Clone)]
pub struct AppState {
    pub desk: Arc<Mutex<Desk>>,
}

impl AppState {
    pub fn new(desk: Desk) -> Self {
        Self {
            desk: Arc::new(Mutex::new(desk)),
        }
    }

    fn desk(&self) -> Result<MutexGuard<'_, Desk>, ApiError> {
        self.desk.lock().map_err(|_| {
            error!("desk lock poisoned");
            ApiError::Internal
        })
    }
}

#[derive(Serialize)]
pub struct BatchView {
    id: String,
    status: BatchStatus,
    lemmas: Vec<String>,
    recorded: Vec<String>,
}

impl From<&TrackedBatch> for BatchView {
    fn from(batch: &TrackedBatch) -> Self {
        Self {
            id: batch.id().to_string(),
            status: batch.status(),
            lemmas: batch.lemmas().to_vec(),
            recorded: batch
                .lemmas()
                .iter()
                .filter(|l| batch.is_recorded(l))
                .cloned()
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct StartResponse {
    #[serde(flatten)]
    batch: BatchView,
    reconciled: Vec<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/validate", post(validate))
        .route("/v1/batches", get(list_batches))
        .route("/v1/batches/{id}/start", post(start_batch))
        .route("/v1/batches/{id}/entries", post(submit_entry))
        .route("/v1/batches/{id}/complete", post(complete_batch))
        .route("/v1/entries/{lemma}", get(get_entry))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

async fn validate(
    State(state): State<AppState>,
    Json(submission): Json<Submission>,
) -> Result<Json<ValidationReport>, ApiError> {
    let desk = state.desk()?;
    Ok(Json(desk.validate(&submission)))
}

async fn list_batches(State(state): State<AppState>) -> Result<Json<Vec<BatchView>>, ApiError> {
    let desk = state.desk()?;
    Ok(Json(desk.batches().iter().map(BatchView::from).collect()))
}

async fn start_batch(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let body = with_desk(state, move |desk| {
        let reconciled = desk.start(&id)?;
        let batch = desk
            .batch(&id)
            .map(BatchView::from)
            .ok_or(ApiError::Internal)?;
        Ok(StartResponse { batch, reconciled })
    })
    .await?;
    Ok(Json(body).into_response())
}

async fn submit_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(submission): Json<Submission>,
) -> Result<Response, ApiError> {
    let report = with_desk(state, move |desk| Ok(desk.submit(&id, submission)?)).await?;
    Ok((StatusCode::CREATED, Json(report)).into_response())
}

async fn complete_batch(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let batch = with_desk(state, move |desk| {
        desk.complete(&id)?;
        desk.batch(&id).map(BatchView::from).ok_or(ApiError::Internal)
    })
    .await?;
    Ok(Json(batch).into_response())
}

/// Run a state-changing desk call on the blocking pool; every write ends in
/// an fsync and a rename.
async fn with_desk<T, F>(state: AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut Desk) -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut desk = state.desk()?;
        f(&mut desk)
    })
    .await
    .map_err(|err| {
        error!("desk task failed: {err}");
        ApiError::Internal
    })?
}

async fn get_entry(
    State(state): State<AppState>,
    Path(lemma): Path<String>,
) -> Result<Response, ApiError> {
    let desk = state.desk()?;
    match desk.entry(&lemma) {
        Some(entry) => Ok(Json(entry).into_response()),
        None => Err(ApiError::NotFound(format!("no entry for lemma {lemma:?}"))),
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("entry failed validation")]
    Invalid(Box<ValidationReport>),
    #[error("internal server error")]
    Internal,
}

impl From<DeskError> for ApiError {
    fn from(err: DeskError) -> Self {
        let message = err.to_string();
        match err {
            DeskError::Invalid(report) => ApiError::Invalid(report),
            DeskError::Corpus(CorpusError::DuplicateLemma(_)) => ApiError::Conflict(message),
            DeskError::Tracker(
                TrackerError::UnknownBatch(_) | TrackerError::UnknownLemma { .. },
            ) => ApiError::NotFound(message),
            DeskError::Tracker(
                TrackerError::BatchNotStarted(_)
                | TrackerError::IncompleteBatch { .. }
                | TrackerError::InvalidTransition { .. }
                | TrackerError::DuplicateBatch(_)
                | TrackerError::EmptyBatch(_)
                | TrackerError::LemmaAlreadyBatched { .. }
                | TrackerError::InvalidBatchId(_)
                | TrackerError::InvalidLemma { .. },
            ) => ApiError::Conflict(message),
            DeskError::Corpus(_) | DeskError::Tracker(_) => {
                error!("desk operation failed: {message}");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { error: msg })).into_response()
            }
            ApiError::Conflict(msg) => {
                (StatusCode::CONFLICT, Json(ErrorResponse { error: msg })).into_response()
            }
            ApiError::Invalid(report) => {
                let body = Json(json!({ "error": "entry failed validation", "report": report }));
                (StatusCode::UNPROCESSABLE_ENTITY, body).into_response()
            }
            ApiError::Internal => {
                let body = Json(json!({ "error": "internal server error" }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

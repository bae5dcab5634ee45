//! Notification queue routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use kodi_common::error::AppError;
use kodi_common::types::JsonRpcRequest;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notify/{name}", post(enqueue_notification))
        .route("/api/queue", get(queue_status))
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub queued: bool,
    pub name: String,
    pub queue_size: usize,
}

#[derive(Debug, Serialize)]
pub struct QueueStatus {
    pub size: usize,
    pub names: Vec<String>,
}

/// POST /api/notify/:name: Queue a Kodi JSON-RPC call for the next flush.
///
/// `name` is the dedup key: while a task with that name is pending, further
/// posts under it are accepted but ignored.
async fn enqueue_notification(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<JsonRpcRequest>,
) -> Result<(StatusCode, Json<EnqueueResponse>), AppError> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("task name must not be empty".to_string()));
    }
    if request.method.trim().is_empty() {
        return Err(AppError::Validation("method must not be empty".to_string()));
    }

    if !state.dispatcher.enqueue(name.clone(), request) {
        return Err(AppError::Disabled);
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(EnqueueResponse {
            queued: true,
            name,
            queue_size: state.dispatcher.queue_size(),
        }),
    ))
}

/// GET /api/queue: List pending task names.
async fn queue_status(State(state): State<AppState>) -> Json<QueueStatus> {
    let names = state.dispatcher.queue().names();
    Json(QueueStatus {
        size: names.len(),
        names,
    })
}

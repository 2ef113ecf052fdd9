use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{CreateBugRequest, DeletedResponse, UpdateBugRequest};
use super::repo_types::Bug;
use crate::{
    auth::AuthUser,
    error::{ApiError, ApiJson},
    state::AppState,
};

// Creation and updates are open to anonymous callers; only deletion is gated.
pub fn bug_routes() -> Router<AppState> {
    Router::new()
        .route("/bugs", get(list_bugs).post(create_bug))
        .route("/bugs/:id", get(get_bug).put(update_bug).delete(delete_bug))
}

#[instrument(skip(state, payload))]
pub async fn create_bug(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateBugRequest>,
) -> Result<(StatusCode, Json<Bug>), ApiError> {
    let new_bug = payload.validate()?;
    let bug = state.db.create_bug(new_bug).await?;
    info!(bug_id = %bug.id, priority = %bug.priority, "bug created");
    Ok((StatusCode::CREATED, Json(bug)))
}

#[instrument(skip(state))]
pub async fn list_bugs(State(state): State<AppState>) -> Result<Json<Vec<Bug>>, ApiError> {
    let bugs = state.db.list_bugs().await?;
    Ok(Json(bugs))
}

#[instrument(skip(state))]
pub async fn get_bug(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Bug>, ApiError> {
    let id = parse_bug_id(&id)?;
    state
        .db
        .get_bug(id)
        .await?
        .map(Json)
        .ok_or_else(bug_not_found)
}

#[instrument(skip(state, payload))]
pub async fn update_bug(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateBugRequest>,
) -> Result<Json<Bug>, ApiError> {
    let id = parse_bug_id(&id)?;
    let changes = payload.validate()?;
    match state.db.update_bug(id, changes).await? {
        Some(bug) => {
            info!(bug_id = %bug.id, status = %bug.status, "bug updated");
            Ok(Json(bug))
        }
        None => {
            warn!(bug_id = %id, "update of unknown bug");
            Err(bug_not_found())
        }
    }
}

#[instrument(skip(state, user))]
pub async fn delete_bug(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let id = parse_bug_id(&id)?;
    if !state.db.delete_bug(id).await? {
        warn!(bug_id = %id, "delete of unknown bug");
        return Err(bug_not_found());
    }
    info!(bug_id = %id, user_id = %user.id, username = %user.username, "bug deleted");
    Ok(Json(DeletedResponse {
        message: "Bug deleted successfully",
        id,
    }))
}

/// Ids that are not UUIDs cannot name a stored bug.
fn parse_bug_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| bug_not_found())
}

fn bug_not_found() -> ApiError {
    ApiError::not_found("Bug not found")
}

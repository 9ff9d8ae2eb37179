//! Thread routes: list, create, read with messages, delete.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wire::Message;

use crate::error::{ApiError, api_error};
use crate::routes::auth::AuthUser;
use crate::services::thread::{Thread, ThreadError, UNTITLED, derive_title};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateThreadBody {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ThreadDetail {
    #[serde(flatten)]
    pub thread: Thread,
    pub messages: Vec<Message>,
}

fn reject(err: &ThreadError) -> ApiError {
    api_error(thread_error_to_status(err), err)
}

/// `GET /api/threads`: the caller's threads, most recent first.
pub async fn list_threads(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<Thread>>, ApiError> {
    let threads = state
        .store
        .list_threads(&auth.user_id)
        .await
        .map_err(|e| reject(&e))?;
    Ok(Json(threads))
}

/// `POST /api/threads`: create an empty thread.
pub async fn create_thread(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Option<Json<CreateThreadBody>>,
) -> Result<(StatusCode, Json<Thread>), ApiError> {
    let title = body
        .and_then(|Json(b)| b.title)
        .map_or_else(|| UNTITLED.to_owned(), |t| derive_title(&t));
    let thread = state
        .store
        .create_thread(&auth.user_id, &title)
        .await
        .map_err(|e| reject(&e))?;
    Ok((StatusCode::CREATED, Json(thread)))
}

/// `GET /api/threads/{id}`: thread metadata plus every message, for reload.
pub async fn get_thread(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(thread_id): Path<Uuid>,
) -> Result<Json<ThreadDetail>, ApiError> {
    let thread = state
        .store
        .get_thread(&auth.user_id, thread_id)
        .await
        .map_err(|e| reject(&e))?;
    let messages = state
        .store
        .load_messages(thread_id)
        .await
        .map_err(|e| reject(&e))?;
    Ok(Json(ThreadDetail { thread, messages }))
}

/// `DELETE /api/threads/{id}`.
pub async fn delete_thread(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(thread_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .delete_thread(&auth.user_id, thread_id)
        .await
        .map_err(|e| reject(&e))?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn thread_error_to_status(err: &ThreadError) -> StatusCode {
    match err {
        ThreadError::NotFound(_) => StatusCode::NOT_FOUND,
        ThreadError::EmptyParts(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ThreadError::Corrupt { .. } | ThreadError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
#[path = "threads_test.rs"]
mod tests;

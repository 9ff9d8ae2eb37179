//! Chat streaming route.
//!
//! `POST /api/chat` resolves the thread and stores the user message before
//! answering, so bad requests get a plain status. The model loop then runs
//! in its own task and the response is an SSE stream of [`StreamEvent`]s,
//! one event per message, named after the event type. The task outlives the
//! connection: a client that goes away still gets its reply persisted.

use std::convert::Infallible;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use wire::StreamEvent;

use crate::error::{ApiError, ErrorCode, api_error};
use crate::routes::auth::AuthUser;
use crate::routes::threads::thread_error_to_status;
use crate::services::chat::{self, ChatError, ChatRequest};
use crate::state::AppState;

/// Events buffered between the turn task and the HTTP body.
const EVENT_BUFFER: usize = 64;

/// `POST /api/chat`: run one chat turn and stream its events.
pub async fn chat(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let turn = chat::prepare_turn(&state, &auth.user_id, body)
        .await
        .map_err(|e| api_error(chat_error_to_status(&e), &e))?;

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let keepalive = state.config.sse_keepalive;
    let user_id = auth.user_id;
    tokio::spawn(async move {
        if let Err(e) = chat::run_prepared(&state, turn, tx).await {
            tracing::warn!(%user_id, code = e.error_code(), error = %e, "chat: turn ended with error");
        }
    });

    let stream = ReceiverStream::new(rx).map(|event| Ok(to_sse_event(&event)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(keepalive)))
}

pub(crate) fn to_sse_event(event: &StreamEvent) -> Event {
    Event::default()
        .event(event.name())
        .json_data(event)
        .unwrap_or_else(|e| {
            tracing::error!(event = event.name(), error = %e, "chat: event not serializable");
            Event::default().event("error").data(r#"{"type":"error","errorText":"internal error"}"#)
        })
}

pub(crate) fn chat_error_to_status(err: &ChatError) -> StatusCode {
    match err {
        ChatError::EmptyMessage => StatusCode::BAD_REQUEST,
        ChatError::LlmNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        ChatError::Thread(e) => thread_error_to_status(e),
        ChatError::Llm(_) => StatusCode::BAD_GATEWAY,
    }
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;

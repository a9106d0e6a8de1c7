//! Router for the chat widget API

use std::sync::{Arc, RwLock};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use super::public;
use crate::ai::chat::Chat;
use crate::api::public::ApiError;
use crate::api::state::AppState;

type SharedState = Arc<RwLock<AppState>>;

fn find_chat(state: &SharedState, id: &str) -> Option<Arc<Chat>> {
    state
        .read()
        .expect("Unable to read share state")
        .sessions
        .get(id)
        .cloned()
}

fn not_found(id: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        format!("Chat session {} not found", id),
    )
        .into_response()
}

/// Start a new chat session seeded with the greeting
async fn chat_create(
    State(state): State<SharedState>,
) -> Result<Json<public::ChatSessionResponse>, ApiError> {
    let mut shared_state = state.write().expect("Unable to write share state");
    let chat = shared_state.new_chat()?;
    let transcript = chat.transcript();
    let session_id = shared_state.insert_chat(chat);

    tracing::debug!("Created chat session {}", session_id);

    Ok(Json(public::ChatSessionResponse {
        session_id,
        transcript,
    }))
}

/// Get the transcript of a chat session
async fn chat_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match find_chat(&state, &id) {
        Some(chat) => Json(public::ChatTranscriptResponse {
            transcript: chat.transcript(),
        })
        .into_response(),
        None => not_found(&id),
    }
}

/// Submit a message to a chat session and wait for the reply
async fn chat_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<public::ChatRequest>,
) -> Result<axum::response::Response, ApiError> {
    let Some(chat) = find_chat(&state, &id) else {
        return Ok(not_found(&id));
    };

    let message = chat.submit(&payload.message).await?;

    Ok(Json(public::ChatResponse { message }).into_response())
}

/// Create the chat router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", post(chat_create))
        .route("/{id}", post(chat_handler).get(chat_session))
}

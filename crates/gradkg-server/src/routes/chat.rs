//! Chat routes: routed retrieval plus an external LLM answer.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use super::ApiResult;
use crate::state::AppState;
use gradkg_chat::{ChatAnswer, ChatRequest, ChatStatus, HttpCompletion, LLMConfigUpdate};
use gradkg_core::Error;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat/status", get(get_status))
        .route("/chat", post(chat))
        .route("/chat/config", get(get_config).put(update_config))
}

// ---------------------------------------------------------------
// Status
// ---------------------------------------------------------------

async fn get_status(State(state): State<Arc<AppState>>) -> ApiResult<ChatStatus> {
    let config = state.llm_config.read().clone();
    Ok(Json(state.chat.status(&config)?))
}

// ---------------------------------------------------------------
// Chat
// ---------------------------------------------------------------

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<ChatAnswer> {
    if req.message.trim().is_empty() {
        return Err(Error::InvalidInput("message is required".into()).into());
    }

    // The lock guard must not live across an await.
    let llm = {
        let config = state.llm_config.read();
        HttpCompletion::from_config(state.http.clone(), &config)
    };
    let llm = llm.ok_or_else(|| Error::Config("No LLM provider configured".into()))?;

    let answer = state
        .chat
        .chat(&llm, &req.profile(), &req.message, &req.conversation_history)
        .await?;
    Ok(Json(answer))
}

// ---------------------------------------------------------------
// Config
// ---------------------------------------------------------------

async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = state.llm_config.read();
    Json(config.to_response())
}

async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<LLMConfigUpdate>,
) -> impl IntoResponse {
    let mut config = state.llm_config.write();
    config.apply_update(&update);

    if let Err(e) = config.save() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": format!("Failed to save config: {}", e) })),
        );
    }

    match serde_json::to_value(config.to_response()) {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}

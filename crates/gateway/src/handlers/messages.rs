//! Conversation history handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::conversation::Role;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MessageItem {
    pub role: Role,
    pub content: String,
}

/// The most recent turns, oldest first
pub async fn last_messages(State(state): State<AppState>) -> Json<Vec<MessageItem>> {
    let turns = state
        .pipeline
        .conversation()
        .last(state.config.conversation.last_messages)
        .await;

    Json(
        turns
            .into_iter()
            .map(|turn| MessageItem {
                role: turn.role,
                content: turn.content,
            })
            .collect(),
    )
}

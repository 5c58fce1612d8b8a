use axum::extract::{Extension, Query};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::extractor::AuthUser;
use crate::response::{ok, Envelope};

use super::models::{Chat, ChatOutcome};
use super::service::ChatService;

const MAX_QUESTION_LEN: usize = 1_000;
const DEFAULT_HISTORY_LIMIT: i64 = 50;
const MAX_HISTORY_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

pub async fn ask(
    Extension(service): Extension<Arc<ChatService>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(payload): Json<AskRequest>,
) -> AppResult<Json<Envelope<ChatOutcome>>> {
    let question = payload.question.trim();
    if question.is_empty() {
        return Err(AppError::Validation("Question must not be empty".into()));
    }
    if question.chars().count() > MAX_QUESTION_LEN {
        return Err(AppError::Validation(format!(
            "Question must be at most {MAX_QUESTION_LEN} characters"
        )));
    }

    let outcome = service.handle_chat(user_id, question).await?;
    Ok(ok(outcome))
}

pub async fn history(
    Extension(service): Extension<Arc<ChatService>>,
    AuthUser { user_id, .. }: AuthUser,
    Query(params): Query<HistoryQuery>,
) -> AppResult<Json<Envelope<Vec<Chat>>>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let chats = service.history(user_id, limit).await?;
    Ok(ok(chats))
}

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::subscriptions::models::Tier;

/// One question/answer exchange. Immutable once persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bundle_id: Option<Uuid>,
    pub question: String,
    pub answer: String,
    pub tokens: i32,
    pub is_free_message: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewChat {
    pub user_id: Uuid,
    pub bundle_id: Option<Uuid>,
    pub question: String,
    pub answer: String,
    pub tokens: i32,
    pub is_free_message: bool,
}

/// key: chat-outcome -> response payload for a funded chat
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOutcome {
    pub chat: Chat,
    pub remaining_quota: RemainingQuota,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemainingQuota {
    pub free_messages: i64,
    /// Remaining capacity on the best bundle; -1 for unlimited, 0 when none.
    pub bundle_messages: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_tier: Option<Tier>,
}

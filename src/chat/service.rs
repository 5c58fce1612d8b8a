use chrono::Utc;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::stores::{ChatStore, SubscriptionStore, UserStore};

use super::generator::AnswerGenerator;
use super::models::{Chat, ChatOutcome, NewChat, RemainingQuota};

/// Monthly free allowance for every user. Fixed product policy, not a
/// per-user setting.
pub const FREE_TIER_MONTHLY_LIMIT: i64 = 3;

/// key: quota-allocator -> funding-source selection and usage recording
pub struct ChatService {
    chats: Arc<dyn ChatStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    users: Arc<dyn UserStore>,
    generator: Arc<dyn AnswerGenerator>,
}

impl ChatService {
    pub fn new(
        chats: Arc<dyn ChatStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        users: Arc<dyn UserStore>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            chats,
            subscriptions,
            users,
            generator,
        }
    }

    pub async fn handle_chat(&self, user_id: Uuid, question: &str) -> AppResult<ChatOutcome> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        // Month rollover must land before quota evaluation.
        if user.needs_free_message_reset(Utc::now()) {
            self.users.reset_free_messages(user_id).await?;
        }

        let free_used = self.chats.count_free_messages_this_month(user_id).await?;
        let mut bundles = self.subscriptions.get_active_bundles(user_id).await?;
        bundles.sort_by_key(|bundle| bundle.end_date);

        // Drain bundles closest to expiry first. The guarded increment both
        // selects and reserves the slot, so two concurrent requests cannot
        // share the last message of a bundle. A rejected reservation means a
        // racing request won; move on to the next candidate.
        let mut funded_by: Option<Uuid> = None;
        for bundle in bundles.iter().filter(|b| b.has_remaining_messages()) {
            if self.subscriptions.increment_usage(bundle.id, 1).await? {
                funded_by = Some(bundle.id);
                break;
            }
        }

        let is_free_message = match funded_by {
            Some(_) => false,
            None if free_used < FREE_TIER_MONTHLY_LIMIT => true,
            None => return Err(AppError::QuotaExceeded),
        };

        let completion = match self.generator.generate(question).await {
            Ok(completion) => completion,
            Err(err) => {
                self.release_reservation(funded_by).await;
                return Err(err);
            }
        };

        let saved = self
            .chats
            .save(NewChat {
                user_id,
                bundle_id: funded_by,
                question: question.to_string(),
                answer: completion.answer,
                tokens: completion.tokens,
                is_free_message,
            })
            .await;
        let chat = match saved {
            Ok(chat) => chat,
            Err(err) => {
                self.release_reservation(funded_by).await;
                return Err(err);
            }
        };

        let updated_free = if is_free_message {
            free_used + 1
        } else {
            free_used
        };
        let remaining_quota = self.remaining_quota(user_id, updated_free).await?;

        Ok(ChatOutcome {
            chat,
            remaining_quota,
        })
    }

    pub async fn history(&self, user_id: Uuid, limit: i64) -> AppResult<Vec<Chat>> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AppError::UserNotFound);
        }
        self.chats.find_by_user_id(user_id, limit).await
    }

    async fn remaining_quota(&self, user_id: Uuid, free_used: i64) -> AppResult<RemainingQuota> {
        let mut bundles = self.subscriptions.get_active_bundles(user_id).await?;
        bundles.sort_by_key(|bundle| bundle.end_date);
        let best = bundles.iter().find(|b| b.has_remaining_messages());

        Ok(RemainingQuota {
            free_messages: FREE_TIER_MONTHLY_LIMIT - free_used,
            bundle_messages: best
                .map(|b| {
                    if b.max_messages == -1 {
                        -1
                    } else {
                        b.max_messages - b.used_messages
                    }
                })
                .unwrap_or(0),
            bundle_tier: best.map(|b| b.tier),
        })
    }

    async fn release_reservation(&self, funded_by: Option<Uuid>) {
        let Some(bundle_id) = funded_by else { return };
        if let Err(err) = self.subscriptions.increment_usage(bundle_id, -1).await {
            warn!(?err, %bundle_id, "failed to release reserved bundle message");
        }
    }
}

pub mod pg;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::chat::models::{Chat, NewChat};
use crate::error::AppResult;
use crate::subscriptions::models::{NewBundle, SubscriptionBundle};
use crate::users::{NewUser, User};

pub use pg::{PgChatStore, PgSubscriptionStore, PgUserStore};

/// key: user-store -> identity and free-tier state
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn create(&self, user: NewUser) -> AppResult<User>;
    /// Zeroes the free-tier counter and stamps the reset date. Conditional on
    /// the stored reset date belonging to a different calendar month, so
    /// concurrent callers cannot double-reset.
    async fn reset_free_messages(&self, user_id: Uuid) -> AppResult<()>;
}

/// key: chat-store -> immutable exchange log
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn save(&self, chat: NewChat) -> AppResult<Chat>;
    /// Free-tier usage is derived from chat rows, not a counter field.
    async fn count_free_messages_this_month(&self, user_id: Uuid) -> AppResult<i64>;
    async fn count_monthly_chats(&self, user_id: Uuid) -> AppResult<i64>;
    async fn find_by_user_id(&self, user_id: Uuid, limit: i64) -> AppResult<Vec<Chat>>;
}

/// key: subscription-store -> bundle lifecycle
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn save(&self, bundle: NewBundle) -> AppResult<SubscriptionBundle>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionBundle>>;
    async fn get_active_bundles(&self, user_id: Uuid) -> AppResult<Vec<SubscriptionBundle>>;
    async fn get_renewable_bundles(
        &self,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<SubscriptionBundle>>;
    /// Atomic conditional usage update. Positive amounts are rejected (returns
    /// `false`) when the bundle lacks capacity; negative amounts release a
    /// reservation and floor at zero.
    async fn increment_usage(&self, bundle_id: Uuid, amount: i32) -> AppResult<bool>;
    async fn mark_inactive(&self, bundle_id: Uuid) -> AppResult<()>;
    /// Advances the period end and renewal date, resetting usage for the new
    /// period.
    async fn renew(&self, bundle_id: Uuid, new_end_date: DateTime<Utc>) -> AppResult<()>;
    async fn cancel_at_period_end(&self, bundle_id: Uuid) -> AppResult<()>;
    async fn update_auto_renew(&self, bundle_id: Uuid, auto_renew: bool) -> AppResult<()>;
}

//! In-memory store fakes and scripted collaborators for unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use uuid::Uuid;

use crate::chat::generator::{AnswerGenerator, Completion};
use crate::chat::models::{Chat, NewChat};
use crate::error::{AppError, AppResult};
use crate::stores::{ChatStore, SubscriptionStore, UserStore};
use crate::subscriptions::models::{BillingCycle, NewBundle, SubscriptionBundle, Tier};
use crate::subscriptions::payments::PaymentProcessor;
use crate::users::{NewUser, User};

pub fn user_fixture() -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        email: format!("{}@example.com", Uuid::new_v4()),
        name: "Test User".into(),
        password_hash: "hashed".into(),
        free_messages_used: 0,
        free_messages_reset_date: now,
        created_at: now,
        updated_at: now,
    }
}

pub fn bundle_fixture(user_id: Uuid, tier: Tier, end_date: DateTime<Utc>) -> SubscriptionBundle {
    let now = Utc::now();
    SubscriptionBundle {
        id: Uuid::new_v4(),
        user_id,
        tier,
        max_messages: tier.max_messages(),
        used_messages: 0,
        price_cents: tier.price_cents(BillingCycle::Monthly),
        billing_cycle: BillingCycle::Monthly,
        start_date: now,
        end_date,
        renewal_date: Some(end_date),
        auto_renew: true,
        active: true,
        created_at: now,
        updated_at: now,
    }
}

fn start_of_current_month() -> DateTime<Utc> {
    let now = Utc::now();
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .expect("first of month is always valid")
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn insert(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn get(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.get(id))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            free_messages_used: 0,
            free_messages_reset_date: now,
            created_at: now,
            updated_at: now,
        };
        self.insert(user.clone());
        Ok(user)
    }

    async fn reset_free_messages(&self, user_id: Uuid) -> AppResult<()> {
        let now = Utc::now();
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.get_mut(&user_id) {
            // Same month guard as the Postgres store.
            if user.needs_free_message_reset(now) {
                user.free_messages_used = 0;
                user.free_messages_reset_date = now;
                user.updated_at = now;
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryChatStore {
    chats: Mutex<Vec<Chat>>,
}

impl MemoryChatStore {
    pub fn seed_free_chats(&self, user_id: Uuid, count: usize, created_at: DateTime<Utc>) {
        let mut chats = self.chats.lock().unwrap();
        for _ in 0..count {
            chats.push(Chat {
                id: Uuid::new_v4(),
                user_id,
                bundle_id: None,
                question: "seeded".into(),
                answer: "seeded".into(),
                tokens: 1,
                is_free_message: true,
                created_at,
            });
        }
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn save(&self, chat: NewChat) -> AppResult<Chat> {
        let chat = Chat {
            id: Uuid::new_v4(),
            user_id: chat.user_id,
            bundle_id: chat.bundle_id,
            question: chat.question,
            answer: chat.answer,
            tokens: chat.tokens,
            is_free_message: chat.is_free_message,
            created_at: Utc::now(),
        };
        self.chats.lock().unwrap().push(chat.clone());
        Ok(chat)
    }

    async fn count_free_messages_this_month(&self, user_id: Uuid) -> AppResult<i64> {
        let window = start_of_current_month();
        Ok(self
            .chats
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.user_id == user_id && c.is_free_message && c.created_at >= window)
            .count() as i64)
    }

    async fn count_monthly_chats(&self, user_id: Uuid) -> AppResult<i64> {
        let window = start_of_current_month();
        Ok(self
            .chats
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.user_id == user_id && c.created_at >= window)
            .count() as i64)
    }

    async fn find_by_user_id(&self, user_id: Uuid, limit: i64) -> AppResult<Vec<Chat>> {
        let mut chats: Vec<Chat> = self
            .chats
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        chats.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        chats.truncate(limit.max(0) as usize);
        Ok(chats)
    }
}

#[derive(Default)]
pub struct MemorySubscriptionStore {
    bundles: Mutex<HashMap<Uuid, SubscriptionBundle>>,
}

impl MemorySubscriptionStore {
    pub fn insert(&self, bundle: SubscriptionBundle) {
        self.bundles.lock().unwrap().insert(bundle.id, bundle);
    }

    pub fn get(&self, id: Uuid) -> Option<SubscriptionBundle> {
        self.bundles.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn save(&self, bundle: NewBundle) -> AppResult<SubscriptionBundle> {
        let now = Utc::now();
        let bundle = SubscriptionBundle {
            id: Uuid::new_v4(),
            user_id: bundle.user_id,
            tier: bundle.tier,
            max_messages: bundle.max_messages,
            used_messages: bundle.used_messages,
            price_cents: bundle.price_cents,
            billing_cycle: bundle.billing_cycle,
            start_date: bundle.start_date,
            end_date: bundle.end_date,
            renewal_date: bundle.renewal_date,
            auto_renew: bundle.auto_renew,
            active: bundle.active,
            created_at: now,
            updated_at: now,
        };
        self.insert(bundle.clone());
        Ok(bundle)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionBundle>> {
        Ok(self.get(id))
    }

    async fn get_active_bundles(&self, user_id: Uuid) -> AppResult<Vec<SubscriptionBundle>> {
        let mut bundles: Vec<SubscriptionBundle> = self
            .bundles
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.user_id == user_id && b.active)
            .cloned()
            .collect();
        bundles.sort_by_key(|b| b.end_date);
        Ok(bundles)
    }

    async fn get_renewable_bundles(
        &self,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<SubscriptionBundle>> {
        Ok(self
            .bundles
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.active && b.auto_renew && matches!(b.renewal_date, Some(r) if r <= now))
            .cloned()
            .collect())
    }

    async fn increment_usage(&self, bundle_id: Uuid, amount: i32) -> AppResult<bool> {
        let mut bundles = self.bundles.lock().unwrap();
        let Some(bundle) = bundles.get_mut(&bundle_id) else {
            return Ok(false);
        };
        if amount > 0
            && bundle.max_messages != -1
            && bundle.used_messages + amount > bundle.max_messages
        {
            return Ok(false);
        }
        bundle.used_messages = (bundle.used_messages + amount).max(0);
        bundle.updated_at = Utc::now();
        Ok(true)
    }

    async fn mark_inactive(&self, bundle_id: Uuid) -> AppResult<()> {
        if let Some(bundle) = self.bundles.lock().unwrap().get_mut(&bundle_id) {
            bundle.active = false;
            bundle.auto_renew = false;
            bundle.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn renew(&self, bundle_id: Uuid, new_end_date: DateTime<Utc>) -> AppResult<()> {
        if let Some(bundle) = self.bundles.lock().unwrap().get_mut(&bundle_id) {
            bundle.end_date = new_end_date;
            bundle.renewal_date = Some(new_end_date);
            bundle.used_messages = 0;
            bundle.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn cancel_at_period_end(&self, bundle_id: Uuid) -> AppResult<()> {
        if let Some(bundle) = self.bundles.lock().unwrap().get_mut(&bundle_id) {
            bundle.auto_renew = false;
            bundle.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_auto_renew(&self, bundle_id: Uuid, auto_renew: bool) -> AppResult<()> {
        if let Some(bundle) = self.bundles.lock().unwrap().get_mut(&bundle_id) {
            bundle.auto_renew = auto_renew;
            bundle.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct StaticAnswerGenerator;

#[async_trait]
impl AnswerGenerator for StaticAnswerGenerator {
    async fn generate(&self, _question: &str) -> AppResult<Completion> {
        Ok(Completion {
            answer: "canned answer".into(),
            tokens: 42,
        })
    }
}

pub struct FailingAnswerGenerator;

#[async_trait]
impl AnswerGenerator for FailingAnswerGenerator {
    async fn generate(&self, _question: &str) -> AppResult<Completion> {
        Err(AppError::Message("generator unavailable".into()))
    }
}

/// Pops a scripted outcome per charge; defaults to approval when exhausted.
#[derive(Default)]
pub struct ScriptedPayments {
    outcomes: Mutex<VecDeque<bool>>,
}

impl ScriptedPayments {
    pub fn approving() -> Self {
        Self::default()
    }

    pub fn scripted(outcomes: impl IntoIterator<Item = bool>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
        }
    }
}

#[async_trait]
impl PaymentProcessor for ScriptedPayments {
    async fn charge(&self) -> bool {
        self.outcomes.lock().unwrap().pop_front().unwrap_or(true)
    }
}

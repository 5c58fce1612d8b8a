use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::chat::models::{Chat, NewChat};
use crate::error::{AppError, AppResult};
use crate::subscriptions::models::{BillingCycle, NewBundle, SubscriptionBundle, Tier};
use crate::users::{NewUser, User};

use super::{ChatStore, SubscriptionStore, UserStore};

/// key: pg-stores -> sqlx-backed repositories

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        password_hash: row.get("password_hash"),
        free_messages_used: row.get("free_messages_used"),
        free_messages_reset_date: row.get("free_messages_reset_date"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (id, email, name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(user_from_row(&row))
    }

    async fn reset_free_messages(&self, user_id: Uuid) -> AppResult<()> {
        // The month guard makes concurrent resets idempotent.
        sqlx::query(
            r#"
            UPDATE users
            SET free_messages_used = 0,
                free_messages_reset_date = NOW(),
                updated_at = NOW()
            WHERE id = $1
              AND date_trunc('month', free_messages_reset_date) <> date_trunc('month', NOW())
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgChatStore {
    pool: PgPool,
}

impl PgChatStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn chat_from_row(row: &PgRow) -> Chat {
    Chat {
        id: row.get("id"),
        user_id: row.get("user_id"),
        bundle_id: row.get("bundle_id"),
        question: row.get("question"),
        answer: row.get("answer"),
        tokens: row.get("tokens"),
        is_free_message: row.get("is_free_message"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl ChatStore for PgChatStore {
    async fn save(&self, chat: NewChat) -> AppResult<Chat> {
        let row = sqlx::query(
            r#"
            INSERT INTO chats (id, user_id, bundle_id, question, answer, tokens, is_free_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(chat.user_id)
        .bind(chat.bundle_id)
        .bind(&chat.question)
        .bind(&chat.answer)
        .bind(chat.tokens)
        .bind(chat.is_free_message)
        .fetch_one(&self.pool)
        .await?;
        Ok(chat_from_row(&row))
    }

    async fn count_free_messages_this_month(&self, user_id: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM chats
            WHERE user_id = $1
              AND is_free_message
              AND created_at >= date_trunc('month', NOW())
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_monthly_chats(&self, user_id: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM chats
            WHERE user_id = $1
              AND created_at >= date_trunc('month', NOW())
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn find_by_user_id(&self, user_id: Uuid, limit: i64) -> AppResult<Vec<Chat>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM chats
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(chat_from_row).collect())
    }
}

#[derive(Clone)]
pub struct PgSubscriptionStore {
    pool: PgPool,
}

impl PgSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn bundle_from_row(row: &PgRow) -> AppResult<SubscriptionBundle> {
    let tier_raw: String = row.get("tier");
    let tier = Tier::parse(&tier_raw)
        .ok_or_else(|| AppError::Message(format!("unknown tier '{tier_raw}' in store")))?;
    let cycle_raw: String = row.get("billing_cycle");
    let billing_cycle = BillingCycle::parse(&cycle_raw)
        .ok_or_else(|| AppError::Message(format!("unknown billing cycle '{cycle_raw}' in store")))?;

    Ok(SubscriptionBundle {
        id: row.get("id"),
        user_id: row.get("user_id"),
        tier,
        max_messages: row.get("max_messages"),
        used_messages: row.get("used_messages"),
        price_cents: row.get("price_cents"),
        billing_cycle,
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        renewal_date: row.get("renewal_date"),
        auto_renew: row.get("auto_renew"),
        active: row.get("active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn save(&self, bundle: NewBundle) -> AppResult<SubscriptionBundle> {
        let row = sqlx::query(
            r#"
            INSERT INTO subscription_bundles (
                id, user_id, tier, max_messages, used_messages, price_cents,
                billing_cycle, start_date, end_date, renewal_date, auto_renew, active
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(bundle.user_id)
        .bind(bundle.tier.as_str())
        .bind(bundle.max_messages)
        .bind(bundle.used_messages)
        .bind(bundle.price_cents)
        .bind(bundle.billing_cycle.as_str())
        .bind(bundle.start_date)
        .bind(bundle.end_date)
        .bind(bundle.renewal_date)
        .bind(bundle.auto_renew)
        .bind(bundle.active)
        .fetch_one(&self.pool)
        .await?;
        bundle_from_row(&row)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionBundle>> {
        let row = sqlx::query("SELECT * FROM subscription_bundles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(bundle_from_row).transpose()
    }

    async fn get_active_bundles(&self, user_id: Uuid) -> AppResult<Vec<SubscriptionBundle>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM subscription_bundles
            WHERE user_id = $1 AND active
            ORDER BY end_date ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(bundle_from_row).collect()
    }

    async fn get_renewable_bundles(
        &self,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<SubscriptionBundle>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM subscription_bundles
            WHERE active AND auto_renew AND renewal_date IS NOT NULL AND renewal_date <= $1
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(bundle_from_row).collect()
    }

    async fn increment_usage(&self, bundle_id: Uuid, amount: i32) -> AppResult<bool> {
        // Capacity guard and increment in one statement: concurrent requests
        // for the last slot cannot both succeed.
        let result = sqlx::query(
            r#"
            UPDATE subscription_bundles
            SET used_messages = GREATEST(used_messages + $2, 0),
                updated_at = NOW()
            WHERE id = $1
              AND ($2 <= 0 OR max_messages = -1 OR used_messages + $2 <= max_messages)
            "#,
        )
        .bind(bundle_id)
        .bind(amount)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_inactive(&self, bundle_id: Uuid) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE subscription_bundles
            SET active = FALSE, auto_renew = FALSE, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(bundle_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn renew(&self, bundle_id: Uuid, new_end_date: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE subscription_bundles
            SET end_date = $2,
                renewal_date = $2,
                used_messages = 0,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(bundle_id)
        .bind(new_end_date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn cancel_at_period_end(&self, bundle_id: Uuid) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE subscription_bundles
            SET auto_renew = FALSE, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(bundle_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_auto_renew(&self, bundle_id: Uuid, auto_renew: bool) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE subscription_bundles
            SET auto_renew = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(bundle_id)
        .bind(auto_renew)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

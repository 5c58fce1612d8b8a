use chatquota::stores::{
    ChatStore, PgChatStore, PgSubscriptionStore, PgUserStore, SubscriptionStore, UserStore,
};
use chatquota::chat::NewChat;
use chatquota::subscriptions::{BillingCycle, NewBundle, Tier};
use chatquota::users::NewUser;
use chrono::Utc;
use sqlx::PgPool;

// key: pg-store-tests -> guarded conditional updates against real rows

async fn seed_user(pool: &PgPool, email: &str) -> chatquota::users::User {
    PgUserStore::new(pool.clone())
        .create(NewUser {
            email: email.into(),
            name: "Store Test".into(),
            password_hash: "hashed".into(),
        })
        .await
        .unwrap()
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn guarded_increment_stops_at_capacity(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    let user = seed_user(&pool, "capacity@example.com").await;

    let store = PgSubscriptionStore::new(pool.clone());
    let mut bundle = NewBundle::purchase(user.id, Tier::Basic, BillingCycle::Monthly, true, Utc::now());
    bundle.used_messages = 9;
    let bundle = store.save(bundle).await.unwrap();

    // One slot left: the first reservation wins, the second is rejected.
    assert!(store.increment_usage(bundle.id, 1).await.unwrap());
    assert!(!store.increment_usage(bundle.id, 1).await.unwrap());

    let refreshed = store.find_by_id(bundle.id).await.unwrap().unwrap();
    assert_eq!(refreshed.used_messages, 10);

    // Releasing the reservation restores the slot.
    assert!(store.increment_usage(bundle.id, -1).await.unwrap());
    assert!(store.increment_usage(bundle.id, 1).await.unwrap());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn unlimited_bundle_accepts_any_increment(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    let user = seed_user(&pool, "unlimited@example.com").await;

    let store = PgSubscriptionStore::new(pool.clone());
    let bundle = store
        .save(NewBundle::purchase(
            user.id,
            Tier::Enterprise,
            BillingCycle::Monthly,
            true,
            Utc::now(),
        ))
        .await
        .unwrap();

    for _ in 0..25 {
        assert!(store.increment_usage(bundle.id, 1).await.unwrap());
    }
    let refreshed = store.find_by_id(bundle.id).await.unwrap().unwrap();
    assert_eq!(refreshed.used_messages, 25);
    assert!(refreshed.has_remaining_messages());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn stale_reset_date_is_cleared_once(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    let user = seed_user(&pool, "rollover@example.com").await;

    sqlx::query(
        "UPDATE users SET free_messages_used = 3, free_messages_reset_date = NOW() - INTERVAL '45 days' WHERE id = $1",
    )
    .bind(user.id)
    .execute(&pool)
    .await
    .unwrap();

    let store = PgUserStore::new(pool.clone());
    store.reset_free_messages(user.id).await.unwrap();
    // Second call within the same month is a no-op under the guard.
    store.reset_free_messages(user.id).await.unwrap();

    let refreshed = store.find_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(refreshed.free_messages_used, 0);
    assert!(!refreshed.needs_free_message_reset(Utc::now()));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn renewable_query_selects_only_due_auto_renewing_bundles(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    let user = seed_user(&pool, "renewable@example.com").await;

    let store = PgSubscriptionStore::new(pool.clone());
    let now = Utc::now();

    let due = store
        .save(NewBundle::purchase(user.id, Tier::Basic, BillingCycle::Monthly, true, now))
        .await
        .unwrap();
    sqlx::query("UPDATE subscription_bundles SET renewal_date = NOW() - INTERVAL '1 day' WHERE id = $1")
        .bind(due.id)
        .execute(&pool)
        .await
        .unwrap();

    let not_due = store
        .save(NewBundle::purchase(user.id, Tier::Pro, BillingCycle::Monthly, true, now))
        .await
        .unwrap();

    let cancelled = store
        .save(NewBundle::purchase(user.id, Tier::Pro, BillingCycle::Monthly, true, now))
        .await
        .unwrap();
    store.cancel_at_period_end(cancelled.id).await.unwrap();
    sqlx::query("UPDATE subscription_bundles SET renewal_date = NOW() - INTERVAL '1 day' WHERE id = $1")
        .bind(cancelled.id)
        .execute(&pool)
        .await
        .unwrap();

    let renewable = store.get_renewable_bundles(Utc::now()).await.unwrap();
    let ids: Vec<_> = renewable.iter().map(|b| b.id).collect();
    assert!(ids.contains(&due.id));
    assert!(!ids.contains(&not_due.id));
    assert!(!ids.contains(&cancelled.id));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn free_message_count_scopes_to_current_month(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    let user = seed_user(&pool, "window@example.com").await;

    let store = PgChatStore::new(pool.clone());
    let current = store
        .save(NewChat {
            user_id: user.id,
            bundle_id: None,
            question: "now".into(),
            answer: "answer".into(),
            tokens: 10,
            is_free_message: true,
        })
        .await
        .unwrap();
    let old = store
        .save(NewChat {
            user_id: user.id,
            bundle_id: None,
            question: "then".into(),
            answer: "answer".into(),
            tokens: 10,
            is_free_message: true,
        })
        .await
        .unwrap();
    sqlx::query("UPDATE chats SET created_at = NOW() - INTERVAL '40 days' WHERE id = $1")
        .bind(old.id)
        .execute(&pool)
        .await
        .unwrap();

    assert_eq!(store.count_free_messages_this_month(user.id).await.unwrap(), 1);
    assert_eq!(store.count_monthly_chats(user.id).await.unwrap(), 1);

    let history = store.find_by_user_id(user.id, 50).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, current.id);
}

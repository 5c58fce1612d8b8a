use async_trait::async_trait;
use chatquota::stores::{PgSubscriptionStore, PgUserStore, SubscriptionStore, UserStore};
use chatquota::subscriptions::{
    BillingCycle, NewBundle, PaymentProcessor, SubscriptionService, Tier,
};
use chatquota::users::NewUser;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

// key: renewal-sweep-tests -> lifecycle transitions against real rows

struct ScriptedPayments {
    outcomes: Mutex<VecDeque<bool>>,
}

impl ScriptedPayments {
    fn new(outcomes: impl IntoIterator<Item = bool>) -> Self {
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

async fn seed_due_bundle(pool: &PgPool, store: &PgSubscriptionStore, email: &str) -> uuid::Uuid {
    let user = PgUserStore::new(pool.clone())
        .create(NewUser {
            email: email.into(),
            name: "Sweep Test".into(),
            password_hash: "hashed".into(),
        })
        .await
        .unwrap();

    let bundle = store
        .save(NewBundle::purchase(
            user.id,
            Tier::Pro,
            BillingCycle::Monthly,
            true,
            Utc::now(),
        ))
        .await
        .unwrap();
    sqlx::query(
        "UPDATE subscription_bundles SET renewal_date = NOW() - INTERVAL '1 day', used_messages = 40 WHERE id = $1",
    )
    .bind(bundle.id)
    .execute(pool)
    .await
    .unwrap();
    bundle.id
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn sweep_renews_due_bundle(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    let store = PgSubscriptionStore::new(pool.clone());
    let bundle_id = seed_due_bundle(&pool, &store, "sweep-renew@example.com").await;

    let before = store.find_by_id(bundle_id).await.unwrap().unwrap();
    let service = SubscriptionService::new(
        Arc::new(store.clone()),
        Arc::new(PgUserStore::new(pool.clone())),
        Arc::new(ScriptedPayments::new([true])),
    );
    service.renew_subscriptions(Utc::now()).await.unwrap();

    let renewed = store.find_by_id(bundle_id).await.unwrap().unwrap();
    assert!(renewed.active);
    assert_eq!(renewed.used_messages, 0);
    assert_eq!(renewed.end_date, before.billing_cycle.advance(before.end_date));
    assert_eq!(renewed.renewal_date, Some(renewed.end_date));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn sweep_deactivates_bundle_when_payment_declines(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    let store = PgSubscriptionStore::new(pool.clone());
    let bundle_id = seed_due_bundle(&pool, &store, "sweep-decline@example.com").await;

    let service = SubscriptionService::new(
        Arc::new(store.clone()),
        Arc::new(PgUserStore::new(pool.clone())),
        Arc::new(ScriptedPayments::new([false])),
    );
    service.renew_subscriptions(Utc::now()).await.unwrap();

    let lapsed = store.find_by_id(bundle_id).await.unwrap().unwrap();
    assert!(!lapsed.active);
    assert!(!lapsed.auto_renew);
}

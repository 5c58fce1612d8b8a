use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::stores::{SubscriptionStore, UserStore};

use super::models::{BillingCycle, NewBundle, SubscriptionBundle, Tier};
use super::payments::PaymentProcessor;

/// key: subscription-lifecycle -> purchase,cancel,renewal sweep
pub struct SubscriptionService {
    subscriptions: Arc<dyn SubscriptionStore>,
    users: Arc<dyn UserStore>,
    payments: Arc<dyn PaymentProcessor>,
    // Held for the duration of a sweep so only one instance runs at a time.
    sweep_gate: tokio::sync::Mutex<()>,
}

impl SubscriptionService {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        users: Arc<dyn UserStore>,
        payments: Arc<dyn PaymentProcessor>,
    ) -> Self {
        Self {
            subscriptions,
            users,
            payments,
            sweep_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub async fn create_bundle(
        &self,
        user_id: Uuid,
        tier: Tier,
        billing_cycle: BillingCycle,
        auto_renew: bool,
    ) -> AppResult<SubscriptionBundle> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AppError::UserNotFound);
        }

        if !self.payments.charge().await {
            return Err(AppError::PaymentFailed);
        }

        let bundle = NewBundle::purchase(user_id, tier, billing_cycle, auto_renew, Utc::now());
        self.subscriptions.save(bundle).await
    }

    pub async fn get_user_subscriptions(
        &self,
        user_id: Uuid,
    ) -> AppResult<Vec<SubscriptionBundle>> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AppError::UserNotFound);
        }
        self.subscriptions.get_active_bundles(user_id).await
    }

    pub async fn toggle_auto_renew(&self, bundle_id: Uuid, auto_renew: bool) -> AppResult<()> {
        if self.subscriptions.find_by_id(bundle_id).await?.is_none() {
            return Err(AppError::SubscriptionNotFound);
        }
        self.subscriptions
            .update_auto_renew(bundle_id, auto_renew)
            .await
    }

    /// Stops renewal but leaves the bundle usable through the current period.
    pub async fn cancel_bundle(&self, bundle_id: Uuid) -> AppResult<()> {
        if self.subscriptions.find_by_id(bundle_id).await?.is_none() {
            return Err(AppError::SubscriptionNotFound);
        }
        self.subscriptions.cancel_at_period_end(bundle_id).await
    }

    /// Batch renewal sweep. Each bundle is settled independently: a declined
    /// payment or a storage error deactivates that bundle and the sweep moves
    /// on. Skips entirely if another sweep is still in flight.
    pub async fn renew_subscriptions(&self, now: DateTime<Utc>) -> AppResult<()> {
        let Ok(_running) = self.sweep_gate.try_lock() else {
            info!("renewal sweep already running, skipping");
            return Ok(());
        };

        let renewable = self.subscriptions.get_renewable_bundles(now).await?;
        info!(candidates = renewable.len(), "renewal sweep started");

        for bundle in renewable {
            match self.renew_one(&bundle).await {
                Ok(new_end_date) => info!(
                    bundle = %bundle.id,
                    user = %bundle.user_id,
                    %new_end_date,
                    "subscription renewed"
                ),
                Err(err) => {
                    warn!(?err, bundle = %bundle.id, "renewal failed, deactivating bundle");
                    if let Err(err) = self.subscriptions.mark_inactive(bundle.id).await {
                        warn!(?err, bundle = %bundle.id, "failed to deactivate bundle");
                    }
                }
            }
        }

        Ok(())
    }

    async fn renew_one(&self, bundle: &SubscriptionBundle) -> AppResult<DateTime<Utc>> {
        if !self.payments.charge().await {
            return Err(AppError::PaymentFailed);
        }
        // The new period extends the old one, even if the renewal ran late.
        let new_end_date = bundle.billing_cycle.advance(bundle.end_date);
        self.subscriptions.renew(bundle.id, new_end_date).await?;
        Ok(new_end_date)
    }
}

use axum::extract::{Extension, Path};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::AppResult;
use crate::extractor::AuthUser;
use crate::response::{ok, Envelope};

use super::models::{BillingCycle, SubscriptionBundle, Tier};
use super::service::SubscriptionService;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub tier: Tier,
    pub billing_cycle: BillingCycle,
    #[serde(default)]
    pub auto_renew: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleAutoRenewRequest {
    pub auto_renew: bool,
}

pub async fn create(
    Extension(service): Extension<Arc<SubscriptionService>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(payload): Json<CreateSubscriptionRequest>,
) -> AppResult<Json<Envelope<SubscriptionBundle>>> {
    let bundle = service
        .create_bundle(
            user_id,
            payload.tier,
            payload.billing_cycle,
            payload.auto_renew.unwrap_or(true),
        )
        .await?;
    Ok(ok(bundle))
}

pub async fn list(
    Extension(service): Extension<Arc<SubscriptionService>>,
    AuthUser { user_id, .. }: AuthUser,
) -> AppResult<Json<Envelope<Vec<SubscriptionBundle>>>> {
    let bundles = service.get_user_subscriptions(user_id).await?;
    Ok(ok(bundles))
}

pub async fn toggle_auto_renew(
    Extension(service): Extension<Arc<SubscriptionService>>,
    AuthUser { .. }: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ToggleAutoRenewRequest>,
) -> AppResult<Json<Envelope<Value>>> {
    service.toggle_auto_renew(id, payload.auto_renew).await?;
    let state = if payload.auto_renew { "enabled" } else { "disabled" };
    Ok(ok(json!({ "message": format!("Auto-renew {state}") })))
}

pub async fn cancel(
    Extension(service): Extension<Arc<SubscriptionService>>,
    AuthUser { .. }: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<Value>>> {
    service.cancel_bundle(id).await?;
    Ok(ok(json!({ "message": "Subscription cancelled successfully" })))
}

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// key: subscription-models -> tiers,cycles,bundles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Basic,
    Pro,
    Enterprise,
}

impl Tier {
    /// Message quota per billing period; -1 means unlimited.
    pub fn max_messages(&self) -> i32 {
        match self {
            Tier::Basic => 10,
            Tier::Pro => 100,
            Tier::Enterprise => -1,
        }
    }

    /// Fixed price table in cents. Yearly prices carry a baked-in discount
    /// rather than scaling the monthly price by twelve.
    pub fn price_cents(&self, cycle: BillingCycle) -> i32 {
        match (self, cycle) {
            (Tier::Basic, BillingCycle::Monthly) => 999,
            (Tier::Basic, BillingCycle::Yearly) => 9_999,
            (Tier::Pro, BillingCycle::Monthly) => 2_999,
            (Tier::Pro, BillingCycle::Yearly) => 29_999,
            (Tier::Enterprise, BillingCycle::Monthly) => 9_999,
            (Tier::Enterprise, BillingCycle::Yearly) => 99_999,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Basic => "BASIC",
            Tier::Pro => "PRO",
            Tier::Enterprise => "ENTERPRISE",
        }
    }

    pub fn parse(value: &str) -> Option<Tier> {
        match value {
            "BASIC" => Some(Tier::Basic),
            "PRO" => Some(Tier::Pro),
            "ENTERPRISE" => Some(Tier::Enterprise),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BillingCycle {
    Monthly,
    Yearly,
}

impl BillingCycle {
    /// Calendar arithmetic: a cycle always advances by whole months.
    pub fn advance(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        let months = match self {
            BillingCycle::Monthly => Months::new(1),
            BillingCycle::Yearly => Months::new(12),
        };
        from.checked_add_months(months).unwrap_or(from)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "MONTHLY",
            BillingCycle::Yearly => "YEARLY",
        }
    }

    pub fn parse(value: &str) -> Option<BillingCycle> {
        match value {
            "MONTHLY" => Some(BillingCycle::Monthly),
            "YEARLY" => Some(BillingCycle::Yearly),
            _ => None,
        }
    }
}

/// A purchased grant of message quota for a fixed period. Snapshots read from
/// the store are immutable; all mutation goes through store operations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionBundle {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tier: Tier,
    pub max_messages: i32,
    pub used_messages: i32,
    pub price_cents: i32,
    pub billing_cycle: BillingCycle,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub renewal_date: Option<DateTime<Utc>>,
    pub auto_renew: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionBundle {
    pub fn has_remaining_messages(&self) -> bool {
        self.max_messages == -1 || self.used_messages < self.max_messages
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.end_date
    }

    pub fn needs_renewal(&self, now: DateTime<Utc>) -> bool {
        self.auto_renew && matches!(self.renewal_date, Some(renewal) if now >= renewal)
    }
}

#[derive(Debug, Clone)]
pub struct NewBundle {
    pub user_id: Uuid,
    pub tier: Tier,
    pub max_messages: i32,
    pub used_messages: i32,
    pub price_cents: i32,
    pub billing_cycle: BillingCycle,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub renewal_date: Option<DateTime<Utc>>,
    pub auto_renew: bool,
    pub active: bool,
}

impl NewBundle {
    /// Builds the row for a freshly purchased bundle: period starts now, the
    /// renewal date coincides with the period end.
    pub fn purchase(
        user_id: Uuid,
        tier: Tier,
        billing_cycle: BillingCycle,
        auto_renew: bool,
        now: DateTime<Utc>,
    ) -> Self {
        let end_date = billing_cycle.advance(now);
        NewBundle {
            user_id,
            tier,
            max_messages: tier.max_messages(),
            used_messages: 0,
            price_cents: tier.price_cents(billing_cycle),
            billing_cycle,
            start_date: now,
            end_date,
            renewal_date: Some(end_date),
            auto_renew,
            active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bundle(max: i32, used: i32) -> SubscriptionBundle {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        SubscriptionBundle {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            tier: Tier::Pro,
            max_messages: max,
            used_messages: used,
            price_cents: 2_999,
            billing_cycle: BillingCycle::Monthly,
            start_date: now,
            end_date: BillingCycle::Monthly.advance(now),
            renewal_date: Some(BillingCycle::Monthly.advance(now)),
            auto_renew: true,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn unlimited_bundle_always_has_capacity() {
        let mut unlimited = bundle(-1, 0);
        unlimited.used_messages = 1_000_000;
        assert!(unlimited.has_remaining_messages());
    }

    #[test]
    fn capacity_exhausts_at_max() {
        assert!(bundle(100, 99).has_remaining_messages());
        assert!(!bundle(100, 100).has_remaining_messages());
    }

    #[test]
    fn expiry_is_strictly_after_end_date() {
        let b = bundle(10, 0);
        assert!(!b.is_expired(b.end_date));
        assert!(b.is_expired(b.end_date + chrono::Duration::seconds(1)));
    }

    #[test]
    fn renewal_requires_auto_renew_and_due_date() {
        let mut b = bundle(10, 0);
        let due = b.renewal_date.unwrap();
        assert!(b.needs_renewal(due));
        assert!(!b.needs_renewal(due - chrono::Duration::seconds(1)));

        b.auto_renew = false;
        assert!(!b.needs_renewal(due));

        b.auto_renew = true;
        b.renewal_date = None;
        assert!(!b.needs_renewal(due));
    }

    #[test]
    fn yearly_purchase_uses_discounted_price_table() {
        let now = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
        let b = NewBundle::purchase(Uuid::new_v4(), Tier::Pro, BillingCycle::Yearly, true, now);
        assert_eq!(b.max_messages, 100);
        assert_eq!(b.price_cents, 29_999);
        assert_eq!(b.end_date, Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap());
        assert_eq!(b.renewal_date, Some(b.end_date));
        assert!(b.active);
        assert_eq!(b.used_messages, 0);
    }

    #[test]
    fn month_end_purchase_clamps_to_valid_date() {
        // Jan 31 + 1 month lands on Feb 29 in a leap year.
        let now = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
        let b = NewBundle::purchase(Uuid::new_v4(), Tier::Basic, BillingCycle::Monthly, true, now);
        assert_eq!(b.end_date, Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap());
    }
}

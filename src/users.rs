use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use uuid::Uuid;

/// key: user-model -> identity plus free-tier bookkeeping
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub free_messages_used: i32,
    pub free_messages_reset_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The free allowance resets on calendar month boundaries: any difference
    /// between the reset date's month/year and now means a rollover is due.
    pub fn needs_free_message_reset(&self, now: DateTime<Utc>) -> bool {
        let reset = self.free_messages_reset_date;
        (now.year(), now.month()) != (reset.year(), reset.month())
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Months, TimeZone};

    fn user(reset: DateTime<Utc>) -> User {
        User {
            id: Uuid::new_v4(),
            email: "user@example.com".into(),
            name: "User".into(),
            password_hash: "hashed".into(),
            free_messages_used: 2,
            free_messages_reset_date: reset,
            created_at: reset,
            updated_at: reset,
        }
    }

    #[test]
    fn reset_due_after_month_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        let last_month = now.checked_sub_months(Months::new(1)).unwrap();
        assert!(user(last_month).needs_free_message_reset(now));
    }

    #[test]
    fn reset_not_due_within_same_month() {
        let now = Utc.with_ymd_and_hms(2024, 3, 28, 12, 0, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert!(!user(earlier).needs_free_message_reset(now));
    }

    #[test]
    fn reset_due_across_year_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let december = Utc.with_ymd_and_hms(2023, 12, 30, 0, 0, 0).unwrap();
        assert!(user(december).needs_free_message_reset(now));
    }
}

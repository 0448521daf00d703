use chrono::{DateTime, Months, Utc};
use escudos_types::GrantSource;
use serde::{Deserialize, Serialize};

/// Business rule that assigns each grant its expiry.
///
/// Windows are calendar months, not fixed day counts, to line up with
/// billing cycles. When the target month is shorter, the day clamps to the
/// month's end (2024-02-29 + 12 months = 2025-02-28).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryPolicy {
    pub subscription_validity_months: u32,
    pub manual_validity_months: Option<u32>,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            subscription_validity_months: 12,
            manual_validity_months: None,
        }
    }
}

impl ExpiryPolicy {
    /// Expiry of a grant from `source` issued at `issued_at`; `None` = never.
    pub fn compute_expiry(
        &self,
        source: GrantSource,
        issued_at: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let months = match source {
            GrantSource::Subscription => Some(self.subscription_validity_months),
            GrantSource::Manual => self.manual_validity_months,
        }?;
        if months == 0 {
            return None;
        }
        issued_at.checked_add_months(Months::new(months))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap()
    }

    #[test]
    fn subscription_expires_after_twelve_calendar_months() {
        let policy = ExpiryPolicy::default();
        assert_eq!(
            policy.compute_expiry(GrantSource::Subscription, at(2024, 1, 10)),
            Some(at(2025, 1, 10))
        );
    }

    #[test]
    fn calendar_arithmetic_is_not_365_days() {
        let policy = ExpiryPolicy::default();
        // 2024 is a leap year: 366 days separate these dates.
        let expiry = policy
            .compute_expiry(GrantSource::Subscription, at(2024, 1, 1))
            .unwrap();
        assert_eq!(expiry, at(2025, 1, 1));
        assert_eq!((expiry - at(2024, 1, 1)).num_days(), 366);
    }

    #[test]
    fn leap_day_clamps_to_month_end() {
        let policy = ExpiryPolicy::default();
        assert_eq!(
            policy.compute_expiry(GrantSource::Subscription, at(2024, 2, 29)),
            Some(at(2025, 2, 28))
        );
    }

    #[test]
    fn manual_never_expires_by_default() {
        let policy = ExpiryPolicy::default();
        assert_eq!(policy.compute_expiry(GrantSource::Manual, at(2024, 1, 10)), None);
    }

    #[test]
    fn manual_window_is_configurable() {
        let policy = ExpiryPolicy {
            manual_validity_months: Some(6),
            ..Default::default()
        };
        assert_eq!(
            policy.compute_expiry(GrantSource::Manual, at(2024, 1, 10)),
            Some(at(2024, 7, 10))
        );
    }

    #[test]
    fn expiry_is_always_after_issuance() {
        let policy = ExpiryPolicy {
            subscription_validity_months: 1,
            manual_validity_months: Some(1),
        };
        for source in GrantSource::ALL {
            let issued = at(2024, 1, 31);
            let expiry = policy.compute_expiry(source, issued).unwrap();
            assert!(expiry > issued);
        }
    }
}

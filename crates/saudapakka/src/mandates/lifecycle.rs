//! Pure timer arithmetic for the mandate lifecycle. These used to live in
//! save-time hooks in an earlier incarnation of the platform; keeping them as
//! free functions lets transitions compute dependent fields before commit.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

/// Window for the counterparty to sign before a pending mandate auto-expires.
pub const ACCEPTANCE_WINDOW_DAYS: i64 = 7;

/// How long an activated mandate remains in force.
pub const VALIDITY_WINDOW_DAYS: i64 = 90;

/// Deadline for counterparty signature, fixed at creation and never
/// recomputed.
pub fn acceptance_deadline(created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + Duration::days(ACCEPTANCE_WINDOW_DAYS)
}

/// End of the validity window once a mandate activates.
pub fn validity_end(start_date: NaiveDate) -> NaiveDate {
    start_date + Duration::days(VALIDITY_WINDOW_DAYS)
}

/// Whole days left before `end_date`, clamped at zero.
pub fn days_remaining(end_date: NaiveDate, today: NaiveDate) -> i64 {
    (end_date - today).num_days().max(0)
}

/// Counts from one expiry sweep pass. Applying the sweep twice in a row
/// yields a second report of zeros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub pending_expired: usize,
    pub active_expired: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.pending_expired + self.active_expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn acceptance_deadline_is_seven_days_out() {
        let created = Utc.with_ymd_and_hms(2025, 11, 3, 9, 30, 0).unwrap();
        let deadline = acceptance_deadline(created);
        assert_eq!(deadline - created, Duration::days(7));
    }

    #[test]
    fn validity_end_is_ninety_days_after_start() {
        let start = NaiveDate::from_ymd_opt(2025, 11, 10).expect("valid date");
        let end = validity_end(start);
        assert_eq!((end - start).num_days(), 90);
    }

    #[test]
    fn days_remaining_clamps_at_zero() {
        let end = NaiveDate::from_ymd_opt(2025, 11, 10).expect("valid date");
        let after = NaiveDate::from_ymd_opt(2025, 12, 1).expect("valid date");
        assert_eq!(days_remaining(end, after), 0);

        let before = NaiveDate::from_ymd_opt(2025, 11, 1).expect("valid date");
        assert_eq!(days_remaining(end, before), 9);
    }
}

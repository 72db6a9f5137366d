//! Per-account lockout policy.
//!
//! Two states, Active and Locked. The transition back to Active is purely
//! time-based: a `lock_until` in the past means Active, with no unlock write
//! required. The transition to Locked happens when a recorded failure brings
//! the consecutive-failure count to the threshold; the store performs that
//! increment-and-lock atomically, this type only holds the parameters and
//! the read-side evaluation.

use chrono::{DateTime, Utc};

#[derive(Clone, Copy, Debug)]
pub struct LockoutPolicy {
    threshold: i32,
    lock_seconds: i64,
}

impl LockoutPolicy {
    #[must_use]
    pub fn new(threshold: i32, lock_seconds: i64) -> Self {
        Self {
            threshold,
            lock_seconds,
        }
    }

    #[must_use]
    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    #[must_use]
    pub fn lock_seconds(&self) -> i64 {
        self.lock_seconds
    }

    /// Read-side evaluation: locked only while `lock_until` is in the future.
    #[must_use]
    pub fn is_locked(&self, lock_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        lock_until.is_some_and(|until| until > now)
    }
}

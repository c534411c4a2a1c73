use chrono::{DateTime, TimeDelta, Utc};

/// Default staleness window, in minutes.
pub const DEFAULT_WINDOW_MINUTES: u32 = 30;

/// `true` iff `updated_at` is strictly earlier than `now - window`. A record
/// exactly one window old is still fresh.
pub fn is_stale(updated_at: DateTime<Utc>, now: DateTime<Utc>, window: TimeDelta) -> bool {
    now.checked_sub_signed(window)
        .is_some_and(|edge| updated_at < edge)
}

/// Decides whether a stored observation may be served as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    window: TimeDelta,
}

impl FreshnessPolicy {
    pub fn new(window: TimeDelta) -> Self {
        Self { window }
    }

    pub fn from_minutes(minutes: u32) -> Self {
        Self::new(TimeDelta::minutes(i64::from(minutes)))
    }

    pub fn window(&self) -> TimeDelta {
        self.window
    }

    pub fn is_stale(&self, updated_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        is_stale(updated_at, now, self.window)
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::from_minutes(DEFAULT_WINDOW_MINUTES)
    }
}

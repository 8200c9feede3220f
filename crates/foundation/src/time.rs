use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub const MS_PER_HOUR: i64 = 60 * 60 * 1000;

    pub fn from_millis(ms: i64) -> Self {
        Timestamp(ms)
    }

    pub fn millis(self) -> i64 {
        self.0
    }

    /// Milliseconds elapsed from `self` to `now`; negative if `self` is in the future.
    pub fn age_at(self, now: Timestamp) -> i64 {
        now.0.saturating_sub(self.0)
    }
}

/// Non-negative duration in milliseconds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ttl(pub i64);

impl Ttl {
    pub fn hours(h: i64) -> Self {
        Ttl(h.saturating_mul(Timestamp::MS_PER_HOUR).max(0))
    }

    pub fn millis(self) -> i64 {
        self.0
    }
}

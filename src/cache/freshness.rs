//! Artifact freshness policy
//!
//! Pure age arithmetic, no I/O. Callers with no artifact at all must treat
//! freshness as undefined and regenerate.

use chrono::{DateTime, Duration, Utc};

/// Maximum artifact age before regeneration is required
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessWindow(Duration);

impl FreshnessWindow {
    /// Window of the given number of hours
    pub fn hours(hours: i64) -> Self {
        Self(Duration::hours(hours))
    }

    /// Window from an arbitrary duration
    pub fn from_duration(duration: Duration) -> Self {
        Self(duration)
    }

    /// The underlying duration
    pub fn duration(&self) -> Duration {
        self.0
    }
}

impl Default for FreshnessWindow {
    fn default() -> Self {
        Self::hours(24)
    }
}

/// Whether an artifact generated at `created_at` is still fresh at `now`
///
/// Strict inequality: an artifact exactly one window old is stale.
pub fn is_fresh(created_at: DateTime<Utc>, now: DateTime<Utc>, window: FreshnessWindow) -> bool {
    now.signed_duration_since(created_at) < window.0
}

//! Signal detector staleness windows.

use serde::{Deserialize, Serialize};

const fn default_hold_days() -> i64 {
    60
}

const fn default_review_stall_days() -> i64 {
    180
}

const fn default_stale_days() -> i64 {
    730
}

const fn default_recent_activity_days() -> i64 {
    365
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignalConfig {
    /// Days a permit may sit on hold before review comments count as
    /// unresolved.
    #[serde(default = "default_hold_days")]
    pub hold_days: i64,

    /// Days a review may stay open before it counts as stalled.
    #[serde(default = "default_review_stall_days")]
    pub review_stall_days: i64,

    /// Days without movement before an issued permit counts as stale.
    #[serde(default = "default_stale_days")]
    pub stale_days: i64,

    /// Window for "recent related activity" on the same property.
    #[serde(default = "default_recent_activity_days")]
    pub recent_activity_days: i64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            hold_days: default_hold_days(),
            review_stall_days: default_review_stall_days(),
            stale_days: default_stale_days(),
            recent_activity_days: default_recent_activity_days(),
        }
    }
}

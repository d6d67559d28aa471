//! Network anomaly detector tuning.

use serde::{Deserialize, Serialize};

const fn default_volume_median_multiple() -> f64 {
    3.0
}

const fn default_concentration_share() -> f64 {
    0.5
}

const fn default_geographic_share() -> f64 {
    0.8
}

const fn default_min_permits() -> u32 {
    5
}

const fn default_fast_approval_cost() -> f64 {
    100_000.0
}

const fn default_fast_approval_days() -> i64 {
    7
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnomalyConfig {
    /// Volume check: flag entities whose permit count exceeds this multiple
    /// of the median for their kind.
    #[serde(default = "default_volume_median_multiple")]
    pub volume_median_multiple: f64,

    /// Concentration check: flag when one inspector handles at least this
    /// share of an entity's inspected permits.
    #[serde(default = "default_concentration_share")]
    pub concentration_share: f64,

    /// Geographic check: flag when at least this share of an entity's
    /// permits fall in one neighborhood.
    #[serde(default = "default_geographic_share")]
    pub geographic_share: f64,

    /// Floor below which the concentration and geographic checks stay quiet;
    /// ratios over tiny samples are noise.
    #[serde(default = "default_min_permits")]
    pub min_permits: u32,

    /// Fast-approval check: cost threshold in dollars.
    #[serde(default = "default_fast_approval_cost")]
    pub fast_approval_cost: f64,

    /// Fast-approval check: filed-to-approved window in days.
    #[serde(default = "default_fast_approval_days")]
    pub fast_approval_days: i64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            volume_median_multiple: default_volume_median_multiple(),
            concentration_share: default_concentration_share(),
            geographic_share: default_geographic_share(),
            min_permits: default_min_permits(),
            fast_approval_cost: default_fast_approval_cost(),
            fast_approval_days: default_fast_approval_days(),
        }
    }
}

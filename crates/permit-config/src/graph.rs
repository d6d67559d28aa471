//! Relationship graph tuning.

use serde::{Deserialize, Serialize};

const fn default_permit_ref_cap() -> usize {
    20
}

const fn default_max_ego_hops() -> u32 {
    4
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphConfig {
    /// Maximum permit references sampled onto one edge row.
    #[serde(default = "default_permit_ref_cap")]
    pub permit_ref_cap: usize,

    /// Upper bound on ego-network expansion depth accepted from consumers.
    #[serde(default = "default_max_ego_hops")]
    pub max_ego_hops: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            permit_ref_cap: default_permit_ref_cap(),
            max_ego_hops: default_max_ego_hops(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = GraphConfig::default();
        assert_eq!(config.permit_ref_cap, 20);
        assert_eq!(config.max_ego_hops, 4);
    }
}

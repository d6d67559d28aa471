//! Entity resolver tuning.

use serde::{Deserialize, Serialize};

const fn default_fuzzy_threshold() -> f64 {
    0.75
}

/// Relaxed threshold for trade roles, where cross-feed naming variance is
/// historically higher. Tuning, not law; override via config if the error
/// rate on a city's data says otherwise.
const fn default_trade_fuzzy_threshold() -> f64 {
    0.67
}

const fn default_blocking_prefix_len() -> usize {
    3
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Token-set Jaccard similarity required to merge two contacts.
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,

    /// Threshold used when either contact carries a trade role.
    #[serde(default = "default_trade_fuzzy_threshold")]
    pub trade_fuzzy_threshold: f64,

    /// Length of the normalized-name prefix used as the blocking key.
    #[serde(default = "default_blocking_prefix_len")]
    pub blocking_prefix_len: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: default_fuzzy_threshold(),
            trade_fuzzy_threshold: default_trade_fuzzy_threshold(),
            blocking_prefix_len: default_blocking_prefix_len(),
        }
    }
}

//! Database configuration.
//!
//! The engine runs against libSQL in two modes: a local embedded file during
//! development, or an embedded replica synced against a networked Turso
//! database in production. The remote fields are optional; when absent the
//! engine stays local-only.

use serde::{Deserialize, Serialize};

fn default_path() -> String {
    "permitgraph.db".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Local database path (or local replica path in synced mode).
    #[serde(default = "default_path")]
    pub path: String,

    /// Remote database URL (e.g., `libsql://permits.turso.io`). Empty means
    /// local-only.
    #[serde(default)]
    pub url: String,

    /// Auth token for the remote database.
    #[serde(default)]
    pub auth_token: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            url: String::new(),
            auth_token: String::new(),
        }
    }
}

impl DatabaseConfig {
    /// Whether remote sync is configured.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        !self.url.is_empty() && !self.auth_token.is_empty()
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Redis URL for the shared redemption store. When absent, the server
    /// runs on the process-local store (volatile across restarts).
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Seconds a redeemed token stays locked before its window reopens.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    /// Set to "production" for JSON logging, anything else for human-readable.
    #[serde(default)]
    pub env: String,
    /// Sentry DSN for error tracking
    #[serde(default)]
    pub sentry_dsn: Option<String>,
}

fn default_token_ttl_secs() -> u64 {
    300
}

impl Config {
    pub fn is_production(&self) -> bool {
        self.env == "production"
    }
}

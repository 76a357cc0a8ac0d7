//! Engine configuration loaded from `.env`.

use serde::{Deserialize, Serialize};

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_gather_timeout() -> u32 {
    8
}

/// Configuration the conversation engine needs to build call-control
/// directives: where the provider should call back, and how long it waits
/// for speech before giving up on a gather.
///
/// | Env | Default | Description |
/// |-----|---------|-------------|
/// | VISHDRILL_BASE_URL | http://localhost:8000 | Public base URL for webhook callbacks. |
/// | VISHDRILL_GATHER_TIMEOUT_SECS | 8 | Provider-side silence timeout for speech capture. |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_gather_timeout")]
    pub gather_timeout_secs: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            gather_timeout_secs: default_gather_timeout(),
        }
    }
}

impl EngineConfig {
    /// Load from environment. Unset or invalid values fall back to defaults.
    pub fn from_env() -> Self {
        let base_url = std::env::var("VISHDRILL_BASE_URL")
            .ok()
            .map(|v| v.trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_base_url);
        let gather_timeout_secs = std::env::var("VISHDRILL_GATHER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_else(default_gather_timeout);
        Self {
            base_url,
            gather_timeout_secs,
        }
    }

    pub fn gather_action_url(&self) -> String {
        format!("{}/api/call/webhook/gather", self.base_url)
    }

    pub fn start_webhook_url(&self) -> String {
        format!("{}/api/call/webhook/start", self.base_url)
    }

    pub fn status_webhook_url(&self) -> String {
        format!("{}/api/call/webhook/status", self.base_url)
    }
}

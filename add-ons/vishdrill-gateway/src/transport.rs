//! Outbound telephony transport: Twilio REST when credentials are present,
//! a logging placeholder otherwise so the gateway runs end-to-end in
//! development without an account.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};
use vishdrill_core::{CallTransport, CoreError, CoreResult};

/// Twilio credentials loaded from the environment.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

impl TwilioConfig {
    /// Requires TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN, TWILIO_PHONE_NUMBER.
    pub fn from_env() -> Result<Self, String> {
        let var = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| format!("{name} not set"))
        };
        Ok(Self {
            account_sid: var("TWILIO_ACCOUNT_SID")?,
            auth_token: var("TWILIO_AUTH_TOKEN")?,
            from_number: var("TWILIO_PHONE_NUMBER")?,
        })
    }
}

/// Places calls through the Twilio REST API.
pub struct TwilioTransport {
    client: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioTransport {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn from_env() -> Result<Self, String> {
        Ok(Self::new(TwilioConfig::from_env()?))
    }
}

#[async_trait]
impl CallTransport for TwilioTransport {
    async fn place_call(
        &self,
        to: &str,
        webhook_url: &str,
        status_callback_url: &str,
    ) -> CoreResult<String> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Calls.json",
            self.config.account_sid
        );
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", to),
                ("From", self.config.from_number.as_str()),
                ("Url", webhook_url),
                ("StatusCallback", status_callback_url),
                ("Method", "POST"),
            ])
            .send()
            .await
            .map_err(|e| CoreError::Transport(format!("create call request failed: {e}")))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CoreError::Transport(format!("create call response unreadable: {e}")))?;
        if !status.is_success() {
            return Err(CoreError::Transport(format!(
                "create call rejected ({status}): {}",
                body.get("message").and_then(|m| m.as_str()).unwrap_or("?")
            )));
        }
        body.get("sid")
            .and_then(|s| s.as_str())
            .map(String::from)
            .ok_or_else(|| CoreError::Transport("create call response missing sid".to_string()))
    }
}

/// Stand-in transport for local development: logs the dial and fabricates a
/// call sid. The webhook flow can then be driven by hand (curl) or tests.
pub struct PlaceholderTransport;

#[async_trait]
impl CallTransport for PlaceholderTransport {
    async fn place_call(
        &self,
        to: &str,
        webhook_url: &str,
        _status_callback_url: &str,
    ) -> CoreResult<String> {
        let sid = format!("CA{}", uuid::Uuid::new_v4().simple());
        info!(
            target: "vishdrill::transport",
            to = %to,
            webhook = %webhook_url,
            sid = %sid,
            "placeholder transport: no call actually placed"
        );
        Ok(sid)
    }
}

/// Twilio when configured, placeholder otherwise.
pub fn create_transport() -> Arc<dyn CallTransport> {
    match TwilioTransport::from_env() {
        Ok(t) => {
            info!(target: "vishdrill::transport", "transport: Twilio REST");
            Arc::new(t)
        }
        Err(reason) => {
            warn!(
                target: "vishdrill::transport",
                "transport: placeholder ({reason}); set TWILIO_* env vars to place real calls"
            );
            Arc::new(PlaceholderTransport)
        }
    }
}

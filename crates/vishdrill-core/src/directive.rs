//! Call-control directives: what the engine tells the telephony provider to
//! do next. The gateway renders these to the provider's XML dialect; the
//! engine itself stays transport-agnostic.

use serde::{Deserialize, Serialize};

/// One instruction in a call-control document, executed in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DirectiveStep {
    /// Play pre-generated audio from a URL.
    Play { url: String },
    /// Speak the text with the provider's built-in synthesis.
    Say { text: String },
    /// Capture and transcribe the callee's speech, posting the result to
    /// `action`. `timeout_secs` is the provider-side silence timeout.
    GatherSpeech {
        #[serde(rename = "action_url")]
        action: String,
        timeout_secs: u32,
    },
    /// Re-invoke a webhook (the no-input fallback after a gather).
    Redirect { url: String },
    Pause { seconds: u32 },
    Hangup,
}

/// An ordered call-control instruction document, returned synchronously from
/// every webhook.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CallDirective {
    pub steps: Vec<DirectiveStep>,
}

impl CallDirective {
    pub fn new(steps: Vec<DirectiveStep>) -> Self {
        Self { steps }
    }

    /// Terminal apology document: say something safe, then hang up. Every
    /// failure path ends a call explicitly rather than leaving it open.
    pub fn say_and_hangup(text: &str) -> Self {
        Self::new(vec![
            DirectiveStep::Say {
                text: text.to_string(),
            },
            DirectiveStep::Hangup,
        ])
    }

    pub fn ends_call(&self) -> bool {
        self.steps.iter().any(|s| matches!(s, DirectiveStep::Hangup))
    }
}

//! Shared call-session types: status, events, transcript rows.
//!
//! These are the shapes the store persists and the gateway serializes back
//! out on the audit surface, so everything here derives Serialize.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a call session.
///
/// Mirrors the provider's status callback vocabulary; `from_provider` maps
/// every provider string onto exactly one variant, with `Failed` as the
/// fallback for anything unrecognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Initiated,
    Ringing,
    InProgress,
    Completed,
    Failed,
    NoAnswer,
    Busy,
}

impl CallStatus {
    /// Map a provider status-callback string onto the session status enum.
    /// Unrecognized strings map to `Failed`, never left unmapped.
    pub fn from_provider(raw: &str) -> Self {
        match raw {
            "initiated" => CallStatus::Initiated,
            "ringing" => CallStatus::Ringing,
            "in-progress" => CallStatus::InProgress,
            "completed" => CallStatus::Completed,
            "busy" => CallStatus::Busy,
            "no-answer" => CallStatus::NoAnswer,
            "failed" => CallStatus::Failed,
            _ => CallStatus::Failed,
        }
    }

    /// Statuses that stamp `ended_at` on the session. `Busy` is not one of
    /// them: a busy signal may be followed by a retry from the provider side.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CallStatus::Completed | CallStatus::Failed | CallStatus::NoAnswer
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CallStatus::Initiated => "initiated",
            CallStatus::Ringing => "ringing",
            CallStatus::InProgress => "in_progress",
            CallStatus::Completed => "completed",
            CallStatus::Failed => "failed",
            CallStatus::NoAnswer => "no_answer",
            CallStatus::Busy => "busy",
        }
    }
}

/// Kind of event in the per-call append-only log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    CallInitiated,
    CallAnswered,
    AttackerSpoke,
    CalleeSpoke,
    SensitiveDataDetected,
    CallEnded,
}

/// One entry in the append-only event log for a call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEvent {
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
}

impl CallEvent {
    pub fn new(event_type: EventType, data: serde_json::Value) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            data,
        }
    }
}

/// Who is speaking on a given script turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Attacker,
    Callee,
}

impl Speaker {
    pub fn as_str(self) -> &'static str {
        match self {
            Speaker::Attacker => "attacker",
            Speaker::Callee => "callee",
        }
    }
}

/// Durable state for one in-progress or completed scripted call.
///
/// `current_turn` is always the turn number of the most recently played
/// attacker line and never decreases over the session's life.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSession {
    pub call_sid: String,
    pub phone_number: String,
    pub scenario_id: String,
    pub status: CallStatus,
    pub current_turn: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl CallSession {
    pub fn new(call_sid: &str, phone_number: &str, scenario_id: &str) -> Self {
        Self {
            call_sid: call_sid.to_string(),
            phone_number: phone_number.to_string(),
            scenario_id: scenario_id.to_string(),
            status: CallStatus::Initiated,
            current_turn: 1,
            started_at: Utc::now(),
            ended_at: None,
        }
    }
}

/// One row of the per-call transcript, appended in the order the
/// conversation engine produces them (strictly turn-ordered).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub turn: u32,
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_status_mapping_covers_known_vocabulary() {
        assert_eq!(CallStatus::from_provider("initiated"), CallStatus::Initiated);
        assert_eq!(CallStatus::from_provider("ringing"), CallStatus::Ringing);
        assert_eq!(CallStatus::from_provider("in-progress"), CallStatus::InProgress);
        assert_eq!(CallStatus::from_provider("completed"), CallStatus::Completed);
        assert_eq!(CallStatus::from_provider("busy"), CallStatus::Busy);
        assert_eq!(CallStatus::from_provider("no-answer"), CallStatus::NoAnswer);
        assert_eq!(CallStatus::from_provider("failed"), CallStatus::Failed);
    }

    #[test]
    fn unknown_provider_status_falls_back_to_failed() {
        assert_eq!(CallStatus::from_provider("queued"), CallStatus::Failed);
        assert_eq!(CallStatus::from_provider(""), CallStatus::Failed);
    }

    #[test]
    fn busy_is_not_terminal() {
        assert!(CallStatus::Completed.is_terminal());
        assert!(CallStatus::NoAnswer.is_terminal());
        assert!(!CallStatus::Busy.is_terminal());
        assert!(!CallStatus::InProgress.is_terminal());
    }
}

//! The conversation engine: a webhook-driven state machine that advances a
//! scripted call one provider callback at a time.
//!
//! The engine keeps no state between requests; everything durable lives in
//! the [`SessionStore`]. Each webhook is answered synchronously with a
//! [`CallDirective`], and all waiting is expressed as "the provider will
//! call back", never as a held task.

use crate::config::EngineConfig;
use crate::detect::Detector;
use crate::directive::{CallDirective, DirectiveStep};
use crate::error::{CoreError, CoreResult};
use crate::model::{CallEvent, CallSession, CallStatus, EventType, Speaker};
use crate::scenario::ScenarioCatalog;
use crate::store::SessionStore;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Outbound dialing boundary. The real implementation talks to the telephony
/// provider's REST API; tests substitute a recording mock.
#[async_trait]
pub trait CallTransport: Send + Sync {
    /// Place an outbound call and return the provider's call sid. The
    /// provider will hit `webhook_url` when the call is answered and
    /// `status_callback_url` on status transitions.
    async fn place_call(
        &self,
        to: &str,
        webhook_url: &str,
        status_callback_url: &str,
    ) -> CoreResult<String>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceCallRequest {
    pub phone_number: String,
    #[serde(default = "default_scenario")]
    pub scenario_id: String,
}

fn default_scenario() -> String {
    "bank_fraud".to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaceCallResponse {
    pub call_sid: String,
    pub status: CallStatus,
    pub message: String,
}

static PHONE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?1?\d{10,15}$").unwrap());

/// Orchestrates scripted calls: consumes webhook notifications, reads and
/// writes the session store, runs the detector over callee speech, and
/// produces the next call-control instruction.
pub struct ConversationEngine {
    catalog: Arc<ScenarioCatalog>,
    store: Arc<SessionStore>,
    transport: Arc<dyn CallTransport>,
    detector: Detector,
    config: EngineConfig,
}

impl ConversationEngine {
    pub fn new(
        catalog: Arc<ScenarioCatalog>,
        store: Arc<SessionStore>,
        transport: Arc<dyn CallTransport>,
        detector: Detector,
        config: EngineConfig,
    ) -> Self {
        Self {
            catalog,
            store,
            transport,
            detector,
            config,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn catalog(&self) -> &ScenarioCatalog {
        &self.catalog
    }

    /// Place an outbound training call. Validation happens before any
    /// external side effect; if dialing fails after the pending-index write,
    /// the entry simply expires unused.
    pub async fn place_call(&self, request: &PlaceCallRequest) -> CoreResult<PlaceCallResponse> {
        if !PHONE_NUMBER.is_match(&request.phone_number) {
            return Err(CoreError::InvalidPhoneNumber(request.phone_number.clone()));
        }
        let scenario = self.catalog.get(&request.scenario_id)?;

        // The first webhook can fire before the session exists, so record
        // the scenario keyed by phone number first.
        self.store
            .record_pending_scenario(&request.phone_number, &request.scenario_id);

        let call_sid = self
            .transport
            .place_call(
                &request.phone_number,
                &self.config.start_webhook_url(),
                &self.config.status_webhook_url(),
            )
            .await?;

        self.store
            .create_session(&call_sid, &request.phone_number, &request.scenario_id);
        self.store.append_event(
            &call_sid,
            CallEvent::new(
                EventType::CallInitiated,
                json!({
                    "phone_number": request.phone_number,
                    "scenario_id": request.scenario_id,
                    "scenario_name": scenario.name,
                }),
            ),
        );
        info!(target: "vishdrill::engine", call_sid = %call_sid, scenario = %request.scenario_id, "call placed");

        Ok(PlaceCallResponse {
            call_sid,
            status: CallStatus::Initiated,
            message: format!("Call initiated to {}", request.phone_number),
        })
    }

    /// The call was answered: play the opening attacker line and start
    /// gathering the callee's reply.
    pub fn on_call_answered(&self, call_sid: &str, dialed_number: Option<&str>) -> CallDirective {
        let Some(session) = self.recover_session(call_sid, dialed_number) else {
            // No session and no pending index: nothing to log against.
            warn!(target: "vishdrill::engine", call_sid = %call_sid, "answered call has no session and no pending entry");
            return CallDirective::say_and_hangup("Sorry, there was an error. Goodbye.");
        };
        let Ok(scenario) = self.catalog.get(&session.scenario_id) else {
            return CallDirective::say_and_hangup("Sorry, this call is not configured properly.");
        };

        self.store.update_status(call_sid, CallStatus::InProgress);
        self.store.append_event(
            call_sid,
            CallEvent::new(EventType::CallAnswered, json!({ "call_sid": call_sid })),
        );

        let Some(first_line) = scenario.line_at(1, Speaker::Attacker) else {
            return CallDirective::say_and_hangup("Sorry, this call is not configured properly.");
        };

        let mut steps = Vec::new();
        self.push_play_or_say(&mut steps, &session.scenario_id, 1, &first_line.text);
        self.store.append_event(
            call_sid,
            CallEvent::new(
                EventType::AttackerSpoke,
                json!({ "turn": 1, "text": first_line.text }),
            ),
        );
        self.store
            .append_transcript(call_sid, 1, Speaker::Attacker, &first_line.text);
        self.push_gather(&mut steps);
        CallDirective::new(steps)
    }

    /// Speech was gathered (possibly empty on timeout): log the callee turn,
    /// scan it for disclosures, and play the next attacker line or wrap up.
    pub fn on_speech_gathered(
        &self,
        call_sid: &str,
        dialed_number: Option<&str>,
        speech: &str,
    ) -> CallDirective {
        let Some(session) = self.recover_session(call_sid, dialed_number) else {
            warn!(target: "vishdrill::engine", call_sid = %call_sid, "gather callback has no session and no pending entry");
            return CallDirective::say_and_hangup("Error occurred. Goodbye.");
        };
        let Ok(scenario) = self.catalog.get(&session.scenario_id) else {
            return CallDirective::say_and_hangup("Sorry, this call is not configured properly.");
        };
        let current_turn = session.current_turn;

        // Silence: re-prompt with the same line, advancing nothing.
        if speech.trim().is_empty() {
            let mut steps = Vec::new();
            match scenario.line_at(current_turn, Speaker::Attacker) {
                Some(line) => {
                    self.push_play_or_say(&mut steps, &session.scenario_id, current_turn, &line.text)
                }
                None => {
                    if let Some(url) = self
                        .store
                        .cached_audio_url(&session.scenario_id, current_turn)
                    {
                        steps.push(DirectiveStep::Play { url });
                    }
                }
            }
            self.push_gather(&mut steps);
            return CallDirective::new(steps);
        }

        let callee_turn = current_turn + 1;
        let next_attacker_turn = current_turn + 2;
        let next_line = scenario.line_at(next_attacker_turn, Speaker::Attacker);

        // Claim the turn advance before logging anything, so an overlapping
        // duplicate callback is rejected instead of double-counting the turn.
        if next_line.is_some()
            && !self
                .store
                .advance_turn_if(call_sid, current_turn, next_attacker_turn)
        {
            warn!(
                target: "vishdrill::engine",
                call_sid = %call_sid,
                turn = current_turn,
                "duplicate gather callback for an already-advanced turn; re-gathering"
            );
            let mut steps = Vec::new();
            self.push_gather(&mut steps);
            return CallDirective::new(steps);
        }

        self.store.append_event(
            call_sid,
            CallEvent::new(
                EventType::CalleeSpoke,
                json!({ "turn": callee_turn, "text": speech }),
            ),
        );
        self.store
            .append_transcript(call_sid, callee_turn, Speaker::Callee, speech);

        // Observational only: a detection never blocks or redirects the call.
        let matches = self.detector.detect(speech);
        if !matches.is_empty() {
            info!(
                target: "vishdrill::engine",
                call_sid = %call_sid,
                turn = callee_turn,
                count = matches.len(),
                "sensitive data detected in callee speech"
            );
            self.store.append_event(
                call_sid,
                CallEvent::new(
                    EventType::SensitiveDataDetected,
                    json!({ "turn": callee_turn, "matches": matches }),
                ),
            );
        }

        match next_line {
            Some(line) => {
                let mut steps = Vec::new();
                self.push_play_or_say(
                    &mut steps,
                    &session.scenario_id,
                    next_attacker_turn,
                    &line.text,
                );
                self.store.append_event(
                    call_sid,
                    CallEvent::new(
                        EventType::AttackerSpoke,
                        json!({ "turn": next_attacker_turn, "text": line.text }),
                    ),
                );
                self.store.append_transcript(
                    call_sid,
                    next_attacker_turn,
                    Speaker::Attacker,
                    &line.text,
                );

                if scenario.has_line_after(next_attacker_turn, Speaker::Callee) {
                    self.push_gather(&mut steps);
                } else {
                    // Last attacker line: let it land, then hang up.
                    steps.push(DirectiveStep::Pause { seconds: 1 });
                    steps.push(DirectiveStep::Hangup);
                }
                CallDirective::new(steps)
            }
            None => {
                // Script exhausted: the terminal success path.
                CallDirective::say_and_hangup("Thank you. Goodbye.")
            }
        }
    }

    /// Provider status callback: map, persist, and close out the event log
    /// when the call completes.
    pub fn on_status_changed(
        &self,
        call_sid: &str,
        provider_status: &str,
        duration_secs: Option<u64>,
    ) {
        let status = CallStatus::from_provider(provider_status);
        self.store.update_status(call_sid, status);
        if status == CallStatus::Completed {
            self.store.append_event(
                call_sid,
                CallEvent::new(
                    EventType::CallEnded,
                    json!({ "call_status": provider_status, "duration": duration_secs }),
                ),
            );
        }
        info!(target: "vishdrill::engine", call_sid = %call_sid, status = status.as_str(), "status changed");
    }

    /// Fetch the session, falling back to the pending-call index when the
    /// provider's first callback won the race against call placement.
    fn recover_session(&self, call_sid: &str, dialed_number: Option<&str>) -> Option<CallSession> {
        if let Some(session) = self.store.get_session(call_sid) {
            return Some(session);
        }
        let number = dialed_number?;
        let scenario_id = self.store.pending_scenario_for(number)?;
        info!(target: "vishdrill::engine", call_sid = %call_sid, "recovered session from pending-call index");
        self.store.create_session(call_sid, number, &scenario_id);
        self.store.get_session(call_sid)
    }

    fn push_play_or_say(
        &self,
        steps: &mut Vec<DirectiveStep>,
        scenario_id: &str,
        turn: u32,
        text: &str,
    ) {
        match self.store.cached_audio_url(scenario_id, turn) {
            Some(url) => steps.push(DirectiveStep::Play { url }),
            None => steps.push(DirectiveStep::Say {
                text: text.to_string(),
            }),
        }
    }

    fn push_gather(&self, steps: &mut Vec<DirectiveStep>) {
        steps.push(DirectiveStep::GatherSpeech {
            action: self.config.gather_action_url(),
            timeout_secs: self.config.gather_timeout_secs,
        });
        // No input: have the provider re-invoke the gather step.
        steps.push(DirectiveStep::Redirect {
            url: self.config.gather_action_url(),
        });
    }
}

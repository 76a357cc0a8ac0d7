//! Full scripted-call walk: place a call, answer it, gather replies through
//! the whole script, and verify the session, transcript, and event log stay
//! consistent across independent webhook deliveries.
//!
//! Run with: `cargo test --test call_flow`

use async_trait::async_trait;
use std::sync::Arc;
use vishdrill_core::{
    CallDirective, CallStatus, CallTransport, ConversationEngine, CoreResult, Detector,
    DirectiveStep, EngineConfig, EventType, PlaceCallRequest, ScenarioCatalog, SessionStore,
    Speaker,
};

struct StubTransport;

#[async_trait]
impl CallTransport for StubTransport {
    async fn place_call(
        &self,
        _to: &str,
        _webhook_url: &str,
        _status_callback_url: &str,
    ) -> CoreResult<String> {
        Ok("CAflow0001".to_string())
    }
}

fn engine() -> ConversationEngine {
    ConversationEngine::new(
        Arc::new(ScenarioCatalog::builtin()),
        Arc::new(SessionStore::new()),
        Arc::new(StubTransport),
        Detector,
        EngineConfig::default(),
    )
}

fn gathers_again(directive: &CallDirective) -> bool {
    directive
        .steps
        .iter()
        .any(|s| matches!(s, DirectiveStep::GatherSpeech { .. }))
}

#[tokio::test]
async fn bank_fraud_script_runs_front_to_back() {
    let engine = engine();
    let response = engine
        .place_call(&PlaceCallRequest {
            phone_number: "+15551234567".to_string(),
            scenario_id: "bank_fraud".to_string(),
        })
        .await
        .expect("placement succeeds");
    let sid = response.call_sid.as_str();

    let opening = engine.on_call_answered(sid, Some("+15551234567"));
    assert!(gathers_again(&opening));
    assert_eq!(engine.store().get_session(sid).unwrap().current_turn, 1);

    // Callee replies at turns 2, 4, 6, 8; attacker advances to 3, 5, 7, 9.
    let replies = [
        "yes, who is this?",
        "no I did not authorize that",
        "it's 4111 1111 1111 1111",
        "the code is 482913",
    ];
    for (i, reply) in replies.iter().enumerate() {
        let directive = engine.on_speech_gathered(sid, Some("+15551234567"), reply);
        let expected_turn = 3 + 2 * i as u32;
        assert_eq!(
            engine.store().get_session(sid).unwrap().current_turn,
            expected_turn
        );
        assert!(gathers_again(&directive), "turn {expected_turn} keeps gathering");
    }

    // Turn 11 is the final attacker line; the call winds down after it.
    let closing = engine.on_speech_gathered(sid, Some("+15551234567"), "okay thanks");
    assert_eq!(engine.store().get_session(sid).unwrap().current_turn, 11);
    assert!(closing.ends_call());
    assert!(!gathers_again(&closing));

    engine.on_status_changed(sid, "completed", Some(183));

    let session = engine.store().get_session(sid).unwrap();
    assert_eq!(session.status, CallStatus::Completed);
    assert!(session.ended_at.is_some());

    // Transcript alternates speakers and is strictly turn-ordered.
    let transcript = engine.store().list_transcript(sid);
    let turns: Vec<u32> = transcript.iter().map(|t| t.turn).collect();
    assert_eq!(turns, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
    for entry in &transcript {
        let expected = if entry.turn % 2 == 1 {
            Speaker::Attacker
        } else {
            Speaker::Callee
        };
        assert_eq!(entry.speaker, expected, "turn {}", entry.turn);
    }

    // The card number and OTP replies each produced a detection event.
    let events = engine.store().list_events(sid);
    let detections: Vec<_> = events
        .iter()
        .filter(|e| e.event_type == EventType::SensitiveDataDetected)
        .collect();
    assert!(detections.len() >= 2);
    assert_eq!(events.first().unwrap().event_type, EventType::CallInitiated);
    assert_eq!(events.last().unwrap().event_type, EventType::CallEnded);
}

#[tokio::test]
async fn silence_loops_on_the_same_turn_until_speech_arrives() {
    let engine = engine();
    engine
        .place_call(&PlaceCallRequest {
            phone_number: "+15551234567".to_string(),
            scenario_id: "tech_support".to_string(),
        })
        .await
        .unwrap();
    let sid = "CAflow0001";
    engine.on_call_answered(sid, Some("+15551234567"));

    let before = engine.store().list_transcript(sid).len();
    for _ in 0..3 {
        let directive = engine.on_speech_gathered(sid, Some("+15551234567"), "");
        assert!(gathers_again(&directive));
    }
    assert_eq!(engine.store().get_session(sid).unwrap().current_turn, 1);
    assert_eq!(engine.store().list_transcript(sid).len(), before);

    engine.on_speech_gathered(sid, Some("+15551234567"), "hello?");
    assert_eq!(engine.store().get_session(sid).unwrap().current_turn, 3);
}

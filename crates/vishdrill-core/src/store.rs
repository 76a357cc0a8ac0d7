//! In-memory expiring session store.
//!
//! Holds call sessions, per-call append-only event and transcript logs, the
//! short-lived pending-call index, and the write-once audio-URL cache. Every
//! key carries a hard expiration; that expiry is the only garbage collection
//! there is; no explicit delete path exists for completed calls. All
//! operations are atomic at single-key granularity; there are no cross-key
//! transactions.

use crate::model::{CallEvent, CallSession, CallStatus, Speaker, TranscriptEntry};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Per-key retention windows. The defaults match the production windows;
/// tests shrink them to exercise expiry.
#[derive(Debug, Clone, Copy)]
pub struct StoreTtls {
    /// Sessions, events, transcripts: 2 hours.
    pub session: Duration,
    /// Pending-call index: 5 minutes.
    pub pending: Duration,
    /// Audio-URL cache: 24 hours.
    pub audio: Duration,
}

impl Default for StoreTtls {
    fn default() -> Self {
        Self {
            session: Duration::seconds(7200),
            pending: Duration::seconds(300),
            audio: Duration::seconds(86400),
        }
    }
}

struct Expiring<T> {
    value: T,
    expires_at: DateTime<Utc>,
}

impl<T> Expiring<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Utc::now() + ttl,
        }
    }

    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Concurrent key-value store for call state, keyed by call sid (sessions,
/// events, transcripts), phone number (pending index), or scenario+turn
/// (audio cache).
pub struct SessionStore {
    ttls: StoreTtls,
    sessions: DashMap<String, Expiring<CallSession>>,
    events: DashMap<String, Expiring<Vec<CallEvent>>>,
    transcripts: DashMap<String, Expiring<Vec<TranscriptEntry>>>,
    pending: DashMap<String, Expiring<String>>,
    audio: DashMap<String, Expiring<String>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_ttls(StoreTtls::default())
    }

    pub fn with_ttls(ttls: StoreTtls) -> Self {
        Self {
            ttls,
            sessions: DashMap::new(),
            events: DashMap::new(),
            transcripts: DashMap::new(),
            pending: DashMap::new(),
            audio: DashMap::new(),
        }
    }

    // Call sessions

    /// Initialize a session with `status = initiated` and `current_turn = 1`.
    /// A second call for the same sid overwrites, but normal operation
    /// creates each session at most once.
    pub fn create_session(&self, call_sid: &str, phone_number: &str, scenario_id: &str) {
        let session = CallSession::new(call_sid, phone_number, scenario_id);
        self.sessions.insert(
            call_sid.to_string(),
            Expiring::new(session, self.ttls.session),
        );
    }

    pub fn get_session(&self, call_sid: &str) -> Option<CallSession> {
        get_fresh(&self.sessions, call_sid)
    }

    /// Update the session status, stamping `ended_at` for terminal statuses.
    /// A missing or expired session is a silent no-op: status callbacks
    /// routinely outlive the session window.
    pub fn update_status(&self, call_sid: &str, status: CallStatus) {
        self.with_session_mut(call_sid, |session| {
            session.status = status;
            if status.is_terminal() {
                session.ended_at = Some(Utc::now());
            }
        });
    }

    pub fn set_current_turn(&self, call_sid: &str, turn: u32) {
        self.with_session_mut(call_sid, |session| session.current_turn = turn);
    }

    /// Compare-and-swap on `current_turn`: advances to `next` only if the
    /// stored value still equals `expected`. Returns false when another
    /// callback already advanced the turn (a duplicate delivery) or the
    /// session is gone.
    pub fn advance_turn_if(&self, call_sid: &str, expected: u32, next: u32) -> bool {
        let now = Utc::now();
        if let Some(mut entry) = self.sessions.get_mut(call_sid) {
            if entry.is_fresh(now) && entry.value.current_turn == expected {
                entry.value.current_turn = next;
                return true;
            }
        }
        false
    }

    /// All live sessions, newest first, optionally filtered by phone number
    /// (compared with the leading `+` ignored).
    pub fn list_sessions(&self, phone_number: Option<&str>) -> Vec<CallSession> {
        let now = Utc::now();
        let wanted = phone_number.map(|p| p.trim_start_matches('+').to_string());
        let mut sessions: Vec<CallSession> = self
            .sessions
            .iter()
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| entry.value.clone())
            .filter(|s| match &wanted {
                Some(p) => s.phone_number.trim_start_matches('+') == p,
                None => true,
            })
            .collect();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        sessions
    }

    fn with_session_mut(&self, call_sid: &str, f: impl FnOnce(&mut CallSession)) {
        let now = Utc::now();
        if let Some(mut entry) = self.sessions.get_mut(call_sid) {
            if entry.is_fresh(now) {
                f(&mut entry.value);
            }
        }
    }

    // Event log

    /// Append to the per-call event log. Appending refreshes the log's
    /// retention window, matching the session it belongs to.
    pub fn append_event(&self, call_sid: &str, event: CallEvent) {
        append_entry(&self.events, call_sid, event, self.ttls.session);
    }

    pub fn list_events(&self, call_sid: &str) -> Vec<CallEvent> {
        get_fresh(&self.events, call_sid).unwrap_or_default()
    }

    // Transcript

    pub fn append_transcript(&self, call_sid: &str, turn: u32, speaker: Speaker, text: &str) {
        let entry = TranscriptEntry {
            turn,
            speaker,
            text: text.to_string(),
            timestamp: Utc::now(),
        };
        append_entry(&self.transcripts, call_sid, entry, self.ttls.session);
    }

    pub fn list_transcript(&self, call_sid: &str) -> Vec<TranscriptEntry> {
        get_fresh(&self.transcripts, call_sid).unwrap_or_default()
    }

    // Pending-call index

    /// Record which scenario a just-placed call to `phone_number` should run.
    /// Bridges the gap between call placement and the first webhook, which
    /// carries no session yet.
    pub fn record_pending_scenario(&self, phone_number: &str, scenario_id: &str) {
        self.pending.insert(
            phone_number.to_string(),
            Expiring::new(scenario_id.to_string(), self.ttls.pending),
        );
    }

    /// Look up the pending scenario for a phone number, tolerating the
    /// provider reformatting the dialed number: tries the number as given,
    /// with a leading `+`, and with the `+` stripped. The entry is read, not
    /// deleted, since more than one webhook may need it before it expires.
    pub fn pending_scenario_for(&self, phone_number: &str) -> Option<String> {
        let stripped = phone_number.trim_start_matches('+');
        let variants = [
            phone_number.to_string(),
            format!("+{stripped}"),
            stripped.to_string(),
        ];
        variants
            .iter()
            .find_map(|key| get_fresh(&self.pending, key))
    }

    // Audio-URL cache

    pub fn cache_audio_url(&self, scenario_id: &str, turn: u32, url: &str) {
        self.audio.insert(
            audio_key(scenario_id, turn),
            Expiring::new(url.to_string(), self.ttls.audio),
        );
    }

    /// Absence is not an error: it means "speak the line as text instead".
    pub fn cached_audio_url(&self, scenario_id: &str, turn: u32) -> Option<String> {
        get_fresh(&self.audio, &audio_key(scenario_id, turn))
    }

    /// Drop every expired entry. Reads already ignore stale keys; this
    /// reclaims their memory. Returns the number of entries evicted.
    pub fn sweep(&self) -> usize {
        let now = Utc::now();
        let before = self.len();
        self.sessions.retain(|_, v| v.is_fresh(now));
        self.events.retain(|_, v| v.is_fresh(now));
        self.transcripts.retain(|_, v| v.is_fresh(now));
        self.pending.retain(|_, v| v.is_fresh(now));
        self.audio.retain(|_, v| v.is_fresh(now));
        before - self.len()
    }

    fn len(&self) -> usize {
        self.sessions.len()
            + self.events.len()
            + self.transcripts.len()
            + self.pending.len()
            + self.audio.len()
    }
}

fn audio_key(scenario_id: &str, turn: u32) -> String {
    format!("{scenario_id}:{turn}")
}

fn get_fresh<T: Clone>(map: &DashMap<String, Expiring<T>>, key: &str) -> Option<T> {
    let now = Utc::now();
    let stale = match map.get(key) {
        Some(entry) if entry.is_fresh(now) => return Some(entry.value.clone()),
        Some(_) => true,
        None => false,
    };
    if stale {
        map.remove_if(key, |_, v| !v.is_fresh(now));
    }
    None
}

fn append_entry<T>(map: &DashMap<String, Expiring<Vec<T>>>, key: &str, item: T, ttl: Duration) {
    let now = Utc::now();
    let mut entry = map
        .entry(key.to_string())
        .or_insert_with(|| Expiring::new(Vec::new(), ttl));
    if !entry.is_fresh(now) {
        entry.value.clear();
    }
    entry.value.push(item);
    entry.expires_at = now + ttl;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventType;
    use serde_json::json;

    fn expired_ttls() -> StoreTtls {
        StoreTtls {
            session: Duration::zero(),
            pending: Duration::zero(),
            audio: Duration::zero(),
        }
    }

    #[test]
    fn create_and_get_session() {
        let store = SessionStore::new();
        store.create_session("CA123", "+15551234567", "bank_fraud");
        let session = store.get_session("CA123").expect("session present");
        assert_eq!(session.status, CallStatus::Initiated);
        assert_eq!(session.current_turn, 1);
        assert!(session.ended_at.is_none());
    }

    #[test]
    fn expired_session_reads_as_absent() {
        let store = SessionStore::with_ttls(expired_ttls());
        store.create_session("CA123", "+15551234567", "bank_fraud");
        assert!(store.get_session("CA123").is_none());
    }

    #[test]
    fn update_status_on_missing_session_is_a_noop() {
        let store = SessionStore::new();
        store.update_status("nope", CallStatus::Completed);
        assert!(store.get_session("nope").is_none());
    }

    #[test]
    fn terminal_status_stamps_ended_at() {
        let store = SessionStore::new();
        store.create_session("CA123", "+15551234567", "bank_fraud");
        store.update_status("CA123", CallStatus::Ringing);
        assert!(store.get_session("CA123").unwrap().ended_at.is_none());
        store.update_status("CA123", CallStatus::Completed);
        assert!(store.get_session("CA123").unwrap().ended_at.is_some());
    }

    #[test]
    fn advance_turn_cas_rejects_stale_expectation() {
        let store = SessionStore::new();
        store.create_session("CA123", "+15551234567", "bank_fraud");
        assert!(store.advance_turn_if("CA123", 1, 3));
        // a duplicate callback still expecting turn 1 loses the race
        assert!(!store.advance_turn_if("CA123", 1, 3));
        assert_eq!(store.get_session("CA123").unwrap().current_turn, 3);
    }

    #[test]
    fn events_round_trip_in_append_order() {
        let store = SessionStore::new();
        for i in 0..5 {
            store.append_event(
                "CA123",
                CallEvent::new(EventType::CalleeSpoke, json!({ "seq": i })),
            );
        }
        let events = store.list_events("CA123");
        assert_eq!(events.len(), 5);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.data["seq"], i);
        }
    }

    #[test]
    fn pending_lookup_tolerates_number_formats() {
        let store = SessionStore::new();
        store.record_pending_scenario("+15551234567", "tech_support");
        assert_eq!(
            store.pending_scenario_for("15551234567").as_deref(),
            Some("tech_support")
        );
        assert_eq!(
            store.pending_scenario_for("+15551234567").as_deref(),
            Some("tech_support")
        );
        // read-many: the entry survives lookups
        assert!(store.pending_scenario_for("+15551234567").is_some());
        assert!(store.pending_scenario_for("+15559999999").is_none());
    }

    #[test]
    fn audio_cache_absence_is_not_an_error() {
        let store = SessionStore::new();
        assert!(store.cached_audio_url("bank_fraud", 1).is_none());
        store.cache_audio_url("bank_fraud", 1, "https://cdn/audio/bank_fraud_1.mp3");
        assert_eq!(
            store.cached_audio_url("bank_fraud", 1).as_deref(),
            Some("https://cdn/audio/bank_fraud_1.mp3")
        );
    }

    #[test]
    fn list_sessions_filters_by_phone_ignoring_plus() {
        let store = SessionStore::new();
        store.create_session("CA1", "+15551234567", "bank_fraud");
        store.create_session("CA2", "15559876543", "tech_support");
        assert_eq!(store.list_sessions(None).len(), 2);
        let filtered = store.list_sessions(Some("15551234567"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].call_sid, "CA1");
    }

    #[test]
    fn sweep_evicts_expired_entries() {
        let store = SessionStore::with_ttls(expired_ttls());
        store.create_session("CA1", "+15551234567", "bank_fraud");
        store.record_pending_scenario("+15551234567", "bank_fraud");
        assert!(store.sweep() >= 2);
        assert_eq!(store.list_sessions(None).len(), 0);
    }
}

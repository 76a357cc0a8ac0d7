//! # Vishdrill Core
//!
//! Call-session state machine and sensitive-data detection for scripted
//! vishing-training phone calls.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   Conversation Engine                        │
//! │  ┌─────────────┐   ┌──────────────┐   ┌────────────────┐    │
//! │  │  Webhooks   │ → │ SessionStore │ → │ CallDirective  │    │
//! │  │ (answered / │   │  (expiring   │   │ (play, gather, │    │
//! │  │  gathered / │   │   KV state)  │   │  hangup, …)    │    │
//! │  │  status)    │   └──────────────┘   └────────────────┘    │
//! │  └─────────────┘          ↓                                 │
//! │  ┌─────────────┐   ┌──────────────┐                         │
//! │  │  Scenario   │   │   Detector   │                         │
//! │  │  Catalog    │   │ (regex + kw) │                         │
//! │  └─────────────┘   └──────────────┘                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine is stateless between requests; all durable state lives in the
//! store, and every webhook is answered synchronously with a directive the
//! gateway renders for the telephony provider.

pub mod config;
pub mod detect;
pub mod directive;
pub mod engine;
pub mod error;
pub mod model;
pub mod scenario;
pub mod store;

pub use config::EngineConfig;
pub use detect::{Detector, MatchKind, SensitiveDataMatch};
pub use directive::{CallDirective, DirectiveStep};
pub use engine::{CallTransport, ConversationEngine, PlaceCallRequest, PlaceCallResponse};
pub use error::{CoreError, CoreResult};
pub use model::{CallEvent, CallSession, CallStatus, EventType, Speaker, TranscriptEntry};
pub use scenario::{Scenario, ScenarioCatalog, ScriptLine};
pub use store::{SessionStore, StoreTtls};

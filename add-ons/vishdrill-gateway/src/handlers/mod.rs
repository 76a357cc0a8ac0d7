//! HTTP handlers: call placement + provider webhooks, the read-only audit
//! surface, and the scenario listing.

pub mod audit;
pub mod calls;
pub mod scenarios;

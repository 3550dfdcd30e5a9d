//! Projector HTTP surface.
//!
//! Receives GitHub webhook deliveries, verifies and decodes them into
//! [`board::RepositoryEvent`], and hands them to an
//! [`automation::RuleEngine`]. Also serves a liveness probe and on-demand
//! reports.
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /health` | Liveness probe |
//! | `POST /webhook` | Signature check, decode, rule evaluation |
//! | `GET /reports` | [`automation::ReportAggregator::generate_all`] |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Header handling, payload shapes and HMAC verification
//! live here; the `automation` crate sees only decoded events.

pub mod errors;
pub mod payload;
pub mod routes;
pub mod signature;

pub use errors::ListenerError;
pub use payload::{decode_event, ISSUES_EVENT, PULL_REQUEST_EVENT};
pub use routes::{create_routes, AppState, WebhookResponse, EVENT_HEADER};
pub use signature::{sign, verify_signature, SIGNATURE_HEADER};

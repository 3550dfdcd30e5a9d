//! API route definitions

use std::sync::Arc;

use automation::{ReportAggregator, ReportSet, RuleEngine, RuleOutcome, RuleResult};
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use board::EventAction;
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::errors::ListenerError;
use crate::payload::decode_event;
use crate::signature::{verify_signature, SIGNATURE_HEADER};

/// Header naming the webhook event type.
pub const EVENT_HEADER: &str = "x-github-event";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RuleEngine>,
    pub aggregator: ReportAggregator,
    /// Webhook secret; when set, every delivery must carry a valid signature.
    pub secret: Option<Arc<[u8]>>,
}

impl AppState {
    pub fn new(engine: Arc<RuleEngine>, aggregator: ReportAggregator) -> Self {
        Self {
            engine,
            aggregator,
            secret: None,
        }
    }

    pub fn with_secret(mut self, secret: impl AsRef<[u8]>) -> Self {
        self.secret = Some(Arc::from(secret.as_ref()));
        self
    }
}

/// Response body for `POST /webhook`.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// `ok` when the delivery was evaluated, `ignored` for other event types.
    pub status: &'static str,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<EventAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_placement: Option<RuleOutcome>,
    pub outcomes: Vec<RuleResult>,
}

/// Create API routes
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/webhook", post(receive_webhook))
        .route("/reports", get(generate_reports))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Verify, decode and evaluate one delivery
async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ListenerError> {
    if let Some(secret) = &state.secret {
        verify_signature(secret, &body, header(&headers, SIGNATURE_HEADER))?;
    }

    let event_type = header(&headers, EVENT_HEADER).ok_or(ListenerError::MissingEventType)?;
    let Some(event) = decode_event(event_type, &body)? else {
        debug!(event = event_type, "Ignoring delivery");
        return Ok(Json(WebhookResponse {
            status: "ignored",
            event: event_type.to_string(),
            action: None,
            default_placement: None,
            outcomes: Vec::new(),
        }));
    };

    let report = state.engine.evaluate(&event).await;
    info!(
        event = event_type,
        action = %report.action,
        fired = report.fired(),
        "Processed delivery"
    );
    Ok(Json(WebhookResponse {
        status: "ok",
        event: event_type.to_string(),
        action: Some(report.action),
        default_placement: report.default_placement,
        outcomes: report.results,
    }))
}

/// Run the report aggregator over every open board
async fn generate_reports(State(state): State<AppState>) -> Result<Json<ReportSet>, ListenerError> {
    Ok(Json(state.aggregator.generate_all().await?))
}

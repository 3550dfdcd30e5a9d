//! Integration tests for the webhook, health and report endpoints

use std::sync::Arc;

use automation::{ReportAggregator, ReportSet, RuleEngine, RuleSet};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use board::testing::{BoardCall, InMemoryBoardClient};
use board::{ColumnId, ContentId, ContentKind, ItemState};
use listener::{create_routes, sign, AppState, EVENT_HEADER, SIGNATURE_HEADER};
use serde_json::{json, Value};

const RULES: &str = r#"
LabelRules:
  - Name: triage-bugs
    Description: Open bugs land in triage
    Content: Issue
    State: open
    Label: bug
    Column: Incoming
    Project: Triage
"#;

struct Fixture {
    server: TestServer,
    client: Arc<InMemoryBoardClient>,
    incoming: ColumnId,
}

fn fixture(secret: Option<&str>) -> Fixture {
    let client = Arc::new(InMemoryBoardClient::new());
    let triage = client.add_board("Triage");
    let incoming = client.add_column(triage, "Incoming");
    let done = client.add_column(triage, "Done");
    client.add_item_card(done, ContentKind::Issue, "acme/x", 1, ItemState::Closed, &["bug"]);

    let rules = RuleSet::from_yaml_str(RULES).unwrap();
    let engine = Arc::new(RuleEngine::new(client.clone(), rules));
    let mut state = AppState::new(engine, ReportAggregator::new(client.clone()));
    if let Some(secret) = secret {
        state = state.with_secret(secret);
    }

    let server = TestServer::new(create_routes(state)).expect("Failed to create test server");
    Fixture {
        server,
        client,
        incoming,
    }
}

fn labeled_issue() -> Vec<u8> {
    serde_json::to_vec(&json!({
        "action": "labeled",
        "issue": {
            "id": 4242,
            "number": 42,
            "state": "open",
            "labels": [{"name": "bug"}]
        },
        "label": {"name": "bug"},
        "repository": {"full_name": "acme/x"}
    }))
    .unwrap()
}

fn header(name: &'static str, value: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(name),
        HeaderValue::from_str(value).unwrap(),
    )
}

#[tokio::test]
async fn test_health_check() {
    let f = fixture(None);

    let response = f.server.get("/health").await;

    response.assert_status_ok();
    response.assert_json(&json!({"status": "ok"}));
}

#[tokio::test]
async fn test_labeled_issue_creates_card() {
    let f = fixture(None);
    let (name, value) = header(EVENT_HEADER, "issues");

    let response = f
        .server
        .post("/webhook")
        .add_header(name, value)
        .bytes(labeled_issue().into())
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["action"], "labeled");
    assert_eq!(body["outcomes"][0]["rule"], "triage-bugs");
    assert_eq!(body["outcomes"][0]["outcome"], "created");
    assert_eq!(
        f.client.calls(),
        vec![BoardCall::CreateCard {
            column: f.incoming,
            kind: ContentKind::Issue,
            content: ContentId::new(4242),
        }]
    );
}

#[tokio::test]
async fn test_ping_is_acknowledged_and_ignored() {
    let f = fixture(None);
    let (name, value) = header(EVENT_HEADER, "ping");

    let response = f
        .server
        .post("/webhook")
        .add_header(name, value)
        .json(&json!({"zen": "Design for failure.", "hook_id": 1}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ignored");
    assert_eq!(body["event"], "ping");
    assert!(f.client.calls().is_empty());
}

#[tokio::test]
async fn test_missing_event_header_is_bad_request() {
    let f = fixture(None);

    let response = f.server.post("/webhook").bytes(labeled_issue().into()).await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_payload_is_bad_request() {
    let f = fixture(None);
    let (name, value) = header(EVENT_HEADER, "issues");

    let response = f
        .server
        .post("/webhook")
        .add_header(name, value)
        .json(&json!({"action": "labeled"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(f.client.calls().is_empty());
}

#[tokio::test]
async fn test_unsigned_delivery_is_rejected_when_secret_configured() {
    let f = fixture(Some("hush"));
    let (name, value) = header(EVENT_HEADER, "issues");

    let response = f
        .server
        .post("/webhook")
        .add_header(name, value)
        .bytes(labeled_issue().into())
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert!(f.client.calls().is_empty());
}

#[tokio::test]
async fn test_signed_delivery_is_accepted() {
    let f = fixture(Some("hush"));
    let body = labeled_issue();
    let (event_name, event_value) = header(EVENT_HEADER, "issues");
    let (sig_name, sig_value) = header(SIGNATURE_HEADER, &sign(b"hush", &body).unwrap());

    let response = f
        .server
        .post("/webhook")
        .add_header(event_name, event_value)
        .add_header(sig_name, sig_value)
        .bytes(body.into())
        .await;

    response.assert_status_ok();
    assert_eq!(f.client.calls().len(), 1);
}

#[tokio::test]
async fn test_signature_from_other_secret_is_rejected() {
    let f = fixture(Some("hush"));
    let body = labeled_issue();
    let (event_name, event_value) = header(EVENT_HEADER, "issues");
    let (sig_name, sig_value) = header(SIGNATURE_HEADER, &sign(b"wrong", &body).unwrap());

    let response = f
        .server
        .post("/webhook")
        .add_header(event_name, event_value)
        .add_header(sig_name, sig_value)
        .bytes(body.into())
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reports_endpoint_returns_done_column_totals() {
    let f = fixture(None);

    let response = f.server.get("/reports").await;

    response.assert_status_ok();
    let set: ReportSet = response.json();
    let report = set.get("Triage").unwrap();
    assert_eq!(report.closed_count, 1);
    assert_eq!(report.label_count("bug"), 1);
    assert!(set.omitted.is_empty());
}

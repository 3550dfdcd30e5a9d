//! Decoding of GitHub webhook bodies into [`RepositoryEvent`].

use board::{
    ContentId, EventAction, IssueNumber, ItemState, LabelName, RepositoryEvent, RepositoryName,
    Subject, SubjectEvent,
};
use serde::Deserialize;

use crate::errors::ListenerError;

/// `X-GitHub-Event` value for pull request deliveries.
pub const PULL_REQUEST_EVENT: &str = "pull_request";
/// `X-GitHub-Event` value for issue deliveries.
pub const ISSUES_EVENT: &str = "issues";

#[derive(Debug, Deserialize)]
struct WireLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireSubject {
    id: u64,
    number: u64,
    state: ItemState,
    #[serde(default)]
    labels: Vec<WireLabel>,
}

#[derive(Debug, Deserialize)]
struct WireRepository {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    action: EventAction,
    pull_request: WireSubject,
    #[serde(default)]
    label: Option<WireLabel>,
    repository: WireRepository,
}

#[derive(Debug, Deserialize)]
struct IssuesPayload {
    action: EventAction,
    issue: WireSubject,
    #[serde(default)]
    label: Option<WireLabel>,
    repository: WireRepository,
}

fn subject_event(
    event: &str,
    action: EventAction,
    subject: WireSubject,
    label: Option<WireLabel>,
    repository: WireRepository,
) -> Result<SubjectEvent, ListenerError> {
    let repository =
        RepositoryName::new(repository.full_name).ok_or_else(|| ListenerError::InvalidPayload {
            event: event.to_string(),
            message: "repository.full_name is empty".to_string(),
        })?;
    Ok(SubjectEvent {
        action,
        subject: Subject {
            id: ContentId::new(subject.id),
            number: IssueNumber::new(subject.number),
            state: subject.state,
            labels: subject
                .labels
                .into_iter()
                .filter_map(|label| LabelName::new(label.name))
                .collect(),
        },
        label: label.and_then(|label| LabelName::new(label.name)),
        repository,
    })
}

/// Decodes one delivery.
///
/// Returns `Ok(None)` for event types this system does not act on (`ping`,
/// `push`, ...).
pub fn decode_event(event: &str, body: &[u8]) -> Result<Option<RepositoryEvent>, ListenerError> {
    let invalid = |source: serde_json::Error| ListenerError::InvalidPayload {
        event: event.to_string(),
        message: source.to_string(),
    };
    match event {
        PULL_REQUEST_EVENT => {
            let payload: PullRequestPayload = serde_json::from_slice(body).map_err(invalid)?;
            subject_event(
                event,
                payload.action,
                payload.pull_request,
                payload.label,
                payload.repository,
            )
            .map(|inner| Some(RepositoryEvent::PullRequest(inner)))
        }
        ISSUES_EVENT => {
            let payload: IssuesPayload = serde_json::from_slice(body).map_err(invalid)?;
            subject_event(event, payload.action, payload.issue, payload.label, payload.repository)
                .map(|inner| Some(RepositoryEvent::Issues(inner)))
        }
        _ => Ok(None),
    }
}

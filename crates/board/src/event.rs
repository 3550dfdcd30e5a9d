//! Decoded repository event envelope.
//!
//! The HTTP layer verifies and decodes webhook deliveries; everything past
//! that point sees only [`RepositoryEvent`]. The two supported categories are
//! variants of one sum type, so dispatch is a `match` on the variant and the
//! content kind is an enum comparison rather than a type-name lookup.

use serde::{Deserialize, Serialize};

use crate::{ContentId, ContentKind, IssueNumber, ItemState, LabelName, RepositoryName};

/// The action that triggered a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    Opened,
    Labeled,
    Unlabeled,
    Closed,
    Reopened,
    Edited,
    Synchronize,
    /// Any action this system does not distinguish.
    #[serde(other)]
    Other,
}

impl EventAction {
    /// Returns the wire name of this action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Labeled => "labeled",
            Self::Unlabeled => "unlabeled",
            Self::Closed => "closed",
            Self::Reopened => "reopened",
            Self::Edited => "edited",
            Self::Synchronize => "synchronize",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The issue or pull request an event is about, as of the delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Global id, used when creating a card.
    pub id: ContentId,
    pub number: IssueNumber,
    pub state: ItemState,
    pub labels: Vec<LabelName>,
}

/// Fields common to both event categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectEvent {
    pub action: EventAction,
    pub subject: Subject,
    /// The label added or removed by a `labeled`/`unlabeled` action.
    pub label: Option<LabelName>,
    pub repository: RepositoryName,
}

/// A validated, typed repository event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "event", rename_all = "snake_case")]
pub enum RepositoryEvent {
    PullRequest(SubjectEvent),
    Issues(SubjectEvent),
}

impl RepositoryEvent {
    /// The content kind this event concerns.
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::PullRequest(_) => ContentKind::PullRequest,
            Self::Issues(_) => ContentKind::Issue,
        }
    }

    /// Borrow the shared event fields.
    pub fn inner(&self) -> &SubjectEvent {
        match self {
            Self::PullRequest(event) | Self::Issues(event) => event,
        }
    }

    pub fn action(&self) -> EventAction {
        self.inner().action
    }

    pub fn subject(&self) -> &Subject {
        &self.inner().subject
    }

    pub fn repository(&self) -> &RepositoryName {
        &self.inner().repository
    }

    /// Returns `true` if `label` satisfies a rule's label condition.
    ///
    /// For `unlabeled` only the removed label counts: removing an unrelated
    /// label must not match a rule whose label is still on the subject.
    /// Otherwise the subject carrying `label`, or the event adding it, counts.
    pub fn has_label(&self, label: &LabelName) -> bool {
        let event = self.inner();
        let changed = event.label.as_ref() == Some(label);
        if event.action == EventAction::Unlabeled {
            return changed;
        }
        changed || event.subject.labels.iter().any(|l| l == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue_event(action: EventAction, labels: &[&str], label: Option<&str>) -> RepositoryEvent {
        RepositoryEvent::Issues(SubjectEvent {
            action,
            subject: Subject {
                id: ContentId::new(1001),
                number: IssueNumber::new(42),
                state: ItemState::Open,
                labels: labels.iter().filter_map(|l| LabelName::new(*l)).collect(),
            },
            label: label.and_then(LabelName::new),
            repository: RepositoryName::new("acme/x").unwrap(),
        })
    }

    #[test]
    fn test_kind_follows_variant() {
        let event = issue_event(EventAction::Labeled, &["bug"], None);
        assert_eq!(event.kind(), ContentKind::Issue);
        assert_eq!(event.action(), EventAction::Labeled);
    }

    #[test]
    fn test_has_label_checks_subject_and_changed_label() {
        let bug = LabelName::new("bug").unwrap();

        assert!(issue_event(EventAction::Labeled, &["bug"], None).has_label(&bug));
        assert!(issue_event(EventAction::Unlabeled, &[], Some("bug")).has_label(&bug));
        assert!(!issue_event(EventAction::Labeled, &[], None).has_label(&bug));
        assert!(!issue_event(EventAction::Labeled, &["Bug"], None).has_label(&bug));
    }

    #[test]
    fn test_unlabeled_matches_only_the_removed_label() {
        let bug = LabelName::new("bug").unwrap();

        assert!(!issue_event(EventAction::Unlabeled, &["bug"], Some("docs")).has_label(&bug));
        assert!(!issue_event(EventAction::Unlabeled, &["bug"], None).has_label(&bug));
        assert!(issue_event(EventAction::Unlabeled, &["docs"], Some("bug")).has_label(&bug));
    }

    #[test]
    fn test_unknown_actions_decode_as_other() {
        let action: EventAction = serde_json::from_str("\"assigned\"").unwrap();
        assert_eq!(action, EventAction::Other);
    }
}

//! Label rules: the configuration records that map an event condition to a
//! board mutation.
//!
//! A rule matches an event only when all three conditions hold at once:
//! content kind, subject state, and label membership. Matching is pure; the
//! board mutation it implies is carried out by the rule engine.

use serde::{Deserialize, Serialize};

use crate::{BoardName, ColumnName, ContentKind, ItemState, LabelName, RepositoryEvent, RuleName};

/// A label rule as declared in the rules file.
///
/// Field names follow the rules file (`Name`, `Content`, ...); lower-case
/// spellings are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LabelRule {
    #[serde(alias = "name")]
    pub name: RuleName,

    #[serde(default, alias = "description")]
    pub description: String,

    /// Which kind of event the rule applies to.
    #[serde(alias = "content")]
    pub content: ContentKind,

    /// Required subject state.
    #[serde(alias = "state")]
    pub state: ItemState,

    /// Required label name.
    #[serde(alias = "label")]
    pub label: LabelName,

    /// Target column name within [`LabelRule::project`].
    #[serde(alias = "column")]
    pub column: ColumnName,

    /// Target board name.
    #[serde(alias = "project")]
    pub project: BoardName,
}

/// The condition that stopped a rule from matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCondition {
    ContentKind,
    State,
    Label,
}

impl std::fmt::Display for RuleCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::ContentKind => "content kind",
            Self::State => "state",
            Self::Label => "label",
        })
    }
}

impl LabelRule {
    /// Checks the rule's conditions against `event` in declaration order.
    ///
    /// # Errors
    ///
    /// Returns the first condition that does not hold.
    pub fn check(&self, event: &RepositoryEvent) -> Result<(), RuleCondition> {
        if event.kind() != self.content {
            return Err(RuleCondition::ContentKind);
        }
        if event.subject().state != self.state {
            return Err(RuleCondition::State);
        }
        if !event.has_label(&self.label) {
            return Err(RuleCondition::Label);
        }
        Ok(())
    }

    /// Returns `true` if every condition holds for `event`.
    pub fn matches(&self, event: &RepositoryEvent) -> bool {
        self.check(event).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ContentId, EventAction, IssueNumber, RepositoryName, Subject, SubjectEvent};

    fn rule() -> LabelRule {
        LabelRule {
            name: RuleName::new("triage-bugs").unwrap(),
            description: String::new(),
            content: ContentKind::Issue,
            state: ItemState::Open,
            label: LabelName::new("bug").unwrap(),
            column: ColumnName::new("Incoming").unwrap(),
            project: BoardName::new("Triage").unwrap(),
        }
    }

    fn subject_event(state: ItemState, labels: &[&str]) -> SubjectEvent {
        SubjectEvent {
            action: EventAction::Labeled,
            subject: Subject {
                id: ContentId::new(9000),
                number: IssueNumber::new(42),
                state,
                labels: labels.iter().filter_map(|l| LabelName::new(*l)).collect(),
            },
            label: None,
            repository: RepositoryName::new("acme/x").unwrap(),
        }
    }

    #[test]
    fn test_all_conditions_hold() {
        let event = RepositoryEvent::Issues(subject_event(ItemState::Open, &["bug"]));
        assert_eq!(rule().check(&event), Ok(()));
    }

    #[test]
    fn test_each_condition_is_required() {
        let wrong_kind = RepositoryEvent::PullRequest(subject_event(ItemState::Open, &["bug"]));
        assert_eq!(rule().check(&wrong_kind), Err(RuleCondition::ContentKind));

        let wrong_state = RepositoryEvent::Issues(subject_event(ItemState::Closed, &["bug"]));
        assert_eq!(rule().check(&wrong_state), Err(RuleCondition::State));

        let wrong_label = RepositoryEvent::Issues(subject_event(ItemState::Open, &["docs"]));
        assert_eq!(rule().check(&wrong_label), Err(RuleCondition::Label));
    }

    #[test]
    fn test_unlabelled_subject_never_matches() {
        let event = RepositoryEvent::Issues(subject_event(ItemState::Open, &[]));
        assert!(!rule().matches(&event));
    }

    #[test]
    fn test_deserializes_rules_file_field_names() {
        let rule: LabelRule = serde_json::from_value(serde_json::json!({
            "Name": "triage-bugs",
            "Content": "Issue",
            "State": "open",
            "Label": "bug",
            "Column": "Incoming",
            "Project": "Triage"
        }))
        .unwrap();
        assert_eq!(rule.project.as_str(), "Triage");
        assert!(rule.description.is_empty());

        let lower: LabelRule = serde_json::from_value(serde_json::json!({
            "name": "prs",
            "description": "Ready PRs",
            "content": "PullRequest",
            "state": "open",
            "label": "ready",
            "column": "Review",
            "project": "Delivery"
        }))
        .unwrap();
        assert_eq!(lower.content, ContentKind::PullRequest);
    }
}

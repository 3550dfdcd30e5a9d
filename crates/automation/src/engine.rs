//! The label rule engine.
//!
//! For one decoded event, every rule is evaluated independently in
//! declaration order. A matching rule resolves its board, then its column,
//! and performs exactly one card mutation. Rules never short-circuit each
//! other: one event may land on several boards, and a failure in one rule
//! does not stop the next.
//!
//! Resolution failures and missing cards are expected outcomes and are
//! logged as skips. Remote failures are logged and surfaced as
//! [`RuleOutcome::Failed`] in the returned [`EvaluationReport`]; nothing in
//! here panics on a remote error.

use std::sync::Arc;
use std::time::Duration;

use board::{
    BoardClient, BoardError, BoardId, BoardName, CardId, ColumnId, ColumnName, EventAction,
    LabelRule, RepositoryEvent, RuleCondition, RuleName,
};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::deadline::bounded;
use crate::RuleSet;

/// Default bound on each remote call made while handling an event.
pub const DEFAULT_CALL_DEADLINE: Duration = Duration::from_secs(10);

/// Board and column every newly opened item is placed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultPlacement {
    pub board: BoardName,
    pub column: ColumnName,
}

/// The card mutation an event calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mutation {
    Create,
    Delete,
}

impl Mutation {
    /// Pull requests always create. Issues create on `opened`/`labeled`,
    /// delete on `unlabeled`, and are otherwise ignored.
    fn for_event(event: &RepositoryEvent) -> Option<Self> {
        match event {
            RepositoryEvent::PullRequest(_) => Some(Self::Create),
            RepositoryEvent::Issues(inner) => match inner.action {
                EventAction::Opened | EventAction::Labeled => Some(Self::Create),
                EventAction::Unlabeled => Some(Self::Delete),
                _ => None,
            },
        }
    }
}

/// What happened for one rule (or for default placement).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RuleOutcome {
    Created { column: ColumnId, card: CardId },
    Deleted { card: CardId },
    /// The remote already had a card for the subject on that board.
    AlreadyPresent { column: ColumnId },
    NotMatched { condition: RuleCondition },
    /// Board, column or card not found; nothing was mutated.
    Skipped { reason: String },
    Failed { error: String },
}

impl RuleOutcome {
    /// Returns `true` if a card was created or deleted.
    pub fn mutated(&self) -> bool {
        matches!(self, Self::Created { .. } | Self::Deleted { .. })
    }
}

/// Outcome of one rule for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleResult {
    pub rule: RuleName,
    #[serde(flatten)]
    pub outcome: RuleOutcome,
}

/// Everything the engine did for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluationReport {
    pub action: EventAction,
    /// Outcome of default placement, when the event was an `opened` and a
    /// default placement is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_placement: Option<RuleOutcome>,
    /// One entry per rule, in declaration order. Empty when the action is
    /// ignored.
    pub results: Vec<RuleResult>,
}

impl EvaluationReport {
    fn new(action: EventAction) -> Self {
        Self {
            action,
            default_placement: None,
            results: Vec::new(),
        }
    }

    /// Number of rules that mutated the board.
    pub fn fired(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.mutated()).count()
    }

    /// Returns `true` if any rule or the default placement hit a remote failure.
    pub fn has_failures(&self) -> bool {
        self.default_placement
            .iter()
            .chain(self.results.iter().map(|r| &r.outcome))
            .any(|outcome| matches!(outcome, RuleOutcome::Failed { .. }))
    }
}

/// Evaluates label rules against repository events and mutates the board.
///
/// The rule set is read-only during an evaluation; [`RuleEngine::reload`]
/// swaps it for subsequent events. Safe to share across concurrently handled
/// events.
pub struct RuleEngine {
    client: Arc<dyn BoardClient>,
    rules: RwLock<Arc<RuleSet>>,
    default_placement: Option<DefaultPlacement>,
    call_deadline: Duration,
}

impl RuleEngine {
    pub fn new(client: Arc<dyn BoardClient>, rules: RuleSet) -> Self {
        Self {
            client,
            rules: RwLock::new(Arc::new(rules)),
            default_placement: None,
            call_deadline: DEFAULT_CALL_DEADLINE,
        }
    }

    /// Places every newly opened item on `placement` before rules run.
    pub fn with_default_placement(mut self, placement: DefaultPlacement) -> Self {
        self.default_placement = Some(placement);
        self
    }

    /// Bounds each remote call made while handling an event.
    pub fn with_call_deadline(mut self, deadline: Duration) -> Self {
        self.call_deadline = deadline;
        self
    }

    /// Replaces the rule set. Evaluations already running keep their snapshot.
    pub async fn reload(&self, rules: RuleSet) {
        let count = rules.len();
        *self.rules.write().await = Arc::new(rules);
        info!(count, "Reloaded label rules");
    }

    /// The current rule set.
    pub async fn rules(&self) -> Arc<RuleSet> {
        Arc::clone(&*self.rules.read().await)
    }

    /// Evaluates every rule against `event` and performs the resulting mutations.
    #[instrument(
        skip_all,
        fields(
            kind = %event.kind(),
            action = %event.action(),
            repository = %event.repository(),
            number = %event.subject().number,
        )
    )]
    pub async fn evaluate(&self, event: &RepositoryEvent) -> EvaluationReport {
        let rules = self.rules().await;
        let mut report = EvaluationReport::new(event.action());

        if event.action() == EventAction::Opened {
            if let Some(placement) = &self.default_placement {
                report.default_placement = Some(self.place_by_default(placement, event).await);
            }
        }

        let Some(mutation) = Mutation::for_event(event) else {
            debug!("Ignoring action");
            return report;
        };

        for rule in rules.iter() {
            let outcome = self.apply(rule, event, mutation).await;
            report.results.push(RuleResult {
                rule: rule.name.clone(),
                outcome,
            });
        }

        info!(rules = rules.len(), fired = report.fired(), "Processed label rules");
        report
    }

    async fn place_by_default(
        &self,
        placement: &DefaultPlacement,
        event: &RepositoryEvent,
    ) -> RuleOutcome {
        let column = match self.resolve(&placement.board, &placement.column).await {
            Ok((_, column)) => column,
            Err(err) => return unresolved("default placement", &placement.board, &placement.column, err),
        };
        self.create(column, event).await
    }

    #[instrument(skip_all, fields(rule = %rule.name, board = %rule.project, column = %rule.column))]
    async fn apply(
        &self,
        rule: &LabelRule,
        event: &RepositoryEvent,
        mutation: Mutation,
    ) -> RuleOutcome {
        if let Err(condition) = rule.check(event) {
            debug!(%condition, "Condition check failed");
            return RuleOutcome::NotMatched { condition };
        }
        debug!("All condition checks passed");

        let (board, column) = match self.resolve(&rule.project, &rule.column).await {
            Ok(ids) => ids,
            Err(err) => return unresolved(rule.name.as_str(), &rule.project, &rule.column, err),
        };

        match mutation {
            Mutation::Create => self.create(column, event).await,
            Mutation::Delete => self.delete(board, event).await,
        }
    }

    async fn resolve(
        &self,
        board: &BoardName,
        column: &ColumnName,
    ) -> Result<(BoardId, ColumnId), BoardError> {
        let board_id = bounded(
            self.call_deadline,
            "resolve_board_id",
            self.client.resolve_board_id(board),
        )
        .await?;
        let column_id = bounded(
            self.call_deadline,
            "resolve_column_id",
            self.client.resolve_column_id(board_id, column),
        )
        .await?;
        Ok((board_id, column_id))
    }

    async fn create(&self, column: ColumnId, event: &RepositoryEvent) -> RuleOutcome {
        let kind = event.kind();
        let content = event.subject().id;
        let result = bounded(
            self.call_deadline,
            "create_card",
            self.client.create_card(column, kind, content),
        )
        .await;

        match result {
            Ok(card) => {
                info!(%column, card = %card.id, %kind, %content, "Created card");
                RuleOutcome::Created {
                    column,
                    card: card.id,
                }
            }
            Err(BoardError::Conflict { message, .. }) => {
                info!(%column, %kind, %content, %message, "Card already on board");
                RuleOutcome::AlreadyPresent { column }
            }
            Err(err) => {
                error!(%column, %kind, %content, error = %err, "Unable to create card");
                RuleOutcome::Failed {
                    error: err.to_string(),
                }
            }
        }
    }

    async fn delete(&self, board: BoardId, event: &RepositoryEvent) -> RuleOutcome {
        let repository = event.repository();
        let number = event.subject().number;
        let result = bounded(
            self.call_deadline,
            "delete_card_by_content",
            self.client.delete_card_by_content(repository, number, board),
        )
        .await;

        match result {
            Ok(card) => {
                info!(%board, %card, "Deleted card");
                RuleOutcome::Deleted { card }
            }
            Err(err) if err.is_not_found() => {
                warn!(%board, error = %err, "No card to delete, skipping");
                RuleOutcome::Skipped {
                    reason: err.to_string(),
                }
            }
            Err(err) => {
                error!(%board, error = %err, "Unable to delete card");
                RuleOutcome::Failed {
                    error: err.to_string(),
                }
            }
        }
    }
}

fn unresolved(source: &str, board: &BoardName, column: &ColumnName, err: BoardError) -> RuleOutcome {
    if err.is_not_found() {
        warn!(source, %board, %column, error = %err, "Unable to resolve target, skipping");
        RuleOutcome::Skipped {
            reason: err.to_string(),
        }
    } else {
        error!(source, %board, %column, error = %err, "Failed to resolve target");
        RuleOutcome::Failed {
            error: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use board::testing::{BoardCall, InMemoryBoardClient};
    use board::{
        ContentId, ContentKind, IssueNumber, ItemState, LabelName, RepositoryName, Subject,
        SubjectEvent,
    };

    fn rule(name: &str, content: ContentKind, state: ItemState, label: &str) -> LabelRule {
        LabelRule {
            name: RuleName::new(name).unwrap(),
            description: String::new(),
            content,
            state,
            label: LabelName::new(label).unwrap(),
            column: ColumnName::new("Incoming").unwrap(),
            project: BoardName::new("Triage").unwrap(),
        }
    }

    fn subject_event(action: EventAction, state: ItemState, labels: &[&str]) -> SubjectEvent {
        SubjectEvent {
            action,
            subject: Subject {
                id: ContentId::new(5000),
                number: IssueNumber::new(42),
                state,
                labels: labels.iter().filter_map(|l| LabelName::new(*l)).collect(),
            },
            label: None,
            repository: RepositoryName::new("acme/x").unwrap(),
        }
    }

    fn triage_board() -> (Arc<InMemoryBoardClient>, ColumnId) {
        let client = Arc::new(InMemoryBoardClient::new());
        let board = client.add_board("Triage");
        let column = client.add_column(board, "Incoming");
        (client, column)
    }

    #[tokio::test]
    async fn test_pull_request_rule_creates_card_for_any_action() {
        let (client, column) = triage_board();
        let rules = RuleSet::new(vec![rule("prs", ContentKind::PullRequest, ItemState::Open, "ready")]);
        let engine = RuleEngine::new(client.clone(), rules);

        let event = RepositoryEvent::PullRequest(subject_event(
            EventAction::Synchronize,
            ItemState::Open,
            &["ready"],
        ));
        let report = engine.evaluate(&event).await;

        assert_eq!(report.fired(), 1);
        assert_eq!(
            client.calls(),
            vec![BoardCall::CreateCard {
                column,
                kind: ContentKind::PullRequest,
                content: ContentId::new(5000),
            }]
        );
    }

    #[tokio::test]
    async fn test_ignored_issue_actions_evaluate_no_rules() {
        let (client, _) = triage_board();
        let rules = RuleSet::new(vec![rule("bugs", ContentKind::Issue, ItemState::Open, "bug")]);
        let engine = RuleEngine::new(client.clone(), rules);

        let event = RepositoryEvent::Issues(subject_event(EventAction::Edited, ItemState::Open, &["bug"]));
        let report = engine.evaluate(&event).await;

        assert!(report.results.is_empty());
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_every_matching_rule_fires_independently() {
        let client = Arc::new(InMemoryBoardClient::new());
        let triage = client.add_board("Triage");
        let incoming = client.add_column(triage, "Incoming");
        let roadmap = client.add_board("Roadmap");
        let backlog = client.add_column(roadmap, "Backlog");

        let mut second = rule("roadmap", ContentKind::Issue, ItemState::Open, "bug");
        second.project = BoardName::new("Roadmap").unwrap();
        second.column = ColumnName::new("Backlog").unwrap();
        let rules = RuleSet::new(vec![
            rule("triage", ContentKind::Issue, ItemState::Open, "bug"),
            rule("closed", ContentKind::Issue, ItemState::Closed, "bug"),
            second,
        ]);
        let engine = RuleEngine::new(client.clone(), rules);

        let event = RepositoryEvent::Issues(subject_event(EventAction::Labeled, ItemState::Open, &["bug"]));
        let report = engine.evaluate(&event).await;

        let outcomes: Vec<&RuleOutcome> = report.results.iter().map(|r| &r.outcome).collect();
        assert!(matches!(outcomes[0], RuleOutcome::Created { column, .. } if *column == incoming));
        assert_eq!(
            outcomes[1],
            &RuleOutcome::NotMatched {
                condition: RuleCondition::State
            }
        );
        assert!(matches!(outcomes[2], RuleOutcome::Created { column, .. } if *column == backlog));
    }

    #[tokio::test]
    async fn test_failing_rule_does_not_stop_later_rules() {
        let client = Arc::new(InMemoryBoardClient::new());
        let broken = client.add_board("Broken");
        client.fail_board(broken);
        let triage = client.add_board("Triage");
        let incoming = client.add_column(triage, "Incoming");

        let mut first = rule("broken", ContentKind::Issue, ItemState::Open, "bug");
        first.project = BoardName::new("Broken").unwrap();
        let rules = RuleSet::new(vec![first, rule("triage", ContentKind::Issue, ItemState::Open, "bug")]);
        let engine = RuleEngine::new(client.clone(), rules);

        let event = RepositoryEvent::Issues(subject_event(EventAction::Labeled, ItemState::Open, &["bug"]));
        let report = engine.evaluate(&event).await;

        assert!(report.has_failures());
        assert!(matches!(report.results[0].outcome, RuleOutcome::Failed { .. }));
        assert!(matches!(report.results[1].outcome, RuleOutcome::Created { column, .. } if column == incoming));
    }

    #[tokio::test]
    async fn test_missing_column_is_skipped_without_mutation() {
        let (client, _) = triage_board();
        let mut missing = rule("missing", ContentKind::Issue, ItemState::Open, "bug");
        missing.column = ColumnName::new("Nowhere").unwrap();
        let engine = RuleEngine::new(client.clone(), RuleSet::new(vec![missing]));

        let event = RepositoryEvent::Issues(subject_event(EventAction::Labeled, ItemState::Open, &["bug"]));
        let report = engine.evaluate(&event).await;

        assert!(matches!(report.results[0].outcome, RuleOutcome::Skipped { .. }));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_card_is_already_present() {
        let (client, column) = triage_board();
        let rules = RuleSet::new(vec![rule("bugs", ContentKind::Issue, ItemState::Open, "bug")]);
        let engine = RuleEngine::new(client.clone(), rules);
        client.add_item(board::testing::content_item(
            ContentId::new(5000),
            ContentKind::Issue,
            "acme/x",
            42,
            ItemState::Open,
            &["bug"],
        ));

        let event = RepositoryEvent::Issues(subject_event(EventAction::Labeled, ItemState::Open, &["bug"]));
        engine.evaluate(&event).await;
        let second = engine.evaluate(&event).await;

        assert_eq!(second.results[0].outcome, RuleOutcome::AlreadyPresent { column });
        assert!(!second.has_failures());
        assert_eq!(client.cards_in(column).len(), 1);
    }

    #[tokio::test]
    async fn test_opened_items_go_to_default_placement() {
        let client = Arc::new(InMemoryBoardClient::new());
        let inbox = client.add_board("Inbox");
        let todo = client.add_column(inbox, "To do");
        let engine = RuleEngine::new(client.clone(), RuleSet::empty()).with_default_placement(
            DefaultPlacement {
                board: BoardName::new("Inbox").unwrap(),
                column: ColumnName::new("To do").unwrap(),
            },
        );

        let opened = RepositoryEvent::PullRequest(subject_event(EventAction::Opened, ItemState::Open, &[]));
        let report = engine.evaluate(&opened).await;
        assert!(matches!(report.default_placement, Some(RuleOutcome::Created { column, .. }) if column == todo));

        let labeled = RepositoryEvent::PullRequest(subject_event(EventAction::Labeled, ItemState::Open, &[]));
        let report = engine.evaluate(&labeled).await;
        assert!(report.default_placement.is_none());
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_reload_replaces_rules_for_later_events() {
        let (client, _) = triage_board();
        let engine = RuleEngine::new(client.clone(), RuleSet::empty());
        let event = RepositoryEvent::Issues(subject_event(EventAction::Labeled, ItemState::Open, &["bug"]));

        assert_eq!(engine.evaluate(&event).await.fired(), 0);

        engine
            .reload(RuleSet::new(vec![rule("bugs", ContentKind::Issue, ItemState::Open, "bug")]))
            .await;
        assert_eq!(engine.rules().await.len(), 1);
        assert_eq!(engine.evaluate(&event).await.fired(), 1);
    }

    #[tokio::test]
    async fn test_outcomes_serialize_with_rule_name() {
        let result = RuleResult {
            rule: RuleName::new("bugs").unwrap(),
            outcome: RuleOutcome::NotMatched {
                condition: RuleCondition::Label,
            },
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"rule": "bugs", "outcome": "not_matched", "condition": "label"})
        );
    }
}

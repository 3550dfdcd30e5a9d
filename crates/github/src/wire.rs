//! GitHub REST payloads and their conversion into board types.
//!
//! Only the fields the automation reads are declared; everything else in the
//! payload is ignored.

use board::{
    Board, BoardId, BoardName, Card, CardId, Column, ColumnId, ColumnName, ContentId,
    ContentItem, ContentKind, Hook, HookId, IssueNumber, ItemState, LabelName, Repository,
    RepositoryName,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Deserialize)]
pub(crate) struct WireRepository {
    pub name: String,
    pub full_name: String,
}

impl WireRepository {
    pub fn into_repository(self) -> Option<Repository> {
        Some(Repository {
            full_name: RepositoryName::new(self.full_name)?,
            name: self.name,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireProject {
    pub id: u64,
    pub name: String,
}

impl WireProject {
    pub fn into_board(self) -> Option<Board> {
        let Some(name) = BoardName::new(self.name) else {
            warn!(project = self.id, "Ignoring project without a name");
            return None;
        };
        Some(Board {
            id: BoardId::new(self.id),
            name,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireColumn {
    pub id: u64,
    pub name: String,
}

impl WireColumn {
    pub fn into_column(self, board: BoardId) -> Option<Column> {
        Some(Column {
            id: ColumnId::new(self.id),
            name: ColumnName::new(self.name)?,
            board_id: board,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireCard {
    pub id: u64,
    #[serde(default)]
    pub content_url: Option<String>,
}

impl WireCard {
    pub fn into_card(self, column: ColumnId) -> Card {
        Card {
            id: CardId::new(self.id),
            column_id: column,
            content_url: self.content_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireLabel {
    pub name: String,
}

fn label_names(labels: Vec<WireLabel>) -> Vec<LabelName> {
    labels
        .into_iter()
        .filter_map(|label| LabelName::new(label.name))
        .collect()
}

#[derive(Debug, Deserialize)]
pub(crate) struct WirePullRequestLinks {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireIssue {
    pub id: u64,
    pub number: u64,
    #[serde(default)]
    pub title: String,
    pub state: ItemState,
    #[serde(default)]
    pub labels: Vec<WireLabel>,
    /// Present only when the issue is a pull request.
    #[serde(default)]
    pub pull_request: Option<WirePullRequestLinks>,
}

impl WireIssue {
    pub fn into_item(self, repository: &RepositoryName) -> ContentItem {
        let (kind, pull_request_url) = match self.pull_request {
            Some(links) => (ContentKind::PullRequest, links.url),
            None => (ContentKind::Issue, None),
        };
        ContentItem {
            id: ContentId::new(self.id),
            number: IssueNumber::new(self.number),
            repository: repository.clone(),
            title: self.title,
            state: self.state,
            labels: label_names(self.labels),
            kind,
            pull_request_url,
            merged: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WirePullRequest {
    pub id: u64,
    pub number: u64,
    #[serde(default)]
    pub title: String,
    pub state: ItemState,
    #[serde(default)]
    pub labels: Vec<WireLabel>,
    #[serde(default)]
    pub merged: Option<bool>,
    pub url: String,
}

impl WirePullRequest {
    pub fn into_item(self, repository: &RepositoryName) -> ContentItem {
        ContentItem {
            id: ContentId::new(self.id),
            number: IssueNumber::new(self.number),
            repository: repository.clone(),
            title: self.title,
            state: self.state,
            labels: label_names(self.labels),
            kind: ContentKind::PullRequest,
            pull_request_url: Some(self.url),
            merged: self.merged,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct WireHookConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireHook {
    pub id: u64,
    #[serde(default)]
    pub config: WireHookConfig,
    #[serde(default)]
    pub events: Vec<String>,
}

impl WireHook {
    pub fn into_hook(self) -> Hook {
        Hook {
            id: HookId::new(self.id),
            url: self.config.url,
            events: self.events,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct NewCard {
    pub content_id: u64,
    pub content_type: ContentKind,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewHook<'a> {
    pub name: &'static str,
    pub active: bool,
    pub events: &'a [&'a str],
    pub config: WireHookConfig,
}

/// Error body returned by the API.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiMessage {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_issue_with_pull_request_linkage_is_a_pull_request() {
        let issue: WireIssue = serde_json::from_value(json!({
            "id": 11,
            "number": 7,
            "title": "Add feature",
            "state": "closed",
            "labels": [{"id": 1, "name": "feature"}],
            "pull_request": {"url": "https://api.github.com/repos/acme/x/pulls/7"}
        }))
        .unwrap();

        let item = issue.into_item(&RepositoryName::new("acme/x").unwrap());
        assert!(item.is_pull_request());
        assert_eq!(item.state, ItemState::Closed);
        assert_eq!(item.labels, vec![LabelName::new("feature").unwrap()]);
    }

    #[test]
    fn test_plain_issue_is_an_issue() {
        let issue: WireIssue = serde_json::from_value(json!({
            "id": 12, "number": 8, "title": "Crash", "state": "open", "labels": []
        }))
        .unwrap();
        let item = issue.into_item(&RepositoryName::new("acme/x").unwrap());
        assert_eq!(item.kind, ContentKind::Issue);
        assert!(item.pull_request_url.is_none());
    }

    #[test]
    fn test_new_card_body_uses_content_type_names() {
        let body = serde_json::to_value(NewCard {
            content_id: 5,
            content_type: ContentKind::PullRequest,
        })
        .unwrap();
        assert_eq!(body, json!({"content_id": 5, "content_type": "PullRequest"}));
    }
}

//! Report types and the label-frequency fold.
//!
//! A [`Report`] is recomputed from scratch on every run; nothing carries over
//! between runs. The fold is order-independent: counts are merged by label
//! name into a sorted map, so the order cards are visited in never changes
//! the totals.

use std::collections::BTreeMap;

use board::{
    BoardName, CardId, ContentItem, ContentKind, IssueNumber, ItemState, LabelName, ReportRunId,
    RepositoryName, Timestamp,
};
use serde::{Deserialize, Serialize};

/// A closed item found in a board's "Done" column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedCard {
    pub card: CardId,
    pub repository: RepositoryName,
    pub number: IssueNumber,
    pub title: String,
    pub kind: ContentKind,
    pub labels: Vec<LabelName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_request_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged: Option<bool>,
}

/// Point-in-time statistics for one board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub board_name: BoardName,
    /// Items in the "Done" column whose underlying state is closed.
    pub closed_count: usize,
    /// Subset of `closed_count` that are pull requests.
    pub pull_requests_closed: usize,
    /// Subset of `pull_requests_closed` known to be merged.
    pub pull_requests_merged: usize,
    pub label_counts: BTreeMap<LabelName, usize>,
    pub cards: Vec<ReportedCard>,
}

impl Report {
    /// An empty report for `board_name`.
    pub fn empty(board_name: BoardName) -> Self {
        Self {
            board_name,
            closed_count: 0,
            pull_requests_closed: 0,
            pull_requests_merged: 0,
            label_counts: BTreeMap::new(),
            cards: Vec::new(),
        }
    }

    /// Folds fetched items into a report.
    ///
    /// Items that are not closed are excluded: a card may sit in "Done" while
    /// its issue was reopened, and the item's own state wins.
    pub fn from_items(
        board_name: BoardName,
        items: impl IntoIterator<Item = (CardId, ContentItem)>,
    ) -> Self {
        items
            .into_iter()
            .fold(Self::empty(board_name), |mut report, (card, item)| {
                report.record(card, item);
                report
            })
    }

    fn record(&mut self, card: CardId, item: ContentItem) {
        if item.state != ItemState::Closed {
            return;
        }

        self.closed_count += 1;
        if item.is_pull_request() {
            self.pull_requests_closed += 1;
            if item.merged == Some(true) {
                self.pull_requests_merged += 1;
            }
        }
        for label in &item.labels {
            *self.label_counts.entry(label.clone()).or_insert(0) += 1;
        }

        self.cards.push(ReportedCard {
            card,
            repository: item.repository,
            number: item.number,
            title: item.title,
            kind: item.kind,
            labels: item.labels,
            pull_request_url: item.pull_request_url,
            merged: item.merged,
        });
    }

    /// Count for `label`, zero when absent.
    pub fn label_count(&self, label: &str) -> usize {
        LabelName::new(label)
            .and_then(|name| self.label_counts.get(&name).copied())
            .unwrap_or(0)
    }
}

/// A board that could not be reported on, with the cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OmittedBoard {
    pub board: BoardName,
    pub cause: String,
}

/// The result of one report run over many boards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSet {
    pub run: ReportRunId,
    pub generated_at: Timestamp,
    /// Successful reports keyed by board name.
    pub reports: BTreeMap<BoardName, Report>,
    /// Boards that failed or timed out.
    pub omitted: Vec<OmittedBoard>,
}

impl ReportSet {
    pub fn get(&self, board: &str) -> Option<&Report> {
        BoardName::new(board).and_then(|name| self.reports.get(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use board::testing::content_item;
    use board::ContentId;

    fn closed_issue(number: u64, labels: &[&str]) -> (CardId, ContentItem) {
        (
            CardId::new(number),
            content_item(
                ContentId::new(number + 1000),
                ContentKind::Issue,
                "acme/x",
                number,
                ItemState::Closed,
                labels,
            ),
        )
    }

    #[test]
    fn test_counts_closed_items_and_labels() {
        let report = Report::from_items(
            BoardName::new("Triage").unwrap(),
            vec![closed_issue(1, &["bug"]), closed_issue(2, &["bug", "urgent"])],
        );

        assert_eq!(report.closed_count, 2);
        assert_eq!(report.label_count("bug"), 2);
        assert_eq!(report.label_count("urgent"), 1);
        assert_eq!(report.label_count("docs"), 0);
        assert_eq!(report.cards.len(), 2);
    }

    #[test]
    fn test_labels_merge_case_sensitively() {
        let report = Report::from_items(
            BoardName::new("Triage").unwrap(),
            vec![closed_issue(1, &["Bug"]), closed_issue(2, &["bug"])],
        );
        assert_eq!(report.label_counts.len(), 2);
    }

    #[test]
    fn test_open_items_are_excluded() {
        let (card, mut reopened) = closed_issue(3, &["bug"]);
        reopened.state = ItemState::Open;

        let report = Report::from_items(
            BoardName::new("Triage").unwrap(),
            vec![closed_issue(1, &["bug"]), (card, reopened)],
        );

        assert_eq!(report.closed_count, 1);
        assert_eq!(report.label_count("bug"), 1);
    }

    #[test]
    fn test_pull_requests_are_counted_separately() {
        let pr = content_item(
            ContentId::new(77),
            ContentKind::PullRequest,
            "acme/x",
            7,
            ItemState::Closed,
            &[],
        );
        let report = Report::from_items(
            BoardName::new("Delivery").unwrap(),
            vec![closed_issue(1, &[]), (CardId::new(7), pr)],
        );

        assert_eq!(report.closed_count, 2);
        assert_eq!(report.pull_requests_closed, 1);
        assert_eq!(report.pull_requests_merged, 1);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = Report::from_items(
            BoardName::new("Triage").unwrap(),
            vec![closed_issue(1, &["bug"])],
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["boardName"], "Triage");
        assert_eq!(json["closedCount"], 1);
        assert_eq!(json["labelCounts"]["bug"], 1);
    }
}

//! The reporting aggregator.
//!
//! For each board: resolve its "Done" column, list the cards in it, look up
//! each card's issue, and fold the closed ones into a [`Report`]. Boards are
//! processed as independent tasks on a [`JoinSet`] and merged after the join;
//! a board that fails or exceeds its deadline is omitted from the run with
//! the cause, and the rest of the run still completes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use board::{
    Board, BoardClient, BoardError, BoardName, CardId, ColumnName, ContentItem, ItemState,
    ReportRunId, Timestamp,
};
use tokio::task::{self, JoinSet};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::deadline::bounded;
use crate::report::{OmittedBoard, Report, ReportSet};

/// Column whose cards are counted as done.
pub const DONE_COLUMN: &str = "Done";

/// Default bound on one board's report computation.
pub const DEFAULT_BOARD_DEADLINE: Duration = Duration::from_secs(60);

/// Produces per-board reports from the remote board state.
#[derive(Clone)]
pub struct ReportAggregator {
    client: Arc<dyn BoardClient>,
    board_deadline: Duration,
}

impl ReportAggregator {
    pub fn new(client: Arc<dyn BoardClient>) -> Self {
        Self {
            client,
            board_deadline: DEFAULT_BOARD_DEADLINE,
        }
    }

    /// Bounds each board's computation. A board that runs longer is omitted.
    pub fn with_board_deadline(mut self, deadline: Duration) -> Self {
        self.board_deadline = deadline;
        self
    }

    /// Reports on every open board.
    ///
    /// # Errors
    ///
    /// Fails only when the board list itself cannot be fetched; per-board
    /// failures are recorded in [`ReportSet::omitted`].
    pub async fn generate_all(&self) -> Result<ReportSet, BoardError> {
        let boards = bounded(self.board_deadline, "list_boards", self.client.list_boards()).await?;
        Ok(self.generate(boards).await)
    }

    /// Reports on `boards` concurrently.
    pub async fn generate(&self, boards: Vec<Board>) -> ReportSet {
        let run = ReportRunId::new_random();
        info!(%run, boards = boards.len(), "Generating reports");

        let mut tasks = JoinSet::new();
        let mut names: HashMap<task::Id, BoardName> = HashMap::with_capacity(boards.len());
        for board in boards {
            let client = Arc::clone(&self.client);
            let deadline = self.board_deadline;
            let span = info_span!("board_report", %run, board = %board.name);
            let name = board.name.clone();
            let handle = tasks.spawn(
                async move {
                    let result =
                        bounded(deadline, "board_report", board_report(client.as_ref(), &board))
                            .await;
                    (board.name, result)
                }
                .instrument(span),
            );
            names.insert(handle.id(), name);
        }

        let mut set = ReportSet {
            run,
            generated_at: Timestamp::now(),
            reports: Default::default(),
            omitted: Vec::new(),
        };
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, (name, Ok(report)))) => {
                    info!(%run, board = %name, closed = report.closed_count, "Processed report");
                    set.reports.insert(name, report);
                }
                Ok((_, (name, Err(err)))) => {
                    if err.is_not_found() {
                        info!(%run, board = %name, error = %err, "Omitting board from report");
                    } else {
                        warn!(%run, board = %name, error = %err, "Omitting board from report");
                    }
                    set.omitted.push(OmittedBoard {
                        board: name,
                        cause: err.to_string(),
                    });
                }
                Err(err) => {
                    let Some(name) = names.remove(&err.id()) else {
                        error!(%run, error = %err, "Report task for unknown board did not complete");
                        continue;
                    };
                    error!(%run, board = %name, error = %err, "Report task did not complete");
                    set.omitted.push(OmittedBoard {
                        board: name,
                        cause: format!("report task did not complete: {err}"),
                    });
                }
            }
        }
        set.omitted.sort_by(|a, b| a.board.cmp(&b.board));
        set
    }

    /// Reports on a single board.
    pub async fn report(&self, board: &Board) -> Result<Report, BoardError> {
        bounded(
            self.board_deadline,
            "board_report",
            board_report(self.client.as_ref(), board),
        )
        .await
    }
}

async fn board_report(client: &dyn BoardClient, board: &Board) -> Result<Report, BoardError> {
    let done = ColumnName::new(DONE_COLUMN)
        .ok_or_else(|| BoardError::not_found("column", DONE_COLUMN))?;
    let column = client.resolve_column_id(board.id, &done).await?;
    let cards = client.list_cards(column).await?;
    debug!(board = %board.name, cards = cards.len(), "Listed done cards");

    let mut items: Vec<(CardId, ContentItem)> = Vec::with_capacity(cards.len());
    for card in cards {
        let reference = match card.content_reference() {
            None => continue,
            Some(Err(err)) => {
                warn!(board = %board.name, card = %card.id, error = %err, "Skipping card");
                continue;
            }
            Some(Ok(reference)) => reference,
        };

        let item = match client.fetch_issue(&reference.repository, reference.number).await {
            Ok(item) => item,
            Err(err) if err.is_not_found() => {
                warn!(board = %board.name, %reference, error = %err, "Skipping card");
                continue;
            }
            Err(err) => return Err(err),
        };
        items.push((card.id, enrich(client, item).await?));
    }

    Ok(Report::from_items(board.name.clone(), items))
}

/// Fills in merge status for closed pull requests.
async fn enrich(client: &dyn BoardClient, item: ContentItem) -> Result<ContentItem, BoardError> {
    if !item.is_pull_request() || item.state != ItemState::Closed {
        return Ok(item);
    }
    match client.fetch_pull_request(&item.repository, item.number).await {
        Ok(pull) => Ok(ContentItem {
            merged: pull.merged,
            ..item
        }),
        Err(err) if err.is_not_found() => Ok(item),
        Err(err) => Err(err),
    }
}

//! The [`BoardClient`] port.
//!
//! Infrastructure crates implement the required methods, which map one-to-one
//! onto remote API calls. The provided methods build the board-domain
//! operations (name resolution, delete-by-content) on top of them, so every
//! implementation resolves names and locates cards the same way.
//!
//! Implementations hold no mutable state beyond a connection handle and must
//! be safe to share across concurrent tasks.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    Board, BoardError, BoardId, BoardName, Card, CardId, Column, ColumnId, ColumnName,
    ContentId, ContentItem, ContentKind, Hook, IssueNumber, RepositoryName, Repository,
};

/// Typed access to the remote project-board API.
#[async_trait]
pub trait BoardClient: Send + Sync {
    /// Lists the organisation's repositories. Used for inventory logging only.
    async fn list_repositories(&self) -> Result<Vec<Repository>, BoardError>;

    /// Lists the organisation's open boards.
    async fn list_boards(&self) -> Result<Vec<Board>, BoardError>;

    /// Lists the columns of a board.
    async fn list_columns(&self, board: BoardId) -> Result<Vec<Column>, BoardError>;

    /// Lists the cards of a column.
    async fn list_cards(&self, column: ColumnId) -> Result<Vec<Card>, BoardError>;

    /// Creates a card in `column` for the content item with global id `content`.
    ///
    /// Not retried. A [`BoardError::Conflict`] means the item is already on
    /// the board.
    async fn create_card(
        &self,
        column: ColumnId,
        kind: ContentKind,
        content: ContentId,
    ) -> Result<Card, BoardError>;

    /// Deletes a card by id.
    async fn delete_card(&self, card: CardId) -> Result<(), BoardError>;

    /// Fetches an issue. Pull requests are also returned by this lookup,
    /// distinguished by [`ContentItem::kind`].
    async fn fetch_issue(
        &self,
        repository: &RepositoryName,
        number: IssueNumber,
    ) -> Result<ContentItem, BoardError>;

    /// Fetches a pull request.
    async fn fetch_pull_request(
        &self,
        repository: &RepositoryName,
        number: IssueNumber,
    ) -> Result<ContentItem, BoardError>;

    /// Lists the organisation's webhooks.
    async fn list_hooks(&self) -> Result<Vec<Hook>, BoardError>;

    /// Creates an organisation webhook delivering `events` as JSON to `url`.
    async fn create_hook(&self, url: &str, events: &[&str]) -> Result<Hook, BoardError>;

    // -----------------------------------------------------------------------
    // Provided board-domain operations
    // -----------------------------------------------------------------------

    /// Resolves a board name to its id by exact, case-sensitive match.
    ///
    /// When several open boards share the name, the lowest id wins.
    async fn resolve_board_id(&self, name: &BoardName) -> Result<BoardId, BoardError> {
        let boards = self.list_boards().await?;
        let ids = boards
            .iter()
            .filter(|board| &board.name == name)
            .map(|board| board.id);
        lowest_id(ids, "board", name.as_str())
    }

    /// Resolves a column name to its id within `board`.
    ///
    /// When several columns share the name, the lowest id wins.
    async fn resolve_column_id(
        &self,
        board: BoardId,
        name: &ColumnName,
    ) -> Result<ColumnId, BoardError> {
        let columns = self.list_columns(board).await?;
        let ids = columns
            .iter()
            .filter(|column| &column.name == name)
            .map(|column| column.id);
        lowest_id(ids, "column", name.as_str())
    }

    /// Deletes the first card on `board` whose content is `repository#number`.
    ///
    /// Scans every column, then every card in each column: O(columns x cards).
    /// Returns the id of the deleted card.
    async fn delete_card_by_content(
        &self,
        repository: &RepositoryName,
        number: IssueNumber,
        board: BoardId,
    ) -> Result<CardId, BoardError> {
        for column in self.list_columns(board).await? {
            for card in self.list_cards(column.id).await? {
                match card.content_reference() {
                    Some(Ok(reference)) if reference.refers_to(repository, number) => {
                        self.delete_card(card.id).await?;
                        return Ok(card.id);
                    }
                    Some(Err(err)) => {
                        debug!(card = %card.id, column = %column.name, error = %err, "Skipping card");
                    }
                    _ => {}
                }
            }
        }
        Err(BoardError::not_found(
            "card",
            format!("{repository}#{number} on board {board}"),
        ))
    }
}

fn lowest_id<I>(ids: impl Iterator<Item = I>, resource: &str, name: &str) -> Result<I, BoardError>
where
    I: Ord + Copy + std::fmt::Display,
{
    let mut ids: Vec<I> = ids.collect();
    ids.sort_unstable();
    match ids.as_slice() {
        [] => Err(BoardError::not_found(resource, name)),
        [id] => Ok(*id),
        [id, ..] => {
            warn!(resource, name, candidates = ids.len(), chosen = %id, "Ambiguous name, using lowest id");
            Ok(*id)
        }
    }
}

//! In-memory [`BoardClient`] for tests.
//!
//! Holds boards, columns, cards, content items and hooks in a mutex-guarded
//! map and records every mutation, so tests can assert on exactly which
//! remote calls a component issued. Boards can be made to fail or stall to
//! exercise error and deadline handling.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::{
    Board, BoardClient, BoardError, BoardId, BoardName, Card, CardId, Column, ColumnId,
    ColumnName, ContentId, ContentItem, ContentKind, Hook, HookId, IssueNumber, ItemState,
    LabelName, RepositoryName, Repository,
};

/// A remote call recorded by [`InMemoryBoardClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardCall {
    CreateCard {
        column: ColumnId,
        kind: ContentKind,
        content: ContentId,
    },
    DeleteCard {
        card: CardId,
    },
    CreateHook {
        url: String,
    },
}

#[derive(Default)]
struct State {
    next_id: u64,
    repositories: Vec<Repository>,
    boards: Vec<Board>,
    columns: Vec<Column>,
    cards: BTreeMap<CardId, Card>,
    items: HashMap<(RepositoryName, IssueNumber), ContentItem>,
    hooks: Vec<Hook>,
    failing_boards: HashSet<BoardId>,
    stalled_boards: HashSet<BoardId>,
    panicking_boards: HashSet<BoardId>,
    calls: Vec<BoardCall>,
}

impl State {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn board_of(&self, column: ColumnId) -> Option<BoardId> {
        self.columns
            .iter()
            .find(|c| c.id == column)
            .map(|c| c.board_id)
    }

    fn item_by_content(&self, content: ContentId) -> Option<&ContentItem> {
        self.items.values().find(|item| item.id == content)
    }
}

/// See the [module documentation](self).
#[derive(Default)]
pub struct InMemoryBoardClient {
    state: Mutex<State>,
}

impl InMemoryBoardClient {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 100,
                ..State::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("in-memory board state poisoned")
    }

    pub fn add_repository(&self, full_name: &str) {
        let name = full_name.rsplit('/').next().unwrap_or(full_name).to_string();
        self.state().repositories.push(Repository {
            name,
            full_name: RepositoryName::new(full_name).expect("repository name"),
        });
    }

    pub fn add_board(&self, name: &str) -> BoardId {
        let id = BoardId::new(self.state().allocate());
        self.add_board_with_id(id, name);
        id
    }

    /// Adds a board with a fixed id, for tie-break tests.
    pub fn add_board_with_id(&self, id: BoardId, name: &str) {
        self.state().boards.push(Board {
            id,
            name: BoardName::new(name).expect("board name"),
        });
    }

    pub fn add_column(&self, board: BoardId, name: &str) -> ColumnId {
        let mut state = self.state();
        let id = ColumnId::new(state.allocate());
        state.columns.push(Column {
            id,
            name: ColumnName::new(name).expect("column name"),
            board_id: board,
        });
        id
    }

    /// Adds a card with an arbitrary (possibly malformed) content URL.
    pub fn add_card(&self, column: ColumnId, content_url: Option<&str>) -> CardId {
        let mut state = self.state();
        let id = CardId::new(state.allocate());
        state.cards.insert(
            id,
            Card {
                id,
                column_id: column,
                content_url: content_url.map(str::to_string),
            },
        );
        id
    }

    /// Registers a content item so `fetch_issue`/`fetch_pull_request` find it.
    pub fn add_item(&self, item: ContentItem) {
        self.state()
            .items
            .insert((item.repository.clone(), item.number), item);
    }

    /// Registers an issue (or pull request) and places a card for it in `column`.
    pub fn add_item_card(
        &self,
        column: ColumnId,
        kind: ContentKind,
        repository: &str,
        number: u64,
        state: ItemState,
        labels: &[&str],
    ) -> CardId {
        let content_id = ContentId::new(self.state().allocate());
        let item = content_item(content_id, kind, repository, number, state, labels);
        let url = content_url(repository, number);
        self.add_item(item);
        self.add_card(column, Some(&url))
    }

    pub fn add_hook(&self, url: &str, events: &[&str]) -> HookId {
        let mut state = self.state();
        let id = HookId::new(state.allocate());
        state.hooks.push(Hook {
            id,
            url: Some(url.to_string()),
            events: events.iter().map(|e| e.to_string()).collect(),
        });
        id
    }

    /// Makes every column/card listing on `board` fail as if the remote were down.
    pub fn fail_board(&self, board: BoardId) {
        self.state().failing_boards.insert(board);
    }

    /// Makes every column listing on `board` hang forever.
    pub fn stall_board(&self, board: BoardId) {
        self.state().stalled_boards.insert(board);
    }

    /// Makes every column listing on `board` panic the calling task.
    pub fn panic_board(&self, board: BoardId) {
        self.state().panicking_boards.insert(board);
    }

    /// All mutations issued so far, in order.
    pub fn calls(&self) -> Vec<BoardCall> {
        self.state().calls.clone()
    }

    /// Cards currently in `column`.
    pub fn cards_in(&self, column: ColumnId) -> Vec<Card> {
        self.state()
            .cards
            .values()
            .filter(|card| card.column_id == column)
            .cloned()
            .collect()
    }

    fn check_board(&self, board: BoardId, operation: &str) -> Result<bool, BoardError> {
        let state = self.state();
        if state.panicking_boards.contains(&board) {
            drop(state);
            panic!("{operation} panicked for board {board}");
        }
        if state.failing_boards.contains(&board) {
            return Err(BoardError::remote(operation, "connection reset"));
        }
        Ok(state.stalled_boards.contains(&board))
    }
}

/// Builds the content URL the remote uses for an issue.
pub fn content_url(repository: &str, number: u64) -> String {
    format!("https://api.github.com/repos/{repository}/issues/{number}")
}

/// Builds a [`ContentItem`] for tests.
pub fn content_item(
    id: ContentId,
    kind: ContentKind,
    repository: &str,
    number: u64,
    state: ItemState,
    labels: &[&str],
) -> ContentItem {
    ContentItem {
        id,
        number: IssueNumber::new(number),
        repository: RepositoryName::new(repository).expect("repository name"),
        title: format!("{repository}#{number}"),
        state,
        labels: labels.iter().filter_map(|l| LabelName::new(*l)).collect(),
        kind,
        pull_request_url: (kind == ContentKind::PullRequest)
            .then(|| format!("https://api.github.com/repos/{repository}/pulls/{number}")),
        merged: (kind == ContentKind::PullRequest).then_some(state == ItemState::Closed),
    }
}

#[async_trait]
impl BoardClient for InMemoryBoardClient {
    async fn list_repositories(&self) -> Result<Vec<Repository>, BoardError> {
        Ok(self.state().repositories.clone())
    }

    async fn list_boards(&self) -> Result<Vec<Board>, BoardError> {
        Ok(self.state().boards.clone())
    }

    async fn list_columns(&self, board: BoardId) -> Result<Vec<Column>, BoardError> {
        if self.check_board(board, "list_columns")? {
            std::future::pending::<()>().await;
        }
        Ok(self
            .state()
            .columns
            .iter()
            .filter(|c| c.board_id == board)
            .cloned()
            .collect())
    }

    async fn list_cards(&self, column: ColumnId) -> Result<Vec<Card>, BoardError> {
        let board = self.state().board_of(column);
        if let Some(board) = board {
            self.check_board(board, "list_cards")?;
        }
        Ok(self.cards_in(column))
    }

    async fn create_card(
        &self,
        column: ColumnId,
        kind: ContentKind,
        content: ContentId,
    ) -> Result<Card, BoardError> {
        let mut state = self.state();
        state.calls.push(BoardCall::CreateCard {
            column,
            kind,
            content,
        });

        let board = state
            .board_of(column)
            .ok_or_else(|| BoardError::not_found("column", column))?;
        let url = state
            .item_by_content(content)
            .map(|item| content_url(item.repository.as_str(), item.number.as_u64()));

        if url.is_some() {
            let duplicate = state
                .cards
                .values()
                .any(|card| card.content_url == url && state.board_of(card.column_id) == Some(board));
            if duplicate {
                return Err(BoardError::Conflict {
                    operation: "create_card".into(),
                    message: "Project already has the associated issue".into(),
                });
            }
        }

        let id = CardId::new(state.allocate());
        let card = Card {
            id,
            column_id: column,
            content_url: url,
        };
        state.cards.insert(id, card.clone());
        Ok(card)
    }

    async fn delete_card(&self, card: CardId) -> Result<(), BoardError> {
        let mut state = self.state();
        state.calls.push(BoardCall::DeleteCard { card });
        state
            .cards
            .remove(&card)
            .map(|_| ())
            .ok_or_else(|| BoardError::not_found("card", card))
    }

    async fn fetch_issue(
        &self,
        repository: &RepositoryName,
        number: IssueNumber,
    ) -> Result<ContentItem, BoardError> {
        self.state()
            .items
            .get(&(repository.clone(), number))
            .cloned()
            .map(|item| ContentItem {
                merged: None,
                ..item
            })
            .ok_or_else(|| BoardError::not_found("issue", format!("{repository}#{number}")))
    }

    async fn fetch_pull_request(
        &self,
        repository: &RepositoryName,
        number: IssueNumber,
    ) -> Result<ContentItem, BoardError> {
        self.state()
            .items
            .get(&(repository.clone(), number))
            .filter(|item| item.is_pull_request())
            .cloned()
            .ok_or_else(|| BoardError::not_found("pull request", format!("{repository}#{number}")))
    }

    async fn list_hooks(&self) -> Result<Vec<Hook>, BoardError> {
        Ok(self.state().hooks.clone())
    }

    async fn create_hook(&self, url: &str, events: &[&str]) -> Result<Hook, BoardError> {
        let mut state = self.state();
        state.calls.push(BoardCall::CreateHook {
            url: url.to_string(),
        });
        let hook = Hook {
            id: HookId::new(state.allocate()),
            url: Some(url.to_string()),
            events: events.iter().map(|e| e.to_string()).collect(),
        };
        state.hooks.push(hook.clone());
        Ok(hook)
    }
}

//! Shared value types for the board domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (a content reference always has a
//! repository and a positive number) and participate in rule and report
//! computations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    BoardError, BoardId, BoardName, CardId, ColumnId, ColumnName, ContentId, HookId, IssueNumber,
    LabelName, RepositoryName,
};

// ---------------------------------------------------------------------------
// Content classification
// ---------------------------------------------------------------------------

/// The kind of content item a card or event refers to.
///
/// Serialised as `"PullRequest"` / `"Issue"`, which is both the value used in
/// rule files and the `content_type` the remote expects when creating a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    PullRequest,
    Issue,
}

impl ContentKind {
    /// Returns the wire name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PullRequest => "PullRequest",
            Self::Issue => "Issue",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------

/// Open/closed state of an issue or pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    Open,
    Closed,
}

impl ItemState {
    /// Returns the wire name of this state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Board structure
// ---------------------------------------------------------------------------

/// A project board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub name: BoardName,
}

/// A named column within a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub name: ColumnName,
    pub board_id: BoardId,
}

/// An entry in a column.
///
/// `content_url` is `None` for free-text notes, which automation ignores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub column_id: ColumnId,
    pub content_url: Option<String>,
}

impl Card {
    /// Parses the card's content URL, if it has one.
    pub fn content_reference(&self) -> Option<Result<ContentReference, BoardError>> {
        self.content_url.as_deref().map(ContentReference::parse)
    }
}

// ---------------------------------------------------------------------------
// Content references
// ---------------------------------------------------------------------------

/// The `(repository, number)` pair a card's content URL points at.
///
/// Content URLs have the shape `<api base>/repos/<owner>/<name>/issues/<number>`
/// (pull requests may also appear under `/pulls/`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentReference {
    pub repository: RepositoryName,
    pub number: IssueNumber,
}

impl ContentReference {
    /// Parses a content URL into a reference.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::MalformedContentReference`] when the URL has no
    /// `/repos/` segment, the wrong number of path segments, an unknown
    /// content collection, or a non-numeric number.
    pub fn parse(url: &str) -> Result<Self, BoardError> {
        let malformed = || BoardError::MalformedContentReference {
            reference: url.to_string(),
        };

        let (_, path) = url.split_once("/repos/").ok_or_else(malformed)?;
        let segments: Vec<&str> = path.trim_end_matches('/').split('/').collect();
        let [owner, name, collection, number] = segments.as_slice() else {
            return Err(malformed());
        };
        if !matches!(*collection, "issues" | "pulls") {
            return Err(malformed());
        }
        let number: u64 = number.parse().map_err(|_| malformed())?;
        if number == 0 || owner.is_empty() || name.is_empty() {
            return Err(malformed());
        }
        let repository = RepositoryName::new(format!("{owner}/{name}")).ok_or_else(malformed)?;

        Ok(Self {
            repository,
            number: IssueNumber::new(number),
        })
    }

    /// Returns `true` if this reference names `number` in `repository`.
    pub fn refers_to(&self, repository: &RepositoryName, number: IssueNumber) -> bool {
        &self.repository == repository && self.number == number
    }
}

impl std::fmt::Display for ContentReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.repository, self.number)
    }
}

// ---------------------------------------------------------------------------
// Content items
// ---------------------------------------------------------------------------

/// An issue or pull request as fetched from the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentId,
    pub number: IssueNumber,
    pub repository: RepositoryName,
    pub title: String,
    pub state: ItemState,
    pub labels: Vec<LabelName>,
    pub kind: ContentKind,

    /// Pull-request linkage. Present when the item fetched through the issues
    /// endpoint is actually a pull request.
    pub pull_request_url: Option<String>,

    /// Whether a pull request was merged. Only known from a pull-request
    /// lookup; `None` for issues and for items fetched as issues.
    pub merged: Option<bool>,
}

impl ContentItem {
    /// Returns `true` if the item is a pull request.
    pub fn is_pull_request(&self) -> bool {
        self.kind == ContentKind::PullRequest
    }
}

// ---------------------------------------------------------------------------
// Organisation inventory
// ---------------------------------------------------------------------------

/// A repository, listed for inventory logging only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: RepositoryName,
}

/// An organisation webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hook {
    pub id: HookId,
    /// Delivery URL. `None` for hooks whose config carries no URL.
    pub url: Option<String>,
    pub events: Vec<String>,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

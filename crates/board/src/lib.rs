//! Board domain for Projector.
//!
//! This crate contains every domain concept, newtype identifier, and error
//! type used by the automation, plus the [`BoardClient`] port through which
//! the remote board is read and mutated. Infrastructure crates implement the
//! port; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`BoardId`, `ColumnName`, etc.) |
//! | [`types`] | Boards, columns, cards, content items and references |
//! | [`event`] | The decoded repository event envelope |
//! | [`rule`] | Label rules and their matching conditions |
//! | [`client`] | The `BoardClient` port and its provided resolution operations |
//! | [`errors`] | `BoardError` and `RetryPolicy` |

pub mod client;
pub mod errors;
pub mod event;
pub mod identifiers;
pub mod rule;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use client::BoardClient;
pub use errors::{BoardError, RetryPolicy};
pub use event::{EventAction, RepositoryEvent, Subject, SubjectEvent};
pub use identifiers::{
    BoardId, BoardName, CardId, ColumnId, ColumnName, ContentId, HookId, IssueNumber, LabelName,
    ReportRunId, RepositoryName, RuleName,
};
pub use rule::{LabelRule, RuleCondition};
pub use types::{
    Board, Card, Column, ContentItem, ContentKind, ContentReference, Hook, ItemState, Repository,
    Timestamp,
};

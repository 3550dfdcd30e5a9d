//! Newtype domain identifiers.
//!
//! Every board concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging, for example,
//! a [`ColumnId`] with a [`BoardId`] even though both are `u64` on the wire.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Macro for u64-wrapped newtypes (GitHub-assigned integers).
// Generates: struct (Copy), new(), as_u64(), Display.
// ---------------------------------------------------------------------------
macro_rules! u64_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new identifier from a raw integer.
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the underlying integer value.
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers — GitHub-integer-backed
// ---------------------------------------------------------------------------

u64_id! {
    /// Identifies a project board.
    BoardId
}

u64_id! {
    /// Identifies a column within a project board.
    ColumnId
}

u64_id! {
    /// Identifies a card within a column.
    CardId
}

u64_id! {
    /// The remote's global identifier of an issue or pull request.
    ///
    /// This is the id a card is created against; it is *not* the
    /// per-repository [`IssueNumber`].
    ContentId
}

u64_id! {
    /// Per-repository issue or pull request number (the `#42` in the UI).
    IssueNumber
}

u64_id! {
    /// Identifies an organisation webhook.
    HookId
}

// ---------------------------------------------------------------------------
// Identifiers — UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single report run.
///
/// Generated fresh for every aggregation so that all log output from the
/// fan-out over boards can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportRunId(Uuid);

impl ReportRunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ReportRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers — String-backed (configuration / GitHub names)
// ---------------------------------------------------------------------------

string_id! {
    /// Name of a project board. Matched case-sensitively.
    BoardName
}

string_id! {
    /// Name of a column, unique within its board.
    ColumnName
}

string_id! {
    /// Name of a label. Labels are compared by name, not by remote identity.
    LabelName
}

string_id! {
    /// Identifies a GitHub repository in `"owner/repo"` format.
    RepositoryName
}

string_id! {
    /// Name of a configured label rule, used for logging and outcomes.
    RuleName
}

//! Error and retry-policy types for board operations.
//!
//! [`BoardError`] is the single error type crossing the [`crate::BoardClient`]
//! port. Infrastructure adapters map their transport failures onto it;
//! the rule engine and report aggregator decide from the variant whether a
//! failure is an expected skip or a reportable fault.
//!
//! [`RetryPolicy`] is a cross-cutting concern: nothing in this workspace
//! retries automatically, but every error can say whether a retry by a
//! higher layer would be safe.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt, e.g. from `Retry-After`.
        /// `None` means apply the caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried without operator action.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Board errors
// ---------------------------------------------------------------------------

/// Errors produced by board operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoardError {
    /// A named board, column, card or content item does not exist.
    ///
    /// Expected and non-fatal: callers log it and skip the action.
    #[error("{resource} not found: {key}")]
    NotFound {
        /// Kind of the missing resource (`"board"`, `"column"`, ...).
        resource: String,
        /// Name or identifier that was looked up.
        key: String,
    },

    /// The remote API could not be reached or answered with a failure.
    ///
    /// Propagated to the caller of the enclosing operation, whose result is
    /// unreliable when this occurs.
    #[error("Remote unavailable during {operation}: {message}")]
    RemoteUnavailable {
        /// Board operation that was being performed.
        operation: String,
        /// Transport or API error description.
        message: String,
        /// HTTP status, when the remote answered at all.
        status: Option<u16>,
        /// Server-requested back-off, when provided.
        retry_after: Option<Duration>,
    },

    /// A remote call did not finish within the caller-supplied deadline.
    #[error("Deadline of {deadline:?} exceeded during {operation}")]
    DeadlineExceeded {
        /// Board operation that was being performed.
        operation: String,
        /// The deadline that elapsed.
        deadline: Duration,
    },

    /// The remote rejected a mutation because of existing state, e.g. the
    /// content item already has a card on the board.
    #[error("Conflict during {operation}: {message}")]
    Conflict {
        /// Board operation that was being performed.
        operation: String,
        /// Remote validation message.
        message: String,
    },

    /// A card's content URL does not parse into `(repository, number)`.
    #[error("Malformed content reference: {reference}")]
    MalformedContentReference {
        /// The offending URL.
        reference: String,
    },
}

impl BoardError {
    /// Builds a [`BoardError::NotFound`].
    pub fn not_found(resource: impl Into<String>, key: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.into(),
            key: key.to_string(),
        }
    }

    /// Builds a [`BoardError::RemoteUnavailable`] for a transport failure.
    pub fn remote(operation: impl Into<String>, message: impl ToString) -> Self {
        Self::RemoteUnavailable {
            operation: operation.into(),
            message: message.to_string(),
            status: None,
            retry_after: None,
        }
    }

    /// Returns `true` for the expected, non-fatal "does not exist" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if the remote could not produce a reliable answer.
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            Self::RemoteUnavailable { .. } | Self::DeadlineExceeded { .. }
        )
    }

    /// Classifies this error for a higher layer that wants to retry.
    ///
    /// Authentication failures (401/403) are never retryable; other remote
    /// failures and deadlines are.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::RemoteUnavailable {
                status: Some(401 | 403),
                ..
            } => RetryPolicy::NonRetryable,
            Self::RemoteUnavailable { retry_after, .. } => RetryPolicy::Retryable {
                after: *retry_after,
            },
            Self::DeadlineExceeded { .. } => RetryPolicy::Retryable { after: None },
            Self::NotFound { .. } | Self::Conflict { .. } | Self::MalformedContentReference { .. } => {
                RetryPolicy::NonRetryable
            }
        }
    }
}

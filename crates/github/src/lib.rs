//! Projector GitHub infrastructure adapter.
//!
//! Implements [`board::BoardClient`] over the GitHub REST v3 API (classic
//! Projects, organisation hooks, issues and pull requests).
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules.
//! Authentication, pagination and the mapping of HTTP statuses onto
//! [`board::BoardError`] are handled here; the `automation` crate never
//! sees them.
//!
//! | Status | Mapped to |
//! |--------|-----------|
//! | 404 | `BoardError::NotFound` |
//! | 422 | `BoardError::Conflict` |
//! | 401 / 403 | `BoardError::RemoteUnavailable` (not retryable) |
//! | 429 / 5xx | `BoardError::RemoteUnavailable` carrying `Retry-After` |

mod client;
mod wire;

pub use client::{GithubClient, GithubConfig, GithubError, DEFAULT_API_URL};

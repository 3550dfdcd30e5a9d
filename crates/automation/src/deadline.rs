use std::future::Future;
use std::time::Duration;

use board::BoardError;

/// Runs a remote operation under `deadline`.
///
/// An elapsed deadline becomes [`BoardError::DeadlineExceeded`] naming
/// `operation`; the operation itself is dropped.
pub(crate) async fn bounded<T, F>(
    deadline: Duration,
    operation: &str,
    future: F,
) -> Result<T, BoardError>
where
    F: Future<Output = Result<T, BoardError>>,
{
    tokio::time::timeout(deadline, future)
        .await
        .unwrap_or_else(|_| {
            Err(BoardError::DeadlineExceeded {
                operation: operation.to_string(),
                deadline,
            })
        })
}

use std::future::Future;

use tlog_types::{StorageError, StorageResult};
use tokio_util::sync::CancellationToken;

/// Races `fut` against `cancel`, surfacing a generic cancellation error
/// (spec §5) instead of letting the backend future run to completion. Used
/// at the boundary of every long-running DAL/transaction operation rather
/// than threaded into individual SQL statements, since rollback — the
/// actual effect of cancelling mid-transaction — only makes sense at that
/// granularity.
pub async fn run_cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = StorageResult<T>>,
) -> StorageResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StorageError::cancelled()),
        result = fut => result,
    }
}

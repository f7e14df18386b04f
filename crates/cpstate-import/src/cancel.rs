use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::error::{ImportError, ImportResult};

/// Run `fut` unless the token fires first
pub(crate) async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> ImportResult<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ImportError::Cancelled),
        out = fut => Ok(out),
    }
}

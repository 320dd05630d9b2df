//! Cancellable waiting: single remote calls and fixed-interval polling.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Awaits `fut` unless `cancel` fires first.
///
/// # Errors
///
/// Returns the future's own error, or [`Error::Cancelled`].
pub async fn until_cancelled<T, Fut>(cancel: &CancellationToken, fut: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}

/// Repeatedly runs `probe` until it yields a value, sleeping `interval`
/// between attempts.
///
/// `probe` receives the zero-based attempt number. There is no attempt limit;
/// the loop ends when the probe finds something, when it fails, or when
/// `cancel` fires, in which case [`Error::Cancelled`] is returned.
///
/// # Errors
///
/// Propagates the first probe error, or [`Error::Cancelled`].
pub async fn poll_until<T, P, Fut>(
    interval: Duration,
    cancel: &CancellationToken,
    mut probe: P,
) -> Result<T>
where
    P: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let mut attempt = 0u32;
    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let found = until_cancelled(cancel, probe(attempt)).await?;
        if let Some(value) = found {
            return Ok(value);
        }
        attempt = attempt.saturating_add(1);
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            () = tokio::time::sleep(interval) => {}
        }
    }
}

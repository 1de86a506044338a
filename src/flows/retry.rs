use std::future::Future;

use chrono::Duration;

use crate::AuthError;

fn is_transient(err: &AuthError) -> bool {
    matches!(
        err,
        AuthError::StorageError(_) | AuthError::UpstreamUnavailable
    )
}

/// Runs a store call under a timeout, retrying once with backoff.
///
/// A timeout or transient store failure on both tries surfaces as
/// `UpstreamUnavailable`; it must never masquerade as a credential
/// failure. Non-transient errors propagate immediately.
pub(crate) async fn with_retry<T, F, Fut>(
    store_timeout: Duration,
    backoff: Duration,
    op: F,
) -> Result<T, AuthError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, AuthError>>,
{
    let timeout = store_timeout
        .to_std()
        .map_err(|_| AuthError::ConfigurationError("negative store timeout".to_owned()))?;

    match tokio::time::timeout(timeout, op()).await {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(err)) if !is_transient(&err) => return Err(err),
        Ok(Err(_)) => {
            log::warn!(target: "palisade_flows", "msg=\"store_call_failed_retrying\"");
        }
        Err(_) => {
            log::warn!(target: "palisade_flows", "msg=\"store_call_timed_out_retrying\"");
        }
    }

    tokio::time::sleep(backoff.to_std().unwrap_or_default()).await;

    match tokio::time::timeout(timeout, op()).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) if !is_transient(&err) => Err(err),
        _ => Err(AuthError::UpstreamUnavailable),
    }
}

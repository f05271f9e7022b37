//! Classifies `tokio_postgres::Error`s into the `TransientDbError`/
//! `FatalDbError` taxonomy and retries the former with exponential backoff
//! up to a small cap.

use std::time::Duration;

use backoff::{
    backoff::Backoff,
    ExponentialBackoff,
    ExponentialBackoffBuilder,
};
use ix_errors::IndexPilotError;

/// Classifies a raw error from the driver into the taxonomy. Connection
/// resets and serialization failures are transient; permission and schema
/// errors are fatal.
pub fn classify(err: &tokio_postgres::Error) -> IndexPilotError {
    if err.is_closed() {
        return IndexPilotError::TransientDb(err.to_string());
    }
    if let Some(db_err) = err.as_db_error() {
        use tokio_postgres::error::SqlState;
        return match *db_err.code() {
            SqlState::T_R_SERIALIZATION_FAILURE
            | SqlState::T_R_DEADLOCK_DETECTED
            | SqlState::ADMIN_SHUTDOWN
            | SqlState::CANNOT_CONNECT_NOW
            | SqlState::CONNECTION_EXCEPTION
            | SqlState::CONNECTION_FAILURE => IndexPilotError::TransientDb(db_err.message().to_owned()),
            _ => IndexPilotError::FatalDb(db_err.message().to_owned()),
        };
    }
    IndexPilotError::TransientDb(err.to_string())
}

fn backoff_policy(max_attempts: u32, base: Duration) -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(base)
        .with_max_interval(base * 8)
        .with_max_elapsed_time(Some(base * 2u32.pow(max_attempts.min(8))))
        .build()
}

/// Runs `f`, retrying up to `max_attempts` times with exponential backoff
/// whenever the error classifies as transient. Fatal errors and exhausted
/// retries are surfaced immediately.
pub async fn with_db_retry<T, F, Fut>(
    max_attempts: u32,
    base_backoff: Duration,
    mut f: F,
) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<T>>,
{
    let mut policy = backoff_policy(max_attempts, base_backoff);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                let retryable = e
                    .downcast_ref::<IndexPilotError>()
                    .map(IndexPilotError::is_retryable)
                    .or_else(|| e.downcast_ref::<tokio_postgres::Error>().map(|pe| classify(pe).is_retryable()))
                    .unwrap_or(false);
                if !retryable || attempt >= max_attempts {
                    return Err(e);
                }
                let Some(wait) = policy.next_backoff() else {
                    return Err(e);
                };
                tracing::warn!(attempt, ?wait, "retrying after transient database error: {e:#}");
                tokio::time::sleep(wait).await;
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{
        AtomicU32,
        Ordering,
    };

    #[tokio::test]
    async fn succeeds_after_transient_failures_within_budget() {
        let calls = AtomicU32::new(0);
        let result: anyhow::Result<u32> = with_db_retry(3, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(anyhow::anyhow!(IndexPilotError::TransientDb("reset".into())))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: anyhow::Result<u32> = with_db_retry(3, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(anyhow::anyhow!(IndexPilotError::FatalDb("denied".into()))) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

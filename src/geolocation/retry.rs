use crate::error::GeoError;
use std::future::Future;
use std::time::Duration;
use tokio_retry::Retry;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Run `op` up to `max_attempts` times, sleeping `attempt * base` between tries.
///
/// A cancelled `cancel` abandons the lookup, including an attempt in flight.
pub async fn retry_linear<T, F, Fut>(
    max_attempts: u32,
    base: Duration,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T, GeoError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, GeoError>>,
{
    let strategy = (1..max_attempts).map(move |attempt| base * attempt);

    let mut attempt = 0;
    let action = move || {
        attempt += 1;
        let current = attempt;
        let fut = op(current);
        async move {
            fut.await.map_err(|e| {
                warn!(attempt = current, max_attempts, error = %e, "Distance lookup attempt failed");
                e
            })
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GeoError::Cancelled),
        result = Retry::spawn(strategy, action) => result.map_err(|last| GeoError::RetriesExhausted {
            attempts: max_attempts,
            source: Box::new(last),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn backs_off_linearly_then_gives_up() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let start = Instant::now();
        let cancel = CancellationToken::new();

        let result: Result<i64, _> = retry_linear(3, Duration::from_secs(1), &cancel, |_| {
            let calls = calls.clone();
            async move {
                calls.lock().unwrap().push(start.elapsed());
                Err(GeoError::Status(500))
            }
        })
        .await;

        let calls = calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1] - calls[0], Duration::from_secs(1));
        assert_eq!(calls[2] - calls[1], Duration::from_secs(2));

        match result {
            Err(GeoError::RetriesExhausted { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, GeoError::Status(500)));
            }
            other => panic!("expected exhausted retries, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_first_success() {
        let cancel = CancellationToken::new();
        let result = retry_linear(3, Duration::from_secs(1), &cancel, |attempt| async move {
            if attempt < 2 {
                Err(GeoError::NoRoute)
            } else {
                Ok(4200)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 4200);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_waiting_when_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: Result<i64, _> =
            retry_linear(3, Duration::from_secs(1), &cancel, |_| async { Err(GeoError::NoRoute) })
                .await;

        assert!(matches!(result, Err(GeoError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_backoff_skips_remaining_attempts() {
        let cancel = CancellationToken::new();
        let calls = Arc::new(Mutex::new(0));
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                cancel.cancel();
            }
        });

        let result: Result<i64, _> = retry_linear(3, Duration::from_secs(1), &cancel, |_| {
            let calls = calls.clone();
            async move {
                *calls.lock().unwrap() += 1;
                Err(GeoError::Status(503))
            }
        })
        .await;

        assert!(matches!(result, Err(GeoError::Cancelled)));
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}

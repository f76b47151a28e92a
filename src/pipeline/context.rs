use crate::error::RunError;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Cancellation handle for one crawl run.
///
/// Cloned into every operation of the run. Remembers whether it was stopped
/// by a caller or by its deadline so the two can be reported differently.
#[derive(Clone, Default)]
pub struct RunContext {
    token: CancellationToken,
    reason: Arc<OnceLock<RunError>>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the run once `timeout` elapses. Must be called inside a tokio runtime.
    pub fn with_deadline(self, timeout: Duration) -> Self {
        let ctx = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    debug!(timeout_secs = timeout.as_secs(), "Run deadline reached");
                    ctx.stop(RunError::DeadlineExceeded);
                }
                _ = ctx.token.cancelled() => {}
            }
        });
        self
    }

    /// Cancel the run on behalf of the caller
    pub fn cancel(&self) {
        self.stop(RunError::Cancelled);
    }

    fn stop(&self, reason: RunError) {
        // First reason wins
        let _ = self.reason.set(reason);
        self.token.cancel();
    }

    /// `Err` with the stop reason once the run has been cancelled
    pub fn check(&self) -> Result<(), RunError> {
        if self.token.is_cancelled() {
            Err(self.reason.get().copied().unwrap_or(RunError::Cancelled))
        } else {
            Ok(())
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

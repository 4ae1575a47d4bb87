//! Cancellation and deadline scope for one reporting unit of work.

use crate::error::{TelemetryError, TelemetryResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Carries the cancellation signal and optional deadline of a report.
///
/// Every wait and network exchange inside [`Reporter::report`](crate::Reporter::report)
/// is raced against both, so cancellation returns immediately instead of
/// finishing a backoff sleep.
#[derive(Debug, Clone)]
pub struct ReportContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl ReportContext {
    /// Creates a context with no deadline.
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    /// Sets the deadline to `timeout` from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Sets an absolute deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Runs `fut` to completion unless the context ends first.
    ///
    /// # Errors
    ///
    /// [`TelemetryError::Cancelled`] or [`TelemetryError::DeadlineExceeded`]
    /// when the context ends before `fut` does.
    pub async fn run<F: Future>(&self, fut: F) -> TelemetryResult<F::Output> {
        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(TelemetryError::Cancelled),
            () = deadline => Err(TelemetryError::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }

    /// Sleeps for `duration` unless the context ends first.
    pub async fn sleep(&self, duration: Duration) -> TelemetryResult<()> {
        self.run(tokio::time::sleep(duration)).await
    }
}

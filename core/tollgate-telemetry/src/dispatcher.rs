//! Background delivery so reporting never blocks a validation cycle.

use crate::context::ReportContext;
use crate::reporter::Reporter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tollgate_license::ValidationResult;
use tracing::{debug, info, warn};

/// Owns the background task that reports results one at a time.
///
/// At most one report is queued behind the one in flight. A result submitted
/// while the queue is full is dropped: the next cycle supersedes it anyway.
pub struct ReportDispatcher {
    tx: mpsc::Sender<Arc<ValidationResult>>,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl ReportDispatcher {
    /// Spawns the delivery task. Each report gets its own `report_timeout`
    /// deadline and is cancelled by `shutdown`.
    pub fn spawn(reporter: Reporter, report_timeout: Duration, shutdown: CancellationToken) -> Self {
        let (tx, mut rx) = mpsc::channel::<Arc<ValidationResult>>(1);
        let token = shutdown.clone();

        let handle = tokio::spawn(async move {
            loop {
                let result = tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    next = rx.recv() => match next {
                        Some(result) => result,
                        None => break,
                    },
                };

                let ctx = ReportContext::new(token.child_token()).with_timeout(report_timeout);
                match reporter.report(&ctx, &result).await {
                    Ok(()) => {}
                    Err(e) if e.is_cancellation() => debug!(error = %e, "Telemetry report abandoned"),
                    Err(e) => warn!(error = %e, "Telemetry report failed (fail-open)"),
                }
            }
            debug!("Telemetry dispatcher stopped");
        });

        Self { tx, shutdown, handle }
    }

    /// Queues `result` for delivery. Returns whether it was accepted.
    ///
    /// Results without a license are skipped since there is nothing to
    /// identify them to the server.
    pub fn submit(&self, result: Arc<ValidationResult>) -> bool {
        if result.license.is_none() {
            debug!("Skipping telemetry: no license to report");
            return false;
        }

        match self.tx.try_send(result) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Telemetry queue full, dropping report");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Stops accepting reports and waits up to `grace` for queued ones to
    /// finish before cancelling whatever is still in flight.
    pub async fn shutdown(self, grace: Duration) {
        let Self { tx, shutdown, mut handle } = self;
        drop(tx);

        if tokio::time::timeout(grace, &mut handle).await.is_err() {
            info!("Telemetry still in flight at shutdown, cancelling");
            shutdown.cancel();
            if let Err(e) = handle.await {
                warn!(error = %e, "Telemetry dispatcher task failed");
            }
        }
    }
}

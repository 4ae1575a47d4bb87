//! The periodic validation driver.

use crate::source::{LicenseSource, NodeCounter};
use crate::store::ResultStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tollgate_license::{LicenseError, LicenseVerifier, ValidationResult};
use tollgate_telemetry::ReportDispatcher;
use tracing::{error, info, warn};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);
const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Runs validation cycles and publishes their results.
pub struct ValidatorService {
    verifier: LicenseVerifier,
    source: Arc<dyn LicenseSource>,
    nodes: Arc<dyn NodeCounter>,
    namespace: String,
    store: ResultStore,
    interval: Duration,
    dispatcher: Option<ReportDispatcher>,
    drain_grace: Duration,
}

impl ValidatorService {
    /// `namespace` is where the validator runs; licenses must be bound to it.
    pub fn new(
        verifier: LicenseVerifier,
        source: Arc<dyn LicenseSource>,
        nodes: Arc<dyn NodeCounter>,
        namespace: impl Into<String>,
        store: ResultStore,
    ) -> Self {
        Self {
            verifier,
            source,
            nodes,
            namespace: namespace.into(),
            store,
            interval: DEFAULT_INTERVAL,
            dispatcher: None,
            drain_grace: DEFAULT_DRAIN_GRACE,
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Enables telemetry. Pending reports get `drain_grace` to finish when
    /// the service stops.
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: ReportDispatcher, drain_grace: Duration) -> Self {
        self.dispatcher = Some(dispatcher);
        self.drain_grace = drain_grace;
        self
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Runs one cycle: fetch, count, validate, publish, report.
    pub async fn run_cycle(&self) -> Arc<ValidationResult> {
        let result = Arc::new(self.evaluate().await);
        self.store.publish(result.clone()).await;
        log_outcome(&result);

        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.submit(result.clone());
        }
        result
    }

    async fn evaluate(&self) -> ValidationResult {
        let token = match self.source.fetch().await {
            Ok(token) => token,
            Err(e) => {
                error!(source = %self.source.describe(), error = %e, "Failed to read license");
                return ValidationResult::failed(
                    LicenseError::Source(e.to_string()),
                    Utc::now(),
                    0,
                    &self.namespace,
                );
            }
        };

        let node_count = match self.nodes.count().await {
            Ok(count) => count,
            Err(e) => {
                error!(error = %e, "Failed to count licensed nodes, assuming 0");
                0
            }
        };

        self.verifier
            .validate(&token, Utc::now(), node_count, &self.namespace)
    }

    /// Validates immediately, then every interval, until `shutdown` fires.
    /// A cycle in progress is abandoned on shutdown.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            source = %self.source.describe(),
            namespace = %self.namespace,
            interval_secs = self.interval.as_secs(),
            telemetry = self.dispatcher.is_some(),
            "Validation loop starting"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = self.run_cycle() => {}
            }
        }

        info!("Validation loop stopped");
        if let Some(dispatcher) = self.dispatcher {
            dispatcher.shutdown(self.drain_grace).await;
        }
    }
}

fn log_outcome(result: &ValidationResult) {
    if !result.is_valid() {
        let failures: Vec<String> = result.failures().iter().map(ToString::to_string).collect();
        error!(
            node_count = result.node_count,
            licensed_nodes = result.licensed_nodes,
            failures = ?failures,
            "License is INVALID"
        );
        return;
    }

    if result.in_grace_period {
        warn!(
            node_count = result.node_count,
            licensed_nodes = result.licensed_nodes,
            days_since_expiry = -result.days_until_expiry,
            "License EXPIRED but in grace period"
        );
    } else if result.in_warning_period() {
        warn!(
            node_count = result.node_count,
            licensed_nodes = result.licensed_nodes,
            days_until_expiry = result.days_until_expiry,
            "License valid but expiring soon"
        );
    } else {
        info!(
            node_count = result.node_count,
            licensed_nodes = result.licensed_nodes,
            days_until_expiry = result.days_until_expiry,
            "License is valid"
        );
    }
}

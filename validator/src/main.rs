//! Tollgate license validator
//!
//! Runs inside the licensed cluster and:
//! 1. Validates the license token against the trusted key, node count and namespace
//! 2. Serves `/health`, `/ready` and `/status` for probes and operators
//! 3. Reports each outcome to the license server (fail-open)
//!
//! Usage:
//!   tollgate-validator --public-key-file /etc/tollgate/public.pem
//!
//! Every flag can also be set through its environment variable.

use std::{sync::Arc, time::Duration};
use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tollgate_license::LicenseVerifier;
use tollgate_telemetry::{ReportDispatcher, Reporter};
use tollgate_validator::{
    build_router, logging, AppState, Config, FileLicenseSource, KubeClient, LabelNodeCounter,
    LicenseSource, ResultStore, SecretLicenseSource, ValidatorService,
};
use tracing::{error, info, warn};

const TELEMETRY_DRAIN_GRACE: Duration = Duration::from_secs(5);
const HTTP_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    logging::init(&config.log_level, config.log_format);
    config.validate()?;

    info!(version = env!("CARGO_PKG_VERSION"), "Tollgate validator starting...");

    let pem = config
        .public_key_pem()
        .context("Failed to load trusted public key")?;
    let verifier = LicenseVerifier::from_pem(&pem).context("Failed to create license verifier")?;

    let kube = KubeClient::in_cluster().context("Failed to create Kubernetes client")?;
    let source: Arc<dyn LicenseSource> = match &config.license_file {
        Some(path) => Arc::new(FileLicenseSource::new(path)),
        None => Arc::new(SecretLicenseSource::new(
            kube.clone(),
            &config.license_secret_namespace,
            &config.license_secret_name,
            &config.license_secret_key,
        )),
    };
    let nodes = Arc::new(LabelNodeCounter::new(kube, config.label_selector()));

    let store = ResultStore::new();
    let mut service = ValidatorService::new(
        verifier,
        source,
        nodes,
        &config.license_secret_namespace,
        store.clone(),
    )
    .with_interval(config.validation_interval);

    if config.phone_home_enabled {
        let reporter =
            Reporter::new(config.reporter_config()).context("Failed to create telemetry reporter")?;
        if config.license_server_url.is_none() {
            warn!("LICENSE_SERVER_URL not set; reports use the endpoint embedded in the license");
        }
        let dispatcher =
            ReportDispatcher::spawn(reporter, config.phone_home_timeout, CancellationToken::new());
        service = service.with_dispatcher(dispatcher, TELEMETRY_DRAIN_GRACE);
    } else {
        info!("Phone-home disabled");
    }

    let shutdown = CancellationToken::new();

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.http_port))
        .await
        .with_context(|| format!("Failed to bind HTTP port {}", config.http_port))?;
    info!(port = config.http_port, "HTTP server listening");

    let app = build_router(AppState {
        store,
        fail_open: config.fail_open,
    });
    let http_shutdown = shutdown.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { http_shutdown.cancelled().await })
            .await
    });

    let driver = tokio::spawn(service.run(shutdown.clone()));

    shutdown_signal().await;
    info!("Shutting down...");
    shutdown.cancel();

    if let Err(e) = driver.await {
        error!(error = %e, "Validation loop task failed");
    }
    match tokio::time::timeout(HTTP_SHUTDOWN_GRACE, server).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => error!(error = %e, "HTTP server error"),
        Ok(Err(e)) => error!(error = %e, "HTTP server task failed"),
        Err(_) => warn!("HTTP server did not stop in time"),
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

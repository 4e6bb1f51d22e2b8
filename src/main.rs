//! Fraud Alert Service - Main Entry Point
//!
//! Loads the classifier and encoder artifacts, opens the transaction store
//! and serves the scoring API over HTTP.

use anyhow::{Context, Result};
use fraud_alert_service::{
    config::{AppConfig, LoggingConfig},
    feature_extractor::{FeatureExtractor, FEATURE_NAMES},
    metrics::{MetricsReporter, PipelineMetrics},
    models::{LabelEncoder, OnnxClassifier},
    notifier::build_notifier,
    pipeline::TransactionPipeline,
    server,
    store::SqliteStore,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    init_logging(&config.logging)?;
    info!("Starting Fraud Alert Service");

    // Initialize metrics
    let metrics = Arc::new(PipelineMetrics::new());

    // Load model artifacts
    let encoder = Arc::new(LabelEncoder::load_from_path(&config.models.encoder_path)?);
    let feature_extractor = FeatureExtractor::new(encoder);
    info!(
        features = ?feature_extractor.feature_names(),
        "Feature extractor initialized ({} features)",
        feature_extractor.feature_count()
    );

    let classifier = Arc::new(OnnxClassifier::load(
        &config.models.classifier_path,
        FEATURE_NAMES.len(),
        config.models.probability_threshold,
        config.models.onnx_threads,
    )?);

    // Open the store and set up alert delivery
    let store = Arc::new(SqliteStore::open(&config.store.path)?);
    let notifier = build_notifier(&config.notifier).await?;

    let pipeline = Arc::new(
        TransactionPipeline::new(feature_extractor, classifier, store, notifier)
            .with_notify_timeout(Duration::from_millis(config.notifier.timeout_ms))
            .with_metrics(metrics.clone()),
    );

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!("Listening on {}", config.server.bind_addr);

    axum::serve(listener, server::router(pipeline))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Service shutting down...");
    metrics.log_summary();

    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("fraud_alert_service={}", logging.level))
    })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

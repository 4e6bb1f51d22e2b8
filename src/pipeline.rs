//! Transaction scoring pipeline.
//!
//! `process` runs validation, feature alignment, encoding, inference and
//! persistence in order, then hands positive verdicts to the notifier on a
//! detached task. Only the first four steps can fail the call.

use crate::error::PipelineError;
use crate::feature_extractor::FeatureExtractor;
use crate::metrics::PipelineMetrics;
use crate::models::classifier::Classifier;
use crate::notifier::{notify_with_timeout, Notifier};
use crate::store::TransactionStore;
use crate::types::{DailyFraudCount, DashboardSummary, FraudAlert, Transaction, TransactionRecord};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Default bound on a single alert delivery
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of a processed transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub is_fraud: bool,
    /// Id of the record written for this transaction
    pub record_id: i64,
}

pub struct TransactionPipeline {
    extractor: FeatureExtractor,
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn TransactionStore>,
    notifier: Arc<dyn Notifier>,
    notify_timeout: Duration,
    metrics: Arc<PipelineMetrics>,
}

impl TransactionPipeline {
    pub fn new(
        extractor: FeatureExtractor,
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn TransactionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            extractor,
            classifier,
            store,
            notifier,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// Score a transaction, persist the verdict and alert on fraud.
    pub async fn process(&self, transaction: Transaction) -> Result<Verdict, PipelineError> {
        let start_time = Instant::now();

        let record = match self.score_and_record(&transaction).await {
            Ok(record) => record,
            Err(e) => {
                if e.is_client_error() {
                    self.metrics.record_rejection();
                    debug!(transaction_type = %transaction.tx_type, error = %e, "Transaction rejected");
                } else {
                    self.metrics.record_failure();
                }
                return Err(e);
            }
        };

        let processing_time = start_time.elapsed();
        self.metrics.record_transaction(processing_time, record.is_fraud);

        info!(
            record_id = record.id,
            transaction_type = %record.tx_type,
            amount = record.amount,
            is_fraud = record.is_fraud,
            processing_time_us = processing_time.as_micros(),
            "Transaction processed"
        );

        if record.is_fraud {
            self.spawn_notification(FraudAlert::new(&transaction, &record));
        }

        Ok(Verdict {
            is_fraud: record.is_fraud,
            record_id: record.id,
        })
    }

    async fn score_and_record(
        &self,
        transaction: &Transaction,
    ) -> Result<TransactionRecord, PipelineError> {
        transaction.validate()?;

        let features = self.extractor.extract(transaction)?;

        // Session runs are serialized and CPU bound; keep them off the async workers
        let classifier = self.classifier.clone();
        let is_fraud = tokio::task::spawn_blocking(move || {
            classifier.predict(&features).map_err(|e| {
                error!(
                    model = %classifier.name(),
                    features = ?features,
                    error = %e,
                    "Inference failed"
                );
                PipelineError::inference(e)
            })
        })
        .await
        .map_err(|e| PipelineError::Inference(format!("inference task failed: {}", e)))??;

        let tx_type = transaction.tx_type.clone();
        let amount = transaction.amount;
        self.with_store(move |store| store.insert(&tx_type, amount, is_fraud))
            .await
            .inspect_err(|e| error!(error = %e, "Failed to persist transaction"))
    }

    /// Deliver the alert on its own task; the caller never waits for it.
    fn spawn_notification(&self, alert: FraudAlert) {
        let notifier = self.notifier.clone();
        let metrics = self.metrics.clone();
        let timeout = self.notify_timeout;

        tokio::spawn(async move {
            match notify_with_timeout(notifier.as_ref(), &alert, timeout).await {
                Ok(()) => {
                    metrics.record_notification(true);
                    info!(
                        alert_id = %alert.alert_id,
                        record_id = alert.record_id,
                        transport = %notifier.name(),
                        "Fraud alert delivered"
                    );
                }
                Err(e) => {
                    metrics.record_notification(false);
                    warn!(
                        alert_id = %alert.alert_id,
                        record_id = alert.record_id,
                        transport = %notifier.name(),
                        error = %e,
                        "Failed to deliver fraud alert"
                    );
                }
            }
        });
    }

    /// Most recent records, newest first
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<TransactionRecord>, PipelineError> {
        self.with_store(move |store| store.list_recent(limit)).await
    }

    pub async fn summary(&self) -> Result<DashboardSummary, PipelineError> {
        self.with_store(|store| store.summary()).await
    }

    pub async fn daily_fraud_counts(&self) -> Result<Vec<DailyFraudCount>, PipelineError> {
        self.with_store(|store| store.daily_fraud_counts()).await
    }

    /// Run a blocking store call off the async workers
    async fn with_store<T, F>(&self, op: F) -> Result<T, PipelineError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn TransactionStore) -> anyhow::Result<T> + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| PipelineError::Persistence(format!("store task failed: {}", e)))?
            .map_err(PipelineError::persistence)
    }
}

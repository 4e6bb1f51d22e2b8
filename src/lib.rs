//! Fraud Alert Service Library
//!
//! Scores payment transactions with a pre-trained classifier, records every
//! verdict in SQLite and raises best-effort alerts for fraudulent ones.

pub mod config;
pub mod error;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod notifier;
pub mod pipeline;
pub mod server;
pub mod store;
pub mod types;

pub use config::AppConfig;
pub use error::{NotificationError, PipelineError};
pub use feature_extractor::FeatureExtractor;
pub use models::{Classifier, LabelEncoder, OnnxClassifier};
pub use notifier::Notifier;
pub use pipeline::{TransactionPipeline, Verdict};
pub use store::{SqliteStore, TransactionStore};
pub use types::{FraudAlert, Transaction, TransactionRecord};

//! Configuration management for the fraud alert service

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Default configuration file, optional
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Prefix for environment overrides, e.g. `FRAUD__STORE__PATH`
pub const ENV_PREFIX: &str = "FRAUD";

/// Alert delivery transport
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotifierTransport {
    /// SMTP email to an administrator
    #[default]
    Email,
    /// Publish the alert as JSON on a NATS subject
    Nats,
    /// Log the alert only
    Log,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub store: StoreConfig,
    pub notifier: NotifierConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
        }
    }
}

/// Classifier and encoder artifacts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// ONNX export of the trained classifier
    pub classifier_path: String,
    /// JSON class list of the transaction type encoder
    pub encoder_path: String,
    /// Number of threads for ONNX inference
    pub onnx_threads: usize,
    /// Fraud probability cut-off, used only when the model has no label output
    pub probability_threshold: f64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            classifier_path: "models/fraud_model.onnx".to_string(),
            encoder_path: "models/type_encoder.json".to_string(),
            onnx_threads: 1,
            probability_threshold: 0.5,
        }
    }
}

/// Transaction store configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "transactions.db".to_string(),
        }
    }
}

/// Fraud alert delivery
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub transport: NotifierTransport,
    /// Upper bound on a single delivery attempt, in milliseconds
    pub timeout_ms: u64,
    pub email: EmailConfig,
    pub nats: NatsConfig,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            transport: NotifierTransport::Email,
            timeout_ms: 10_000,
            email: EmailConfig::default(),
            nats: NatsConfig::default(),
        }
    }
}

/// SMTP settings; sender, password and recipient have no defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Sender address, also used as the SMTP login
    pub sender: Option<String>,
    pub password: Option<String>,
    pub recipient: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            sender: None,
            password: None,
            recipient: None,
        }
    }
}

/// NATS alert publishing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for outgoing fraud alerts
    pub subject: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            subject: "fraud.alerts".to_string(),
        }
    }
}

/// Periodic metrics summary
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between summaries; 0 disables the reporter
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 60,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path, then apply environment overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut app = Self::from_sources(path.as_ref(), env_overrides())?;
        app.apply_legacy_email_env(|key| std::env::var(key).ok());
        Ok(app)
    }

    fn from_sources(path: &Path, env: Environment) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(env)
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Fill email credentials from `EMAIL_USER`, `EMAIL_PASSWORD` and `EMAIL_RECEIVER`.
    fn apply_legacy_email_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let email = &mut self.notifier.email;
        if let Some(sender) = lookup("EMAIL_USER") {
            email.sender = Some(sender);
        }
        if let Some(password) = lookup("EMAIL_PASSWORD") {
            email.password = Some(password);
        }
        if let Some(recipient) = lookup("EMAIL_RECEIVER") {
            email.recipient = Some(recipient);
        }
    }
}

/// `FRAUD__SECTION__KEY` variables, e.g. `FRAUD__NOTIFIER__TIMEOUT_MS=2500`
fn env_overrides() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

//! Fraud alert delivery.
//!
//! Delivery is best effort: the pipeline runs every notification on a
//! detached task under its own timeout and only logs failures.

use crate::config::{EmailConfig, NotifierConfig, NotifierTransport};
use crate::error::NotificationError;
use crate::types::alert::FraudAlert;
use anyhow::{Context, Result};
use async_nats::Client;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Alert delivery capability
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &FraudAlert) -> Result<(), NotificationError>;

    /// Transport name for logs
    fn name(&self) -> &str;
}

/// Run one delivery attempt bounded by `timeout`
pub async fn notify_with_timeout(
    notifier: &dyn Notifier,
    alert: &FraudAlert,
    timeout: Duration,
) -> Result<(), NotificationError> {
    match tokio::time::timeout(timeout, notifier.notify(alert)).await {
        Ok(result) => result,
        Err(_) => Err(NotificationError::Timeout(timeout)),
    }
}

/// Sends alerts as plain-text email over SMTP with STARTTLS
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    recipient: Mailbox,
}

impl EmailNotifier {
    pub fn new(config: &EmailConfig, timeout: Duration) -> Result<Self, NotificationError> {
        let sender = required(&config.sender, "email sender")?;
        let password = required(&config.password, "email password")?;
        let recipient = required(&config.recipient, "email recipient")?;

        let sender_box: Mailbox = sender
            .parse()
            .map_err(|_| NotificationError::InvalidAddress(sender.to_string()))?;
        let recipient_box: Mailbox = recipient
            .parse()
            .map_err(|_| NotificationError::InvalidAddress(recipient.to_string()))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| NotificationError::Transport(e.to_string()))?
            .port(config.smtp_port)
            .credentials(Credentials::new(sender.to_string(), password.to_string()))
            .timeout(Some(timeout))
            .build();

        Ok(Self {
            transport,
            sender: sender_box,
            recipient: recipient_box,
        })
    }
}

fn alert_message(
    sender: &Mailbox,
    recipient: &Mailbox,
    alert: &FraudAlert,
) -> Result<Message, NotificationError> {
    Message::builder()
        .from(sender.clone())
        .to(recipient.clone())
        .subject(alert.subject())
        .header(ContentType::TEXT_PLAIN)
        .body(alert.body())
        .map_err(|e| NotificationError::Transport(e.to_string()))
}

fn required<'a>(value: &'a Option<String>, what: &str) -> Result<&'a str, NotificationError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| NotificationError::NotConfigured(format!("{} is not set", what)))
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, alert: &FraudAlert) -> Result<(), NotificationError> {
        let message = alert_message(&self.sender, &self.recipient, alert)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        debug!(
            alert_id = %alert.alert_id,
            record_id = alert.record_id,
            recipient = %self.recipient,
            "Fraud alert email sent"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "email"
    }
}

/// Publishes alerts as JSON on a NATS subject
#[derive(Clone)]
pub struct NatsNotifier {
    client: Client,
    subject: String,
}

impl NatsNotifier {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Connect without waiting for the server; the client reconnects in the background
    pub async fn connect(url: &str, subject: &str) -> Result<Self> {
        let client = async_nats::ConnectOptions::new()
            .retry_on_initial_connect()
            .connect(url)
            .await
            .with_context(|| format!("Failed to connect to NATS at {}", url))?;
        info!(url = %url, subject = %subject, "NATS alert publisher ready");
        Ok(Self::new(client, subject))
    }
}

#[async_trait]
impl Notifier for NatsNotifier {
    async fn notify(&self, alert: &FraudAlert) -> Result<(), NotificationError> {
        let payload =
            serde_json::to_vec(alert).map_err(|e| NotificationError::Transport(e.to_string()))?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        debug!(
            alert_id = %alert.alert_id,
            record_id = alert.record_id,
            subject = %self.subject,
            "Published fraud alert"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "nats"
    }
}

/// Writes the alert to the log; used when no transport is configured
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, alert: &FraudAlert) -> Result<(), NotificationError> {
        warn!(
            alert_id = %alert.alert_id,
            record_id = alert.record_id,
            transaction_type = %alert.tx_type,
            amount = alert.amount,
            "Fraudulent transaction detected"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Build the configured notifier.
///
/// Incomplete email credentials fall back to [`LogNotifier`]: verdicts do not
/// depend on alert delivery.
pub async fn build_notifier(config: &NotifierConfig) -> Result<Arc<dyn Notifier>> {
    let timeout = Duration::from_millis(config.timeout_ms);

    let notifier: Arc<dyn Notifier> = match config.transport {
        NotifierTransport::Email => match EmailNotifier::new(&config.email, timeout) {
            Ok(notifier) => {
                info!(smtp_host = %config.email.smtp_host, "Email fraud alerts enabled");
                Arc::new(notifier)
            }
            Err(e) => {
                warn!(error = %e, "Email alerts unavailable, logging alerts instead");
                Arc::new(LogNotifier)
            }
        },
        NotifierTransport::Nats => {
            Arc::new(NatsNotifier::connect(&config.nats.url, &config.nats.subject).await?)
        }
        NotifierTransport::Log => Arc::new(LogNotifier),
    };

    Ok(notifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Transaction, TransactionRecord};
    use chrono::Utc;

    fn alert() -> FraudAlert {
        let record = TransactionRecord {
            id: 1,
            tx_type: "TRANSFER".to_string(),
            amount: 500.0,
            is_fraud: true,
            timestamp: Utc::now(),
        };
        FraudAlert::new(&Transaction::new("TRANSFER", 500.0), &record)
    }

    struct StalledNotifier;

    #[async_trait]
    impl Notifier for StalledNotifier {
        async fn notify(&self, _alert: &FraudAlert) -> Result<(), NotificationError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    fn complete_email() -> EmailConfig {
        EmailConfig {
            sender: Some("alerts@example.com".to_string()),
            password: Some("secret".to_string()),
            recipient: Some("admin@example.com".to_string()),
            ..EmailConfig::default()
        }
    }

    #[tokio::test]
    async fn test_timeout_bounds_delivery() {
        let result =
            notify_with_timeout(&StalledNotifier, &alert(), Duration::from_millis(20)).await;
        assert!(matches!(result, Err(NotificationError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_log_notifier_succeeds() {
        assert!(LogNotifier.notify(&alert()).await.is_ok());
    }

    #[tokio::test]
    async fn test_email_requires_credentials() {
        let err = EmailNotifier::new(&EmailConfig::default(), Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, NotificationError::NotConfigured(_)));

        let mut config = complete_email();
        config.recipient = Some("not an address".to_string());
        let err = EmailNotifier::new(&config, Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, NotificationError::InvalidAddress(_)));
    }

    #[test]
    fn test_email_message_headers() {
        let sender: Mailbox = "alerts@example.com".parse().unwrap();
        let recipient: Mailbox = "admin@example.com".parse().unwrap();
        let message = alert_message(&sender, &recipient, &alert()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: Fraud Alert: Transaction Detected"));
        assert!(raw.contains("To: admin@example.com"));
        assert!(raw.contains("Type: TRANSFER"));
    }

    #[tokio::test]
    async fn test_incomplete_email_falls_back_to_log() {
        let notifier = build_notifier(&NotifierConfig::default()).await.unwrap();
        assert_eq!(notifier.name(), "log");
    }
}

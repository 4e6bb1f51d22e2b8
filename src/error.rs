//! Error taxonomy for the scoring pipeline

use std::time::Duration;
use thiserror::Error;

/// Failures that end a `process` call and are reported to the caller
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid transaction: {0}")]
    Validation(String),
    #[error("Error encoding 'type' column: unknown transaction type [{value}]")]
    Encoding { value: String },
    #[error("Error during prediction: {0}")]
    Inference(String),
    #[error("Error writing to the transaction store: {0}")]
    Persistence(String),
}

impl PipelineError {
    /// Caller-side mistakes, as opposed to server faults
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Encoding { .. })
    }

    pub fn inference(err: anyhow::Error) -> Self {
        Self::Inference(format!("{:#}", err))
    }

    pub fn persistence(err: anyhow::Error) -> Self {
        Self::Persistence(format!("{:#}", err))
    }
}

/// Alert delivery failures; logged by the pipeline and never surfaced
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification transport is not configured: {0}")]
    NotConfigured(String),
    #[error("Invalid notification address [{0}]")]
    InvalidAddress(String),
    #[error("Notification transport failed: {0}")]
    Transport(String),
    #[error("Notification timed out after {0:?}")]
    Timeout(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(PipelineError::Validation("x".into()).is_client_error());
        assert!(PipelineError::Encoding { value: "X".into() }.is_client_error());
        assert!(!PipelineError::Inference("x".into()).is_client_error());
        assert!(!PipelineError::Persistence("x".into()).is_client_error());
    }

    #[test]
    fn test_context_chain_is_kept() {
        let err = anyhow::anyhow!("disk full").context("insert failed");
        let message = PipelineError::persistence(err).to_string();
        assert!(message.contains("insert failed"));
        assert!(message.contains("disk full"));
    }
}

//! Fraud alert data structures

use crate::types::record::TransactionRecord;
use crate::types::transaction::Transaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert raised when a transaction is classified as fraudulent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudAlert {
    /// Unique alert identifier
    pub alert_id: String,

    /// Identifier of the stored record
    pub record_id: i64,

    /// Transfer kind
    #[serde(rename = "type")]
    pub tx_type: String,

    pub amount: f64,

    #[serde(rename = "oldbalanceOrg")]
    pub old_balance_orig: f64,

    #[serde(rename = "newbalanceOrig")]
    pub new_balance_orig: f64,

    #[serde(rename = "oldbalanceDest")]
    pub old_balance_dest: f64,

    #[serde(rename = "newbalanceDest")]
    pub new_balance_dest: f64,

    /// When the transaction was recorded
    pub timestamp: DateTime<Utc>,
}

impl FraudAlert {
    /// Build an alert from the submitted transaction and its stored record
    pub fn new(transaction: &Transaction, record: &TransactionRecord) -> Self {
        Self {
            alert_id: uuid::Uuid::new_v4().to_string(),
            record_id: record.id,
            tx_type: transaction.tx_type.clone(),
            amount: transaction.amount,
            old_balance_orig: transaction.old_balance_orig,
            new_balance_orig: transaction.new_balance_orig,
            old_balance_dest: transaction.old_balance_dest,
            new_balance_dest: transaction.new_balance_dest,
            timestamp: record.timestamp,
        }
    }

    /// Subject line for human-facing transports
    pub fn subject(&self) -> &'static str {
        "Fraud Alert: Transaction Detected"
    }

    /// Plain-text body for human-facing transports
    pub fn body(&self) -> String {
        format!(
            "A fraudulent transaction has been detected:\n\
             Record: {}\n\
             Type: {}\n\
             Amount: {}\n\
             Origin balance: {} -> {}\n\
             Destination balance: {} -> {}\n\
             Recorded at: {}\n",
            self.record_id,
            self.tx_type,
            self.amount,
            self.old_balance_orig,
            self.new_balance_orig,
            self.old_balance_dest,
            self.new_balance_dest,
            self.timestamp.to_rfc3339(),
        )
    }
}

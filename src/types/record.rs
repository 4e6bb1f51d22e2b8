//! Persisted transaction records and store aggregates

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A scored transaction as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Store-assigned identifier
    pub id: i64,

    /// Raw transfer kind, not encoded
    #[serde(rename = "type")]
    pub tx_type: String,

    pub amount: f64,

    /// Classifier verdict
    #[serde(rename = "isFraud")]
    pub is_fraud: bool,

    /// Creation instant
    pub timestamp: DateTime<Utc>,
}

/// Aggregate figures over every stored record
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_transactions: u64,
    pub fraudulent_transactions: u64,
    pub total_amount: f64,
}

/// Transactions and fraud verdicts for one UTC day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyFraudCount {
    pub date: NaiveDate,
    pub total: u64,
    pub fraudulent: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_wire_format() {
        let record = TransactionRecord {
            id: 7,
            tx_type: "CASH_OUT".to_string(),
            amount: 12.5,
            is_fraud: true,
            timestamp: Utc::now(),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["type"], "CASH_OUT");
        assert_eq!(value["isFraud"], true);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_empty_summary_is_zero() {
        let value = serde_json::to_value(DashboardSummary::default()).unwrap();
        assert_eq!(value["total_transactions"], 0);
        assert_eq!(value["fraudulent_transactions"], 0);
        assert_eq!(value["total_amount"], 0.0);
    }
}

//! Transaction data structures for fraud scoring

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// A transfer submitted for scoring.
///
/// Field names follow the dataset the classifier was trained on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transfer kind (CASH_IN, CASH_OUT, DEBIT, PAYMENT, TRANSFER)
    #[serde(rename = "type")]
    pub tx_type: String,

    /// Transferred amount
    pub amount: f64,

    /// Origin balance before the transfer
    #[serde(rename = "oldbalanceOrg")]
    pub old_balance_orig: f64,

    /// Origin balance after the transfer
    #[serde(rename = "newbalanceOrig")]
    pub new_balance_orig: f64,

    /// Destination balance before the transfer
    #[serde(rename = "oldbalanceDest")]
    pub old_balance_dest: f64,

    /// Destination balance after the transfer
    #[serde(rename = "newbalanceDest")]
    pub new_balance_dest: f64,
}

impl Transaction {
    /// Create a transaction with zeroed balances
    pub fn new(tx_type: &str, amount: f64) -> Self {
        Self {
            tx_type: tx_type.to_string(),
            amount,
            old_balance_orig: 0.0,
            new_balance_orig: 0.0,
            old_balance_dest: 0.0,
            new_balance_dest: 0.0,
        }
    }

    /// Set all four balances
    pub fn with_balances(
        mut self,
        old_balance_orig: f64,
        new_balance_orig: f64,
        old_balance_dest: f64,
        new_balance_dest: f64,
    ) -> Self {
        self.old_balance_orig = old_balance_orig;
        self.new_balance_orig = new_balance_orig;
        self.old_balance_dest = old_balance_dest;
        self.new_balance_dest = new_balance_dest;
        self
    }

    /// Reject blank types and amounts that are negative, non-finite or too
    /// large for the classifier's `f32` inputs.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.tx_type.trim().is_empty() {
            return Err(PipelineError::Validation(
                "field 'type' must not be empty".to_string(),
            ));
        }

        let numeric = [
            ("amount", self.amount),
            ("oldbalanceOrg", self.old_balance_orig),
            ("newbalanceOrig", self.new_balance_orig),
            ("oldbalanceDest", self.old_balance_dest),
            ("newbalanceDest", self.new_balance_dest),
        ];

        for (name, value) in numeric {
            if !value.is_finite() {
                return Err(PipelineError::Validation(format!(
                    "field '{}' must be a finite number",
                    name
                )));
            }
            if value < 0.0 {
                return Err(PipelineError::Validation(format!(
                    "field '{}' must not be negative (got {})",
                    name, value
                )));
            }
            if value > f32::MAX as f64 {
                return Err(PipelineError::Validation(format!(
                    "field '{}' is too large to score (got {})",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

//! Feature alignment for classifier inference.
//!
//! The classifier was trained on a fixed column layout. Any change to the
//! order or count of features silently corrupts verdicts, so the layout is
//! declared once in [`FEATURE_NAMES`] and every vector is built from it.

use crate::error::PipelineError;
use crate::models::encoder::LabelEncoder;
use crate::types::transaction::Transaction;
use std::sync::Arc;

/// Column order the classifier was trained on
pub const FEATURE_NAMES: [&str; 7] = [
    "step",
    "type",
    "amount",
    "oldbalanceOrg",
    "newbalanceOrig",
    "oldbalanceDest",
    "newbalanceDest",
];

/// Placeholder sequence position; the live service has no notion of simulation steps
pub const PLACEHOLDER_STEP: f32 = 1.0;

/// Turns transactions into model input vectors.
pub struct FeatureExtractor {
    encoder: Arc<LabelEncoder>,
}

impl FeatureExtractor {
    pub fn new(encoder: Arc<LabelEncoder>) -> Self {
        Self { encoder }
    }

    /// Extract the feature vector for a transaction.
    ///
    /// Fails with [`PipelineError::Encoding`] when the type is not one the
    /// encoder was fitted on.
    pub fn extract(&self, tx: &Transaction) -> Result<Vec<f32>, PipelineError> {
        let encoded_type = self.encoder.encode(&tx.tx_type)?;

        let features = vec![
            PLACEHOLDER_STEP,
            encoded_type as f32,
            tx.amount as f32,
            tx.old_balance_orig as f32,
            tx.new_balance_orig as f32,
            tx.old_balance_dest as f32,
            tx.new_balance_dest as f32,
        ];
        debug_assert_eq!(features.len(), FEATURE_NAMES.len());

        Ok(features)
    }

    pub fn feature_count(&self) -> usize {
        FEATURE_NAMES.len()
    }

    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> FeatureExtractor {
        let classes = ["CASH_IN", "CASH_OUT", "DEBIT", "PAYMENT", "TRANSFER"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        FeatureExtractor::new(Arc::new(LabelEncoder::new(classes).unwrap()))
    }

    #[test]
    fn test_feature_order() {
        let tx = Transaction::new("TRANSFER", 181.0).with_balances(181.0, 0.0, 21.0, 5.0);
        let features = extractor().extract(&tx).unwrap();

        assert_eq!(features, vec![1.0, 4.0, 181.0, 181.0, 0.0, 21.0, 5.0]);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let extractor = extractor();
        let tx = Transaction::new("CASH_OUT", 250.5).with_balances(1000.0, 749.5, 0.0, 250.5);

        let first = extractor.extract(&tx).unwrap();
        let second = extractor.extract(&tx).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_type() {
        let err = extractor().extract(&Transaction::new("CRYPTO", 1.0)).unwrap_err();
        assert!(matches!(err, PipelineError::Encoding { .. }));
    }

    #[test]
    fn test_feature_count() {
        let extractor = extractor();
        assert_eq!(extractor.feature_count(), 7);
        assert_eq!(extractor.feature_names()[0], "step");
        assert_eq!(extractor.feature_names()[1], "type");
    }
}

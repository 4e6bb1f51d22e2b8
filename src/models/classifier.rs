//! Fraud classifier capability and its ONNX Runtime implementation

use crate::models::loader::{LoadedModel, ModelLoader};
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// A pre-trained binary classifier.
///
/// Implementations are immutable after construction and shared across
/// concurrent requests.
pub trait Classifier: Send + Sync {
    /// Return `true` when the feature vector is classified as fraud
    fn predict(&self, features: &[f32]) -> Result<bool>;

    /// Model name for logs
    fn name(&self) -> &str;
}

/// Classifier backed by an ONNX export of the trained model.
///
/// Exports from scikit-learn carry a label output and a probability output.
/// The label is used when present; otherwise the fraud-class probability is
/// compared with `probability_threshold`.
pub struct OnnxClassifier {
    name: String,
    /// Session runs need exclusive access
    model: Mutex<LoadedModel>,
    expected_features: usize,
    probability_threshold: f64,
}

impl OnnxClassifier {
    pub fn load<P: AsRef<Path>>(
        path: P,
        expected_features: usize,
        probability_threshold: f64,
        onnx_threads: usize,
    ) -> Result<Self> {
        let path = path.as_ref();
        let loader = ModelLoader::with_threads(onnx_threads)?;
        let model = loader.load_model(path)?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "classifier".to_string());

        Ok(Self {
            name,
            model: Mutex::new(model),
            expected_features,
            probability_threshold,
        })
    }

    fn run(&self, model: &mut LoadedModel, features: &[f32]) -> Result<bool> {
        use ort::value::Tensor;

        // Shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))
            .context("Failed to create input tensor")?;

        let outputs = model
            .session
            .run(ort::inputs![&model.input_name => input_tensor])?;

        if let Some(label_name) = &model.label_output {
            if let Some(output) = outputs.get(label_name.as_str()) {
                if let Ok((_, labels)) = output.try_extract_tensor::<i64>() {
                    let label = labels
                        .first()
                        .copied()
                        .ok_or_else(|| anyhow::anyhow!("Empty label output"))?;
                    debug!(model = %self.name, label = label, "Extracted label");
                    return Ok(label != 0);
                }
            }
        }

        if let Some(prob_name) = &model.probability_output {
            if let Some(output) = outputs.get(prob_name.as_str()) {
                // Tensor format: [batch, classes]
                if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
                    if let Some(prob) = fraud_probability_from_tensor(shape, data) {
                        debug!(model = %self.name, prob = prob, "Extracted from tensor");
                        return Ok(prob >= self.probability_threshold);
                    }
                }

                // seq(map(int64, float)) format used by scikit-learn exports
                let dtype = output.dtype();
                if DynSequenceValueType::can_downcast(&dtype) {
                    let prob = self.fraud_probability_from_sequence_map(output)?;
                    return Ok(prob >= self.probability_threshold);
                }
            }
        }

        anyhow::bail!("Model {} produced no usable label or probability", self.name)
    }

    fn fraud_probability_from_sequence_map(&self, output: &ort::value::DynValue) -> Result<f64> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

        let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
        let first = maps
            .first()
            .ok_or_else(|| anyhow::anyhow!("Empty probability sequence"))?;

        let pairs = first.try_extract_key_values::<i64, f32>()?;
        let prob = fraud_probability_from_pairs(&pairs)
            .ok_or_else(|| anyhow::anyhow!("No class probability in map"))?;

        debug!(model = %self.name, prob = prob, "Extracted from seq(map)");
        Ok(prob)
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: &[f32]) -> Result<bool> {
        check_width(features, self.expected_features)?;

        let mut guard = self
            .model
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let model: &mut LoadedModel = &mut guard;

        self.run(model, features)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Guard against feature layout drift
pub fn check_width(features: &[f32], expected: usize) -> Result<()> {
    if features.len() != expected {
        anyhow::bail!(
            "Feature vector has {} values, classifier expects {}",
            features.len(),
            expected
        );
    }
    Ok(())
}

/// Fraud-class probability from a `[classes]` or `[batch, classes]` tensor
fn fraud_probability_from_tensor(dims: &[i64], data: &[f32]) -> Option<f64> {
    let classes = match dims {
        [classes] => *classes,
        [_, classes] => *classes,
        _ => return None,
    };

    match classes {
        c if c >= 2 => data.get(1).map(|&p| p as f64),
        1 => data.first().map(|&p| p as f64),
        _ => None,
    }
}

/// Fraud-class probability from `(class, probability)` pairs
fn fraud_probability_from_pairs(pairs: &[(i64, f32)]) -> Option<f64> {
    if let Some((_, prob)) = pairs.iter().find(|(class, _)| *class == 1) {
        return Some(*prob as f64);
    }
    pairs
        .iter()
        .find(|(class, _)| *class == 0)
        .map(|(_, prob)| 1.0 - *prob as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_check() {
        assert!(check_width(&[0.0; 7], 7).is_ok());
        assert!(check_width(&[0.0; 6], 7).is_err());
    }

    #[test]
    fn test_probability_from_tensor() {
        assert_eq!(fraud_probability_from_tensor(&[1, 2], &[0.25, 0.75]), Some(0.75));
        assert_eq!(fraud_probability_from_tensor(&[2], &[0.75, 0.25]), Some(0.25));
        assert_eq!(fraud_probability_from_tensor(&[1, 1], &[0.5]), Some(0.5));
        assert_eq!(fraud_probability_from_tensor(&[1, 2, 3], &[0.0; 6]), None);
    }

    #[test]
    fn test_probability_from_pairs() {
        assert_eq!(fraud_probability_from_pairs(&[(0, 0.25), (1, 0.75)]), Some(0.75));
        assert_eq!(fraud_probability_from_pairs(&[(0, 0.25)]), Some(0.75));
        assert_eq!(fraud_probability_from_pairs(&[]), None);
    }
}

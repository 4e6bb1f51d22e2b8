//! ONNX model loader

use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use tracing::info;

/// Loaded ONNX model with the tensor names inference needs
pub struct LoadedModel {
    /// ONNX Runtime session
    pub session: Session,
    /// Feature input name
    pub input_name: String,
    /// Predicted class label output, when the export has one
    pub label_output: Option<String>,
    /// Class probability output, when the export has one
    pub probability_output: Option<String>,
}

/// Loader for the classifier artifact
pub struct ModelLoader {
    /// Number of intra-op threads per session
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a loader with the given thread count and initialise ONNX Runtime
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load a classifier exported to ONNX
    pub fn load_model<P: AsRef<Path>>(&self, path: P) -> Result<LoadedModel> {
        let path = path.as_ref();

        info!(path = %path.display(), threads = self.onnx_threads, "Loading ONNX classifier");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone());

        let probability_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .map(|o| o.name.clone());

        if label_output.is_none() && probability_output.is_none() {
            anyhow::bail!(
                "Model at {:?} exposes neither a label nor a probability output",
                path
            );
        }

        info!(
            input = %input_name,
            label_output = ?label_output,
            probability_output = ?probability_output,
            "Classifier loaded successfully"
        );

        Ok(LoadedModel {
            session,
            input_name,
            label_output,
            probability_output,
        })
    }
}

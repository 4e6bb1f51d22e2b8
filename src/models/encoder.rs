//! Categorical encoder for the transaction type column

use crate::error::PipelineError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Encoder artifact as exported at training time
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EncoderArtifact {
    Object { classes: Vec<String> },
    List(Vec<String>),
}

/// Maps each known transaction type to its position in the training class list.
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    classes: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelEncoder {
    /// Build an encoder from the class list, in training order
    pub fn new(classes: Vec<String>) -> Result<Self> {
        if classes.is_empty() {
            anyhow::bail!("Encoder has no classes");
        }

        let mut index = HashMap::with_capacity(classes.len());
        for (position, class) in classes.iter().enumerate() {
            if index.insert(class.clone(), position).is_some() {
                anyhow::bail!("Duplicate encoder class [{}]", class);
            }
        }

        Ok(Self { classes, index })
    }

    /// Load the encoder from a JSON artifact, either `{"classes": [...]}` or a bare list
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read encoder from {:?}", path))?;
        let encoder = Self::from_json(&raw)
            .with_context(|| format!("Failed to parse encoder from {:?}", path))?;

        info!(
            path = %path.display(),
            classes = ?encoder.classes,
            "Encoder loaded"
        );

        Ok(encoder)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let artifact: EncoderArtifact = serde_json::from_str(raw)?;
        let classes = match artifact {
            EncoderArtifact::Object { classes } => classes,
            EncoderArtifact::List(classes) => classes,
        };
        Self::new(classes)
    }

    /// Encode a transaction type; unseen values are an error, never a default.
    pub fn encode(&self, value: &str) -> Result<usize, PipelineError> {
        self.index
            .get(value)
            .copied()
            .ok_or_else(|| PipelineError::Encoding {
                value: value.to_string(),
            })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

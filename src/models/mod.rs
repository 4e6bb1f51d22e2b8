//! Pre-trained model artifacts: the type encoder and the fraud classifier

pub mod classifier;
pub mod encoder;
pub mod loader;

pub use classifier::{Classifier, OnnxClassifier};
pub use encoder::LabelEncoder;

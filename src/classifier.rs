use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PredictError;

/// Top prediction of a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
}

/// Which backend a server runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ClassifierMode {
    /// Frozen tensorflow graph plus class list from the models directory
    Trained,
    /// Color-ratio heuristic, no model artifact needed
    Demo,
}

/// A classifier backend. Implementations must be safe to share between
/// request handlers.
pub trait Classifier: Send + Sync {
    /// Whether a prediction can be served right now.
    fn is_ready(&self) -> bool;

    fn num_classes(&self) -> usize;

    /// Classify the image stored at `image_path`.
    fn classify(&self, image_path: &Path) -> Result<Classification, PredictError>;

    /// Re-read model artifacts. Backends without artifacts do nothing.
    fn reload(&self) -> Result<(), crate::error::ModelError> {
        Ok(())
    }
}

//! Error kinds surfaced by the prediction pipeline, model loading,
//! training and dataset generation.
//!
//! Every error that reaches the HTTP layer is rendered as `{"error": "..."}`
//! using its `Display` text, so those strings are part of the wire contract.

use std::path::PathBuf;

use serde_json::{json, Value};
use thiserror::Error;

/// Failure of a single prediction request.
#[derive(Error, Debug)]
pub enum PredictError {
    /// Rejected upload (missing field, empty name, wrong extension)
    #[error("{0}")]
    Validation(String),

    /// The stored image could not be decoded
    #[error("Error processing image")]
    Decode(String),

    /// Trained-model backend has no model loaded
    #[error("Model not loaded. Please train the model first.")]
    NotReady,

    /// Anything else that went wrong while predicting
    #[error("Prediction failed: {0}")]
    Internal(String),
}

impl PredictError {
    pub fn to_json(&self) -> Value {
        json!({ "error": self.to_string() })
    }
}

/// Failure while loading or running the trained classifier.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid class list {0}: {1}")]
    ClassList(PathBuf, String),

    #[error("tensorflow: {0}")]
    Session(String),

    #[error("built without tensorflow support")]
    Unsupported,
}

/// Failure of the `/train_model` trigger.
#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("Training failed: {0}")]
    Failed(String),
}

impl From<DatasetError> for TrainingError {
    fn from(err: DatasetError) -> Self {
        TrainingError::Failed(err.to_string())
    }
}

impl From<ModelError> for TrainingError {
    fn from(err: ModelError) -> Self {
        TrainingError::Failed(err.to_string())
    }
}

/// Failure while generating the synthetic dataset or writing class names.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write image {0}: {1}")]
    Image(PathBuf, String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure reading the disease info table from disk.
#[derive(Error, Debug)]
pub enum DiseaseInfoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid disease info: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("record {0} has no remedies")]
    EmptyRemedies(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_bodies_carry_client_messages() {
        assert_eq!(
            PredictError::Validation("Invalid file type".into()).to_json(),
            json!({ "error": "Invalid file type" })
        );
        assert_eq!(
            PredictError::NotReady.to_json()["error"],
            "Model not loaded. Please train the model first."
        );
        assert_eq!(
            PredictError::Decode("bad header".into()).to_string(),
            "Error processing image"
        );
        assert_eq!(
            PredictError::Internal("boom".into()).to_string(),
            "Prediction failed: boom"
        );
    }

    #[test]
    fn training_errors_are_prefixed() {
        let err: TrainingError = ModelError::Unsupported.into();
        assert_eq!(
            err.to_string(),
            "Training failed: built without tensorflow support"
        );
    }
}

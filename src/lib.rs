//! Plant disease classification from leaf photos.
//!
//! Uploaded images go through a [`classifier::Classifier`] backend, either a
//! trained tensorflow graph ([`model::TrainedModelBackend`]) or a color-ratio
//! heuristic ([`heuristic::HeuristicClassifier`]), and the predicted label is
//! enriched with descriptions and remedies from [`disease_info`].

pub mod classifier;
pub mod config;
pub mod dataset;
pub mod disease_info;
pub mod error;
pub mod heuristic;
pub mod model;
pub mod preprocess;
pub mod routes;
pub mod service;
pub mod state;
pub mod training;
pub mod upload;
pub mod utils;

pub use classifier::{Classification, Classifier, ClassifierMode};
pub use config::ServerConfig;
pub use error::PredictError;
pub use service::{PredictionResult, PredictionService};
pub use state::{AppState, SharedState};

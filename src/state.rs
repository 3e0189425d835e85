//! Application context built once at startup and shared by every handler.

use std::sync::Arc;

use tracing::{info, warn};

use crate::classifier::{Classifier, ClassifierMode};
use crate::config::ServerConfig;
use crate::disease_info::DiseaseInfoStore;
use crate::heuristic::HeuristicClassifier;
use crate::model::TrainedModelBackend;
use crate::service::PredictionService;

pub struct AppState {
    pub config: ServerConfig,
    pub service: PredictionService,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: ServerConfig, classifier: Arc<dyn Classifier>) -> Self {
        if !config.uploads_are_served() {
            warn!(
                "Upload dir {} is outside static dir {}; image_path links will not resolve",
                config.upload_dir.display(),
                config.static_dir.display()
            );
        }
        let diseases = Arc::new(DiseaseInfoStore::load(&config.disease_info_path));
        let mut service = PredictionService::new(classifier, diseases);
        if config.simulated_latency() {
            service = service.with_simulated_latency(1.0..3.0);
        }
        Self { config, service }
    }

    /// Build the backend named by `config.mode`. In trained mode a load
    /// failure is logged and the server starts without a model.
    pub fn from_config(config: ServerConfig) -> Self {
        let classifier: Arc<dyn Classifier> = match config.mode {
            ClassifierMode::Demo => {
                info!("Running in demo mode with simulated AI predictions");
                Arc::new(HeuristicClassifier::default())
            }
            ClassifierMode::Trained => {
                let backend = TrainedModelBackend::new(config.model_artifacts());
                if let Err(err) = backend.load() {
                    warn!("Error loading model: {}", err);
                    warn!("Model will be trained first...");
                }
                Arc::new(backend)
            }
        };
        Self::new(config, classifier)
    }

    pub fn classifier(&self) -> &Arc<dyn Classifier> {
        self.service.classifier()
    }
}

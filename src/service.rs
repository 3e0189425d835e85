use std::ops::Range;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::classifier::Classifier;
use crate::disease_info::DiseaseInfoStore;
use crate::error::PredictError;

/// Response body of a successful prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub disease: String,
    pub confidence: f32,
    pub description: String,
    pub symptoms: String,
    pub remedies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

/// Ties a classifier backend to the disease metadata.
#[derive(Clone)]
pub struct PredictionService {
    classifier: Arc<dyn Classifier>,
    diseases: Arc<DiseaseInfoStore>,
    latency: Option<Range<f64>>,
}

impl PredictionService {
    pub fn new(classifier: Arc<dyn Classifier>, diseases: Arc<DiseaseInfoStore>) -> Self {
        Self {
            classifier,
            diseases,
            latency: None,
        }
    }

    /// Sleep a uniform number of seconds from `range` before each prediction.
    pub fn with_simulated_latency(mut self, range: Range<f64>) -> Self {
        self.latency = Some(range);
        self
    }

    pub fn classifier(&self) -> &Arc<dyn Classifier> {
        &self.classifier
    }

    /// Blocking. Run from a blocking-capable thread.
    pub fn predict(&self, image_path: &Path) -> Result<PredictionResult, PredictError> {
        if !self.classifier.is_ready() {
            return Err(PredictError::NotReady);
        }

        if let Some(range) = &self.latency {
            let secs = rand::thread_rng().gen_range(range.clone());
            std::thread::sleep(Duration::from_secs_f64(secs));
        }

        let classification = self.classifier.classify(image_path).map_err(|err| {
            warn!("Prediction for {} failed: {}", image_path.display(), err);
            err
        })?;

        let record = self.diseases.lookup(&classification.label);
        info!(
            "Predicted {} ({:.1}%) for {}",
            classification.label,
            classification.confidence * 100.0,
            image_path.display()
        );

        Ok(PredictionResult {
            disease: classification.label,
            confidence: classification.confidence,
            description: record.description.clone(),
            symptoms: record.symptoms.clone(),
            remedies: record.remedies.clone(),
            image_path: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classification;
    use crate::disease_info::DiseaseRecord;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeClassifier {
        ready: bool,
        label: &'static str,
        calls: AtomicUsize,
    }

    impl FakeClassifier {
        fn new(ready: bool, label: &'static str) -> Self {
            Self {
                ready,
                label,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Classifier for FakeClassifier {
        fn is_ready(&self) -> bool {
            self.ready
        }

        fn num_classes(&self) -> usize {
            1
        }

        fn classify(&self, _image_path: &Path) -> Result<Classification, PredictError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Classification {
                label: self.label.to_string(),
                confidence: 0.91,
            })
        }
    }

    fn service(classifier: Arc<FakeClassifier>) -> PredictionService {
        PredictionService::new(classifier, Arc::new(DiseaseInfoStore::builtin()))
    }

    #[test]
    fn known_label_is_enriched_from_store() {
        let fake = Arc::new(FakeClassifier::new(true, "Apple___Black_rot"));
        let result = service(fake).predict(Path::new("leaf.jpg")).unwrap();

        let expected = DiseaseInfoStore::builtin()
            .lookup("Apple___Black_rot")
            .clone();
        assert_eq!(result.disease, "Apple___Black_rot");
        assert!((result.confidence - 0.91).abs() < 1e-6);
        assert_eq!(result.description, expected.description);
        assert_eq!(result.symptoms, expected.symptoms);
        assert_eq!(result.remedies, expected.remedies);
        assert_eq!(result.image_path, None);
    }

    #[test]
    fn unknown_label_gets_undocumented_record() {
        let fake = Arc::new(FakeClassifier::new(true, "Unknown_Class_9"));
        let result = service(fake).predict(Path::new("leaf.jpg")).unwrap();
        let fallback = DiseaseRecord::undocumented();
        assert_eq!(result.description, fallback.description);
        assert_eq!(result.remedies, fallback.remedies);
    }

    #[test]
    fn not_ready_short_circuits_before_classifying() {
        let fake = Arc::new(FakeClassifier::new(false, "Apple___healthy"));
        let err = service(fake.clone())
            .predict(Path::new("leaf.jpg"))
            .unwrap_err();
        assert!(matches!(err, PredictError::NotReady));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn serialized_result_has_wire_field_names() {
        let result = PredictionResult {
            disease: "Apple___healthy".into(),
            confidence: 0.5,
            description: "d".into(),
            symptoms: "s".into(),
            remedies: vec!["r".into()],
            image_path: Some("static/uploads/1_a.jpg".into()),
        };
        let value = serde_json::to_value(&result).unwrap();
        for key in [
            "disease",
            "confidence",
            "description",
            "symptoms",
            "remedies",
            "image_path",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
    }
}

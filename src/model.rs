//! Trained-model backend: a frozen tensorflow graph plus the ordered class
//! list it was trained with.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, info, warn};

use crate::classifier::{Classification, Classifier};
use crate::error::{ModelError, PredictError};
use crate::preprocess::{preprocess, InputTensor};

/// Runs a forward pass and returns the probability vector of the single
/// batch entry.
pub trait InferenceSession: Send + Sync {
    fn run(&self, input: &InputTensor) -> Result<Vec<f32>, ModelError>;
}

/// Where the model artifacts live and how the graph is wired.
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub graph_path: PathBuf,
    pub class_names_path: PathBuf,
    pub input_op: String,
    pub output_op: String,
}

#[cfg(feature = "tensorflow")]
pub struct TensorflowSession {
    session: tensorflow::Session,
    graph: tensorflow::Graph,
    input_op: String,
    output_op: String,
}

#[cfg(feature = "tensorflow")]
impl TensorflowSession {
    pub fn load(artifacts: &ModelArtifacts) -> Result<Self, ModelError> {
        use tensorflow::{Graph, ImportGraphDefOptions, Session, SessionOptions};

        let model_bytes = std::fs::read(&artifacts.graph_path).map_err(|source| ModelError::Io {
            path: artifacts.graph_path.clone(),
            source,
        })?;

        let mut graph = Graph::new();
        graph
            .import_graph_def(&model_bytes, &ImportGraphDefOptions::new())
            .map_err(|e| ModelError::Session(e.to_string()))?;

        let session = Session::new(&SessionOptions::new(), &graph)
            .map_err(|e| ModelError::Session(e.to_string()))?;

        Ok(Self {
            session,
            graph,
            input_op: artifacts.input_op.clone(),
            output_op: artifacts.output_op.clone(),
        })
    }

    fn operation(&self, name: &str) -> Result<tensorflow::Operation, ModelError> {
        self.graph
            .operation_by_name(name)
            .map_err(|e| ModelError::Session(e.to_string()))?
            .ok_or_else(|| ModelError::Session(format!("operation '{}' not found in graph", name)))
    }
}

#[cfg(feature = "tensorflow")]
impl InferenceSession for TensorflowSession {
    fn run(&self, input: &InputTensor) -> Result<Vec<f32>, ModelError> {
        use tensorflow::{SessionRunArgs, Tensor};

        let mut input_tensor = Tensor::<f32>::new(&input.dims);
        input_tensor.copy_from_slice(&input.data);

        let input_operation = self.operation(&self.input_op)?;
        let output_operation = self.operation(&self.output_op)?;

        let mut args = SessionRunArgs::new();
        args.add_feed(&input_operation, 0, &input_tensor);
        let output_token = args.request_fetch(&output_operation, 0);
        self.session
            .run(&mut args)
            .map_err(|e| ModelError::Session(e.to_string()))?;

        let output_tensor: Tensor<f32> = args
            .fetch(output_token)
            .map_err(|e| ModelError::Session(e.to_string()))?;
        Ok(output_tensor.to_vec())
    }
}

#[cfg(feature = "tensorflow")]
fn open_session(artifacts: &ModelArtifacts) -> Result<Box<dyn InferenceSession>, ModelError> {
    Ok(Box::new(TensorflowSession::load(artifacts)?))
}

#[cfg(not(feature = "tensorflow"))]
fn open_session(_artifacts: &ModelArtifacts) -> Result<Box<dyn InferenceSession>, ModelError> {
    Err(ModelError::Unsupported)
}

/// Read the ordered class list. `.txt` files hold one label per line,
/// anything else is parsed as a JSON array of strings.
pub fn load_class_names(path: &Path) -> Result<Vec<String>, ModelError> {
    let text = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let labels: Vec<String> = if path.extension().map_or(false, |ext| ext == "txt") {
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect()
    } else {
        serde_json::from_str(&text)
            .map_err(|e| ModelError::ClassList(path.to_path_buf(), e.to_string()))?
    };

    if labels.is_empty() {
        return Err(ModelError::ClassList(path.to_path_buf(), "no labels".into()));
    }
    Ok(labels)
}

/// Index and value of the largest probability; ties go to the first index.
pub fn top_prediction(probabilities: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &p) in probabilities.iter().enumerate() {
        match best {
            Some((_, best_p)) if p <= best_p => {}
            Some(_) if p.is_nan() => {}
            _ => best = Some((i, p)),
        }
    }
    best
}

/// Map an output index to its label, or `Unknown_Class_<idx>` when the
/// class list is shorter than the model output.
pub fn resolve_label(labels: &[String], index: usize) -> String {
    labels
        .get(index)
        .cloned()
        .unwrap_or_else(|| format!("Unknown_Class_{}", index))
}

struct LoadedModel {
    session: Box<dyn InferenceSession>,
    labels: Vec<String>,
}

/// Starts without a model. Once a load succeeds the backend stays ready;
/// later failed reloads keep the previous model.
pub struct TrainedModelBackend {
    artifacts: ModelArtifacts,
    loaded: RwLock<Option<LoadedModel>>,
}

impl TrainedModelBackend {
    pub fn new(artifacts: ModelArtifacts) -> Self {
        Self {
            artifacts,
            loaded: RwLock::new(None),
        }
    }

    /// Load graph and class list from disk. Returns the number of classes.
    pub fn load(&self) -> Result<usize, ModelError> {
        let labels = load_class_names(&self.artifacts.class_names_path)?;
        let session = open_session(&self.artifacts)?;
        let num_classes = labels.len();
        self.install(session, labels);
        info!(
            "Model loaded successfully from {} ({} classes)",
            self.artifacts.graph_path.display(),
            num_classes
        );
        Ok(num_classes)
    }

    /// Swap in an already opened session and its labels.
    pub fn install(&self, session: Box<dyn InferenceSession>, labels: Vec<String>) {
        let mut guard = match self.loaded.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(LoadedModel { session, labels });
    }
}

impl Classifier for TrainedModelBackend {
    fn is_ready(&self) -> bool {
        self.loaded.read().map(|m| m.is_some()).unwrap_or(false)
    }

    fn num_classes(&self) -> usize {
        self.loaded
            .read()
            .ok()
            .and_then(|m| m.as_ref().map(|m| m.labels.len()))
            .unwrap_or(0)
    }

    fn classify(&self, image_path: &Path) -> Result<Classification, PredictError> {
        let guard = self
            .loaded
            .read()
            .map_err(|_| PredictError::Internal("model lock poisoned".into()))?;
        let model = guard.as_ref().ok_or(PredictError::NotReady)?;

        let input = preprocess(image_path)?;
        let probabilities = model
            .session
            .run(&input)
            .map_err(|e| PredictError::Internal(e.to_string()))?;

        if probabilities.len() != model.labels.len() {
            warn!(
                "Model produced {} outputs but class list has {} labels",
                probabilities.len(),
                model.labels.len()
            );
        }

        let (index, confidence) = top_prediction(&probabilities)
            .ok_or_else(|| PredictError::Internal("model returned no outputs".into()))?;
        let label = resolve_label(&model.labels, index);
        debug!("Predicted {} (index {}) with {:.4}", label, index, confidence);

        Ok(Classification {
            label,
            confidence: confidence.clamp(0.0, 1.0),
        })
    }

    fn reload(&self) -> Result<(), ModelError> {
        self.load().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    struct FixedSession(Vec<f32>);

    impl InferenceSession for FixedSession {
        fn run(&self, input: &InputTensor) -> Result<Vec<f32>, ModelError> {
            assert_eq!(input.dims, [1, 224, 224, 3]);
            Ok(self.0.clone())
        }
    }

    fn artifacts(dir: &Path) -> ModelArtifacts {
        ModelArtifacts {
            graph_path: dir.join("plant_disease_model.pb"),
            class_names_path: dir.join("class_names.json"),
            input_op: "x".into(),
            output_op: "Identity".into(),
        }
    }

    fn leaf(dir: &Path) -> PathBuf {
        let path = dir.join("leaf.png");
        ImageBuffer::from_pixel(16, 16, Rgb([40u8, 160, 40]))
            .save(&path)
            .unwrap();
        path
    }

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn argmax_prefers_first_of_equal_maxima() {
        assert_eq!(top_prediction(&[0.1, 0.4, 0.4, 0.1]), Some((1, 0.4)));
        assert_eq!(top_prediction(&[0.9]), Some((0, 0.9)));
        assert_eq!(top_prediction(&[]), None);
    }

    #[test]
    fn out_of_range_index_becomes_unknown_class() {
        let names = labels(&["a", "b"]);
        assert_eq!(resolve_label(&names, 1), "b");
        assert_eq!(resolve_label(&names, 5), "Unknown_Class_5");
    }

    #[test]
    fn not_ready_until_installed() {
        let dir = tempfile::tempdir().unwrap();
        let backend = TrainedModelBackend::new(artifacts(dir.path()));
        assert!(!backend.is_ready());
        assert_eq!(backend.num_classes(), 0);
        assert!(matches!(
            backend.classify(&leaf(dir.path())),
            Err(PredictError::NotReady)
        ));
    }

    #[test]
    fn stays_ready_across_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let backend = TrainedModelBackend::new(artifacts(dir.path()));
        backend.install(
            Box::new(FixedSession(vec![0.05, 0.8, 0.15])),
            labels(&["Apple___Apple_scab", "Apple___healthy", "Apple___Black_rot"]),
        );
        assert!(backend.is_ready());
        assert_eq!(backend.num_classes(), 3);

        let image = leaf(dir.path());
        for _ in 0..3 {
            let result = backend.classify(&image).unwrap();
            assert_eq!(result.label, "Apple___healthy");
            assert!((result.confidence - 0.8).abs() < 1e-6);
            assert!(backend.is_ready());
        }
    }

    #[test]
    fn label_list_shorter_than_output_yields_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let backend = TrainedModelBackend::new(artifacts(dir.path()));
        backend.install(
            Box::new(FixedSession(vec![0.1, 0.2, 0.7])),
            labels(&["Corn_(maize)___healthy"]),
        );

        let result = backend.classify(&leaf(dir.path())).unwrap();
        assert_eq!(result.label, "Unknown_Class_2");
    }

    #[test]
    fn undecodable_upload_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = TrainedModelBackend::new(artifacts(dir.path()));
        backend.install(Box::new(FixedSession(vec![1.0])), labels(&["a"]));

        let bogus = dir.path().join("leaf.jpg");
        std::fs::write(&bogus, b"garbage").unwrap();
        assert!(matches!(
            backend.classify(&bogus),
            Err(PredictError::Decode(_))
        ));
    }

    #[test]
    fn failed_reload_keeps_previous_model() {
        let dir = tempfile::tempdir().unwrap();
        let backend = TrainedModelBackend::new(artifacts(dir.path()));
        backend.install(Box::new(FixedSession(vec![1.0])), labels(&["a"]));

        assert!(backend.reload().is_err());
        assert!(backend.is_ready());
        assert_eq!(backend.num_classes(), 1);
    }

    #[test]
    fn class_names_accept_json_and_text() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("class_names.json");
        std::fs::write(&json, r#"["Apple___healthy", "Corn_(maize)___healthy"]"#).unwrap();
        assert_eq!(
            load_class_names(&json).unwrap(),
            labels(&["Apple___healthy", "Corn_(maize)___healthy"])
        );

        let txt = dir.path().join("class_list.txt");
        std::fs::write(&txt, "Apple___healthy\n\nApple___Black_rot\n").unwrap();
        assert_eq!(
            load_class_names(&txt).unwrap(),
            labels(&["Apple___healthy", "Apple___Black_rot"])
        );

        std::fs::write(&json, "[]").unwrap();
        assert!(matches!(
            load_class_names(&json),
            Err(ModelError::ClassList(_, _))
        ));
    }
}

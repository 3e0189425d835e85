use std::path::PathBuf;

use clap::Parser;

use crate::classifier::ClassifierMode;
use crate::model::ModelArtifacts;

pub const MODEL_FILE: &str = "plant_disease_model.pb";
pub const CLASS_NAMES_FILE: &str = "class_names.json";

/// Plant disease classification server
#[derive(Parser, Debug, Clone)]
#[command(name = "plant-disease-service")]
#[command(version)]
#[command(about = "Classify plant diseases from uploaded leaf photos")]
pub struct ServerConfig {
    /// Host to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Maximum request body size in megabytes
    #[arg(long, env = "BODY_LIMIT_MB", default_value_t = 16)]
    pub body_limit_mb: usize,

    /// Classifier backend
    #[arg(long, env = "CLASSIFIER_MODE", value_enum, default_value_t = ClassifierMode::Trained)]
    pub mode: ClassifierMode,

    /// Directory served under /static, holding index.html
    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// Where uploaded images are stored
    #[arg(long, env = "UPLOAD_DIR", default_value = "static/uploads")]
    pub upload_dir: PathBuf,

    /// Directory holding the frozen graph and class list
    #[arg(long, env = "MODELS_DIR", default_value = "models")]
    pub models_dir: PathBuf,

    /// Disease description/remedy table
    #[arg(
        long = "disease-info",
        env = "DISEASE_INFO_PATH",
        default_value = "data/disease_info.json"
    )]
    pub disease_info_path: PathBuf,

    /// Labeled dataset used by training
    #[arg(long, env = "DATASET_DIR", default_value = "data/PlantVillage")]
    pub dataset_dir: PathBuf,

    /// External trainer invoked by /train_model (trained mode)
    #[arg(long, env = "TRAIN_COMMAND")]
    pub train_command: Option<String>,

    /// Graph input operation name
    #[arg(long, env = "MODEL_INPUT_OP", default_value = "x")]
    pub input_op: String,

    /// Graph output operation name
    #[arg(long, env = "MODEL_OUTPUT_OP", default_value = "Identity")]
    pub output_op: String,

    /// Skip the artificial delays of demo mode
    #[arg(long, env = "NO_SIMULATED_LATENCY")]
    pub no_simulated_latency: bool,
}

impl ServerConfig {
    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb * 1024 * 1024
    }

    pub fn model_artifacts(&self) -> ModelArtifacts {
        ModelArtifacts {
            graph_path: self.models_dir.join(MODEL_FILE),
            class_names_path: self.models_dir.join(CLASS_NAMES_FILE),
            input_op: self.input_op.clone(),
            output_op: self.output_op.clone(),
        }
    }

    pub fn simulated_latency(&self) -> bool {
        self.mode == ClassifierMode::Demo && !self.no_simulated_latency
    }

    /// Whether stored uploads are reachable under `/static`.
    pub fn uploads_are_served(&self) -> bool {
        self.upload_dir.starts_with(&self.static_dir)
    }

    /// Public URL prefix of stored uploads, e.g. `static/uploads`. Uploads
    /// outside the static dir keep the default prefix; see
    /// [`ServerConfig::uploads_are_served`].
    pub fn upload_url_prefix(&self) -> String {
        match self.upload_dir.strip_prefix(&self.static_dir) {
            Ok(rest) => {
                let rest = rest.to_string_lossy().replace('\\', "/");
                if rest.is_empty() {
                    "static".to_string()
                } else {
                    format!("static/{}", rest)
                }
            }
            Err(_) => "static/uploads".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_layout() {
        let config = ServerConfig::parse_from(["test"]);
        assert_eq!(config.body_limit_bytes(), 16 * 1024 * 1024);
        assert_eq!(config.mode, ClassifierMode::Trained);
        assert_eq!(config.upload_url_prefix(), "static/uploads");
        assert_eq!(
            config.model_artifacts().class_names_path,
            PathBuf::from("models/class_names.json")
        );
        assert!(!config.simulated_latency());
    }

    #[test]
    fn demo_mode_flags() {
        let config = ServerConfig::parse_from(["test", "--mode", "demo"]);
        assert!(config.simulated_latency());

        let quiet = ServerConfig::parse_from(["test", "--mode", "demo", "--no-simulated-latency"]);
        assert!(!quiet.simulated_latency());
    }

    #[test]
    fn upload_prefix_follows_static_dir() {
        let config = ServerConfig::parse_from([
            "test",
            "--static-dir",
            "/srv/site",
            "--upload-dir",
            "/srv/site/images/in",
        ]);
        assert_eq!(config.upload_url_prefix(), "static/images/in");
        assert!(config.uploads_are_served());
    }

    #[test]
    fn upload_dir_outside_static_dir_is_not_served() {
        let config = ServerConfig::parse_from([
            "test",
            "--static-dir",
            "/srv/site",
            "--upload-dir",
            "/var/lib/uploads",
        ]);
        assert!(!config.uploads_are_served());
        assert!(ServerConfig::parse_from(["test"]).uploads_are_served());
    }
}

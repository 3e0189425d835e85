//! `/train_model` for both classifier modes.
//!
//! Trained mode prepares a dataset and class list, hands them to an external
//! trainer with explicit input and output paths, then reloads the model.
//! Demo mode only pretends.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::classifier::{Classifier, ClassifierMode};
use crate::dataset::{class_dirs, generate_synthetic_dataset, write_class_names, DatasetOptions};
use crate::disease_info::DEFAULT_CLASSES;
use crate::error::TrainingError;
use crate::state::AppState;

pub const TRAINED_MESSAGE: &str = "Model trained successfully!";
pub const DEMO_MESSAGE: &str =
    "Demo model is ready! (This is a simulation for demonstration purposes)";

pub async fn train(state: &AppState) -> Result<String, TrainingError> {
    match state.config.mode {
        ClassifierMode::Demo => {
            if state.config.simulated_latency() {
                let secs = rand::thread_rng().gen_range(2.0..5.0);
                tokio::time::sleep(Duration::from_secs_f64(secs)).await;
            }
            Ok(DEMO_MESSAGE.to_string())
        }
        ClassifierMode::Trained => {
            let command = state.config.train_command.as_deref().ok_or_else(|| {
                TrainingError::Failed("no training command configured (set TRAIN_COMMAND)".into())
            })?;
            let job = TrainingJob {
                command: command.to_string(),
                dataset_dir: state.config.dataset_dir.clone(),
                models_dir: state.config.models_dir.clone(),
            };
            job.run(state.classifier().clone()).await
        }
    }
}

/// One offline training run.
#[derive(Debug, Clone)]
pub struct TrainingJob {
    pub command: String,
    pub dataset_dir: PathBuf,
    pub models_dir: PathBuf,
}

impl TrainingJob {
    pub async fn run(&self, classifier: Arc<dyn Classifier>) -> Result<String, TrainingError> {
        info!("Starting model training with `{}`", self.command);

        let dataset_dir = self.dataset_dir.clone();
        let models_dir = self.models_dir.clone();
        let classes = tokio::task::spawn_blocking(move || prepare_inputs(&dataset_dir, &models_dir))
            .await
            .map_err(|e| TrainingError::Failed(e.to_string()))??;
        info!("Number of classes: {}", classes.len());

        self.invoke_trainer().await?;

        tokio::task::spawn_blocking(move || classifier.reload())
            .await
            .map_err(|e| TrainingError::Failed(e.to_string()))??;

        info!("Training finished, model reloaded");
        Ok(TRAINED_MESSAGE.to_string())
    }

    async fn invoke_trainer(&self) -> Result<(), TrainingError> {
        let mut parts = self.command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| TrainingError::Failed("training command is empty".into()))?;

        let output = Command::new(program)
            .args(parts)
            .arg("--dataset")
            .arg(&self.dataset_dir)
            .arg("--output")
            .arg(&self.models_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| TrainingError::Failed(format!("could not start {}: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last = stderr.lines().last().unwrap_or("").trim().to_string();
            error!("Trainer exited with {}: {}", output.status, stderr);
            return Err(TrainingError::Failed(if last.is_empty() {
                format!("trainer exited with {}", output.status)
            } else {
                last
            }));
        }
        Ok(())
    }
}

/// Make sure a dataset exists and the class list matches its directories.
fn prepare_inputs(dataset_dir: &Path, models_dir: &Path) -> Result<Vec<String>, TrainingError> {
    let classes = match class_dirs(dataset_dir) {
        Ok(classes) if !classes.is_empty() => classes,
        _ => {
            warn!(
                "No dataset at {}, generating sample data",
                dataset_dir.display()
            );
            let defaults: Vec<String> = DEFAULT_CLASSES.iter().map(|s| s.to_string()).collect();
            generate_synthetic_dataset(dataset_dir, &defaults, &DatasetOptions::default())?;
            class_dirs(dataset_dir)?
        }
    };
    write_class_names(models_dir, &classes)?;
    Ok(classes)
}

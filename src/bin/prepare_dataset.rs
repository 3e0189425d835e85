//! Generate the synthetic PlantVillage-style dataset and class list used by
//! the offline trainer.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use plant_disease_service::dataset::{
    class_dirs, dataset_exists, generate_synthetic_dataset, write_class_names, DatasetOptions,
};
use plant_disease_service::disease_info::DEFAULT_CLASSES;

#[derive(Parser, Debug)]
#[command(name = "prepare-dataset")]
#[command(about = "Write a synthetic labeled leaf dataset and its class list")]
struct Cli {
    /// Dataset root; train/ and test/ are created below it
    #[arg(long, env = "DATASET_DIR", default_value = "data/PlantVillage")]
    output: PathBuf,

    /// Where class_names.json is written
    #[arg(long, env = "MODELS_DIR", default_value = "models")]
    models_dir: PathBuf,

    #[arg(long, default_value_t = 100)]
    train_samples: usize,

    #[arg(long, default_value_t = 20)]
    test_samples: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Regenerate even if the dataset already exists
    #[arg(long)]
    force: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).compact().init();
    let cli = Cli::parse();

    let classes: Vec<String> = DEFAULT_CLASSES.iter().map(|s| s.to_string()).collect();

    if cli.force || !dataset_exists(&cli.output, &classes) {
        let options = DatasetOptions {
            train_samples: cli.train_samples,
            test_samples: cli.test_samples,
            seed: cli.seed,
        };
        generate_synthetic_dataset(&cli.output, &classes, &options)?;
    } else {
        info!("Dataset already present at {}", cli.output.display());
    }

    let ordered = class_dirs(&cli.output)?;
    let path = write_class_names(&cli.models_dir, &ordered)?;
    info!("Class names saved as: {}", path.display());
    Ok(())
}

//! Synthetic labeled image dataset for the offline training pipeline.
//!
//! Layout: `<root>/{train,test}/<class>/sample_<i>.jpg`.

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::config::CLASS_NAMES_FILE;
use crate::error::DatasetError;
use crate::preprocess::IMAGE_SIZE;

const SPOT_SIZE: u32 = 50;

#[derive(Debug, Clone)]
pub struct DatasetOptions {
    pub train_samples: usize,
    pub test_samples: usize,
    pub seed: u64,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            train_samples: 100,
            test_samples: 20,
            seed: 42,
        }
    }
}

fn noise<R: Rng>(rng: &mut R) -> RgbImage {
    RgbImage::from_fn(IMAGE_SIZE, IMAGE_SIZE, |_, _| {
        Rgb([rng.gen::<u8>(), rng.gen::<u8>(), rng.gen::<u8>()])
    })
}

/// Noise with the green channel lifted.
pub fn healthy_sample<R: Rng>(rng: &mut R) -> RgbImage {
    let mut img = noise(rng);
    for pixel in img.pixels_mut() {
        pixel[1] = pixel[1].saturating_add(50);
    }
    img
}

/// Noise with one reddish-yellow square patch.
pub fn diseased_sample<R: Rng>(rng: &mut R) -> RgbImage {
    let mut img = noise(rng);
    let x0 = rng.gen_range(50..IMAGE_SIZE - SPOT_SIZE);
    let y0 = rng.gen_range(50..IMAGE_SIZE - SPOT_SIZE);
    for y in y0..y0 + SPOT_SIZE {
        for x in x0..x0 + SPOT_SIZE {
            let pixel = img.get_pixel_mut(x, y);
            pixel[0] = pixel[0].saturating_add(80);
            pixel[1] = pixel[1].saturating_add(40);
        }
    }
    img
}

/// Write train and test splits for `classes` under `root`.
pub fn generate_synthetic_dataset(
    root: &Path,
    classes: &[String],
    options: &DatasetOptions,
) -> Result<PathBuf, DatasetError> {
    let mut rng = StdRng::seed_from_u64(options.seed);

    for (split, count) in [("train", options.train_samples), ("test", options.test_samples)] {
        for class in classes {
            let dir = root.join(split).join(class);
            fs::create_dir_all(&dir)?;

            for i in 0..count {
                let img = if class.contains("healthy") {
                    healthy_sample(&mut rng)
                } else {
                    diseased_sample(&mut rng)
                };
                let path = dir.join(format!("sample_{}.jpg", i));
                img.save(&path)
                    .map_err(|e| DatasetError::Image(path.clone(), e.to_string()))?;
            }
        }
    }

    info!(
        "Sample dataset created at {} ({} classes)",
        root.display(),
        classes.len()
    );
    Ok(root.to_path_buf())
}

/// A dataset is usable once every class has a train directory.
pub fn dataset_exists(root: &Path, classes: &[String]) -> bool {
    classes.iter().all(|c| root.join("train").join(c).is_dir())
}

/// Class directories of the train split in sorted order, which is the index
/// order a directory-based trainer assigns.
pub fn class_dirs(root: &Path) -> Result<Vec<String>, DatasetError> {
    let mut classes = Vec::new();
    for entry in fs::read_dir(root.join("train"))? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            classes.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    classes.sort();
    Ok(classes)
}

/// Write the ordered class list as a pretty JSON array.
pub fn write_class_names(models_dir: &Path, classes: &[String]) -> Result<PathBuf, DatasetError> {
    fs::create_dir_all(models_dir)?;
    let path = models_dir.join(CLASS_NAMES_FILE);
    fs::write(&path, serde_json::to_string_pretty(classes)?)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::load_class_names;

    fn classes() -> Vec<String> {
        vec!["Apple___healthy".into(), "Apple___Black_rot".into()]
    }

    #[test]
    fn healthy_samples_are_green_shifted() {
        let mut rng = StdRng::seed_from_u64(1);
        let img = healthy_sample(&mut rng);
        assert_eq!(img.dimensions(), (224, 224));
        assert!(img.pixels().all(|p| p[1] >= 50));
    }

    #[test]
    fn diseased_samples_have_a_patch_inside_bounds() {
        let mut rng = StdRng::seed_from_u64(2);
        let img = diseased_sample(&mut rng);
        let lifted = img.pixels().filter(|p| p[0] >= 80 && p[1] >= 40).count();
        assert!(lifted >= (SPOT_SIZE * SPOT_SIZE) as usize);
    }

    #[test]
    fn writes_both_splits_and_class_names() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("PlantVillage");
        let options = DatasetOptions {
            train_samples: 2,
            test_samples: 1,
            seed: 3,
        };

        assert!(!dataset_exists(&root, &classes()));
        generate_synthetic_dataset(&root, &classes(), &options).unwrap();
        assert!(dataset_exists(&root, &classes()));

        for class in classes() {
            assert!(root.join("train").join(&class).join("sample_1.jpg").is_file());
            assert!(root.join("test").join(&class).join("sample_0.jpg").is_file());
            assert!(!root.join("test").join(&class).join("sample_1.jpg").exists());
        }

        let mut sorted = classes();
        sorted.sort();
        assert_eq!(class_dirs(&root).unwrap(), sorted);

        let path = write_class_names(&dir.path().join("models"), &classes()).unwrap();
        assert_eq!(load_class_names(&path).unwrap(), classes());
    }
}

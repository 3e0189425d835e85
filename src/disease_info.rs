//! Disease descriptions, symptoms and remedies keyed by class label.
//!
//! The table is read once at startup from a JSON file. If the file is missing
//! or malformed the built-in table for the eight default classes is used
//! instead; the two sources are never merged.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::DiseaseInfoError;

/// Class labels the built-in table, the demo classifier and the synthetic
/// dataset all share. Order matches the training-time class ordering.
pub const DEFAULT_CLASSES: [&str; 8] = [
    "Apple___Apple_scab",
    "Apple___Black_rot",
    "Apple___Cedar_apple_rust",
    "Apple___healthy",
    "Corn_(maize)___Cercospora_leaf_spot",
    "Corn_(maize)___Common_rust",
    "Corn_(maize)___Northern_Leaf_Blight",
    "Corn_(maize)___healthy",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseRecord {
    pub description: String,
    pub symptoms: String,
    pub remedies: Vec<String>,
}

impl DiseaseRecord {
    fn new(description: &str, symptoms: &str, remedies: &[&str]) -> Self {
        Self {
            description: description.to_string(),
            symptoms: symptoms.to_string(),
            remedies: remedies.iter().map(|r| r.to_string()).collect(),
        }
    }

    /// Returned for any label the store does not know.
    pub fn undocumented() -> Self {
        Self::new(
            "Disease information not available.",
            "Symptoms not documented.",
            &["Consult with local agricultural extension service"],
        )
    }
}

#[derive(Debug, Clone)]
pub struct DiseaseInfoStore {
    records: HashMap<String, DiseaseRecord>,
    fallback: DiseaseRecord,
}

impl DiseaseInfoStore {
    /// Read the table from `path`, falling back to [`DiseaseInfoStore::builtin`]
    /// on any read or parse failure.
    pub fn load(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(store) => {
                info!(
                    "Loaded disease info for {} classes from {}",
                    store.len(),
                    path.display()
                );
                store
            }
            Err(err) => {
                warn!(
                    "Using built-in disease info ({}): {}",
                    path.display(),
                    err
                );
                Self::builtin()
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self, DiseaseInfoError> {
        let text = std::fs::read_to_string(path)?;
        let records: HashMap<String, DiseaseRecord> = serde_json::from_str(&text)?;

        if let Some((label, _)) = records.iter().find(|(_, r)| r.remedies.is_empty()) {
            return Err(DiseaseInfoError::EmptyRemedies(label.clone()));
        }

        Ok(Self::from_records(records))
    }

    pub fn from_records(records: HashMap<String, DiseaseRecord>) -> Self {
        Self {
            records,
            fallback: DiseaseRecord::undocumented(),
        }
    }

    /// Never fails: unknown labels get the undocumented record.
    pub fn lookup(&self, label: &str) -> &DiseaseRecord {
        self.records.get(label).unwrap_or(&self.fallback)
    }

    #[cfg(test)]
    fn contains(&self, label: &str) -> bool {
        self.records.contains_key(label)
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    pub fn builtin() -> Self {
        let entries = [
            (
                DEFAULT_CLASSES[0],
                DiseaseRecord::new(
                    "Apple scab is a fungal disease that affects apple trees and their fruit.",
                    "Dark, scaly lesions on leaves and fruit",
                    &[
                        "Apply fungicides containing sulfur or copper",
                        "Remove infected leaves and fruit",
                        "Improve air circulation around trees",
                        "Plant resistant apple varieties",
                    ],
                ),
            ),
            (
                DEFAULT_CLASSES[1],
                DiseaseRecord::new(
                    "Black rot is a fungal disease that causes dark lesions on apple leaves and fruit.",
                    "Brown to black circular spots on leaves, rotting fruit",
                    &[
                        "Remove infected plant parts",
                        "Apply fungicides in early spring",
                        "Ensure proper drainage",
                        "Prune to improve air circulation",
                    ],
                ),
            ),
            (
                DEFAULT_CLASSES[2],
                DiseaseRecord::new(
                    "Cedar apple rust is a fungal disease that alternates between cedar and apple trees.",
                    "Yellow spots on leaves that develop orange spore masses",
                    &[
                        "Remove nearby cedar trees if possible",
                        "Apply fungicides during wet periods",
                        "Plant resistant apple varieties",
                        "Remove infected leaves",
                    ],
                ),
            ),
            (
                DEFAULT_CLASSES[3],
                DiseaseRecord::new(
                    "The plant appears to be healthy with no visible signs of disease.",
                    "Green, vibrant leaves with no spots or discoloration",
                    &[
                        "Continue regular watering and fertilization",
                        "Monitor for any changes in plant health",
                        "Maintain good garden hygiene",
                        "Ensure adequate sunlight and air circulation",
                    ],
                ),
            ),
            (
                DEFAULT_CLASSES[4],
                DiseaseRecord::new(
                    "Cercospora leaf spot is a fungal disease affecting corn plants.",
                    "Small, rectangular gray or tan spots with dark borders on leaves",
                    &[
                        "Apply fungicides containing strobilurin",
                        "Practice crop rotation",
                        "Remove crop debris after harvest",
                        "Plant resistant corn varieties",
                    ],
                ),
            ),
            (
                DEFAULT_CLASSES[5],
                DiseaseRecord::new(
                    "Common rust is a fungal disease that creates rust-colored pustules on corn leaves.",
                    "Small, reddish-brown pustules on leaves",
                    &[
                        "Apply fungicides if infection is severe",
                        "Plant resistant corn hybrids",
                        "Ensure proper plant spacing",
                        "Remove infected plant debris",
                    ],
                ),
            ),
            (
                DEFAULT_CLASSES[6],
                DiseaseRecord::new(
                    "Northern leaf blight is a fungal disease causing elongated lesions on corn leaves.",
                    "Long, elliptical gray-green lesions on leaves",
                    &[
                        "Apply fungicides containing azoxystrobin",
                        "Practice crop rotation with non-host crops",
                        "Plant resistant corn varieties",
                        "Manage crop residue properly",
                    ],
                ),
            ),
            (
                DEFAULT_CLASSES[7],
                DiseaseRecord::new(
                    "The corn plant appears healthy with no visible disease symptoms.",
                    "Green, upright leaves with no lesions or discoloration",
                    &[
                        "Continue proper fertilization program",
                        "Monitor for pest and disease pressure",
                        "Maintain adequate soil moisture",
                        "Ensure proper plant spacing",
                    ],
                ),
            ),
        ];

        Self::from_records(
            entries
                .into_iter()
                .map(|(label, record)| (label.to_string(), record))
                .collect(),
        )
    }
}

//! Demo classifier that guesses a plausible label from leaf color ratios and
//! filename hints. It never fails: missing signal degrades to a uniform
//! random pick.

use std::path::Path;

use image::RgbImage;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::classifier::{Classification, Classifier};
use crate::disease_info::DEFAULT_CLASSES;
use crate::error::PredictError;
use crate::preprocess::open_image;

pub const MAX_CONFIDENCE: f32 = 0.98;

/// Ratios used when the image cannot be decoded.
pub const FALLBACK_STATS: ColorStats = ColorStats {
    green_ratio: 0.5,
    brown_ratio: 0.3,
};

/// Inclusive HSV range, hue in `0..=179` and saturation/value in `0..=255`.
#[derive(Debug, Clone, Copy)]
struct HsvBand {
    lower: [u8; 3],
    upper: [u8; 3],
}

impl HsvBand {
    fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| self.lower[i] <= hsv[i] && hsv[i] <= self.upper[i])
    }
}

const GREEN: HsvBand = HsvBand {
    lower: [40, 30, 30],
    upper: [80, 255, 255],
};

const BROWN: HsvBand = HsvBand {
    lower: [10, 50, 50],
    upper: [30, 255, 255],
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStats {
    pub green_ratio: f32,
    pub brown_ratio: f32,
}

/// 8-bit RGB to HSV with hue halved into `0..=179`.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let s = if max == 0.0 { 0.0 } else { 255.0 * delta / max };

    let h = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    [
        ((h / 2.0).round() as u32 % 180) as u8,
        s.round() as u8,
        max as u8,
    ]
}

pub fn color_stats(rgb: &RgbImage) -> ColorStats {
    let total = (rgb.width() as u64) * (rgb.height() as u64);
    if total == 0 {
        return FALLBACK_STATS;
    }

    let (mut green, mut brown) = (0u64, 0u64);
    for pixel in rgb.pixels() {
        let hsv = rgb_to_hsv(pixel[0], pixel[1], pixel[2]);
        if GREEN.contains(hsv) {
            green += 1;
        }
        if BROWN.contains(hsv) {
            brown += 1;
        }
    }

    ColorStats {
        green_ratio: green as f32 / total as f32,
        brown_ratio: brown as f32 / total as f32,
    }
}

pub fn analyze_image_color(path: &Path) -> ColorStats {
    match open_image(path) {
        Ok(img) => color_stats(&img.to_rgb8()),
        Err(err) => {
            debug!("Color analysis fell back for {}: {}", path.display(), err);
            FALLBACK_STATS
        }
    }
}

/// Plant family hinted by a filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlantFamily {
    Apple,
    Corn,
}

impl PlantFamily {
    pub fn from_filename(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        if name.contains("apple") {
            Some(PlantFamily::Apple)
        } else if name.contains("corn") || name.contains("maize") {
            Some(PlantFamily::Corn)
        } else {
            None
        }
    }

    /// Substring identifying this family's labels.
    fn marker(self) -> &'static str {
        match self {
            PlantFamily::Apple => "Apple",
            PlantFamily::Corn => "Corn",
        }
    }

    fn healthy_label(self) -> &'static str {
        match self {
            PlantFamily::Apple => "Apple___healthy",
            PlantFamily::Corn => "Corn_(maize)___healthy",
        }
    }

    /// `(base, jitter)` for a healthy verdict.
    fn healthy_confidence(self) -> (f32, f32) {
        match self {
            PlantFamily::Apple => (0.85, 0.1),
            PlantFamily::Corn => (0.87, 0.08),
        }
    }

    /// `(base, jitter)` for a diseased verdict.
    fn diseased_confidence(self) -> (f32, f32) {
        match self {
            PlantFamily::Apple => (0.78, 0.15),
            PlantFamily::Corn => (0.75, 0.18),
        }
    }
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, (base, spread): (f32, f32)) -> f32 {
    base + rng.gen_range(0.0..spread)
}

fn is_healthy(label: &str) -> bool {
    label.contains("healthy")
}

fn is_spotty(label: &str) -> bool {
    let lower = label.to_lowercase();
    ["spot", "blight", "scab"].iter().any(|w| lower.contains(w))
}

pub struct HeuristicClassifier {
    labels: Vec<String>,
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_CLASSES.iter().map(|s| s.to_string()).collect())
    }
}

impl HeuristicClassifier {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    fn pick<R: Rng + ?Sized>(&self, rng: &mut R, candidates: Vec<&String>) -> String {
        if let Some(label) = candidates.choose(rng) {
            return label.to_string();
        }
        self.labels
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| "Unknown_Class_0".to_string())
    }

    /// Map color statistics and a filename to a label and confidence.
    /// First matching rule wins.
    pub fn decide<R: Rng + ?Sized>(
        &self,
        stats: ColorStats,
        filename: &str,
        rng: &mut R,
    ) -> Classification {
        let family = PlantFamily::from_filename(filename);

        let (label, confidence) = if stats.green_ratio > 0.3 && stats.brown_ratio < 0.2 {
            match family {
                Some(family) => {
                    let label = self
                        .labels
                        .iter()
                        .find(|l| l.as_str() == family.healthy_label())
                        .cloned()
                        .unwrap_or_else(|| family.healthy_label().to_string());
                    (label, jitter(rng, family.healthy_confidence()))
                }
                None => {
                    let healthy: Vec<&String> =
                        self.labels.iter().filter(|l| is_healthy(l)).collect();
                    (self.pick(rng, healthy), jitter(rng, (0.82, 0.12)))
                }
            }
        } else {
            match family {
                Some(family) => {
                    let diseased: Vec<&String> = self
                        .labels
                        .iter()
                        .filter(|l| l.contains(family.marker()) && !is_healthy(l))
                        .collect();
                    (self.pick(rng, diseased), jitter(rng, family.diseased_confidence()))
                }
                None => {
                    let candidates: Vec<&String> = if stats.brown_ratio > 0.3 {
                        self.labels.iter().filter(|l| is_spotty(l)).collect()
                    } else {
                        self.labels.iter().collect()
                    };
                    (self.pick(rng, candidates), jitter(rng, (0.72, 0.2)))
                }
            }
        };

        Classification {
            label,
            confidence: confidence.min(MAX_CONFIDENCE),
        }
    }
}

impl Classifier for HeuristicClassifier {
    fn is_ready(&self) -> bool {
        true
    }

    fn num_classes(&self) -> usize {
        self.labels.len()
    }

    fn classify(&self, image_path: &Path) -> Result<Classification, PredictError> {
        let stats = analyze_image_color(image_path);
        let filename = image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let result = self.decide(stats, &filename, &mut rand::thread_rng());
        debug!(
            "Heuristic guess {} ({:.2}) from green={:.3} brown={:.3}",
            result.label, result.confidence, stats.green_ratio, stats.brown_ratio
        );
        Ok(result)
    }
}

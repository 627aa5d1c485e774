//! Core data types for detections, ground truth and evaluation results.

use serde::{Deserialize, Serialize};

use crate::category::one_hot;
use crate::error::Result;
use crate::geometry::VocBox;
use crate::shape::Shape;

/// A shape with one confidence per category.
///
/// A category score can be suppressed (by non-maximal suppression); a suppressed
/// score is absent rather than stored as a numeric sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    shape: Shape,
    scores: Vec<Option<f32>>,
}

impl Detection {
    /// Create a detection with every category score active.
    pub fn new(shape: Shape, scores: Vec<f32>) -> Self {
        Self {
            shape,
            scores: scores.into_iter().map(Some).collect(),
        }
    }

    /// Zero-score detection on a `(0, 0, 0, 0)` box, emitted for unusable grid slots.
    pub fn degenerate(category_count: usize) -> Self {
        Self::new(
            Shape::new(VocBox::new(0, 0, 0, 0).unwrap_or_default()),
            vec![0.0; category_count],
        )
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn voc_box(&self) -> VocBox {
        self.shape.voc_box()
    }

    pub fn category_count(&self) -> usize {
        self.scores.len()
    }

    /// Score for `category`, `None` if suppressed or out of range.
    pub fn score(&self, category: usize) -> Option<f32> {
        self.scores.get(category).copied().flatten()
    }

    pub fn scores(&self) -> &[Option<f32>] {
        &self.scores
    }

    pub fn is_suppressed(&self, category: usize) -> bool {
        matches!(self.scores.get(category), Some(None))
    }

    /// Mark `category` as "not a detection in this category".
    pub fn suppress(&mut self, category: usize) {
        if let Some(score) = self.scores.get_mut(category) {
            *score = None;
        }
    }

    /// Highest active score and its category; the first category wins ties.
    pub fn best(&self) -> Option<(usize, f32)> {
        self.scores
            .iter()
            .enumerate()
            .filter_map(|(c, s)| s.map(|s| (c, s)))
            .fold(None, |best, (c, s)| match best {
                Some((_, best_score)) if best_score >= s => best,
                _ => Some((c, s)),
            })
    }
}

/// Single-category view of a detection, tagged with the image it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedCategoryDetection {
    pub image_id: String,
    pub shape: Shape,
    pub score: f32,
}

/// An annotated object.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruthObject {
    pub shape: Shape,
    pub category_id: usize,
    /// Excluded from scoring when set.
    pub difficult: bool,
    pub category_name: String,
}

impl GroundTruthObject {
    pub fn new(shape: Shape, category_id: usize, difficult: bool, category_name: impl Into<String>) -> Self {
        Self {
            shape,
            category_id,
            difficult,
            category_name: category_name.into(),
        }
    }

    /// A detection with a one-hot score vector, as fed to target encoding.
    pub fn to_detection(&self, category_count: usize) -> Result<Detection> {
        Ok(Detection::new(
            self.shape.clone(),
            one_hot(self.category_id, category_count)?,
        ))
    }
}

/// Average precision of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAp {
    pub category: String,
    pub ap: f64,
}

/// AP table and mAP at a single overlap threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapReport {
    pub overlap_threshold: f64,
    pub ap_per_category: Vec<CategoryAp>,
    pub map: f64,
}

/// mAP at each threshold of a sweep and their mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapVolumeReport {
    pub per_threshold: Vec<MapReport>,
    pub map_volume: f64,
}

/// Quality score of the detections in a single image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageScore {
    pub image_id: String,
    /// Sum of the overlaps of the true positives.
    pub true_positives: f64,
    pub false_positives: f64,
    pub object_count: usize,
    pub detection_count: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// F1 plus a small bonus per true positive; used for ranking.
    pub score: f64,
}

//! Assignment of single-category detections to ground-truth objects.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use crate::error::Result;
use crate::ground_truth::GroundTruthIndex;
use crate::metrics::iou::calculate_overlap;
use crate::shape::Shape;
use crate::types::{GroundTruthObject, NamedCategoryDetection};

/// How a detection counts towards precision and recall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    TruePositive,
    FalsePositive,
    /// Matched a difficult object; counts as neither.
    DontCare,
}

/// A detection with its assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub image_id: String,
    pub score: f32,
    /// Index into the image's ground-truth objects of the best candidate, if any.
    pub ground_truth_index: Option<usize>,
    pub overlap: Option<f32>,
    pub outcome: MatchOutcome,
}

/// Best candidate among the objects of `category`: the one with the largest overlap.
///
/// Objects whose intersection with the shape is not positive are ignored. Ties keep
/// the earlier object.
pub fn best_ground_truth(
    shape: &Shape,
    objects: &[GroundTruthObject],
    category: usize,
    binary_threshold: Option<u8>,
) -> Result<Option<(usize, f32)>> {
    let mut best: Option<(usize, f32)> = None;
    for (index, object) in objects.iter().enumerate() {
        if object.category_id != category {
            continue;
        }
        let Some(overlap) = calculate_overlap(shape, &object.shape, binary_threshold)? else {
            continue;
        };
        if best.map_or(true, |(_, best_overlap)| overlap > best_overlap) {
            best = Some((index, overlap));
        }
    }
    Ok(best)
}

/// Match the detections of one category against the ground truth.
///
/// Detections are visited in order of decreasing score (ties in unspecified order).
/// A detection whose best overlap reaches `overlap_threshold` is a true positive the
/// first time its object is claimed, a false positive afterwards, and "don't care"
/// when the object is difficult. Every other detection is a false positive.
///
/// # Arguments
///
/// * `detections` - Detections of a single category across all images
/// * `ground_truth` - Ground truth of every image the detections refer to
/// * `category` - Category id being evaluated
/// * `overlap_threshold` - Minimum overlap for a match
/// * `binary_threshold` - Optional mask binarisation threshold
///
/// # Returns
///
/// Returns one `Match` per detection, sorted by score (descending).
///
/// # Errors
///
/// Returns [`crate::error::VocEvalError::UnknownImage`] if a detection refers to an
/// image without ground truth.
pub fn match_category(
    detections: &[NamedCategoryDetection],
    ground_truth: &GroundTruthIndex,
    category: usize,
    overlap_threshold: f32,
    binary_threshold: Option<u8>,
) -> Result<Vec<Match>> {
    let mut sorted: Vec<&NamedCategoryDetection> = detections.iter().collect();
    sorted.sort_unstable_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut claimed: HashSet<(&str, usize)> = HashSet::new();
    let mut matches = Vec::with_capacity(sorted.len());

    for detection in sorted {
        let objects = ground_truth.objects(&detection.image_id)?;
        let best = best_ground_truth(&detection.shape, objects, category, binary_threshold)?;

        let outcome = match best {
            Some((index, overlap)) if overlap >= overlap_threshold => {
                if objects[index].difficult {
                    MatchOutcome::DontCare
                } else if claimed.insert((detection.image_id.as_str(), index)) {
                    MatchOutcome::TruePositive
                } else {
                    MatchOutcome::FalsePositive
                }
            }
            _ => MatchOutcome::FalsePositive,
        };

        matches.push(Match {
            image_id: detection.image_id.clone(),
            score: detection.score,
            ground_truth_index: best.map(|(index, _)| index),
            overlap: best.map(|(_, overlap)| overlap),
            outcome,
        });
    }

    Ok(matches)
}

/// Number of non-difficult objects of `category`, summed over the images that appear
/// among the detections.
///
/// Images without a detection of this category do not contribute, so a category that
/// is rarely detected is measured against fewer objects.
pub fn positive_count(
    detections: &[NamedCategoryDetection],
    ground_truth: &GroundTruthIndex,
    category: usize,
) -> Result<usize> {
    let images: BTreeSet<&str> = detections.iter().map(|d| d.image_id.as_str()).collect();
    images
        .into_iter()
        .map(|image_id| ground_truth.object_count(image_id, category))
        .sum()
}

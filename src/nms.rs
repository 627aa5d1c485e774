//! Per-category non-maximal suppression (`NMS`) and the decode post-processing chain.
//!
//! Suppression works on one category at a time: a detection suppressed as a duplicate
//! "cat" keeps its "dog" score untouched.

use std::cmp::Ordering;

use tracing::debug;

use crate::error::{Result, VocEvalError};
use crate::settings::DetectionSettings;
use crate::threshold::{prune, validate_threshold};
use crate::types::Detection;

/// Apply greedy non-maximal suppression independently in every category.
///
/// For each category the detections are visited in order of decreasing score. A
/// detection with an active, strictly positive score suppresses every later detection
/// whose box overlap with it exceeds `overlap_threshold`. The input is not modified;
/// the returned detections keep the input order.
///
/// # Arguments
///
/// * `detections` - Detections of a single image
/// * `overlap_threshold` - Box overlap above which the lower-scoring detection is suppressed
///
/// # Errors
///
/// * [`VocEvalError::InvalidThreshold`] if `overlap_threshold` is outside [0.0, 1.0].
/// * [`VocEvalError::MismatchedSize`] if the detections have different category counts.
///
/// # Examples
///
/// ```
/// # use voc_eval::geometry::VocBox;
/// # use voc_eval::shape::Shape;
/// # use voc_eval::types::Detection;
/// # use voc_eval::nms::non_maximal_suppression;
/// let boxed = |xmin, ymin, xmax, ymax| Shape::new(VocBox::new(xmin, ymin, xmax, ymax).unwrap());
/// let detections = vec![
///     Detection::new(boxed(10, 10, 50, 50), vec![0.9]),
///     Detection::new(boxed(15, 15, 55, 55), vec![0.8]),
///     Detection::new(boxed(100, 100, 150, 150), vec![0.95]),
/// ];
///
/// let kept = non_maximal_suppression(&detections, 0.5).unwrap();
/// assert!(!kept[0].is_suppressed(0));
/// assert!(kept[1].is_suppressed(0));
/// assert!(!kept[2].is_suppressed(0));
/// ```
pub fn non_maximal_suppression(
    detections: &[Detection],
    overlap_threshold: f32,
) -> Result<Vec<Detection>> {
    validate_threshold(overlap_threshold)?;

    let mut result = detections.to_vec();
    let Some(category_count) = result.first().map(Detection::category_count) else {
        return Ok(result);
    };
    if let Some(other) = result.iter().find(|d| d.category_count() != category_count) {
        return Err(VocEvalError::MismatchedSize(format!(
            "detections disagree on category count: {} vs {}",
            category_count,
            other.category_count()
        )));
    }

    let mut suppressed = 0usize;
    let mut indices: Vec<usize> = (0..result.len()).collect();
    for category in 0..category_count {
        // Sort indices by score (descending), suppressed scores last
        indices.sort_unstable_by(|&a, &b| {
            let score_a = result[a].score(category).unwrap_or(f32::NEG_INFINITY);
            let score_b = result[b].score(category).unwrap_or(f32::NEG_INFINITY);
            score_b.partial_cmp(&score_a).unwrap_or(Ordering::Equal)
        });

        for (i, &idx_i) in indices.iter().enumerate() {
            let active = result[idx_i]
                .score(category)
                .is_some_and(|score| score >= f32::MIN_POSITIVE);
            if !active {
                continue;
            }

            let voc_box = result[idx_i].voc_box();
            for &idx_j in &indices[(i + 1)..] {
                if voc_box.overlap(&result[idx_j].voc_box()) > overlap_threshold {
                    if !result[idx_j].is_suppressed(category) {
                        suppressed += 1;
                    }
                    result[idx_j].suppress(category);
                }
            }
        }
    }

    debug!(
        detections = result.len(),
        suppressed_scores = suppressed,
        "non-maximal suppression"
    );

    Ok(result)
}

/// Post-process decoded detections: `NMS` when enabled, then prune at the
/// detection threshold.
pub fn postprocess(detections: &[Detection], settings: &DetectionSettings) -> Result<Vec<Detection>> {
    if settings.nms {
        let suppressed = non_maximal_suppression(detections, settings.overlap_threshold)?;
        prune(&suppressed, settings.detection_threshold)
    } else {
        prune(detections, settings.detection_threshold)
    }
}

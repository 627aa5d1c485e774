//! Shape-aware overlap used when matching detections to ground truth.

use crate::error::Result;
use crate::geometry::VocBox;
use crate::shape::Shape;

/// Overlap between a predicted and a ground-truth shape.
///
/// Returns `None` when the intersection area is not positive; such pairs are never
/// match candidates. Otherwise returns `intersection / (area(a) + area(b) - intersection)`
/// using mask pixels where masks are present and inclusive box arithmetic elsewhere.
///
/// # Arguments
///
/// * `prediction` - Predicted shape
/// * `ground_truth` - Ground-truth shape
/// * `binary_threshold` - Optional mask binarisation threshold, see [`Shape::area`]
///
/// # Example
///
/// ```
/// use voc_eval::geometry::VocBox;
/// use voc_eval::metrics::iou::calculate_overlap;
/// use voc_eval::shape::Shape;
///
/// let a = Shape::new(VocBox::new(0, 0, 9, 9).unwrap());
/// let b = Shape::new(VocBox::new(5, 0, 14, 9).unwrap());
/// let overlap = calculate_overlap(&a, &b, None).unwrap().unwrap();
/// assert!((overlap - 50.0 / 150.0).abs() < 1e-6);
/// ```
pub fn calculate_overlap(
    prediction: &Shape,
    ground_truth: &Shape,
    binary_threshold: Option<u8>,
) -> Result<Option<f32>> {
    let intersection = prediction.intersection_area(ground_truth, binary_threshold)?;
    if intersection <= 0.0 {
        return Ok(None);
    }

    let union = prediction.area(binary_threshold)? + ground_truth.area(binary_threshold)? - intersection;
    Ok(Some(intersection / union))
}

/// Calculate the box overlap matrix between two sets of boxes.
///
/// `result[i][j]` is the overlap between `boxes1[i]` and `boxes2[j]`.
pub fn calculate_overlap_matrix(boxes1: &[VocBox], boxes2: &[VocBox]) -> Vec<Vec<f32>> {
    boxes1
        .iter()
        .map(|a| boxes2.iter().map(|b| a.overlap(b)).collect())
        .collect()
}

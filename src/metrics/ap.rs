//! Average Precision (AP), mean Average Precision (mAP) and mAP volume.

use crate::metrics::precision_recall::PrecisionRecallCurve;

/// Calculate Average Precision (AP) from a precision-recall curve.
///
/// The curve is padded with recall `0` and `1` at either end and precision `0` at
/// either end. Precision is then replaced by its monotone non-increasing envelope,
/// walking backwards, and AP is the sum of `(recall[k+1] - recall[k]) * precision[k+1]`.
///
/// # Arguments
///
/// * `curve` - Cumulative precision and recall in score order
///
/// # Returns
///
/// Returns the Average Precision value (0.0 to 1.0).
///
/// # Example
///
/// ```
/// use voc_eval::metrics::ap::calculate_ap;
/// use voc_eval::metrics::precision_recall::PrecisionRecallCurve;
///
/// let curve = PrecisionRecallCurve {
///     precision: vec![1.0, 0.5],
///     recall: vec![1.0, 1.0],
/// };
/// assert!((calculate_ap(&curve) - 1.0).abs() < 1e-10);
/// ```
pub fn calculate_ap(curve: &PrecisionRecallCurve) -> f64 {
    let mut recall = Vec::with_capacity(curve.recall.len() + 2);
    recall.push(0.0);
    recall.extend_from_slice(&curve.recall);
    recall.push(1.0);

    let mut precision = Vec::with_capacity(curve.precision.len() + 2);
    precision.push(0.0);
    precision.extend_from_slice(&curve.precision);
    precision.push(0.0);

    let mut ap = 0.0;
    for k in (0..recall.len() - 1).rev() {
        precision[k] = precision[k].max(precision[k + 1]);
        ap += (recall[k + 1] - recall[k]) * precision[k + 1];
    }

    ap
}

/// Calculate mean Average Precision (mAP) across multiple classes.
///
/// # Arguments
///
/// * `class_aps` - Vector of AP values for each class
///
/// # Returns
///
/// Returns the mean Average Precision (0.0 to 1.0).
///
/// # Example
///
/// ```
/// use voc_eval::metrics::ap::calculate_map;
///
/// let class_aps = vec![0.8, 0.9, 0.75, 0.85];
/// let map = calculate_map(&class_aps);
/// assert!((map - 0.825).abs() < 1e-10);
/// ```
pub fn calculate_map(class_aps: &[f64]) -> f64 {
    if class_aps.is_empty() {
        return 0.0;
    }

    class_aps.iter().sum::<f64>() / class_aps.len() as f64
}

/// Calculate the mAP volume: the mean of mAP values computed at several overlap thresholds.
///
/// # Example
///
/// ```
/// use voc_eval::metrics::ap::calculate_map_volume;
///
/// let map_per_threshold = vec![0.9, 0.7, 0.5];
/// assert!((calculate_map_volume(&map_per_threshold) - 0.7).abs() < 1e-10);
/// ```
pub fn calculate_map_volume(map_per_threshold: &[f64]) -> f64 {
    calculate_map(map_per_threshold)
}
